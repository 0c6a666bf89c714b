//! Terminal geometry probing.

use std::env;

pub const FALLBACK_COLUMNS: u16 = 100;

/// Returns the stdout terminal width in columns.
///
/// Falls back to `COLUMNS` and then [`FALLBACK_COLUMNS`] when stdout is not a tty.
pub fn columns() -> u16 {
    #[cfg(unix)]
    if let Some((columns, _rows)) = read_winsize(libc::STDOUT_FILENO) {
        return columns;
    }

    columns_from_env().unwrap_or(FALLBACK_COLUMNS)
}

fn columns_from_env() -> Option<u16> {
    env::var("COLUMNS")
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .filter(|value| *value > 0)
}

#[cfg(unix)]
fn read_winsize(fd: libc::c_int) -> Option<(u16, u16)> {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut size) };
    if result == 0 && size.ws_col > 0 && size.ws_row > 0 {
        Some((size.ws_col, size.ws_row))
    } else {
        None
    }
}
