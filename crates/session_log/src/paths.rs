use std::path::{Path, PathBuf};

use crate::counter::SessionId;
use crate::interaction::{InteractionKind, Role};

/// Counter file holding the last used session number, relative to the session root.
pub const COUNTER_FILE_NAME: &str = ".last_session";

/// Minimum digits used for session and interaction numbers.
pub const NUMBER_WIDTH: usize = 3;

#[must_use]
pub fn counter_path(root: &Path) -> PathBuf {
    root.join(COUNTER_FILE_NAME)
}

#[must_use]
pub fn session_dir_name(session: SessionId) -> String {
    format!("session_{}", pad_number(session.get()))
}

#[must_use]
pub fn interaction_dir_name(number: u32, kind: InteractionKind) -> String {
    format!("{}-{}", pad_number(number), kind.as_str())
}

#[must_use]
pub fn interaction_file_name(sequence: u32, role: Role, extension: &str) -> String {
    format!("{}-{}.{extension}", pad_number(sequence), role.as_str())
}

#[must_use]
pub fn pad_number(value: u32) -> String {
    format!("{value:0width$}", width = NUMBER_WIDTH)
}
