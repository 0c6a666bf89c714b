//! Titled, rounded-border panels sized to fit their content.

use crate::text::{pad_to_width, visible_width, wrap_text};
use crate::theme::Tone;

const MIN_INNER_WIDTH: usize = 8;
// Border plus one column of padding on each side.
const CHROME_WIDTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    title: String,
    content: String,
    tone: Tone,
}

impl Panel {
    pub fn new(title: impl Into<String>, content: impl Into<String>, tone: Tone) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            tone,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Renders the panel as unstyled rows no wider than `max_width` columns.
    pub fn render_plain(&self, max_width: usize) -> Vec<String> {
        let max_inner = max_width.saturating_sub(CHROME_WIDTH).max(MIN_INNER_WIDTH);
        let title_width = visible_width(&self.title) + 2;

        let rows = wrap_text(&self.content, max_inner);
        let content_width = rows.iter().map(|row| visible_width(row)).max().unwrap_or(0);
        let inner = content_width
            .max(title_width + 1)
            .max(MIN_INNER_WIDTH)
            .min(max_inner);

        let mut lines = Vec::with_capacity(rows.len() + 2);
        lines.push(self.top_border(inner));
        for row in rows {
            lines.push(format!("│ {} │", pad_to_width(&row, inner)));
        }
        lines.push(format!("╰{}╯", "─".repeat(inner + 2)));
        lines
    }

    /// Renders the panel with the border and title painted in the panel tone.
    pub fn render(&self, max_width: usize) -> String {
        let plain = self.render_plain(max_width);
        let last = plain.len().saturating_sub(1);
        let mut out = String::new();

        for (index, line) in plain.iter().enumerate() {
            if index == 0 || index == last {
                out.push_str(&self.tone.paint(line).to_string());
            } else {
                let body = line
                    .strip_prefix("│ ")
                    .and_then(|rest| rest.strip_suffix(" │"))
                    .unwrap_or(line);
                let bar = self.tone.paint("│");
                out.push_str(&format!("{bar} {body} {bar}"));
            }
            out.push('\n');
        }

        out
    }

    fn top_border(&self, inner: usize) -> String {
        let title = format!(" {} ", self.title);
        let used = visible_width(&title) + 1;
        let remaining = (inner + 2).saturating_sub(used);
        format!("╭─{title}{}╮", "─".repeat(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_render_fits_content_and_title() {
        let rows = Panel::new("User", "list files", Tone::User).render_plain(80);

        assert_eq!(rows.len(), 3);
        assert!(rows[0].starts_with("╭─ User "));
        assert_eq!(rows[1], "│ list files │");
        let widths: Vec<usize> = rows.iter().map(|row| visible_width(row)).collect();
        assert!(widths.iter().all(|width| *width == widths[0]), "{rows:?}");
    }

    #[test]
    fn long_content_wraps_inside_max_width() {
        let content = "word ".repeat(40);
        let rows = Panel::new("Model", content, Tone::Model).render_plain(30);

        assert!(rows.len() > 3);
        assert!(rows.iter().all(|row| visible_width(row) <= 30), "{rows:?}");
    }

    #[test]
    fn empty_content_still_draws_a_box() {
        let rows = Panel::new("Tool Output", "", Tone::ToolOutput).render_plain(40);
        assert_eq!(rows.len(), 3);
        assert!(rows[2].starts_with('╰'));
    }
}
