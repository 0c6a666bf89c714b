//! Grapheme-aware width and wrapping helpers for panel content.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

const TAB_WIDTH: usize = 4;

pub fn grapheme_width(grapheme: &str) -> usize {
    if grapheme.is_empty() {
        return 0;
    }
    if grapheme == "\t" {
        return TAB_WIDTH;
    }

    grapheme
        .chars()
        .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(0))
        .sum()
}

/// Column width of plain (unstyled) text.
pub fn visible_width(input: &str) -> usize {
    input.graphemes(true).map(grapheme_width).sum()
}

/// Hard-wraps every line of `text` to at most `width` columns.
///
/// Wrapping prefers the last whitespace boundary inside the row and falls back
/// to splitting between graphemes. Tabs are expanded so padding stays aligned.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();

    for line in text.split('\n') {
        let line = line.trim_end_matches('\r').replace('\t', &" ".repeat(TAB_WIDTH));
        if line.is_empty() {
            rows.push(String::new());
            continue;
        }

        let mut current = String::new();
        let mut current_width = 0usize;
        let mut last_break: Option<usize> = None;

        for grapheme in line.graphemes(true) {
            let g_width = grapheme_width(grapheme);
            if current_width + g_width > width && !current.is_empty() {
                match last_break {
                    Some(break_at) if break_at > 0 => {
                        let rest = current.split_off(break_at);
                        rows.push(current.trim_end().to_string());
                        current = rest.trim_start().to_string();
                    }
                    _ => rows.push(std::mem::take(&mut current)),
                }
                current_width = visible_width(&current);
                last_break = None;
            }

            current.push_str(grapheme);
            current_width += g_width;
            if grapheme.chars().all(char::is_whitespace) {
                last_break = Some(current.len());
            }
        }

        rows.push(current);
    }

    rows
}

/// Pads `text` with spaces up to `width` columns.
pub fn pad_to_width(text: &str, width: usize) -> String {
    let current = visible_width(text);
    if current >= width {
        return text.to_string();
    }

    let mut padded = String::with_capacity(text.len() + width - current);
    padded.push_str(text);
    padded.push_str(&" ".repeat(width - current));
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_graphemes_count_two_columns() {
        assert_eq!(visible_width("ab"), 2);
        assert_eq!(visible_width("日本"), 4);
    }

    #[test]
    fn wrap_prefers_whitespace_boundaries() {
        let rows = wrap_text("list the files here", 10);
        assert_eq!(rows, vec!["list the", "files here"]);
    }

    #[test]
    fn wrap_splits_long_words_between_graphemes() {
        let rows = wrap_text("abcdefghij", 4);
        assert_eq!(rows, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn wrap_keeps_blank_lines() {
        let rows = wrap_text("one\n\ntwo", 20);
        assert_eq!(rows, vec!["one", "", "two"]);
    }

    #[test]
    fn pad_extends_to_requested_width() {
        assert_eq!(pad_to_width("ab", 4), "ab  ");
        assert_eq!(pad_to_width("abcd", 2), "abcd");
    }
}
