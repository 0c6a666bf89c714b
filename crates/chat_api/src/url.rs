/// Default base URL when none is configured.
pub const DEFAULT_CHAT_BASE_URL: &str = "https://api.openai.com/v1";

const COMPLETIONS_PATH: &str = "/chat/completions";

/// Normalize a base URL to its chat-completions endpoint.
///
/// A URL already ending in `/chat/completions` is kept; otherwise the path is
/// appended after trimming trailing slashes. Blank input uses the default.
pub fn normalize_chat_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_CHAT_BASE_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with(COMPLETIONS_PATH) {
        return trimmed.to_string();
    }
    format!("{trimmed}{COMPLETIONS_PATH}")
}
