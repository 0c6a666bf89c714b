use serde_json::Value;

/// Content of one transcript file. The variant decides the file extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Json(Value),
    Markdown(String),
}

impl Payload {
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Text(_) => "txt",
            Self::Json(_) => "json",
            Self::Markdown(_) => "md",
        }
    }

    /// File contents. JSON is pretty-printed with a trailing newline.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) | Self::Markdown(text) => text.clone(),
            Self::Json(value) => match serde_json::to_string_pretty(value) {
                Ok(mut rendered) => {
                    rendered.push('\n');
                    rendered
                }
                Err(error) => format!("<serialization failed: {error}>\n"),
            },
        }
    }
}
