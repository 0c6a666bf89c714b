use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatApiError {
    #[error("API key is required")]
    MissingApiKey,
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {0} {1}")]
    Status(StatusCode, String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("request was cancelled")]
    Cancelled,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<ErrorPayloadFields>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayloadFields {
    message: Option<String>,
    code: Option<serde_json::Value>,
    #[serde(rename = "type")]
    type_: Option<String>,
}

/// Best human-readable message for a failed HTTP response.
///
/// Prefers `error.message` from an OpenAI-style error body, then the error
/// code or type, then the raw body, then the status reason.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let fields = serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(|payload| payload.error);

    if let Some(fields) = fields {
        if let Some(message) = fields.message.as_deref().and_then(non_empty) {
            return message.to_owned();
        }
        let code = fields.code.as_ref().map(|code| match code {
            serde_json::Value::String(code) => code.clone(),
            other => other.to_string(),
        });
        if let Some(label) = code.or(fields.type_).filter(|label| !label.trim().is_empty()) {
            return label;
        }
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

fn non_empty(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
