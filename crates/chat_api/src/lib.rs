//! Transport-only client for OpenAI-compatible chat-completions endpoints.
//!
//! Builds and sends `POST {base}/chat/completions` requests and parses the
//! reply, keeping the raw JSON of both sides for callers that record them.
//! The tool loop and any conversation state live with the caller.

pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod payload;
pub mod url;

pub use client::{CancellationSignal, ChatApiClient, ChatCompletion};
pub use config::ChatApiConfig;
pub use error::ChatApiError;
pub use payload::{
    ChatChoice, ChatFunction, ChatFunctionCall, ChatMessage, ChatRequest, ChatResponse, ChatTool,
    ChatToolCall,
};
pub use url::normalize_chat_url;
