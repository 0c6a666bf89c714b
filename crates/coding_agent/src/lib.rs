//! Glass-box coding agent.
//!
//! The `glassbox` binary reads prompts at a terminal, lets a model call one
//! `shell` tool, and writes every interaction of the session to disk through
//! `session_log`:
//!
//! ```text
//! session_001/
//!   001-user/001-request.txt
//!   002-llm/002-request.json
//!   002-llm/003-response.json
//!   003-tool/003-request.txt
//!   003-tool/004-response.txt
//! ```
//!
//! ## Providers
//!
//! Each turn builds a provider for the selected model from the catalog in
//! [`models`]: OpenAI, Anthropic and OpenRouter, all over the OpenAI-compatible
//! chat-completions API. API keys come from the environment or a `.env` file.
//! `GLASSBOX_PROVIDER=mock` swaps in the scripted offline provider.
//!
//! ## Conversation memory
//!
//! [`app::App`] owns model-facing history and replays it on every turn through
//! provider-neutral `RunMessage` items. A turn's messages join the history
//! only when the run finishes; cancelled, denied and failed runs are dropped.
//!
//! ## Tool approval
//!
//! In approval mode every tool call waits for a `y`/`yes` answer. A denial is
//! logged as a refused tool interaction and cancels the run.

pub mod app;
pub mod approval;
pub mod commands;
pub mod config;
pub mod models;
pub mod repl;
pub mod runtime;
pub mod tools;
