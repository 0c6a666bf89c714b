//! Numbered, on-disk transcript of one assistant session.
//!
//! Every user input, model round trip and tool call becomes an interaction
//! directory under `session_NNN/`, holding a request file and, when there is
//! one, a response file numbered one higher. Logging is best-effort: failures
//! come back as [`LogOutcome::Failed`] and are never fatal.

mod counter;
mod error;
mod format;
mod interaction;
mod logger;
mod paths;
mod payload;
mod writer;

pub use counter::{CounterStore, FileCounterStore, MemoryCounterStore, SessionCounter, SessionId};
pub use error::{SessionLogError, UnpersistedSession};
pub use format::{
    LlmRequestRecord, LlmResponseRecord, ToolRequestRecord, ToolResponseRecord, TranscriptFormat,
};
pub use interaction::{InteractionCounter, InteractionId, InteractionKind, Role};
pub use logger::{LogOutcome, RequestLog, SessionLogger};
pub use paths::{
    counter_path, interaction_dir_name, interaction_file_name, session_dir_name,
    COUNTER_FILE_NAME,
};
pub use payload::Payload;
pub use writer::TranscriptWriter;
