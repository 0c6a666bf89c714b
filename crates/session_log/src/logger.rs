use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::counter::{FileCounterStore, SessionCounter, SessionId};
use crate::format::{
    LlmRequestRecord, LlmResponseRecord, ToolRequestRecord, ToolResponseRecord, TranscriptFormat,
};
use crate::interaction::{InteractionCounter, InteractionId, InteractionKind, Role};
use crate::paths::session_dir_name;
use crate::payload::Payload;
use crate::writer::TranscriptWriter;

/// Result of one best-effort log call. Never an error for the caller to propagate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutcome {
    Logged(PathBuf),
    Failed(String),
}

impl LogOutcome {
    #[must_use]
    pub fn is_logged(&self) -> bool {
        matches!(self, Self::Logged(_))
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Logged(path) => Some(path),
            Self::Failed(_) => None,
        }
    }
}

/// Outcome of logging a request, plus the interaction its response belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLog {
    pub interaction: InteractionId,
    pub outcome: LogOutcome,
}

/// Owns session and interaction numbering and is the only writer below the
/// session directory.
#[derive(Debug)]
pub struct SessionLogger {
    root: PathBuf,
    counter: SessionCounter,
    format: TranscriptFormat,
    session: SessionId,
    counter_persisted: bool,
    writer: TranscriptWriter,
    interactions: InteractionCounter,
}

impl SessionLogger {
    /// Claims a session number from `counter` and prepares `session_NNN/` under `root`.
    pub fn start(root: impl Into<PathBuf>, counter: SessionCounter, format: TranscriptFormat) -> Self {
        let root = root.into();
        let writer = TranscriptWriter::new(root.clone());
        let mut logger = Self {
            root,
            counter,
            format,
            session: SessionId::new(0),
            counter_persisted: true,
            writer,
            interactions: InteractionCounter::new(),
        };
        logger.start_next_session();
        logger
    }

    /// Logger numbering sessions through `.last_session` inside `root`.
    pub fn with_file_counter(root: impl Into<PathBuf>, format: TranscriptFormat) -> Self {
        let root = root.into();
        let counter = SessionCounter::new(FileCounterStore::in_root(&root));
        Self::start(root, counter, format)
    }

    /// Moves to a fresh session directory; interaction numbering restarts at 1.
    pub fn start_next_session(&mut self) -> SessionId {
        let session = match self.counter.next_session_id() {
            Ok(session) => {
                self.counter_persisted = true;
                session
            }
            Err(unpersisted) => {
                warn!(
                    session = %unpersisted.session,
                    error = %unpersisted.source,
                    "session counter not persisted; continuing with in-memory numbering"
                );
                self.counter_persisted = false;
                unpersisted.session
            }
        };

        self.session = session;
        self.interactions = InteractionCounter::new();
        self.writer = TranscriptWriter::new(self.root.join(session_dir_name(session)));

        let dir = self.writer.session_dir();
        match fs::create_dir_all(dir) {
            Ok(()) => info!(session = %session, dir = %dir.display(), "session started"),
            Err(error) => warn!(
                session = %session,
                dir = %dir.display(),
                %error,
                "could not create session directory; transcript entries may be missing"
            ),
        }

        session
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session
    }

    #[must_use]
    pub fn session_dir(&self) -> &Path {
        self.writer.session_dir()
    }

    /// Whether the current session number reached the counter store.
    #[must_use]
    pub fn counter_persisted(&self) -> bool {
        self.counter_persisted
    }

    /// Last interaction number handed out in this session.
    #[must_use]
    pub fn last_interaction(&self) -> u32 {
        self.interactions.current()
    }

    pub fn log_user_input(&mut self, input: &str) -> LogOutcome {
        let interaction = self.begin(InteractionKind::User);
        let payload = self.format.user_input(interaction.number(), input);
        self.write(interaction, Role::Request, &payload)
    }

    pub fn log_llm_request(&mut self, record: &LlmRequestRecord<'_>) -> RequestLog {
        let interaction = self.begin(InteractionKind::Llm);
        let payload = self.format.llm_request(interaction.number(), record);
        let outcome = self.write(interaction, Role::Request, &payload);
        RequestLog {
            interaction,
            outcome,
        }
    }

    pub fn log_llm_response(
        &mut self,
        interaction: InteractionId,
        record: &LlmResponseRecord<'_>,
    ) -> LogOutcome {
        debug_assert_eq!(interaction.kind(), InteractionKind::Llm);
        let payload = self.format.llm_response(interaction.number(), record);
        self.write(interaction, Role::Response, &payload)
    }

    pub fn log_tool_request(&mut self, record: &ToolRequestRecord<'_>) -> RequestLog {
        let interaction = self.begin(InteractionKind::Tool);
        let payload = self.format.tool_request(interaction.number(), record);
        let outcome = self.write(interaction, Role::Request, &payload);
        RequestLog {
            interaction,
            outcome,
        }
    }

    pub fn log_tool_response(
        &mut self,
        interaction: InteractionId,
        record: &ToolResponseRecord<'_>,
    ) -> LogOutcome {
        debug_assert_eq!(interaction.kind(), InteractionKind::Tool);
        let payload = self.format.tool_response(interaction.number(), record);
        self.write(interaction, Role::Response, &payload)
    }

    fn begin(&mut self, kind: InteractionKind) -> InteractionId {
        InteractionId::new(self.interactions.next(), kind)
    }

    fn write(&self, interaction: InteractionId, role: Role, payload: &Payload) -> LogOutcome {
        match self.writer.record(interaction, role, payload) {
            Ok(path) => {
                debug!(path = %path.display(), "transcript entry written");
                LogOutcome::Logged(path)
            }
            Err(error) => {
                warn!(
                    session = %self.session,
                    interaction = interaction.number(),
                    kind = %interaction.kind(),
                    role = role.as_str(),
                    %error,
                    "transcript entry not written"
                );
                LogOutcome::Failed(error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::counter::MemoryCounterStore;

    fn memory_logger(root: &Path) -> SessionLogger {
        SessionLogger::start(
            root,
            SessionCounter::new(MemoryCounterStore::new()),
            TranscriptFormat::Raw,
        )
    }

    #[test]
    fn start_creates_the_session_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let logger = memory_logger(temp.path());

        assert_eq!(logger.session_id(), SessionId::new(1));
        assert_eq!(logger.session_dir(), temp.path().join("session_001"));
        assert!(logger.session_dir().is_dir());
        assert!(logger.counter_persisted());
    }

    #[test]
    fn next_session_restarts_interaction_numbering() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut logger = memory_logger(temp.path());
        assert!(logger.log_user_input("first").is_logged());
        assert!(logger.log_user_input("second").is_logged());

        let session = logger.start_next_session();
        let outcome = logger.log_user_input("third");

        assert_eq!(session, SessionId::new(2));
        assert_eq!(
            outcome.path(),
            Some(temp.path().join("session_002/001-user/001-request.txt").as_path())
        );
    }

    #[test]
    fn rejected_counter_writes_are_reported_but_numbering_continues() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut logger = SessionLogger::start(
            temp.path(),
            SessionCounter::new(MemoryCounterStore::rejecting_writes()),
            TranscriptFormat::Raw,
        );

        assert!(!logger.counter_persisted());
        assert_eq!(logger.session_id(), SessionId::new(1));
        assert_eq!(logger.start_next_session(), SessionId::new(2));
    }

    #[test]
    fn failed_write_still_consumes_its_number() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut logger = memory_logger(temp.path());
        fs::create_dir_all(temp.path().join("session_001/001-user/001-request.txt"))
            .expect("blocking directory");

        let failed = logger.log_user_input("lost");
        let payload = json!({"model": "gpt-5"});
        let request = logger.log_llm_request(&LlmRequestRecord {
            model: "gpt-5",
            system_prompt: "",
            payload: &payload,
        });

        assert!(matches!(failed, LogOutcome::Failed(_)));
        assert_eq!(request.interaction.number(), 2);
        assert!(request.outcome.is_logged());
    }
}
