use std::path::PathBuf;

use thiserror::Error;

use crate::counter::SessionId;

#[derive(Debug, Error)]
pub enum SessionLogError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to lock session counter at {path}: {source}")]
    CounterLock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session counter overflowed after {last}")]
    CounterOverflow { last: u32 },

    #[error("in-memory session counter rejected writes")]
    MemoryStoreRejected,
}

impl SessionLogError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn counter_lock(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CounterLock {
            path: path.into(),
            source,
        }
    }
}

/// A session number was claimed but could not be persisted.
///
/// The number is still valid for the current process; the next run may reuse it.
#[derive(Debug, Error)]
#[error("session {session} was not persisted: {source}")]
pub struct UnpersistedSession {
    pub session: SessionId,
    #[source]
    pub source: SessionLogError,
}
