use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::warn;

use crate::error::{SessionLogError, UnpersistedSession};
use crate::paths::{counter_path, pad_number};

/// Sequential session number, rendered zero-padded (`001`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u32);

impl SessionId {
    #[must_use]
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&pad_number(self.0))
    }
}

/// Storage for the last used session number.
pub trait CounterStore {
    /// Claims the session number after `max(persisted, floor)` and persists it.
    ///
    /// `floor` is the last number this process handed out, so numbering keeps
    /// advancing in memory when the persisted value cannot be read or written.
    /// On failure the claimed number is returned inside the error.
    fn advance(&mut self, floor: u32) -> Result<SessionId, UnpersistedSession>;
}

/// Plain-text counter file guarded by an exclusive advisory lock.
#[derive(Debug, Clone)]
pub struct FileCounterStore {
    path: PathBuf,
}

impl FileCounterStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Counter file at `.last_session` inside `root`.
    #[must_use]
    pub fn in_root(root: &Path) -> Self {
        Self::new(counter_path(root))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_locked(&self) -> Result<File, SessionLogError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| {
                SessionLogError::io("creating session root", parent, source)
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|source| SessionLogError::io("opening session counter", &self.path, source))?;
        file.lock_exclusive()
            .map_err(|source| SessionLogError::counter_lock(&self.path, source))?;
        Ok(file)
    }

    fn read_last(&self, file: &mut File) -> Result<u32, SessionLogError> {
        let mut raw = String::new();
        file.read_to_string(&mut raw)
            .map_err(|source| SessionLogError::io("reading session counter", &self.path, source))?;
        Ok(parse_counter(&self.path, &raw))
    }

    fn write_value(&self, file: &mut File, value: u32) -> Result<(), SessionLogError> {
        let path = &self.path;
        file.set_len(0)
            .map_err(|source| SessionLogError::io("truncating session counter", path, source))?;
        file.seek(SeekFrom::Start(0))
            .map_err(|source| SessionLogError::io("rewinding session counter", path, source))?;
        file.write_all(value.to_string().as_bytes())
            .map_err(|source| SessionLogError::io("writing session counter", path, source))?;
        file.flush()
            .map_err(|source| SessionLogError::io("flushing session counter", path, source))
    }
}

impl CounterStore for FileCounterStore {
    fn advance(&mut self, floor: u32) -> Result<SessionId, UnpersistedSession> {
        let unpersisted = |value: u32, source| UnpersistedSession {
            session: SessionId::new(value),
            source,
        };

        let mut file = match self.open_locked() {
            Ok(file) => file,
            Err(source) => return Err(unpersisted(floor.saturating_add(1), source)),
        };

        let outcome = match self.read_last(&mut file) {
            Ok(last) => match last.max(floor).checked_add(1) {
                Some(next) => self
                    .write_value(&mut file, next)
                    .map(|()| SessionId::new(next))
                    .map_err(|source| unpersisted(next, source)),
                None => Err(unpersisted(
                    floor.saturating_add(1),
                    SessionLogError::CounterOverflow { last },
                )),
            },
            Err(source) => Err(unpersisted(floor.saturating_add(1), source)),
        };

        let _ = FileExt::unlock(&file);
        outcome
    }
}

/// Process-local counter store; nothing survives a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryCounterStore {
    last: u32,
    reject_writes: bool,
}

impl MemoryCounterStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an already used session number.
    #[must_use]
    pub fn starting_after(last: u32) -> Self {
        Self {
            last,
            reject_writes: false,
        }
    }

    /// Store whose every write fails, for exercising degraded numbering.
    #[must_use]
    pub fn rejecting_writes() -> Self {
        Self {
            last: 0,
            reject_writes: true,
        }
    }

    #[must_use]
    pub fn last(&self) -> u32 {
        self.last
    }
}

impl CounterStore for MemoryCounterStore {
    fn advance(&mut self, floor: u32) -> Result<SessionId, UnpersistedSession> {
        let next = self.last.max(floor).saturating_add(1);
        if self.reject_writes {
            return Err(UnpersistedSession {
                session: SessionId::new(next),
                source: SessionLogError::MemoryStoreRejected,
            });
        }

        self.last = next;
        Ok(SessionId::new(next))
    }
}

/// Hands out session numbers, persisting each through a [`CounterStore`].
pub struct SessionCounter {
    store: Box<dyn CounterStore>,
    last_claimed: u32,
}

impl SessionCounter {
    #[must_use]
    pub fn new(store: impl CounterStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            last_claimed: 0,
        }
    }

    /// Claims the next session number.
    ///
    /// A persistence failure is returned as [`UnpersistedSession`], which still
    /// carries a usable number; later calls keep counting from it in memory.
    pub fn next_session_id(&mut self) -> Result<SessionId, UnpersistedSession> {
        let result = self.store.advance(self.last_claimed);
        self.last_claimed = match &result {
            Ok(session) => session.get(),
            Err(unpersisted) => unpersisted.session.get(),
        };
        result
    }

    #[must_use]
    pub fn last_claimed(&self) -> Option<SessionId> {
        (self.last_claimed > 0).then(|| SessionId::new(self.last_claimed))
    }
}

impl fmt::Debug for SessionCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCounter")
            .field("last_claimed", &self.last_claimed)
            .finish_non_exhaustive()
    }
}

fn parse_counter(path: &Path, raw: &str) -> u32 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0;
    }

    match trimmed.parse::<u32>() {
        Ok(value) => value,
        Err(error) => {
            warn!(
                path = %path.display(),
                value = trimmed,
                %error,
                "ignoring unreadable session counter; numbering restarts"
            );
            0
        }
    }
}
