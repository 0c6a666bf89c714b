use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SessionLogError;
use crate::interaction::{InteractionId, Role};
use crate::paths::{interaction_dir_name, interaction_file_name};
use crate::payload::Payload;

/// Writes numbered interaction files below one session directory.
#[derive(Debug, Clone)]
pub struct TranscriptWriter {
    session_dir: PathBuf,
}

impl TranscriptWriter {
    #[must_use]
    pub fn new(session_dir: impl Into<PathBuf>) -> Self {
        Self {
            session_dir: session_dir.into(),
        }
    }

    #[must_use]
    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    #[must_use]
    pub fn interaction_dir(&self, interaction: InteractionId) -> PathBuf {
        self.session_dir
            .join(interaction_dir_name(interaction.number(), interaction.kind()))
    }

    /// Creates the interaction directory if needed and writes the file for `role`.
    pub fn record(
        &self,
        interaction: InteractionId,
        role: Role,
        payload: &Payload,
    ) -> Result<PathBuf, SessionLogError> {
        let dir = self.interaction_dir(interaction);
        fs::create_dir_all(&dir)
            .map_err(|source| SessionLogError::io("creating interaction directory", &dir, source))?;

        let file_name = interaction_file_name(
            interaction.sequence_for(role),
            role,
            payload.extension(),
        );
        let path = dir.join(file_name);
        fs::write(&path, payload.render())
            .map_err(|source| SessionLogError::io("writing transcript file", &path, source))?;

        Ok(path)
    }
}
