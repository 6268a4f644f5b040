use std::io;
use std::path::PathBuf;

use crate::sprite::SpriteError;

use super::types::SlotId;

/// Why an apply run stopped.
#[derive(thiserror::Error, Debug)]
pub enum ApplyError {
    #[error("ROM file not found: {}", .0.display())]
    MissingRom(PathBuf),

    #[error("PCM file for slot {slot} not found: {}", .path.display())]
    MissingTrack { slot: SlotId, path: PathBuf },

    #[error("Sprite file not found: {}", .0.display())]
    MissingSprite(PathBuf),

    #[error("Invalid sprite file: {0}")]
    InvalidSprite(#[source] SpriteError),

    /// Overwriting would copy a file onto itself.
    #[error("{} is both a source and a destination", .0.display())]
    SourceIsDestination(PathBuf),

    /// Cancelled through the token, or the conflict prompt got no decision.
    #[error("Apply cancelled by user.")]
    Cancelled,

    /// The ROM was already copied when this happened and stays on disk.
    #[error("Sprite injection failed: {0}")]
    SpriteInjection(#[source] SpriteError),

    #[error("{step} failed for {}: {source}", .path.display())]
    Io {
        step: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("apply worker stopped before reporting a result")]
    WorkerLost,
}

impl ApplyError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApplyError::Cancelled)
    }

    pub(crate) fn io(
        step: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| ApplyError::Io { step, path, source }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("slot id {0:?} is not a non-negative integer")]
pub struct SlotIdError(pub String);
