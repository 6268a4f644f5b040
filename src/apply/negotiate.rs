//! One-shot handshake used when a run finds existing destination files.
//!
//! The engine hands a `ConflictPrompt` to its observer and blocks on the
//! matching `PendingResolution`. The prompt is consumed by answering it, so
//! it can be answered at most once; dropping it unanswered counts as
//! `Resolution::NoDecision`.

use std::sync::mpsc::{self, Receiver, SyncSender};

use super::types::{ApplyConflict, OverwriteMode};

/// The answer to a conflict prompt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Resolution {
    Overwrite,
    Skip,
    /// Declined, or the prompt was dropped without an answer.
    NoDecision,
}

impl From<OverwriteMode> for Resolution {
    fn from(mode: OverwriteMode) -> Self {
        match mode {
            OverwriteMode::Overwrite => Resolution::Overwrite,
            OverwriteMode::Skip => Resolution::Skip,
            // `Ask` is the unset value: the user closed the dialog.
            OverwriteMode::Ask => Resolution::NoDecision,
        }
    }
}

impl Resolution {
    /// The overwrite mode to continue with, `None` if the run must stop.
    pub fn effective_mode(self) -> Option<OverwriteMode> {
        match self {
            Resolution::Overwrite => Some(OverwriteMode::Overwrite),
            Resolution::Skip => Some(OverwriteMode::Skip),
            Resolution::NoDecision => None,
        }
    }
}

#[derive(Debug)]
pub struct ConflictPrompt {
    conflicts: Vec<ApplyConflict>,
    reply: SyncSender<Resolution>,
}

impl ConflictPrompt {
    pub(crate) fn new(conflicts: Vec<ApplyConflict>) -> (Self, PendingResolution) {
        let (reply, rx) = mpsc::sync_channel(1);
        (Self { conflicts, reply }, PendingResolution { rx })
    }

    /// Existing destinations in plan order (ROM, marker, tracks).
    pub fn conflicts(&self) -> &[ApplyConflict] {
        &self.conflicts
    }

    pub fn respond(self, resolution: Resolution) {
        // The run may already be gone; nothing is waiting for the answer then.
        let _ = self.reply.send(resolution);
    }

    /// Answer with an overwrite mode; `Ask` means the user cancelled.
    pub fn resolve(self, mode: OverwriteMode) {
        self.respond(Resolution::from(mode));
    }

    pub fn cancel(self) {
        self.respond(Resolution::NoDecision);
    }
}

#[derive(Debug)]
pub(crate) struct PendingResolution {
    rx: Receiver<Resolution>,
}

impl PendingResolution {
    /// Block until the prompt is answered or dropped.
    pub fn wait(self) -> Resolution {
        self.rx.recv().unwrap_or(Resolution::NoDecision)
    }
}
