//! Output assembly: turns an `ApplyRequest` into a ROM copy, a `.msu`
//! marker and numbered `.pcm` tracks inside an output directory.
//!
//! `ApplyEngine::run` executes the steps in a fixed order on the calling
//! thread; `ApplyJob` moves a run onto a worker thread and relays progress
//! and conflict prompts back through a channel.

mod cancel;
mod engine;
mod error;
mod job;
mod negotiate;
mod plan;
mod types;

pub use engine::{ApplyEngine, ApplyObserver};
pub use error::{ApplyError, SlotIdError};
pub use job::ApplyJob;
pub use negotiate::ConflictPrompt;
pub use types::*;

#[cfg(test)]
mod tests;
