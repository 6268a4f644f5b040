use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::error::ApplyError;

/// Cooperative cancellation flag shared between a run and whoever may stop it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn check(&self) -> Result<(), ApplyError> {
        if self.is_cancelled() {
            Err(ApplyError::Cancelled)
        } else {
            Ok(())
        }
    }
}
