use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use crate::sprite::SpriteApplier;

use super::cancel::CancelToken;
use super::engine::{ApplyEngine, ApplyObserver};
use super::error::ApplyError;
use super::negotiate::ConflictPrompt;
use super::types::{ApplyRequest, ApplySuccess};

/// Messages sent from the worker thread back to the thread that started the job.
#[derive(Debug)]
pub enum ApplyEvent {
    Progress {
        step: String,
        current: usize,
        total: usize,
    },
    Conflicts(ConflictPrompt),
    Finished(Result<ApplySuccess, ApplyError>),
}

struct ChannelObserver {
    tx: Sender<ApplyEvent>,
}

impl ApplyObserver for ChannelObserver {
    fn progress(&mut self, step: &str, current: usize, total: usize) {
        let _ = self.tx.send(ApplyEvent::Progress {
            step: step.to_string(),
            current,
            total,
        });
    }

    fn conflicts(&mut self, prompt: ConflictPrompt) {
        // If the receiver is gone the prompt drops here, which the engine reads as no decision.
        let _ = self.tx.send(ApplyEvent::Conflicts(prompt));
    }
}

/// An apply run executing on its own thread.
pub struct ApplyJob {
    events: Receiver<ApplyEvent>,
    cancel: CancelToken,
    join: Option<JoinHandle<()>>,
}

impl ApplyJob {
    pub fn spawn<A>(mut engine: ApplyEngine<A>, request: ApplyRequest) -> Self
    where
        A: SpriteApplier + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<ApplyEvent>();
        let cancel = CancelToken::new();
        let cancel_for_thread = cancel.clone();

        let join = thread::spawn(move || {
            let mut observer = ChannelObserver { tx };
            let result = engine.run(&request, &mut observer, &cancel_for_thread);
            if let Err(e) = &result {
                if e.is_cancelled() {
                    log::info!("apply cancelled");
                } else {
                    log::warn!("apply failed: {e}");
                }
            }
            let _ = observer.tx.send(ApplyEvent::Finished(result));
        });

        Self {
            events: rx,
            cancel,
            join: Some(join),
        }
    }

    #[cfg(test)]
    pub(crate) fn events(&self) -> &Receiver<ApplyEvent> {
        &self.events
    }

    /// A handle that stops the run at its next checkpoint, e.g. from a signal handler.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Relay events to `observer` on the calling thread until the run finishes.
    pub fn wait<O: ApplyObserver>(mut self, observer: &mut O) -> Result<ApplySuccess, ApplyError> {
        let mut outcome = None;
        for event in self.events.iter() {
            match event {
                ApplyEvent::Progress {
                    step,
                    current,
                    total,
                } => observer.progress(&step, current, total),
                ApplyEvent::Conflicts(prompt) => observer.conflicts(prompt),
                ApplyEvent::Finished(result) => {
                    outcome = Some(result);
                    break;
                }
            }
        }

        if let Some(h) = self.join.take() {
            let _ = h.join();
        }

        // The worker only ends without `Finished` if it panicked.
        outcome.unwrap_or(Err(ApplyError::WorkerLost))
    }
}

impl Drop for ApplyJob {
    fn drop(&mut self) {
        // An abandoned job stops at its next checkpoint instead of writing on.
        if self.join.is_some() {
            self.cancel.cancel();
        }
    }
}
