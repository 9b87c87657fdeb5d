//! One simulated user: repeated scenario iterations with failure
//! containment, per-iteration cleanup, and a randomized backoff.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::cancel::CancelToken;
use crate::events::{EventSink, RunEvent};
use crate::workload::{DataStore, IterationContext, IterationError, Workload};

const BACKOFF_MIN_MS: u64 = 1_000;
const BACKOFF_MAX_MS: u64 = 3_000;

pub struct Worker {
    workload: Arc<dyn Workload>,
    store: Arc<dyn DataStore>,
    events: Arc<dyn EventSink>,
}

impl Worker {
    pub fn new(
        workload: Arc<dyn Workload>,
        store: Arc<dyn DataStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            workload,
            store,
            events,
        }
    }

    /// Run up to `iterations` sequential iterations. A failing iteration
    /// is logged and followed by cleanup-and-continue; cancellation stops
    /// the loop at the next boundary.
    pub async fn run(&self, phase: &str, user_id: usize, iterations: usize, cancel: CancelToken) {
        for iteration in 0..iterations {
            if cancel.is_cancelled() {
                break;
            }

            let identity = self.workload.identity(user_id, iteration);
            self.events.emit(&RunEvent::IterationStarted {
                user_id,
                iteration,
                total: iterations,
            });

            let cx = IterationContext {
                phase,
                user_id,
                iteration,
                identity: &identity,
                cancel: &cancel,
            };
            match self.workload.run_iteration(&cx).await {
                Ok(()) => {}
                Err(IterationError::Cancelled) => {
                    self.events.emit(&RunEvent::IterationCancelled { user_id });
                    break;
                }
                Err(IterationError::Failed(error)) => {
                    self.events.emit(&RunEvent::IterationFailed {
                        user_id,
                        iteration,
                        error: format!("{error:#}"),
                    });
                }
            }

            if let Err(error) = self.store.cleanup(&identity).await {
                self.events.emit(&RunEvent::CleanupFailed {
                    user_id,
                    error: format!("{error:#}"),
                });
            }

            let backoff = {
                let mut rng = rand::thread_rng();
                Duration::from_millis(rng.gen_range(BACKOFF_MIN_MS..=BACKOFF_MAX_MS))
            };
            tokio::select! {
                _ = tokio::time::sleep(backoff) => {}
                _ = cancel.cancelled() => break,
            }
        }
    }
}
