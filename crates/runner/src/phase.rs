//! One load phase: staggered worker launch, deadline-scoped cancellation,
//! drain, seal.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use loadtest_metrics::MetricsCollector;
use parking_lot::Mutex;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::debug;

use crate::cancel::{CancelSource, CancelToken};
use crate::events::{EventSink, RunEvent};
use crate::worker::Worker;

/// Minimum delay between successive worker launches.
pub const STAGGER_FLOOR_MS: u64 = 50;

/// Launch stagger inside a phase: `max(floor, 1000/user_count)` ms.
pub fn stagger_delay(user_count: usize) -> Duration {
    let ms = (1_000 / user_count.max(1) as u64).max(STAGGER_FLOOR_MS);
    Duration::from_millis(ms)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseState {
    Idle,
    Spawning,
    Running,
    Draining,
    Sealed,
}

pub struct PhaseScheduler {
    metrics: Arc<MetricsCollector>,
    worker: Arc<Worker>,
    events: Arc<dyn EventSink>,
    state: Mutex<PhaseState>,
}

impl PhaseScheduler {
    pub fn new(
        metrics: Arc<MetricsCollector>,
        worker: Arc<Worker>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            metrics,
            worker,
            events,
            state: Mutex::new(PhaseState::Idle),
        }
    }

    pub fn state(&self) -> PhaseState {
        *self.state.lock()
    }

    fn set_state(&self, state: PhaseState) {
        *self.state.lock() = state;
    }

    /// Run one phase to completion. Worker errors are contained; only the
    /// phase deadline or the run-level token stops workers early, and the
    /// phase always seals with its metrics report.
    pub async fn run_phase(
        &self,
        phase: &str,
        user_count: usize,
        duration: Duration,
        iterations_per_user: usize,
        run_cancel: &CancelToken,
    ) {
        self.set_state(PhaseState::Spawning);
        self.metrics.start_phase(phase, user_count);
        self.events.emit(&RunEvent::PhaseStarted {
            phase: phase.to_string(),
            user_count,
        });

        let deadline = Instant::now() + duration;
        let (phase_source, phase_token) = CancelSource::new();
        let stagger = stagger_delay(user_count);

        let mut tasks: JoinSet<()> = JoinSet::new();
        let mut task_users: HashMap<tokio::task::Id, usize> = HashMap::new();

        // The deadline is live from the start of the phase, not from the
        // end of the launch ramp: with enough users the stagger span can
        // exceed the whole phase duration.
        let mut deadline_armed = true;
        for user_id in 1..=user_count {
            let worker = Arc::clone(&self.worker);
            let token = phase_token.clone();
            let phase_name = phase.to_string();
            let handle = tasks.spawn(async move {
                worker
                    .run(&phase_name, user_id, iterations_per_user, token)
                    .await;
            });
            task_users.insert(handle.id(), user_id);

            if user_id < user_count {
                tokio::select! {
                    _ = tokio::time::sleep(stagger) => {}
                    _ = tokio::time::sleep_until(deadline), if deadline_armed => {
                        deadline_armed = false;
                        phase_source.cancel();
                        self.events.emit(&RunEvent::PhaseDeadlineReached {
                            phase: phase.to_string(),
                        });
                        break;
                    }
                    _ = run_cancel.cancelled() => break,
                }
            }
        }
        debug!(phase, launched = task_users.len(), "worker launch ramp done");
        self.set_state(if phase_token.is_cancelled() {
            PhaseState::Draining
        } else {
            PhaseState::Running
        });

        let mut run_stop_armed = true;
        loop {
            tokio::select! {
                joined = tasks.join_next_with_id() => match joined {
                    None => break,
                    Some(Ok((id, ()))) => {
                        task_users.remove(&id);
                    }
                    Some(Err(join_error)) => {
                        let user_id = task_users.remove(&join_error.id()).unwrap_or(0);
                        self.events.emit(&RunEvent::WorkerFailed {
                            phase: phase.to_string(),
                            user_id,
                            error: join_error.to_string(),
                        });
                    }
                },
                _ = tokio::time::sleep_until(deadline), if deadline_armed => {
                    deadline_armed = false;
                    phase_source.cancel();
                    self.set_state(PhaseState::Draining);
                    self.events.emit(&RunEvent::PhaseDeadlineReached {
                        phase: phase.to_string(),
                    });
                }
                _ = run_cancel.cancelled(), if run_stop_armed => {
                    run_stop_armed = false;
                    phase_source.cancel();
                    self.set_state(PhaseState::Draining);
                }
            }
        }

        if let Some(snapshot) = self.metrics.end_phase(phase) {
            self.events.emit(&RunEvent::PhaseCompleted { snapshot });
        }
        self.set_state(PhaseState::Sealed);
    }
}
