//! Sequences the configured phases strictly one at a time, inserts the
//! inter-phase cool-down and the rest period, and triggers final
//! reporting — also when the run was cancelled part-way through.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use loadtest_metrics::{save_detailed_report, MetricsCollector};
use tracing::info;

use crate::cancel::CancelToken;
use crate::config::LoadTestConfig;
use crate::events::{EventSink, RunEvent};
use crate::phase::PhaseScheduler;
use crate::worker::Worker;
use crate::workload::{DataStore, Workload};

/// Fixed wait between consecutive phases.
pub const INTER_PHASE_COOLDOWN_SECS: u64 = 30;

pub struct RunOrchestrator {
    config: LoadTestConfig,
    metrics: Arc<MetricsCollector>,
    workload: Arc<dyn Workload>,
    store: Arc<dyn DataStore>,
    events: Arc<dyn EventSink>,
}

impl RunOrchestrator {
    pub fn new(
        config: LoadTestConfig,
        metrics: Arc<MetricsCollector>,
        workload: Arc<dyn Workload>,
        store: Arc<dyn DataStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            metrics,
            workload,
            store,
            events,
        }
    }

    /// Drive the whole run and return the path of the persisted report.
    /// A cancelled run skips remaining phases but still reports whatever
    /// data accumulated.
    pub async fn run(&self, cancel: CancelToken) -> Result<PathBuf> {
        self.events.emit(&RunEvent::RunStarted {
            base_url: self.config.base_url.clone(),
            phase_count: self.config.phases.len(),
            iterations_per_user: self.config.iterations_per_user,
        });

        self.sweep().await;

        let worker = Arc::new(Worker::new(
            Arc::clone(&self.workload),
            Arc::clone(&self.store),
            Arc::clone(&self.events),
        ));

        let phase_count = self.config.phases.len();
        for (index, phase_config) in self.config.phases.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }

            let phase = format!("Phase {} ({} users)", index + 1, phase_config.users);
            let scheduler = PhaseScheduler::new(
                Arc::clone(&self.metrics),
                Arc::clone(&worker),
                Arc::clone(&self.events),
            );
            scheduler
                .run_phase(
                    &phase,
                    phase_config.users,
                    Duration::from_secs(phase_config.duration_minutes * 60),
                    self.config.iterations_per_user,
                    &cancel,
                )
                .await;

            if index + 1 < phase_count && !cancel.is_cancelled() {
                self.events.emit(&RunEvent::CooldownStarted {
                    seconds: INTER_PHASE_COOLDOWN_SECS,
                });
                self.pause(Duration::from_secs(INTER_PHASE_COOLDOWN_SECS), &cancel)
                    .await;
            }
        }

        if !cancel.is_cancelled() && self.config.rest_duration_minutes > 0 {
            self.events.emit(&RunEvent::RestStarted {
                minutes: self.config.rest_duration_minutes,
            });
            self.pause(
                Duration::from_secs(self.config.rest_duration_minutes * 60),
                &cancel,
            )
            .await;
        }

        self.sweep().await;

        let snapshot = self.metrics.run_snapshot();
        self.events.emit(&RunEvent::RunCompleted {
            snapshot: snapshot.clone(),
        });
        let path = save_detailed_report(&snapshot, &self.config.report_dir)?;
        info!(path = %path.display(), "run report persisted");
        self.events.emit(&RunEvent::ReportSaved { path: path.clone() });
        Ok(path)
    }

    /// Cancellable wait; an aborted pause just returns early.
    async fn pause(&self, duration: Duration, cancel: &CancelToken) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = cancel.cancelled() => {}
        }
    }

    /// Remove leftovers from earlier runs when the workload advertises a
    /// sweep pattern. Failures are reported, never fatal.
    async fn sweep(&self) {
        let Some(pattern) = self.workload.sweep_pattern() else {
            return;
        };
        self.events.emit(&RunEvent::SweepStarted {
            pattern: pattern.clone(),
        });
        if let Err(error) = self.store.cleanup_matching(&pattern).await {
            self.events.emit(&RunEvent::SweepFailed {
                error: format!("{error:#}"),
            });
        }
    }
}
