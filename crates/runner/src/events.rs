//! Structured run narration. The engine emits `RunEvent`s; rendering is a
//! sink concern, so business logic never prints directly.

use std::path::PathBuf;

use chrono::Utc;
use loadtest_metrics::{render_final_summary, render_phase_report, PhaseSnapshot, RunSnapshot};
use tracing::warn;

#[derive(Debug, Clone)]
pub enum RunEvent {
    RunStarted {
        base_url: String,
        phase_count: usize,
        iterations_per_user: usize,
    },
    SweepStarted {
        pattern: String,
    },
    SweepFailed {
        error: String,
    },
    PhaseStarted {
        phase: String,
        user_count: usize,
    },
    IterationStarted {
        user_id: usize,
        iteration: usize,
        total: usize,
    },
    IterationFailed {
        user_id: usize,
        iteration: usize,
        error: String,
    },
    IterationCancelled {
        user_id: usize,
    },
    CleanupFailed {
        user_id: usize,
        error: String,
    },
    WorkerFailed {
        phase: String,
        user_id: usize,
        error: String,
    },
    PhaseDeadlineReached {
        phase: String,
    },
    PhaseCompleted {
        snapshot: PhaseSnapshot,
    },
    CooldownStarted {
        seconds: u64,
    },
    RestStarted {
        minutes: u64,
    },
    RunCompleted {
        snapshot: RunSnapshot,
    },
    ReportSaved {
        path: PathBuf,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &RunEvent);
}

/// Renders events in the tool's console dialect: phase banners, per-user
/// diagnostics, full statistics blocks.
pub struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn emit(&self, event: &RunEvent) {
        match event {
            RunEvent::RunStarted {
                base_url,
                phase_count,
                iterations_per_user,
            } => {
                println!("{}", "=".repeat(80));
                println!("API Load Test");
                println!("{}", "=".repeat(80));
                println!("API Base URL: {base_url}");
                println!("Iterations per user per phase: {iterations_per_user}");
                println!("Number of phases: {phase_count}");
                println!();
            }
            RunEvent::SweepStarted { pattern } => {
                println!("Cleaning up test data matching: {pattern}");
            }
            RunEvent::SweepFailed { error } => {
                warn!(error, "test data sweep failed");
            }
            RunEvent::PhaseStarted { phase, user_count } => {
                println!();
                println!("{}", "=".repeat(80));
                println!(
                    "[{}] STARTING PHASE: {} with {} concurrent users",
                    Utc::now().format("%H:%M:%S"),
                    phase,
                    user_count
                );
                println!("{}", "=".repeat(80));
            }
            RunEvent::IterationStarted {
                user_id,
                iteration,
                total,
            } => {
                println!(
                    "  [User {}] Starting iteration {}/{}",
                    user_id,
                    iteration + 1,
                    total
                );
            }
            RunEvent::IterationFailed {
                user_id,
                iteration,
                error,
            } => {
                println!(
                    "  [User {}] Iteration {} failed: {}",
                    user_id,
                    iteration + 1,
                    error
                );
            }
            RunEvent::IterationCancelled { user_id } => {
                println!("  [User {user_id}] Iteration cancelled");
            }
            RunEvent::CleanupFailed { user_id, error } => {
                println!("  [User {user_id}] Cleanup failed: {error}");
            }
            RunEvent::WorkerFailed {
                phase,
                user_id,
                error,
            } => {
                println!("  [{phase}] [User {user_id}] Unexpected error: {error}");
            }
            RunEvent::PhaseDeadlineReached { phase } => {
                println!();
                println!("[{phase}] Phase time limit reached, stopping users...");
            }
            RunEvent::PhaseCompleted { snapshot } => {
                println!();
                print!("{}", render_phase_report(snapshot));
            }
            RunEvent::CooldownStarted { seconds } => {
                println!();
                println!("Waiting {seconds} seconds before next phase...");
                println!();
            }
            RunEvent::RestStarted { minutes } => {
                println!();
                println!("Resting for {minutes} minutes...");
            }
            RunEvent::RunCompleted { snapshot } => {
                println!();
                print!("{}", render_final_summary(snapshot));
            }
            RunEvent::ReportSaved { path } => {
                println!();
                println!("Detailed report saved to: {}", path.display());
            }
        }
    }
}

/// Discards everything. Used by tests that only assert on metrics.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &RunEvent) {}
}
