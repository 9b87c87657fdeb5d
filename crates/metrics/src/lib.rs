//! # Loadtest Metrics
//!
//! Thread-safe sink for per-request observations produced by concurrent
//! load-test workers, with on-demand aggregation into per-phase and
//! per-endpoint statistics.
//!
//! ## Features
//! - **Append-only recording** safe under unbounded concurrent writers
//! - **Nearest-rank percentiles** (no interpolation)
//! - **Ordered first-match endpoint normalization**
//! - **Point-in-time snapshots** so reporting never races recording
//! - **Console and Markdown report rendering**

mod collector;
mod endpoint;
mod report;
mod sample;

pub use collector::{percentile, EndpointStats, MetricsCollector, PhaseSnapshot, RunSnapshot};
pub use endpoint::{EndpointRules, RuleError};
pub use report::{
    render_detailed_report, render_final_summary, render_phase_report, save_detailed_report,
};
pub use sample::RequestSample;
