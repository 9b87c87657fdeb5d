//! # Loadtest Runner
//!
//! Phase-driven concurrent execution engine. Coordinates many simulated
//! users across timed load phases, contains per-iteration failures, and
//! feeds every observation into the metrics collector.
//!
//! ## Features
//! - **Staggered worker launch** to avoid a thundering-herd start
//! - **Cooperative cancellation** — a run-wide token plus a narrower
//!   per-phase deadline scope, both checked at iteration boundaries
//! - **Strict phase sequencing** with inter-phase cool-downs
//! - **Structured run events** consumed by pluggable sinks
//! - **Failure containment**: a failing iteration or worker never aborts
//!   its phase

pub mod cancel;
pub mod config;
pub mod events;
pub mod orchestrator;
pub mod phase;
pub mod worker;
pub mod workload;

pub use cancel::{CancelSource, CancelToken};
pub use config::{ConfigError, EndpointRuleConfig, LoadTestConfig, PhaseConfig};
pub use events::{ConsoleSink, EventSink, NullSink, RunEvent};
pub use orchestrator::RunOrchestrator;
pub use phase::{stagger_delay, PhaseScheduler, PhaseState};
pub use worker::Worker;
pub use workload::{DataStore, IterationContext, IterationError, NoopStore, Workload};
