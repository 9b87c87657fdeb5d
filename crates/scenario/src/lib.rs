//! # Loadtest Scenario
//!
//! The concrete REST workflow each simulated user drives against the
//! target API: register, login, verify, onboard, create and read forms.
//! Every call is timed and recorded as exactly one observation; failures
//! are classified and absorbed here, never propagated to the engine.

mod client;
mod error;
mod models;
mod workload;

pub use client::{ApiClient, Outcome, REQUEST_TIMEOUT};
pub use error::RequestError;
pub use models::*;
pub use workload::FormsWorkload;
