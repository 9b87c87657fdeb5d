//! Seams to the domain glue: the workload executed by each simulated user
//! and the backing store used for verification lookups and cleanup. The
//! engine only needs step-level success/failure from either.

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::cancel::CancelToken;

/// Why one iteration of a workload stopped.
#[derive(Debug, Error)]
pub enum IterationError {
    /// Cancellation observed at a step boundary; the worker stops its loop.
    #[error("iteration cancelled")]
    Cancelled,
    /// Anything else; logged, cleaned up, and the loop continues.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// Per-iteration execution context handed to the workload.
pub struct IterationContext<'a> {
    pub phase: &'a str,
    pub user_id: usize,
    pub iteration: usize,
    /// Generated identity for this iteration; doubles as the cleanup key.
    pub identity: &'a str,
    pub cancel: &'a CancelToken,
}

impl IterationContext<'_> {
    /// Cooperative check for use between workload steps.
    pub fn ensure_live(&self) -> Result<(), IterationError> {
        if self.cancel.is_cancelled() {
            return Err(IterationError::Cancelled);
        }
        Ok(())
    }
}

/// An ordered sequence of scenario steps executed once per iteration.
/// Implementations record their own observations; the engine only sees
/// the iteration-level outcome.
#[async_trait]
pub trait Workload: Send + Sync {
    /// Build the identity used for one iteration.
    fn identity(&self, user_id: usize, iteration: usize) -> String;

    /// Pattern for sweeping leftover identities before and after a run.
    fn sweep_pattern(&self) -> Option<String> {
        None
    }

    async fn run_iteration(&self, cx: &IterationContext<'_>) -> Result<(), IterationError>;
}

/// Keyed removal against the deployment's backing store, plus the
/// verification-token lookup some workflows need mid-iteration.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn verification_token(&self, key: &str) -> Result<Option<String>>;

    /// Remove everything created under one iteration identity.
    async fn cleanup(&self, key: &str) -> Result<()>;

    /// Remove everything matching an identity pattern.
    async fn cleanup_matching(&self, pattern: &str) -> Result<()>;
}

/// Store stand-in for deployments without direct backing-store access:
/// no tokens, cleanup succeeds as a no-op.
pub struct NoopStore;

#[async_trait]
impl DataStore for NoopStore {
    async fn verification_token(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn cleanup(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    async fn cleanup_matching(&self, _pattern: &str) -> Result<()> {
        Ok(())
    }
}
