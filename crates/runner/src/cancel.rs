//! Explicit cooperative cancellation, threaded through every suspension
//! point instead of living in process-wide state. A `CancelSource` flips
//! the flag; any number of `CancelToken` clones observe it.

use tokio::sync::watch;

#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelSource {
    pub fn new() -> (Self, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, CancelToken { rx })
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is signalled. If the source is dropped
    /// without cancelling, the future stays pending so `select!` arms fall
    /// through to their siblings.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_observed_by_all_tokens() {
        let (source, token) = CancelSource::new();
        let sibling = source.token();
        assert!(!token.is_cancelled());
        assert!(!sibling.is_cancelled());

        source.cancel();
        assert!(token.is_cancelled());
        assert!(sibling.is_cancelled());
        // Already-cancelled tokens resolve immediately.
        token.cancelled().await;
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiters() {
        let (source, token) = CancelSource::new();
        let waiter = tokio::spawn(async move { token.cancelled().await });
        source.cancel();
        waiter.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_source_stays_pending() {
        let (source, token) = CancelSource::new();
        drop(source);
        let outcome = tokio::time::timeout(Duration::from_secs(1), token.cancelled()).await;
        assert!(outcome.is_err());
        assert!(!token.is_cancelled());
    }
}
