//! Time source used between deployment and verification.

use std::{future::Future, time::Duration};

/// Delays further processing by a given duration.
pub trait ConfirmationWaiter: Send + Sync {
    /// Resolves once `duration` has elapsed. Never fails.
    fn wait(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioWaiter;

impl ConfirmationWaiter for TokioWaiter {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopWaiter;

impl ConfirmationWaiter for NoopWaiter {
    async fn wait(&self, _duration: Duration) {}
}
