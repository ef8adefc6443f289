//! Per-cycle cancellation and deadline.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Context handed to every step of a reconciliation cycle.
///
/// Long waits inside a cycle (enforcement polling in particular) must finish
/// early when the token is cancelled or the deadline passes.
#[derive(Debug, Clone, Default)]
pub struct CycleContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl CycleContext {
    /// Unbounded context with a fresh token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context cancelled through `cancel` and bounded by an optional timeout.
    pub fn with_token(cancel: CancellationToken, timeout: Option<Duration>) -> Self {
        Self {
            cancel,
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    /// Context bounded by a timeout from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_token(CancellationToken::new(), Some(timeout))
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels the cycle.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns true once the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Time left before the deadline; `None` if unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Resolves when the cycle is cancelled or its deadline passes.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.cancel.cancelled().await,
        }
    }
}
