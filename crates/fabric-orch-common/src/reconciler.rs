//! Base Reconciler trait, triggers and actions.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::context::CycleContext;

/// What started a reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// A single object changed; carries its key.
    Object(String),
    /// Periodic sweep over everything the reconciler knows about.
    Resync,
}

impl Trigger {
    /// Creates an object trigger.
    pub fn object(key: impl Into<String>) -> Self {
        Self::Object(key.into())
    }

    /// Key of the changed object, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Trigger::Object(key) => Some(key),
            Trigger::Resync => None,
        }
    }

    /// Returns true if this is a periodic sweep.
    pub fn is_resync(&self) -> bool {
        matches!(self, Trigger::Resync)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Object(key) => write!(f, "object {}", key),
            Trigger::Resync => write!(f, "resync"),
        }
    }
}

/// What the caller should do after a successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Run again after the given delay.
    Requeue(Duration),
    /// Wait for the next change notification.
    Await,
}

impl Action {
    /// Requeue after the given number of seconds.
    pub fn requeue_secs(secs: u64) -> Self {
        Self::Requeue(Duration::from_secs(secs))
    }

    /// Delay before the next run, if one was requested.
    pub fn requeue_after(&self) -> Option<Duration> {
        match self {
            Action::Requeue(delay) => Some(*delay),
            Action::Await => None,
        }
    }
}

/// Base trait for convergence controllers.
///
/// One call to [`Reconciler::reconcile`] is one cycle: it reads the desired
/// state, compares it against the observed state and issues whatever
/// mutations are needed. Cycles are short-lived and may run concurrently for
/// different triggers, so implementations are `Send + Sync` and keep their
/// state behind internal synchronization.
///
/// An `Err` aborts the cycle. The caller reports it and retries on the next
/// trigger; nothing a cycle returns is fatal to the process.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Error type of a failed cycle.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the name of this reconciler (for logging).
    fn name(&self) -> &str;

    /// Runs one convergence cycle.
    async fn reconcile(&self, trigger: &Trigger, ctx: &CycleContext)
        -> Result<Action, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Never;

    impl fmt::Display for Never {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "never")
        }
    }

    impl std::error::Error for Never {}

    struct CountingReconciler {
        cycles: AtomicUsize,
    }

    #[async_trait]
    impl Reconciler for CountingReconciler {
        type Error = Never;

        fn name(&self) -> &str {
            "counting"
        }

        async fn reconcile(
            &self,
            trigger: &Trigger,
            _ctx: &CycleContext,
        ) -> Result<Action, Self::Error> {
            self.cycles.fetch_add(1, Ordering::SeqCst);
            if trigger.is_resync() {
                Ok(Action::requeue_secs(60))
            } else {
                Ok(Action::Await)
            }
        }
    }

    #[tokio::test]
    async fn test_reconciler_trait() {
        let r = CountingReconciler {
            cycles: AtomicUsize::new(0),
        };
        let ctx = CycleContext::new();

        let action = r.reconcile(&Trigger::Resync, &ctx).await.unwrap();
        assert_eq!(action.requeue_after(), Some(Duration::from_secs(60)));

        let action = r.reconcile(&Trigger::object("t1"), &ctx).await.unwrap();
        assert_eq!(action, Action::Await);
        assert_eq!(r.cycles.load(Ordering::SeqCst), 2);
        assert_eq!(r.name(), "counting");
    }

    #[test]
    fn test_trigger_key() {
        assert_eq!(Trigger::object("t1").key(), Some("t1"));
        assert_eq!(Trigger::Resync.key(), None);
        assert_eq!(Trigger::object("t1").to_string(), "object t1");
        assert_eq!(Trigger::Resync.to_string(), "resync");
    }
}
