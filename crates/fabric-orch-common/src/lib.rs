//! Common reconciliation abstractions for fabric controllers.
//!
//! This crate provides the runtime pieces every controller shares:
//!
//! - [`Reconciler`]: Base trait for a controller's convergence cycle
//! - [`Trigger`] / [`Action`]: What started a cycle and what to do next
//! - [`CycleContext`]: Cancellation token and deadline of one cycle
//! - [`BackoffPolicy`]: Bounded exponential backoff for polling loops
//! - [`run_cycle`]: Runs one bounded cycle with logging
//!
//! # Architecture
//!
//! Controllers follow a level-triggered model:
//!
//! 1. A trigger arrives (one object changed, or the periodic resync timer)
//! 2. The daemon builds a [`CycleContext`] bounded by the cycle timeout
//! 3. The reconciler reads desired and observed state and converges them
//! 4. The returned [`Action`] says when to revisit
//!
//! A failed cycle is never fatal: the next trigger simply runs it again, so
//! every step must be idempotent.
//!
//! # Example
//!
//! ```ignore
//! use fabric_orch_common::{Action, CycleContext, Reconciler, Trigger};
//!
//! struct Echo;
//!
//! #[async_trait::async_trait]
//! impl Reconciler for Echo {
//!     type Error = std::io::Error;
//!
//!     fn name(&self) -> &str { "echo" }
//!
//!     async fn reconcile(&self, trigger: &Trigger, _ctx: &CycleContext)
//!         -> Result<Action, Self::Error>
//!     {
//!         tracing::info!("reconciling {}", trigger);
//!         Ok(Action::requeue_secs(60))
//!     }
//! }
//! ```

mod backoff;
mod context;
mod reconciler;
mod runner;

pub use backoff::{Backoff, BackoffPolicy};
pub use context::CycleContext;
pub use reconciler::{Action, Reconciler, Trigger};
pub use runner::run_cycle;

pub use tokio_util::sync::CancellationToken;
