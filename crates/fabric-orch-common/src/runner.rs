//! Running one bounded cycle.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::context::CycleContext;
use crate::reconciler::{Action, Reconciler, Trigger};

/// Runs one cycle of `reconciler` for `trigger`.
///
/// The cycle gets a child of `shutdown`, so cancelling the daemon cancels the
/// cycle, and is bounded by `timeout` when one is given. The outcome is
/// logged and handed back unchanged.
pub async fn run_cycle<R: Reconciler>(
    reconciler: &R,
    trigger: &Trigger,
    shutdown: &CancellationToken,
    timeout: Option<Duration>,
) -> Result<Action, R::Error> {
    let ctx = CycleContext::with_token(shutdown.child_token(), timeout);
    debug!(reconciler = reconciler.name(), trigger = %trigger, "Starting cycle");

    let result = reconciler.reconcile(trigger, &ctx).await;
    match &result {
        Ok(action) => info!(
            reconciler = reconciler.name(),
            trigger = %trigger,
            requeue_after = ?action.requeue_after(),
            "Cycle completed"
        ),
        Err(e) => error!(
            reconciler = reconciler.name(),
            trigger = %trigger,
            error = %e,
            "Cycle failed, will retry on next trigger"
        ),
    }

    // Release anything still waiting on this cycle's token.
    ctx.cancel();
    result
}
