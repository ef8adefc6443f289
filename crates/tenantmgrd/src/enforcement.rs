//! Enforcement task tracking.
//!
//! Creating or patching a VNI block starts an asynchronous enforcement task
//! on the fabric. [`EnforcementTracker::wait`] polls that task until it
//! reaches a terminal stage, backing off between polls, and gives up once the
//! attempt or time budget of its [`BackoffPolicy`] is spent.

use std::sync::Arc;

use fabric_client::models::{STAGE_FAILED, STAGE_FINISHED};
use fabric_client::FabricApi;
use fabric_orch_common::{BackoffPolicy, CycleContext};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::error::{TenantMgrError, TenantMgrResult};

/// Terminal result of waiting on an enforcement task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnforcementOutcome {
    Finished,
    Failed,
    /// The budget ran out while the task was still in `last_stage`.
    TimedOut { last_stage: String },
}

impl EnforcementOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, EnforcementOutcome::Finished)
    }
}

/// Polls enforcement tasks to completion.
#[derive(Clone)]
pub struct EnforcementTracker {
    fabric: Arc<dyn FabricApi>,
    policy: BackoffPolicy,
}

impl EnforcementTracker {
    pub fn new(fabric: Arc<dyn FabricApi>, policy: BackoffPolicy) -> Self {
        Self { fabric, policy }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Waits for the task at `link`, started for `block`, to finish.
    ///
    /// Returns [`TenantMgrError::Cancelled`] if the cycle is cancelled or
    /// passes its deadline while waiting, and
    /// [`TenantMgrError::MissingEnforcementLink`] if `link` is empty.
    #[instrument(skip(self, ctx))]
    pub async fn wait(
        &self,
        block: &str,
        link: &str,
        ctx: &CycleContext,
    ) -> TenantMgrResult<EnforcementOutcome> {
        if link.is_empty() {
            return Err(TenantMgrError::missing_enforcement_link(block));
        }

        let budget_end = self.policy.timeout.map(|t| Instant::now() + t);
        let mut backoff = self.policy.start();

        loop {
            if ctx.is_cancelled() || ctx.is_expired() {
                return Err(TenantMgrError::Cancelled);
            }

            let task = self.fabric.get_enforcement_task(link).await?;
            let stage = task.task_info.stage;
            match stage.as_str() {
                STAGE_FINISHED => {
                    info!(block = %block, "VNI block enforcement finished");
                    return Ok(EnforcementOutcome::Finished);
                }
                STAGE_FAILED => {
                    warn!(block = %block, sub_stage = %task.sub_stage, "VNI block enforcement failed");
                    return Ok(EnforcementOutcome::Failed);
                }
                _ => debug!(block = %block, stage = %stage, "Enforcement in progress"),
            }

            let timed_out = || {
                warn!(block = %block, stage = %stage, "Gave up waiting for VNI block enforcement");
                EnforcementOutcome::TimedOut {
                    last_stage: stage.clone(),
                }
            };

            let Some(mut delay) = backoff.next_delay() else {
                return Ok(timed_out());
            };
            if let Some(end) = budget_end {
                let left = end.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    return Ok(timed_out());
                }
                delay = delay.min(left);
            }

            tokio::select! {
                _ = ctx.done() => return Err(TenantMgrError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
