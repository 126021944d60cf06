//! Overdue sweep: flips in-progress tasks whose deadline has passed.

use super::flow::FlowError;
use crate::task::domain::TaskStatus;
use crate::task::ports::{EscrowContract, TaskStore};
use mockable::Clock;
use std::sync::Arc;
use tracing::{info, warn};

/// Summary of one sweep run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    /// Tasks examined.
    pub examined: usize,
    /// Tasks flipped to overdue.
    pub flipped: usize,
}

/// Periodic service marking expired in-progress tasks overdue.
///
/// The cutoff is the task deadline, extended by the contract's
/// `OVERDUE_PERIOD` when the task permits overdue work. Re-running the
/// sweep makes no further mutation: flipped tasks leave the in-progress
/// pool.
#[derive(Clone)]
pub struct OverdueSweepService<S, E, C>
where
    S: TaskStore,
    E: EscrowContract,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    escrow: Arc<E>,
    clock: Arc<C>,
}

impl<S, E, C> OverdueSweepService<S, E, C>
where
    S: TaskStore,
    E: EscrowContract,
    C: Clock + Send + Sync,
{
    /// Creates a sweep service.
    #[must_use]
    pub const fn new(store: Arc<S>, escrow: Arc<E>, clock: Arc<C>) -> Self {
        Self {
            store,
            escrow,
            clock,
        }
    }

    /// Runs one sweep.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when the overdue-period read or the task
    /// listing fails. Per-task failures are logged and skipped so one bad
    /// row does not stall the sweep.
    pub async fn sweep(&self) -> Result<SweepReport, FlowError> {
        let overdue_period = self.escrow.overdue_period().await?;
        let now = self.clock.utc();
        let candidates = self.store.tasks_in_status(TaskStatus::InProgress).await?;

        let mut report = SweepReport {
            examined: candidates.len(),
            ..SweepReport::default()
        };
        for mut task in candidates {
            if !task.is_past_deadline(now, overdue_period) {
                continue;
            }
            let task_id = task.id();
            if let Err(err) = task.transition_to(TaskStatus::Overdue, &*self.clock) {
                warn!(%task_id, error = %err, "overdue transition rejected");
                continue;
            }
            match self.store.update_task(&task).await {
                Ok(()) => {
                    info!(%task_id, "task marked overdue");
                    report.flipped += 1;
                }
                Err(err) => warn!(%task_id, error = %err, "overdue status not recorded"),
            }
        }
        Ok(report)
    }
}
