//! Cancel-task orchestration: on-chain refund plus workspace teardown.
//!
//! This is the wired refund path. The review-reject flow deliberately does
//! not call into it; see the completion service.

use super::flow::{DiscardSteps, FailureKind, FlowError, StepSink};
use crate::task::domain::{
    Task, TaskId, TaskStatus, TransactionKind, TransactionRecord, TxHash,
};
use crate::task::ports::{EscrowContract, RepositoryForge, TaskStore};
use mockable::Clock;
use std::sync::Arc;
use tracing::{info, warn};

/// Step union of the cancel flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelStep {
    /// Awaiting confirmation; nothing has been submitted.
    Confirm,
    /// Refund submitted; awaiting the mined receipt.
    Blockchain,
    /// Recording the refunded status and tearing down the workspace.
    Database,
    /// Flow finished; the deposit was returned.
    Success,
    /// Flow terminated with an error.
    Failed {
        /// Failure category fixed at the point of failure.
        kind: FailureKind,
        /// Human-readable detail.
        message: String,
    },
}

/// Events the cancel reducer consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelEvent {
    /// The caller confirmed the cancellation.
    Confirmed,
    /// The refund receipt confirmed.
    TransactionConfirmed,
    /// The refunded status was recorded.
    RefundRecorded,
    /// A step failed.
    Failed(FlowError),
    /// Manual retry: return to the initial step.
    Reset,
}

impl CancelStep {
    /// Single reducer for the cancel flow.
    #[must_use]
    pub fn apply(self, event: CancelEvent) -> Self {
        match (self, event) {
            (_, CancelEvent::Failed(err)) => Self::Failed {
                kind: err.kind,
                message: err.message,
            },
            (Self::Failed { .. }, CancelEvent::Reset) => Self::Confirm,
            (Self::Confirm, CancelEvent::Confirmed) => Self::Blockchain,
            (Self::Blockchain, CancelEvent::TransactionConfirmed) => Self::Database,
            (Self::Database, CancelEvent::RefundRecorded) => Self::Success,
            (step, _) => step,
        }
    }

    /// Returns true when abandoning the flow leaves no work in flight.
    #[must_use]
    pub const fn can_abandon(&self) -> bool {
        matches!(self, Self::Confirm | Self::Success | Self::Failed { .. })
    }
}

/// Result of a successful cancel flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelOutcome {
    /// Refunded task.
    pub task_id: TaskId,
    /// Hash of the confirmed refund transaction.
    pub tx_hash: TxHash,
}

/// Cancel-task orchestrator.
#[derive(Clone)]
pub struct CancelTaskService<S, E, F, C>
where
    S: TaskStore,
    E: EscrowContract,
    F: RepositoryForge,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    escrow: Arc<E>,
    forge: Arc<F>,
    clock: Arc<C>,
    sink: Arc<dyn StepSink<CancelStep>>,
}

impl<S, E, F, C> CancelTaskService<S, E, F, C>
where
    S: TaskStore,
    E: EscrowContract,
    F: RepositoryForge,
    C: Clock + Send + Sync,
{
    /// Creates a service that discards progress updates.
    #[must_use]
    pub fn new(store: Arc<S>, escrow: Arc<E>, forge: Arc<F>, clock: Arc<C>) -> Self {
        Self {
            store,
            escrow,
            forge,
            clock,
            sink: Arc::new(DiscardSteps),
        }
    }

    /// Replaces the progress sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn StepSink<CancelStep>>) -> Self {
        self.sink = sink;
        self
    }

    fn advance(&self, step: &mut CancelStep, event: CancelEvent) {
        *step = step.clone().apply(event);
        self.sink.step_changed(step);
    }

    fn fail(&self, step: &mut CancelStep, err: FlowError) -> FlowError {
        self.advance(step, CancelEvent::Failed(err.clone()));
        err
    }

    /// Runs the cancel flow.
    ///
    /// Open, in-progress, and overdue tasks can be cancelled. The refund is
    /// confirmed on chain before any local state changes; a store failure
    /// afterwards leaves a refunded contract entry with a stale local
    /// status, which is logged.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] with the discriminant of the failing step.
    pub async fn cancel(
        &self,
        task_id: TaskId,
        reason: &str,
    ) -> Result<CancelOutcome, FlowError> {
        let mut step = CancelStep::Confirm;
        self.sink.step_changed(&step);

        let mut task = match self.store.find_task(task_id).await {
            Ok(Some(task)) if !task.is_deleted() => task,
            Ok(_) => {
                let err = FlowError::not_found(format!("task {task_id} not found"));
                return Err(self.fail(&mut step, err));
            }
            Err(err) => return Err(self.fail(&mut step, err.into())),
        };
        if !matches!(
            task.status(),
            TaskStatus::Open | TaskStatus::InProgress | TaskStatus::Overdue
        ) {
            let err = FlowError::validation(format!(
                "task {task_id} cannot be cancelled from status {}",
                task.status()
            ));
            return Err(self.fail(&mut step, err));
        }
        let Some(contract_task_id) = task.contract_task_id() else {
            let err = FlowError::validation(format!(
                "task {task_id} has no escrow contract backing"
            ));
            return Err(self.fail(&mut step, err));
        };
        self.advance(&mut step, CancelEvent::Confirmed);

        let tx_hash = match self.escrow.cancel_task(contract_task_id, reason).await {
            Ok(hash) => hash,
            Err(err) => return Err(self.fail(&mut step, err.into())),
        };
        let receipt = match self.escrow.wait_for_receipt(&tx_hash).await {
            Ok(receipt) => receipt,
            Err(err) => {
                self.record_refund_attempt(&task, Some(tx_hash), false).await;
                return Err(self.fail(&mut step, err.into()));
            }
        };
        if !receipt.success {
            self.record_refund_attempt(&task, Some(tx_hash.clone()), false)
                .await;
            let err = FlowError::new(
                FailureKind::Contract,
                format!("refund transaction reverted: {tx_hash}"),
            );
            return Err(self.fail(&mut step, err));
        }
        self.record_refund_attempt(&task, Some(tx_hash.clone()), true)
            .await;
        self.advance(&mut step, CancelEvent::TransactionConfirmed);

        // Overdue tasks refund directly; open and in-progress tasks pass
        // through cancelled first.
        if task.status() != TaskStatus::Overdue {
            if let Err(err) = task.transition_to(TaskStatus::Cancelled, &*self.clock) {
                return Err(self.fail(&mut step, err.into()));
            }
        }
        if let Err(err) = task.transition_to(TaskStatus::Refunded, &*self.clock) {
            return Err(self.fail(&mut step, err.into()));
        }
        if let Err(err) = self.store.update_task(&task).await {
            warn!(
                %task_id,
                tx_hash = %tx_hash,
                "refund confirmed on chain but the refunded status was not recorded"
            );
            return Err(self.fail(&mut step, err.into()));
        }
        self.teardown_workspace(task_id).await;
        self.advance(&mut step, CancelEvent::RefundRecorded);
        info!(%task_id, "task cancelled and deposit refunded");

        Ok(CancelOutcome { task_id, tx_hash })
    }

    /// Deletes the provisioned repository and its mirror. Best-effort: the
    /// refund has already happened, so failures are logged, not surfaced.
    async fn teardown_workspace(&self, task_id: TaskId) {
        let workspace = match self.store.find_workspace(task_id).await {
            Ok(Some(workspace)) => workspace,
            Ok(None) => return,
            Err(err) => {
                warn!(%task_id, error = %err, "workspace lookup failed during teardown");
                return;
            }
        };
        if let Err(err) = self
            .forge
            .delete_repository(workspace.repository_name())
            .await
        {
            warn!(%task_id, error = %err, "workspace repository deletion failed");
        }
        if let Err(err) = self.store.remove_workspace(task_id).await {
            warn!(%task_id, error = %err, "workspace mirror removal failed");
        }
    }

    async fn record_refund_attempt(
        &self,
        task: &Task,
        tx_hash: Option<TxHash>,
        confirmed: bool,
    ) {
        let record = if confirmed {
            match tx_hash {
                Some(hash) => TransactionRecord::confirmed(
                    task.id(),
                    TransactionKind::Cancel,
                    task.value_in_wei(),
                    hash,
                    self.escrow.network_id(),
                    &*self.clock,
                ),
                None => return,
            }
        } else {
            TransactionRecord::failed(
                task.id(),
                TransactionKind::Cancel,
                task.value_in_wei(),
                tx_hash,
                self.escrow.network_id(),
                &*self.clock,
            )
        };
        if let Err(err) = self.store.record_transaction(&record).await {
            warn!(task_id = %task.id(), error = %err, "failed to append refund audit record");
        }
    }
}
