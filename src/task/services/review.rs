//! Accept/reject-developer orchestration.
//!
//! Acceptance commits the escrow on-chain and then provisions the GitHub
//! workspace; rejection is database-only and returns the task to the open
//! pool without touching escrowed funds.

use super::flow::{DiscardSteps, FailureKind, FlowError, StepSink};
use crate::task::domain::{
    RepositoryName, Task, TaskId, TaskStatus, TransactionKind, TransactionRecord, TxHash,
    WeiAmount, Workspace,
};
use crate::task::ports::{CreatedRepository, EscrowContract, RepositoryForge, TaskStore};
use mockable::Clock;
use std::sync::Arc;
use tracing::{info, warn};

/// Step union of the accept-developer flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptStep {
    /// Awaiting confirmation; nothing has been submitted.
    Confirm,
    /// Escrow acceptance submitted; awaiting the mined receipt.
    Blockchain,
    /// Provisioning the workspace and recording the in-progress status.
    Database,
    /// Flow finished; the developer has a funded workspace.
    Success,
    /// Flow terminated with an error.
    Failed {
        /// Failure category fixed at the point of failure.
        kind: FailureKind,
        /// Human-readable detail.
        message: String,
    },
}

/// Events the accept reducer consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptEvent {
    /// The caller confirmed the acceptance.
    Confirmed,
    /// The acceptance transaction receipt confirmed.
    TransactionConfirmed,
    /// Workspace and status were recorded.
    WorkspaceRecorded,
    /// A step failed.
    Failed(FlowError),
    /// Manual retry: return to the initial step.
    Reset,
}

impl AcceptStep {
    /// Single reducer for the accept flow.
    #[must_use]
    pub fn apply(self, event: AcceptEvent) -> Self {
        match (self, event) {
            (_, AcceptEvent::Failed(err)) => Self::Failed {
                kind: err.kind,
                message: err.message,
            },
            (Self::Failed { .. }, AcceptEvent::Reset) => Self::Confirm,
            (Self::Confirm, AcceptEvent::Confirmed) => Self::Blockchain,
            (Self::Blockchain, AcceptEvent::TransactionConfirmed) => Self::Database,
            (Self::Database, AcceptEvent::WorkspaceRecorded) => Self::Success,
            (step, _) => step,
        }
    }

    /// Returns true when abandoning the flow leaves no work in flight.
    #[must_use]
    pub const fn can_abandon(&self) -> bool {
        matches!(self, Self::Confirm | Self::Success | Self::Failed { .. })
    }

    /// Returns true when the flow has finished, successfully or not.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed { .. })
    }
}

/// Step union of the reject-developer flow (database-only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectStep {
    /// Awaiting confirmation.
    Confirm,
    /// Removing the assignment and reopening the task.
    Database,
    /// Flow finished; the task is open again.
    Success,
    /// Flow terminated with an error.
    Failed {
        /// Failure category fixed at the point of failure.
        kind: FailureKind,
        /// Human-readable detail.
        message: String,
    },
}

/// Events the reject reducer consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectEvent {
    /// The caller confirmed the rejection.
    Confirmed,
    /// Assignment removed and status reverted.
    Reopened,
    /// A step failed.
    Failed(FlowError),
    /// Manual retry: return to the initial step.
    Reset,
}

impl RejectStep {
    /// Single reducer for the reject flow.
    #[must_use]
    pub fn apply(self, event: RejectEvent) -> Self {
        match (self, event) {
            (_, RejectEvent::Failed(err)) => Self::Failed {
                kind: err.kind,
                message: err.message,
            },
            (Self::Failed { .. }, RejectEvent::Reset) => Self::Confirm,
            (Self::Confirm, RejectEvent::Confirmed) => Self::Database,
            (Self::Database, RejectEvent::Reopened) => Self::Success,
            (step, _) => step,
        }
    }

    /// Returns true when abandoning the flow leaves no work in flight.
    #[must_use]
    pub const fn can_abandon(&self) -> bool {
        matches!(self, Self::Confirm | Self::Success | Self::Failed { .. })
    }
}

/// Result of a successful accept flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptOutcome {
    /// Task the developer was accepted for.
    pub task_id: TaskId,
    /// Hash of the confirmed acceptance transaction.
    pub tx_hash: TxHash,
    /// Provisioned workspace repository.
    pub repository: CreatedRepository,
}

/// Accept/reject-developer orchestrator.
#[derive(Clone)]
pub struct DeveloperReviewService<S, E, F, C>
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
    accept_sink: Arc<dyn StepSink<AcceptStep>>,
    reject_sink: Arc<dyn StepSink<RejectStep>>,
}

impl<S, E, F, C> DeveloperReviewService<S, E, F, C>
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
            accept_sink: Arc::new(DiscardSteps),
            reject_sink: Arc::new(DiscardSteps),
        }
    }

    /// Replaces the accept-flow progress sink.
    #[must_use]
    pub fn with_accept_sink(mut self, sink: Arc<dyn StepSink<AcceptStep>>) -> Self {
        self.accept_sink = sink;
        self
    }

    /// Replaces the reject-flow progress sink.
    #[must_use]
    pub fn with_reject_sink(mut self, sink: Arc<dyn StepSink<RejectStep>>) -> Self {
        self.reject_sink = sink;
        self
    }

    fn advance_accept(&self, step: &mut AcceptStep, event: AcceptEvent) {
        *step = step.clone().apply(event);
        self.accept_sink.step_changed(step);
    }

    fn fail_accept(&self, step: &mut AcceptStep, err: FlowError) -> FlowError {
        self.advance_accept(step, AcceptEvent::Failed(err.clone()));
        err
    }

    /// Runs the accept-developer flow.
    ///
    /// Escrow commitment is confirmed before any workspace provisioning;
    /// a forge failure after the confirmed receipt leaves an on-chain
    /// acceptance without a workspace. The window is logged and the audit
    /// record still written, because the chain state did change.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] with the discriminant of the failing step.
    pub async fn accept(&self, task_id: TaskId) -> Result<AcceptOutcome, FlowError> {
        let mut step = AcceptStep::Confirm;
        self.accept_sink.step_changed(&step);

        let (mut task, contract_task_id) = match self.load_applied_task(task_id).await {
            Ok(loaded) => loaded,
            Err(err) => return Err(self.fail_accept(&mut step, err)),
        };
        let assignment = match self.store.find_assignment(task_id).await {
            Ok(Some(assignment)) => assignment,
            Ok(None) => {
                let err = FlowError::validation(format!(
                    "task {task_id} has no developer application to accept"
                ));
                return Err(self.fail_accept(&mut step, err));
            }
            Err(err) => return Err(self.fail_accept(&mut step, err.into())),
        };
        self.advance_accept(&mut step, AcceptEvent::Confirmed);

        let tx_hash = match self
            .escrow
            .accept_developer(contract_task_id, assignment.wallet_address())
            .await
        {
            Ok(hash) => hash,
            Err(err) => return Err(self.fail_accept(&mut step, err.into())),
        };
        let receipt = match self.escrow.wait_for_receipt(&tx_hash).await {
            Ok(receipt) => receipt,
            Err(err) => {
                self.record_accept_attempt(task_id, Some(tx_hash), false).await;
                return Err(self.fail_accept(&mut step, err.into()));
            }
        };
        if !receipt.success {
            self.record_accept_attempt(task_id, Some(tx_hash.clone()), false)
                .await;
            let err = FlowError::new(
                FailureKind::Contract,
                format!("acceptance transaction reverted: {tx_hash}"),
            );
            return Err(self.fail_accept(&mut step, err));
        }
        self.record_accept_attempt(task_id, Some(tx_hash.clone()), true)
            .await;
        self.advance_accept(&mut step, AcceptEvent::TransactionConfirmed);

        let repository_name = RepositoryName::for_task(task_id);
        let repository = match self
            .forge
            .create_repository(&repository_name, task.title())
            .await
        {
            Ok(repository) => repository,
            Err(err) => {
                warn!(
                    %task_id,
                    "acceptance confirmed on chain but workspace provisioning failed"
                );
                return Err(self.fail_accept(&mut step, err.into()));
            }
        };
        if let Err(err) = self
            .forge
            .add_collaborator(&repository_name, assignment.github_login())
            .await
        {
            warn!(
                %task_id,
                repository = %repository_name,
                "workspace created but collaborator grant failed"
            );
            return Err(self.fail_accept(&mut step, err.into()));
        }

        let workspace = Workspace::new(
            task_id,
            repository.name.clone(),
            repository.url.clone(),
            repository.github_repo_id,
            &*self.clock,
        );
        if let Err(err) = self.store.record_workspace(&workspace).await {
            return Err(self.fail_accept(&mut step, err.into()));
        }
        if let Err(err) = task.transition_to(TaskStatus::InProgress, &*self.clock) {
            return Err(self.fail_accept(&mut step, err.into()));
        }
        if let Err(err) = self.store.update_task(&task).await {
            return Err(self.fail_accept(&mut step, err.into()));
        }
        self.advance_accept(&mut step, AcceptEvent::WorkspaceRecorded);
        info!(%task_id, repository = %repository_name, "developer accepted");

        Ok(AcceptOutcome {
            task_id,
            tx_hash,
            repository,
        })
    }

    /// Runs the reject-developer flow: removes the assignment and reverts
    /// the task to open, making it visible to other developers again. The
    /// escrowed funds remain untouched.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when the task is not in the applied state or
    /// the store fails.
    pub async fn reject(&self, task_id: TaskId) -> Result<(), FlowError> {
        let mut step = RejectStep::Confirm;
        self.reject_sink.step_changed(&step);

        let fail = |service: &Self, step: &mut RejectStep, err: FlowError| {
            *step = step.clone().apply(RejectEvent::Failed(err.clone()));
            service.reject_sink.step_changed(step);
            err
        };

        let mut task = match self.store.find_task(task_id).await {
            Ok(Some(task)) if !task.is_deleted() => task,
            Ok(_) => {
                let err = FlowError::not_found(format!("task {task_id} not found"));
                return Err(fail(self, &mut step, err));
            }
            Err(err) => return Err(fail(self, &mut step, err.into())),
        };
        if task.status() != TaskStatus::Applied {
            let err = FlowError::validation(format!(
                "task {task_id} has no pending application to reject"
            ));
            return Err(fail(self, &mut step, err));
        }
        step = step.apply(RejectEvent::Confirmed);
        self.reject_sink.step_changed(&step);

        if let Err(err) = self.store.remove_assignment(task_id).await {
            return Err(fail(self, &mut step, err.into()));
        }
        if let Err(err) = task.transition_to(TaskStatus::Open, &*self.clock) {
            return Err(fail(self, &mut step, err.into()));
        }
        if let Err(err) = self.store.update_task(&task).await {
            return Err(fail(self, &mut step, err.into()));
        }
        step = step.apply(RejectEvent::Reopened);
        self.reject_sink.step_changed(&step);
        info!(%task_id, "developer application rejected; task reopened");
        Ok(())
    }

    async fn load_applied_task(&self, task_id: TaskId) -> Result<(Task, u64), FlowError> {
        let task = match self.store.find_task(task_id).await? {
            Some(task) if !task.is_deleted() => task,
            _ => return Err(FlowError::not_found(format!("task {task_id} not found"))),
        };
        if task.status() != TaskStatus::Applied {
            return Err(FlowError::validation(format!(
                "task {task_id} is not awaiting developer acceptance"
            )));
        }
        let Some(contract_task_id) = task.contract_task_id() else {
            return Err(FlowError::validation(format!(
                "task {task_id} has no escrow contract backing"
            )));
        };
        Ok((task, contract_task_id))
    }

    async fn record_accept_attempt(
        &self,
        task_id: TaskId,
        tx_hash: Option<TxHash>,
        confirmed: bool,
    ) {
        let record = if confirmed {
            match tx_hash {
                Some(hash) => TransactionRecord::confirmed(
                    task_id,
                    TransactionKind::Accept,
                    WeiAmount::ZERO,
                    hash,
                    self.escrow.network_id(),
                    &*self.clock,
                ),
                None => return,
            }
        } else {
            TransactionRecord::failed(
                task_id,
                TransactionKind::Accept,
                WeiAmount::ZERO,
                tx_hash,
                self.escrow.network_id(),
                &*self.clock,
            )
        };
        if let Err(err) = self.store.record_transaction(&record).await {
            warn!(%task_id, error = %err, "failed to append acceptance audit record");
        }
    }
}
