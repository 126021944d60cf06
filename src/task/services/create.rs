//! Create-task orchestration: database row, escrow funding, hash linkage.

use super::flow::{DiscardSteps, FailureKind, FlowError, StepSink};
use crate::task::domain::{
    ClientId, Task, TaskDraft, TaskId, TransactionKind, TransactionRecord, TxHash, WeiAmount,
};
use crate::task::ports::{EscrowContract, TaskStore};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use tracing::warn;

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    title: String,
    description: String,
    requirements: String,
    value_in_wei: WeiAmount,
    deadline: DateTime<Utc>,
    allow_overdue: bool,
    creator_id: ClientId,
}

impl CreateTaskRequest {
    /// Creates a request with required fields.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        value_in_wei: WeiAmount,
        deadline: DateTime<Utc>,
        creator_id: ClientId,
    ) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            requirements: String::new(),
            value_in_wei,
            deadline,
            allow_overdue: false,
            creator_id,
        }
    }

    /// Sets the long-form description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the acceptance requirements.
    #[must_use]
    pub fn with_requirements(mut self, requirements: impl Into<String>) -> Self {
        self.requirements = requirements.into();
        self
    }

    /// Permits a discounted overdue period past the deadline.
    #[must_use]
    pub const fn with_allow_overdue(mut self, allow_overdue: bool) -> Self {
        self.allow_overdue = allow_overdue;
        self
    }
}

/// Step union of the create-task flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateTaskStep {
    /// Collecting and validating input; no remote call has happened.
    Form,
    /// Input validated; awaiting confirmation to spend.
    Confirm,
    /// Writing the task row with status open.
    Database,
    /// Escrow funding submitted; awaiting the mined receipt.
    Blockchain,
    /// Recording the contract linkage on the task row.
    DatabaseTx,
    /// Flow finished; the task is open and escrow-backed.
    Success,
    /// Flow terminated with an error; side effects are not rolled back.
    Failed {
        /// Failure category fixed at the point of failure.
        kind: FailureKind,
        /// Human-readable detail.
        message: String,
    },
}

/// Events the create-task reducer consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateTaskEvent {
    /// Form input passed validation.
    Submitted,
    /// The caller confirmed the spend.
    Confirmed,
    /// The open task row was written.
    TaskStored,
    /// The funding transaction receipt confirmed.
    TransactionConfirmed,
    /// The contract linkage was recorded on the row.
    HashRecorded,
    /// A step failed.
    Failed(FlowError),
    /// Manual retry: return to the initial step.
    Reset,
}

impl CreateTaskStep {
    /// Single reducer for the create-task flow.
    ///
    /// Events that do not apply to the current step leave it unchanged.
    #[must_use]
    pub fn apply(self, event: CreateTaskEvent) -> Self {
        match (self, event) {
            (_, CreateTaskEvent::Failed(err)) => Self::Failed {
                kind: err.kind,
                message: err.message,
            },
            (Self::Failed { .. }, CreateTaskEvent::Reset) => Self::Form,
            (Self::Form, CreateTaskEvent::Submitted) => Self::Confirm,
            (Self::Confirm, CreateTaskEvent::Confirmed) => Self::Database,
            (Self::Database, CreateTaskEvent::TaskStored) => Self::Blockchain,
            (Self::Blockchain, CreateTaskEvent::TransactionConfirmed) => Self::DatabaseTx,
            (Self::DatabaseTx, CreateTaskEvent::HashRecorded) => Self::Success,
            (step, _) => step,
        }
    }

    /// Returns true when abandoning the flow leaves no work in flight.
    ///
    /// Mid-flow steps cannot be abandoned: a submitted transaction cannot
    /// be retracted, only the local state could be reset.
    #[must_use]
    pub const fn can_abandon(&self) -> bool {
        matches!(
            self,
            Self::Form | Self::Confirm | Self::Success | Self::Failed { .. }
        )
    }

    /// Returns true when the flow has finished, successfully or not.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed { .. })
    }
}

/// Result of a successful create-task flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskOutcome {
    /// Identifier of the created task.
    pub task_id: TaskId,
    /// Identifier the contract assigned to the escrow entry.
    pub contract_task_id: u64,
    /// Hash of the confirmed funding transaction.
    pub tx_hash: TxHash,
    /// Deposit actually escrowed (value plus platform fee).
    pub deposit: WeiAmount,
}

/// Create-task orchestrator.
///
/// Sequences the database write, the escrow funding call, and the contract
/// linkage update, surfacing each step through the configured sink. A
/// failure after the database step leaves an open task row without
/// contract backing; the row is deliberately not rolled back.
#[derive(Clone)]
pub struct CreateTaskService<S, E, C>
where
    S: TaskStore,
    E: EscrowContract,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    escrow: Arc<E>,
    clock: Arc<C>,
    sink: Arc<dyn StepSink<CreateTaskStep>>,
}

impl<S, E, C> CreateTaskService<S, E, C>
where
    S: TaskStore,
    E: EscrowContract,
    C: Clock + Send + Sync,
{
    /// Creates a service that discards progress updates.
    #[must_use]
    pub fn new(store: Arc<S>, escrow: Arc<E>, clock: Arc<C>) -> Self {
        Self {
            store,
            escrow,
            clock,
            sink: Arc::new(DiscardSteps),
        }
    }

    /// Replaces the progress sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn StepSink<CreateTaskStep>>) -> Self {
        self.sink = sink;
        self
    }

    fn advance(&self, step: &mut CreateTaskStep, event: CreateTaskEvent) {
        *step = step.clone().apply(event);
        self.sink.step_changed(step);
    }

    fn fail(&self, step: &mut CreateTaskStep, err: FlowError) -> FlowError {
        self.advance(step, CreateTaskEvent::Failed(err.clone()));
        err
    }

    /// Runs the create-task flow.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] with the discriminant of the failing step. The
    /// open task row written before an escrow failure is not rolled back.
    pub async fn create(
        &self,
        request: CreateTaskRequest,
    ) -> Result<CreateTaskOutcome, FlowError> {
        let mut step = CreateTaskStep::Form;
        self.sink.step_changed(&step);

        let draft = match self.validate(&request).await {
            Ok(draft) => draft,
            Err(err) => return Err(self.fail(&mut step, err)),
        };
        self.advance(&mut step, CreateTaskEvent::Submitted);
        self.advance(&mut step, CreateTaskEvent::Confirmed);

        let mut task = Task::new(draft, &*self.clock);
        let task_id = task.id();
        if let Err(err) = self.store.create_task(&task).await {
            return Err(self.fail(&mut step, err.into()));
        }
        self.advance(&mut step, CreateTaskEvent::TaskStored);

        let fee_percent = match self.escrow.platform_fee_percent().await {
            Ok(percent) => percent,
            Err(err) => {
                warn!(%task_id, "escrow fee read failed; open task row has no contract backing");
                return Err(self.fail(&mut step, err.into()));
            }
        };
        let deposit = match request.value_in_wei.deposit_with_fee(fee_percent) {
            Ok(deposit) => deposit,
            Err(err) => return Err(self.fail(&mut step, err.into())),
        };

        let submitted = match self
            .escrow
            .create_task(request.deadline, request.allow_overdue, deposit)
            .await
        {
            Ok(submitted) => submitted,
            Err(err) => {
                warn!(%task_id, "escrow funding failed; open task row has no contract backing");
                return Err(self.fail(&mut step, err.into()));
            }
        };
        let receipt = match self.escrow.wait_for_receipt(&submitted.tx_hash).await {
            Ok(receipt) => receipt,
            Err(err) => {
                self.record_attempt(task_id, deposit, Some(submitted.tx_hash.clone()), false)
                    .await;
                return Err(self.fail(&mut step, err.into()));
            }
        };
        if !receipt.success {
            self.record_attempt(task_id, deposit, Some(submitted.tx_hash.clone()), false)
                .await;
            let err = FlowError::new(
                FailureKind::Contract,
                format!("funding transaction reverted: {}", submitted.tx_hash),
            );
            return Err(self.fail(&mut step, err));
        }
        self.advance(&mut step, CreateTaskEvent::TransactionConfirmed);

        if let Err(err) = task.link_contract(
            submitted.contract_task_id,
            submitted.tx_hash.clone(),
            &*self.clock,
        ) {
            return Err(self.fail(&mut step, err.into()));
        }
        if let Err(err) = self.store.update_task(&task).await {
            warn!(
                %task_id,
                tx_hash = %submitted.tx_hash,
                "funding confirmed on chain but the contract linkage was not recorded"
            );
            return Err(self.fail(&mut step, err.into()));
        }
        self.record_attempt(task_id, deposit, Some(submitted.tx_hash.clone()), true)
            .await;
        self.advance(&mut step, CreateTaskEvent::HashRecorded);

        Ok(CreateTaskOutcome {
            task_id,
            contract_task_id: submitted.contract_task_id,
            tx_hash: submitted.tx_hash,
            deposit,
        })
    }

    async fn validate(&self, request: &CreateTaskRequest) -> Result<TaskDraft, FlowError> {
        let draft = TaskDraft::new(
            request.title.clone(),
            request.value_in_wei,
            request.deadline,
            request.creator_id,
        )?
        .with_description(request.description.clone())
        .with_requirements(request.requirements.clone())
        .with_allow_overdue(request.allow_overdue);

        if request.deadline <= self.clock.utc() {
            return Err(FlowError::validation("deadline must lie in the future"));
        }
        let minimum = self.escrow.minimum_task_value().await?;
        if request.value_in_wei < minimum {
            return Err(FlowError::validation(format!(
                "task value {} is below the contract minimum {minimum}",
                request.value_in_wei
            )));
        }
        Ok(draft)
    }

    /// Appends the audit row for a funding attempt; audit failures are
    /// logged rather than surfaced because the chain state is already
    /// settled either way.
    async fn record_attempt(
        &self,
        task_id: TaskId,
        deposit: WeiAmount,
        tx_hash: Option<TxHash>,
        confirmed: bool,
    ) {
        let record = if confirmed {
            match tx_hash {
                Some(hash) => TransactionRecord::confirmed(
                    task_id,
                    TransactionKind::Create,
                    deposit,
                    hash,
                    self.escrow.network_id(),
                    &*self.clock,
                ),
                None => return,
            }
        } else {
            TransactionRecord::failed(
                task_id,
                TransactionKind::Create,
                deposit,
                tx_hash,
                self.escrow.network_id(),
                &*self.clock,
            )
        };
        if let Err(err) = self.store.record_transaction(&record).await {
            warn!(%task_id, error = %err, "failed to append funding audit record");
        }
    }
}
