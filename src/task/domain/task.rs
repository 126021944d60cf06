//! Task aggregate root and the lifecycle status machine.

use super::{ClientId, ParseTaskStatusError, TaskDomainError, TaskId, TxHash, WeiAmount};
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle status.
///
/// Status moves only along the documented graph; every other edge is
/// rejected by [`TaskStatus::can_transition_to`]. The happy path is
/// `Open -> Applied -> InProgress -> PendingApproval -> Completed`; the
/// remaining edges cover developer rejection, review rejection, revision
/// requests, deadline expiry, and escrow refunds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is visible and accepting developer applications.
    Open,
    /// A developer has applied and awaits the client's decision.
    Applied,
    /// The developer was accepted and is working in the task repository.
    InProgress,
    /// The developer opened a pull request; the client is reviewing.
    PendingApproval,
    /// The client approved; escrowed funds were released.
    Completed,
    /// The task was cancelled; escrowed funds await or bypass refund.
    Cancelled,
    /// The deadline (plus any permitted overdue period) elapsed.
    Overdue,
    /// The escrow contract returned the deposited funds.
    Refunded,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Applied => "applied",
            Self::InProgress => "in_progress",
            Self::PendingApproval => "pending_approval",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Overdue => "overdue",
            Self::Refunded => "refunded",
        }
    }

    /// Returns true when the status permits the given transition.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Open, Self::Applied | Self::Cancelled)
                | (Self::Applied, Self::Open | Self::InProgress)
                | (
                    Self::InProgress,
                    Self::PendingApproval | Self::Cancelled | Self::Overdue
                )
                | (
                    Self::PendingApproval,
                    Self::Completed | Self::Cancelled | Self::InProgress
                )
                | (Self::Cancelled | Self::Overdue, Self::Refunded)
        )
    }

    /// Returns true when no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Refunded)
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "open" => Ok(Self::Open),
            "applied" => Ok(Self::Applied),
            "in_progress" => Ok(Self::InProgress),
            "pending_approval" => Ok(Self::PendingApproval),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "overdue" => Ok(Self::Overdue),
            "refunded" => Ok(Self::Refunded),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validated creation payload for a new task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    title: String,
    description: String,
    requirements: String,
    value_in_wei: WeiAmount,
    deadline: DateTime<Utc>,
    allow_overdue: bool,
    creator_id: ClientId,
}

impl TaskDraft {
    /// Creates a validated draft.
    ///
    /// Minimum-value and deadline-in-future checks live in the create-task
    /// service, which has access to the contract reads and the clock.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTitle`] when the title is blank and
    /// [`TaskDomainError::ZeroValue`] when the value is zero.
    pub fn new(
        title: impl Into<String>,
        value_in_wei: WeiAmount,
        deadline: DateTime<Utc>,
        creator_id: ClientId,
    ) -> Result<Self, TaskDomainError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(TaskDomainError::EmptyTitle);
        }
        if value_in_wei.is_zero() {
            return Err(TaskDomainError::ZeroValue);
        }
        Ok(Self {
            title,
            description: String::new(),
            requirements: String::new(),
            value_in_wei,
            deadline,
            allow_overdue: false,
            creator_id,
        })
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

    /// Returns the task value.
    #[must_use]
    pub const fn value_in_wei(&self) -> WeiAmount {
        self.value_in_wei
    }

    /// Returns the deadline.
    #[must_use]
    pub const fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    title: String,
    description: String,
    requirements: String,
    value_in_wei: WeiAmount,
    deadline: DateTime<Utc>,
    allow_overdue: bool,
    status: TaskStatus,
    creator_id: ClientId,
    contract_task_id: Option<u64>,
    contract_tx_hash: Option<TxHash>,
    pull_request_number: Option<u64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted title.
    pub title: String,
    /// Persisted description.
    pub description: String,
    /// Persisted requirements.
    pub requirements: String,
    /// Persisted value in wei.
    pub value_in_wei: WeiAmount,
    /// Persisted deadline.
    pub deadline: DateTime<Utc>,
    /// Whether an overdue period is permitted.
    pub allow_overdue: bool,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
    /// Persisted creator identifier.
    pub creator_id: ClientId,
    /// Persisted on-chain task identifier, if funded.
    pub contract_task_id: Option<u64>,
    /// Persisted funding transaction hash, if funded.
    pub contract_tx_hash: Option<TxHash>,
    /// Persisted pull request number, if submitted.
    pub pull_request_number: Option<u64>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest lifecycle timestamp.
    pub updated_at: DateTime<Utc>,
    /// Persisted soft-deletion timestamp, if deleted.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a new task from a validated draft with status [`TaskStatus::Open`].
    #[must_use]
    pub fn new(draft: TaskDraft, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: TaskId::new(),
            title: draft.title,
            description: draft.description,
            requirements: draft.requirements,
            value_in_wei: draft.value_in_wei,
            deadline: draft.deadline,
            allow_overdue: draft.allow_overdue,
            status: TaskStatus::Open,
            creator_id: draft.creator_id,
            contract_task_id: None,
            contract_tx_hash: None,
            pull_request_number: None,
            created_at: timestamp,
            updated_at: timestamp,
            deleted_at: None,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            title: data.title,
            description: data.description,
            requirements: data.requirements,
            value_in_wei: data.value_in_wei,
            deadline: data.deadline,
            allow_overdue: data.allow_overdue,
            status: data.status,
            creator_id: data.creator_id,
            contract_task_id: data.contract_task_id,
            contract_tx_hash: data.contract_tx_hash,
            pull_request_number: data.pull_request_number,
            created_at: data.created_at,
            updated_at: data.updated_at,
            deleted_at: data.deleted_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the acceptance requirements.
    #[must_use]
    pub fn requirements(&self) -> &str {
        &self.requirements
    }

    /// Returns the task value.
    #[must_use]
    pub const fn value_in_wei(&self) -> WeiAmount {
        self.value_in_wei
    }

    /// Returns the deadline.
    #[must_use]
    pub const fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    /// Returns true when a discounted overdue period is permitted.
    #[must_use]
    pub const fn allow_overdue(&self) -> bool {
        self.allow_overdue
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the creator identifier.
    #[must_use]
    pub const fn creator_id(&self) -> ClientId {
        self.creator_id
    }

    /// Returns the on-chain task identifier, if the escrow was funded.
    #[must_use]
    pub const fn contract_task_id(&self) -> Option<u64> {
        self.contract_task_id
    }

    /// Returns the funding transaction hash, if the escrow was funded.
    #[must_use]
    pub const fn contract_tx_hash(&self) -> Option<&TxHash> {
        self.contract_tx_hash.as_ref()
    }

    /// Returns the submitted pull request number, if any.
    #[must_use]
    pub const fn pull_request_number(&self) -> Option<u64> {
        self.pull_request_number
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest lifecycle timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the soft-deletion timestamp, if deleted.
    #[must_use]
    pub const fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Returns true when the task has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Moves the task to a new lifecycle status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStatusTransition`] when the edge is
    /// not part of the lifecycle graph; the task is left unchanged.
    pub fn transition_to(
        &mut self,
        to: TaskStatus,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if !self.status.can_transition_to(to) {
            return Err(TaskDomainError::InvalidStatusTransition {
                task_id: self.id,
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.touch(clock);
        Ok(())
    }

    /// Records the escrow contract linkage after a confirmed funding receipt.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::ContractAlreadyLinked`] when the task is
    /// already funded.
    pub fn link_contract(
        &mut self,
        contract_task_id: u64,
        tx_hash: TxHash,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if self.contract_task_id.is_some() || self.contract_tx_hash.is_some() {
            return Err(TaskDomainError::ContractAlreadyLinked(self.id));
        }
        self.contract_task_id = Some(contract_task_id);
        self.contract_tx_hash = Some(tx_hash);
        self.touch(clock);
        Ok(())
    }

    /// Records the pull request number submitted for review.
    ///
    /// Recording the same number again is a no-op, which keeps webhook
    /// redelivery idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::PullRequestAlreadyRecorded`] when a
    /// different pull request is already recorded.
    pub fn record_pull_request(
        &mut self,
        number: u64,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        match self.pull_request_number {
            Some(existing) if existing == number => Ok(()),
            Some(_) => Err(TaskDomainError::PullRequestAlreadyRecorded(self.id)),
            None => {
                self.pull_request_number = Some(number);
                self.touch(clock);
                Ok(())
            }
        }
    }

    /// Soft-deletes the task.
    pub fn soft_delete(&mut self, clock: &impl Clock) {
        if self.deleted_at.is_none() {
            self.deleted_at = Some(clock.utc());
            self.touch(clock);
        }
    }

    /// Returns true when the deadline, extended by the overdue period when
    /// permitted, lies in the past.
    #[must_use]
    pub fn is_past_deadline(&self, now: DateTime<Utc>, overdue_period: Duration) -> bool {
        let cutoff = if self.allow_overdue {
            self.deadline + overdue_period
        } else {
            self.deadline
        };
        now > cutoff
    }

    /// Updates the `updated_at` timestamp to the current clock time.
    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
