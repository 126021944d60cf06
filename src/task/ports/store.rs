//! Store port for task persistence, assignments, audit records, and
//! workspace mirrors.

use crate::task::domain::{
    DeveloperAssignment, Task, TaskId, TaskStatus, TransactionRecord, Workspace,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence contract for the task lifecycle.
///
/// The store is the canonical holder of task status. It persists whatever
/// aggregate state it is handed; transition validation lives in the domain,
/// which services invoke before calling [`TaskStore::update_task`].
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateTask`] when the task ID already
    /// exists.
    async fn create_task(&self, task: &Task) -> StoreResult<()>;

    /// Persists changes to an existing task (status, contract linkage,
    /// pull request number, timestamps, soft deletion).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaskNotFound`] when the task does not exist.
    async fn update_task(&self, task: &Task) -> StoreResult<()>;

    /// Finds a task by identifier. Returns `None` when absent.
    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>>;

    /// Returns all non-deleted tasks currently in the given status.
    async fn tasks_in_status(&self, status: TaskStatus) -> StoreResult<Vec<Task>>;

    /// Records a developer assignment.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AssignmentExists`] when the task already has
    /// an active assignment.
    async fn assign_developer(&self, assignment: &DeveloperAssignment) -> StoreResult<()>;

    /// Removes the active assignment for a task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AssignmentMissing`] when no assignment exists.
    async fn remove_assignment(&self, task_id: TaskId) -> StoreResult<()>;

    /// Finds the active assignment for a task. Returns `None` when absent.
    async fn find_assignment(&self, task_id: TaskId)
    -> StoreResult<Option<DeveloperAssignment>>;

    /// Appends an on-chain audit record. Records are never updated.
    async fn record_transaction(&self, record: &TransactionRecord) -> StoreResult<()>;

    /// Returns the audit records for a task, oldest first.
    async fn transactions_for_task(&self, task_id: TaskId)
    -> StoreResult<Vec<TransactionRecord>>;

    /// Records a workspace mirror.
    async fn record_workspace(&self, workspace: &Workspace) -> StoreResult<()>;

    /// Finds the workspace mirror for a task. Returns `None` when absent.
    async fn find_workspace(&self, task_id: TaskId) -> StoreResult<Option<Workspace>>;

    /// Removes the workspace mirror for a task. Removing a missing mirror
    /// is a no-op.
    async fn remove_workspace(&self, task_id: TaskId) -> StoreResult<()>;

    /// Appends reviewer feedback for a task.
    async fn record_review_feedback(&self, task_id: TaskId, feedback: &str)
    -> StoreResult<()>;
}

/// Errors returned by store implementations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// The task already has an active developer assignment.
    #[error("task {0} already has an assigned developer")]
    AssignmentExists(TaskId),

    /// No active assignment exists for the task.
    #[error("task {0} has no assigned developer")]
    AssignmentMissing(TaskId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
