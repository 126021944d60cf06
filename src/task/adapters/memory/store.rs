//! In-memory store for lifecycle tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{DeveloperAssignment, Task, TaskId, TaskStatus, TransactionRecord, Workspace},
    ports::{StoreError, StoreResult, TaskStore},
};

/// Thread-safe in-memory task store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<RwLock<InMemoryState>>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    tasks: HashMap<TaskId, Task>,
    assignments: HashMap<TaskId, DeveloperAssignment>,
    transactions: Vec<TransactionRecord>,
    workspaces: HashMap<TaskId, Workspace>,
    feedback: Vec<(TaskId, String, DateTime<Utc>)>,
}

impl InMemoryTaskStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded feedback entries for a task, oldest first.
    #[must_use]
    pub fn feedback_for_task(&self, task_id: TaskId) -> Vec<String> {
        self.state
            .read()
            .map(|state| {
                state
                    .feedback
                    .iter()
                    .filter(|(id, _, _)| *id == task_id)
                    .map(|(_, text, _)| text.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn poisoned(err: impl std::fmt::Display) -> StoreError {
    StoreError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create_task(&self, task: &Task) -> StoreResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.tasks.contains_key(&task.id()) {
            return Err(StoreError::DuplicateTask(task.id()));
        }
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn update_task(&self, task: &Task) -> StoreResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if !state.tasks.contains_key(&task.id()) {
            return Err(StoreError::TaskNotFound(task.id()));
        }
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn tasks_in_status(&self, status: TaskStatus) -> StoreResult<Vec<Task>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .tasks
            .values()
            .filter(|task| task.status() == status && !task.is_deleted())
            .cloned()
            .collect())
    }

    async fn assign_developer(&self, assignment: &DeveloperAssignment) -> StoreResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.assignments.contains_key(&assignment.task_id()) {
            return Err(StoreError::AssignmentExists(assignment.task_id()));
        }
        state
            .assignments
            .insert(assignment.task_id(), assignment.clone());
        Ok(())
    }

    async fn remove_assignment(&self, task_id: TaskId) -> StoreResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.assignments.remove(&task_id).is_none() {
            return Err(StoreError::AssignmentMissing(task_id));
        }
        Ok(())
    }

    async fn find_assignment(
        &self,
        task_id: TaskId,
    ) -> StoreResult<Option<DeveloperAssignment>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.assignments.get(&task_id).cloned())
    }

    async fn record_transaction(&self, record: &TransactionRecord) -> StoreResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.transactions.push(record.clone());
        Ok(())
    }

    async fn transactions_for_task(
        &self,
        task_id: TaskId,
    ) -> StoreResult<Vec<TransactionRecord>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .transactions
            .iter()
            .filter(|record| record.task_id() == task_id)
            .cloned()
            .collect())
    }

    async fn record_workspace(&self, workspace: &Workspace) -> StoreResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.workspaces.insert(workspace.task_id(), workspace.clone());
        Ok(())
    }

    async fn find_workspace(&self, task_id: TaskId) -> StoreResult<Option<Workspace>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.workspaces.get(&task_id).cloned())
    }

    async fn remove_workspace(&self, task_id: TaskId) -> StoreResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.workspaces.remove(&task_id);
        Ok(())
    }

    async fn record_review_feedback(
        &self,
        task_id: TaskId,
        feedback: &str,
    ) -> StoreResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.feedback.push((task_id, feedback.to_owned(), Utc::now()));
        Ok(())
    }
}
