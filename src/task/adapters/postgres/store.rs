//! `PostgreSQL` store implementation for task lifecycle storage.

use super::models::{
    NewFeedbackRow, assignment_to_row, row_to_assignment, row_to_task, row_to_transaction,
    row_to_workspace, task_to_row, transaction_to_row, workspace_to_row,
};
use super::models::{AssignmentRow, TaskRow, TransactionRow, WorkspaceRow};
use super::schema::{
    developer_assignments, escrow_transactions, review_feedback, tasks, workspaces,
};
use crate::task::{
    domain::{DeveloperAssignment, Task, TaskId, TaskStatus, TransactionRecord, Workspace},
    ports::{StoreError, StoreResult, TaskStore},
};
use async_trait::async_trait;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by the store.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed task store.
#[derive(Debug, Clone)]
pub struct PostgresTaskStore {
    pool: TaskPgPool,
}

impl PostgresTaskStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(StoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(StoreError::persistence)?
    }
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    async fn create_task(&self, task: &Task) -> StoreResult<()> {
        let task_id = task.id();
        let new_row = task_to_row(task).map_err(StoreError::persistence)?;

        self.run_blocking(move |connection| {
            diesel::insert_into(tasks::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        StoreError::DuplicateTask(task_id)
                    }
                    _ => StoreError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update_task(&self, task: &Task) -> StoreResult<()> {
        let task_id = task.id();
        let changes = task_to_row(task).map_err(StoreError::persistence)?;

        self.run_blocking(move |connection| {
            let updated =
                diesel::update(tasks::table.filter(tasks::id.eq(task_id.into_inner())))
                    .set(&changes)
                    .execute(connection)
                    .map_err(StoreError::persistence)?;
            if updated == 0 {
                return Err(StoreError::TaskNotFound(task_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .filter(tasks::id.eq(id.into_inner()))
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()
                .map_err(StoreError::persistence)?;
            row.map(|found| row_to_task(found).map_err(StoreError::persistence))
                .transpose()
        })
        .await
    }

    async fn tasks_in_status(&self, status: TaskStatus) -> StoreResult<Vec<Task>> {
        let status_str = status.as_str().to_owned();
        self.run_blocking(move |connection| {
            let rows = tasks::table
                .filter(tasks::status.eq(status_str))
                .filter(tasks::deleted_at.is_null())
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)
                .map_err(StoreError::persistence)?;
            rows.into_iter()
                .map(|row| row_to_task(row).map_err(StoreError::persistence))
                .collect()
        })
        .await
    }

    async fn assign_developer(&self, assignment: &DeveloperAssignment) -> StoreResult<()> {
        let task_id = assignment.task_id();
        let new_row = assignment_to_row(assignment);

        self.run_blocking(move |connection| {
            diesel::insert_into(developer_assignments::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        StoreError::AssignmentExists(task_id)
                    }
                    _ => StoreError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn remove_assignment(&self, task_id: TaskId) -> StoreResult<()> {
        self.run_blocking(move |connection| {
            let removed = diesel::delete(
                developer_assignments::table
                    .filter(developer_assignments::task_id.eq(task_id.into_inner())),
            )
            .execute(connection)
            .map_err(StoreError::persistence)?;
            if removed == 0 {
                return Err(StoreError::AssignmentMissing(task_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_assignment(
        &self,
        task_id: TaskId,
    ) -> StoreResult<Option<DeveloperAssignment>> {
        self.run_blocking(move |connection| {
            let row = developer_assignments::table
                .filter(developer_assignments::task_id.eq(task_id.into_inner()))
                .select(AssignmentRow::as_select())
                .first::<AssignmentRow>(connection)
                .optional()
                .map_err(StoreError::persistence)?;
            row.map(|found| row_to_assignment(found).map_err(StoreError::persistence))
                .transpose()
        })
        .await
    }

    async fn record_transaction(&self, record: &TransactionRecord) -> StoreResult<()> {
        let new_row = transaction_to_row(record).map_err(StoreError::persistence)?;
        self.run_blocking(move |connection| {
            diesel::insert_into(escrow_transactions::table)
                .values(&new_row)
                .execute(connection)
                .map_err(StoreError::persistence)?;
            Ok(())
        })
        .await
    }

    async fn transactions_for_task(
        &self,
        task_id: TaskId,
    ) -> StoreResult<Vec<TransactionRecord>> {
        self.run_blocking(move |connection| {
            let rows = escrow_transactions::table
                .filter(escrow_transactions::task_id.eq(task_id.into_inner()))
                .order(escrow_transactions::recorded_at.asc())
                .select(TransactionRow::as_select())
                .load::<TransactionRow>(connection)
                .map_err(StoreError::persistence)?;
            rows.into_iter()
                .map(|row| row_to_transaction(row).map_err(StoreError::persistence))
                .collect()
        })
        .await
    }

    async fn record_workspace(&self, workspace: &Workspace) -> StoreResult<()> {
        let new_row = workspace_to_row(workspace).map_err(StoreError::persistence)?;
        self.run_blocking(move |connection| {
            diesel::insert_into(workspaces::table)
                .values(&new_row)
                .execute(connection)
                .map_err(StoreError::persistence)?;
            Ok(())
        })
        .await
    }

    async fn find_workspace(&self, task_id: TaskId) -> StoreResult<Option<Workspace>> {
        self.run_blocking(move |connection| {
            let row = workspaces::table
                .filter(workspaces::task_id.eq(task_id.into_inner()))
                .select(WorkspaceRow::as_select())
                .first::<WorkspaceRow>(connection)
                .optional()
                .map_err(StoreError::persistence)?;
            row.map(|found| row_to_workspace(found).map_err(StoreError::persistence))
                .transpose()
        })
        .await
    }

    async fn remove_workspace(&self, task_id: TaskId) -> StoreResult<()> {
        self.run_blocking(move |connection| {
            diesel::delete(
                workspaces::table.filter(workspaces::task_id.eq(task_id.into_inner())),
            )
            .execute(connection)
            .map_err(StoreError::persistence)?;
            Ok(())
        })
        .await
    }

    async fn record_review_feedback(
        &self,
        task_id: TaskId,
        feedback: &str,
    ) -> StoreResult<()> {
        let new_row = NewFeedbackRow {
            id: uuid::Uuid::new_v4(),
            task_id: task_id.into_inner(),
            feedback: feedback.to_owned(),
            recorded_at: Utc::now(),
        };
        self.run_blocking(move |connection| {
            diesel::insert_into(review_feedback::table)
                .values(&new_row)
                .execute(connection)
                .map_err(StoreError::persistence)?;
            Ok(())
        })
        .await
    }
}
