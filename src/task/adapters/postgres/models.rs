//! Diesel row models and domain conversions for task persistence.

use super::schema::{
    developer_assignments, escrow_transactions, review_feedback, tasks, workspaces,
};
use crate::task::domain::{
    ClientId, DeveloperAssignment, GithubLogin, PersistedTaskData, RepositoryName, Task,
    TaskId, TaskStatus, TransactionKind, TransactionOutcome, TransactionRecord, TxHash,
    WalletAddress, WeiAmount, Workspace,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use thiserror::Error;

/// Errors raised while mapping rows back into domain values.
#[derive(Debug, Clone, Error)]
pub enum RowError {
    /// A stored scalar failed domain validation.
    #[error("stored value rejected by domain validation: {0}")]
    Invalid(String),

    /// A stored numeric column does not fit the domain type.
    #[error("stored numeric out of range: {0}")]
    OutOfRange(String),
}

fn invalid(err: impl std::fmt::Display) -> RowError {
    RowError::Invalid(err.to_string())
}

fn to_u64(value: i64, column: &str) -> Result<u64, RowError> {
    u64::try_from(value).map_err(|_| RowError::OutOfRange(format!("{column}={value}")))
}

fn to_i64(value: u64, column: &str) -> Result<i64, RowError> {
    i64::try_from(value).map_err(|_| RowError::OutOfRange(format!("{column}={value}")))
}

fn parse_wei(value: &str) -> Result<WeiAmount, RowError> {
    value
        .parse::<u128>()
        .map(WeiAmount::from_wei)
        .map_err(|_| RowError::Invalid(format!("value_in_wei={value}")))
}

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Internal task identifier.
    pub id: uuid::Uuid,
    /// Short task title.
    pub title: String,
    /// Long-form description.
    pub description: String,
    /// Acceptance requirements.
    pub requirements: String,
    /// Task value in wei as a decimal string.
    pub value_in_wei: String,
    /// Completion deadline.
    pub deadline: DateTime<Utc>,
    /// Whether a discounted overdue period is permitted.
    pub allow_overdue: bool,
    /// Lifecycle status.
    pub status: String,
    /// Creator identifier.
    pub creator_id: uuid::Uuid,
    /// Contract-side task identifier.
    pub contract_task_id: Option<i64>,
    /// Funding transaction hash.
    pub contract_tx_hash: Option<String>,
    /// Submitted pull request number.
    pub pull_request_number: Option<i64>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-deletion timestamp.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Insert/update model for task records.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub struct NewTaskRow {
    /// Internal task identifier.
    pub id: uuid::Uuid,
    /// Short task title.
    pub title: String,
    /// Long-form description.
    pub description: String,
    /// Acceptance requirements.
    pub requirements: String,
    /// Task value in wei as a decimal string.
    pub value_in_wei: String,
    /// Completion deadline.
    pub deadline: DateTime<Utc>,
    /// Whether a discounted overdue period is permitted.
    pub allow_overdue: bool,
    /// Lifecycle status.
    pub status: String,
    /// Creator identifier.
    pub creator_id: uuid::Uuid,
    /// Contract-side task identifier.
    pub contract_task_id: Option<i64>,
    /// Funding transaction hash.
    pub contract_tx_hash: Option<String>,
    /// Submitted pull request number.
    pub pull_request_number: Option<i64>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-deletion timestamp.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Builds the insert/update row for a task aggregate.
pub fn task_to_row(task: &Task) -> Result<NewTaskRow, RowError> {
    Ok(NewTaskRow {
        id: task.id().into_inner(),
        title: task.title().to_owned(),
        description: task.description().to_owned(),
        requirements: task.requirements().to_owned(),
        value_in_wei: task.value_in_wei().as_wei().to_string(),
        deadline: task.deadline(),
        allow_overdue: task.allow_overdue(),
        status: task.status().as_str().to_owned(),
        creator_id: task.creator_id().into_inner(),
        contract_task_id: task
            .contract_task_id()
            .map(|id| to_i64(id, "contract_task_id"))
            .transpose()?,
        contract_tx_hash: task.contract_tx_hash().map(|hash| hash.as_str().to_owned()),
        pull_request_number: task
            .pull_request_number()
            .map(|number| to_i64(number, "pull_request_number"))
            .transpose()?,
        created_at: task.created_at(),
        updated_at: task.updated_at(),
        deleted_at: task.deleted_at(),
    })
}

/// Reconstructs a task aggregate from a row.
pub fn row_to_task(row: TaskRow) -> Result<Task, RowError> {
    let status = TaskStatus::try_from(row.status.as_str()).map_err(invalid)?;
    let contract_tx_hash = row
        .contract_tx_hash
        .map(TxHash::new)
        .transpose()
        .map_err(invalid)?;
    Ok(Task::from_persisted(PersistedTaskData {
        id: TaskId::from_uuid(row.id),
        title: row.title,
        description: row.description,
        requirements: row.requirements,
        value_in_wei: parse_wei(&row.value_in_wei)?,
        deadline: row.deadline,
        allow_overdue: row.allow_overdue,
        status,
        creator_id: ClientId::from_uuid(row.creator_id),
        contract_task_id: row
            .contract_task_id
            .map(|id| to_u64(id, "contract_task_id"))
            .transpose()?,
        contract_tx_hash,
        pull_request_number: row
            .pull_request_number
            .map(|number| to_u64(number, "pull_request_number"))
            .transpose()?,
        created_at: row.created_at,
        updated_at: row.updated_at,
        deleted_at: row.deleted_at,
    }))
}

/// Row model for developer assignments.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = developer_assignments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AssignmentRow {
    /// Task the assignment belongs to.
    pub task_id: uuid::Uuid,
    /// Developer wallet address.
    pub wallet_address: String,
    /// Developer GitHub login.
    pub github_login: String,
    /// Application timestamp.
    pub applied_at: DateTime<Utc>,
}

/// Builds the row for an assignment.
pub fn assignment_to_row(assignment: &DeveloperAssignment) -> AssignmentRow {
    AssignmentRow {
        task_id: assignment.task_id().into_inner(),
        wallet_address: assignment.wallet_address().as_str().to_owned(),
        github_login: assignment.github_login().as_str().to_owned(),
        applied_at: assignment.applied_at(),
    }
}

/// Reconstructs an assignment from a row.
pub fn row_to_assignment(row: AssignmentRow) -> Result<DeveloperAssignment, RowError> {
    Ok(DeveloperAssignment::from_persisted(
        TaskId::from_uuid(row.task_id),
        WalletAddress::new(row.wallet_address).map_err(invalid)?,
        GithubLogin::new(row.github_login).map_err(invalid)?,
        row.applied_at,
    ))
}

/// Row model for escrow transaction audit records.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = escrow_transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TransactionRow {
    /// Record identifier.
    pub id: uuid::Uuid,
    /// Task the attempt belongs to.
    pub task_id: uuid::Uuid,
    /// Operation kind.
    pub kind: String,
    /// Attempt outcome.
    pub outcome: String,
    /// Value in wei as a decimal string.
    pub value_in_wei: String,
    /// Transaction hash.
    pub tx_hash: Option<String>,
    /// Chain identifier.
    pub network_id: i64,
    /// Recording timestamp.
    pub recorded_at: DateTime<Utc>,
}

/// Builds the row for an audit record.
pub fn transaction_to_row(record: &TransactionRecord) -> Result<TransactionRow, RowError> {
    Ok(TransactionRow {
        id: record.id(),
        task_id: record.task_id().into_inner(),
        kind: record.kind().as_str().to_owned(),
        outcome: record.outcome().as_str().to_owned(),
        value_in_wei: record.value_in_wei().as_wei().to_string(),
        tx_hash: record.tx_hash().map(|hash| hash.as_str().to_owned()),
        network_id: to_i64(record.network_id(), "network_id")?,
        recorded_at: record.recorded_at(),
    })
}

/// Reconstructs an audit record from a row.
pub fn row_to_transaction(row: TransactionRow) -> Result<TransactionRecord, RowError> {
    let kind = TransactionKind::try_from(row.kind.as_str()).map_err(invalid)?;
    let outcome = match row.outcome.as_str() {
        "confirmed" => TransactionOutcome::Confirmed,
        "failed" => TransactionOutcome::Failed,
        other => return Err(RowError::Invalid(format!("outcome={other}"))),
    };
    let tx_hash = row.tx_hash.map(TxHash::new).transpose().map_err(invalid)?;
    Ok(TransactionRecord::from_persisted(
        row.id,
        TaskId::from_uuid(row.task_id),
        kind,
        outcome,
        parse_wei(&row.value_in_wei)?,
        tx_hash,
        to_u64(row.network_id, "network_id")?,
        row.recorded_at,
    ))
}

/// Row model for workspace mirrors.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = workspaces)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WorkspaceRow {
    /// Task the workspace belongs to.
    pub task_id: uuid::Uuid,
    /// Repository name.
    pub repository_name: String,
    /// Repository browser URL.
    pub repository_url: String,
    /// Host-side repository identifier.
    pub github_repo_id: i64,
    /// Provisioning timestamp.
    pub created_at: DateTime<Utc>,
}

/// Builds the row for a workspace mirror.
pub fn workspace_to_row(workspace: &Workspace) -> Result<WorkspaceRow, RowError> {
    Ok(WorkspaceRow {
        task_id: workspace.task_id().into_inner(),
        repository_name: workspace.repository_name().as_str().to_owned(),
        repository_url: workspace.repository_url().to_owned(),
        github_repo_id: to_i64(workspace.github_repo_id(), "github_repo_id")?,
        created_at: workspace.created_at(),
    })
}

/// Reconstructs a workspace mirror from a row.
pub fn row_to_workspace(row: WorkspaceRow) -> Result<Workspace, RowError> {
    Ok(Workspace::from_persisted(
        TaskId::from_uuid(row.task_id),
        RepositoryName::new(row.repository_name).map_err(invalid)?,
        row.repository_url,
        to_u64(row.github_repo_id, "github_repo_id")?,
        row.created_at,
    ))
}

/// Insert model for review feedback.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = review_feedback)]
pub struct NewFeedbackRow {
    /// Record identifier.
    pub id: uuid::Uuid,
    /// Task the feedback belongs to.
    pub task_id: uuid::Uuid,
    /// Feedback text.
    pub feedback: String,
    /// Recording timestamp.
    pub recorded_at: DateTime<Utc>,
}
