//! Error types for task domain validation and parsing.

use super::{TaskId, TaskStatus};
use thiserror::Error;

/// Errors returned while constructing or mutating domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The wallet address is not a `0x`-prefixed 20-byte hex string.
    #[error("invalid wallet address: {0}")]
    InvalidWalletAddress(String),

    /// The transaction hash is not a `0x`-prefixed 32-byte hex string.
    #[error("invalid transaction hash: {0}")]
    InvalidTxHash(String),

    /// The repository name contains characters GitHub rejects.
    #[error("invalid repository name: {0}")]
    InvalidRepositoryName(String),

    /// The GitHub login does not follow GitHub's username rules.
    #[error("invalid github login: {0}")]
    InvalidGithubLogin(String),

    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The task value is zero.
    #[error("task value must be greater than zero")]
    ZeroValue,

    /// The ether amount string could not be parsed.
    #[error("invalid ether amount '{0}'")]
    InvalidEtherAmount(String),

    /// An amount computation exceeded the representable range.
    #[error("wei amount arithmetic overflowed")]
    AmountOverflow,

    /// The requested status change is not an edge of the lifecycle graph.
    #[error("invalid status transition for task {task_id}: {from} -> {to}")]
    InvalidStatusTransition {
        /// Task whose transition was rejected.
        task_id: TaskId,
        /// Status the task currently holds.
        from: TaskStatus,
        /// Status the transition requested.
        to: TaskStatus,
    },

    /// The task already carries an on-chain contract linkage.
    #[error("task {0} is already linked to an escrow contract entry")]
    ContractAlreadyLinked(TaskId),

    /// A different pull request is already recorded for the task.
    #[error("task {0} already has a different pull request recorded")]
    PullRequestAlreadyRecorded(TaskId),
}

/// Error returned while parsing task statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing transaction kinds from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown transaction kind: {0}")]
pub struct ParseTransactionKindError(pub String);
