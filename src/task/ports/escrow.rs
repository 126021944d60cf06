//! Escrow contract port.
//!
//! Write operations follow the submit-then-await-receipt shape of EVM
//! transactions: submission yields a hash immediately, confirmation arrives
//! asynchronously with the mined receipt. Read operations mirror the
//! contract's public constants and views.

use crate::task::domain::{TxHash, WalletAddress, WeiAmount};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Result type for escrow operations.
pub type EscrowResult<T> = Result<T, EscrowError>;

/// Funding submission: the contract-side task id plus the pending hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTransaction {
    /// Identifier the contract assigned to the task entry.
    pub contract_task_id: u64,
    /// Hash of the submitted, not yet confirmed, transaction.
    pub tx_hash: TxHash,
}

/// Mined transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// Hash of the mined transaction.
    pub tx_hash: TxHash,
    /// True when the transaction executed without reverting.
    pub success: bool,
    /// Block the transaction was mined in.
    pub block_number: u64,
}

/// Escrow contract contract surface consumed by the orchestrators.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EscrowContract: Send + Sync {
    /// Submits `createTask(taskId, deadline, allowOverdue)` with the
    /// deposit attached (task value plus platform fee).
    async fn create_task(
        &self,
        deadline: DateTime<Utc>,
        allow_overdue: bool,
        deposit: WeiAmount,
    ) -> EscrowResult<SubmittedTransaction>;

    /// Submits `acceptDeveloper(taskId, developerAddress)`.
    async fn accept_developer(
        &self,
        contract_task_id: u64,
        developer: &WalletAddress,
    ) -> EscrowResult<TxHash>;

    /// Submits `completeTask(taskId)`, releasing escrowed funds to the
    /// developer.
    async fn complete_task(&self, contract_task_id: u64) -> EscrowResult<TxHash>;

    /// Submits `cancelTask(taskId, reason)`, refunding the deposit.
    async fn cancel_task(&self, contract_task_id: u64, reason: &str) -> EscrowResult<TxHash>;

    /// Waits for the receipt of a submitted transaction.
    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> EscrowResult<TxReceipt>;

    /// Reads `PLATFORM_FEE_PERCENTAGE`.
    async fn platform_fee_percent(&self) -> EscrowResult<u8>;

    /// Reads `MINIMUM_TASK_VALUE`.
    async fn minimum_task_value(&self) -> EscrowResult<WeiAmount>;

    /// Reads `getTaskCount`.
    async fn task_count(&self) -> EscrowResult<u64>;

    /// Reads `OVERDUE_PERIOD`.
    async fn overdue_period(&self) -> EscrowResult<Duration>;

    /// Chain identifier the contract lives on.
    fn network_id(&self) -> u64;
}

/// Errors returned by escrow contract implementations.
///
/// The discriminant is set at the point of failure; callers never infer
/// categories from message text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EscrowError {
    /// The signer refused to authorise the transaction (EIP-1193 4001).
    #[error("transaction rejected by wallet: {0}")]
    WalletRejected(String),

    /// The connected node reports a different chain than configured.
    #[error("wrong chain: expected network {expected}, node reports {actual}")]
    WrongChain {
        /// Chain id the adapter was configured for.
        expected: u64,
        /// Chain id the node reported.
        actual: u64,
    },

    /// Transport-level failure reaching the node.
    #[error("network error: {0}")]
    Network(String),

    /// The transaction was mined but reverted.
    #[error("transaction reverted: {tx_hash}")]
    Reverted {
        /// Hash of the reverted transaction.
        tx_hash: TxHash,
    },

    /// The node returned a JSON-RPC error.
    #[error("rpc error: {0}")]
    Rpc(String),
}
