//! Append-only audit records for on-chain escrow operations.

use super::{ParseTransactionKindError, TaskId, TxHash, WeiAmount};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Escrow contract operation a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// `createTask` funding deposit.
    Create,
    /// `acceptDeveloper` commitment.
    Accept,
    /// `completeTask` fund release.
    Complete,
    /// `cancelTask` refund.
    Cancel,
}

impl TransactionKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Accept => "accept",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = ParseTransactionKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "accept" => Ok(Self::Accept),
            "complete" => Ok(Self::Complete),
            "cancel" => Ok(Self::Cancel),
            _ => Err(ParseTransactionKindError(value.to_owned())),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final outcome of an on-chain operation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionOutcome {
    /// The transaction was mined and its receipt reported success.
    Confirmed,
    /// The transaction reverted, was rejected, or never confirmed.
    Failed,
}

impl TransactionOutcome {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }
}

/// One audit row per on-chain operation attempt. Rows are never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    id: Uuid,
    task_id: TaskId,
    kind: TransactionKind,
    outcome: TransactionOutcome,
    value_in_wei: WeiAmount,
    tx_hash: Option<TxHash>,
    network_id: u64,
    recorded_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Records a confirmed attempt.
    #[must_use]
    pub fn confirmed(
        task_id: TaskId,
        kind: TransactionKind,
        value_in_wei: WeiAmount,
        tx_hash: TxHash,
        network_id: u64,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            kind,
            outcome: TransactionOutcome::Confirmed,
            value_in_wei,
            tx_hash: Some(tx_hash),
            network_id,
            recorded_at: clock.utc(),
        }
    }

    /// Records a failed attempt. The hash is present when the transaction
    /// was submitted before failing.
    #[must_use]
    pub fn failed(
        task_id: TaskId,
        kind: TransactionKind,
        value_in_wei: WeiAmount,
        tx_hash: Option<TxHash>,
        network_id: u64,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            kind,
            outcome: TransactionOutcome::Failed,
            value_in_wei,
            tx_hash,
            network_id,
            recorded_at: clock.utc(),
        }
    }

    /// Reconstructs a record from persisted storage.
    #[must_use]
    #[expect(clippy::too_many_arguments, reason = "persistence reconstruction mirrors the row")]
    pub const fn from_persisted(
        id: Uuid,
        task_id: TaskId,
        kind: TransactionKind,
        outcome: TransactionOutcome,
        value_in_wei: WeiAmount,
        tx_hash: Option<TxHash>,
        network_id: u64,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            task_id,
            kind,
            outcome,
            value_in_wei,
            tx_hash,
            network_id,
            recorded_at,
        }
    }

    /// Returns the record identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the task the attempt belongs to.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the operation kind.
    #[must_use]
    pub const fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Returns the attempt outcome.
    #[must_use]
    pub const fn outcome(&self) -> TransactionOutcome {
        self.outcome
    }

    /// Returns the value attached to the operation.
    #[must_use]
    pub const fn value_in_wei(&self) -> WeiAmount {
        self.value_in_wei
    }

    /// Returns the transaction hash, when one was obtained.
    #[must_use]
    pub const fn tx_hash(&self) -> Option<&TxHash> {
        self.tx_hash.as_ref()
    }

    /// Returns the chain the attempt targeted.
    #[must_use]
    pub const fn network_id(&self) -> u64 {
        self.network_id
    }

    /// Returns the recording timestamp.
    #[must_use]
    pub const fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}
