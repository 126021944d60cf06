//! Shared machinery for the per-operation flow state machines.
//!
//! Every lifecycle operation drives an explicit step tagged-union through a
//! single reducer and reports each transition to a [`StepSink`], so callers
//! can render per-step progress instead of a generic spinner. Failures are
//! folded into [`FlowError`] with a [`FailureKind`] discriminant set at the
//! point of failure; no caller categorises errors from message text.

use crate::task::domain::TaskDomainError;
use crate::task::ports::{EscrowError, ForgeError, SignatureError, StoreError};
use std::fmt;
use std::sync::Mutex;
use thiserror::Error;

/// Structured failure category, fixed where the failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Input rejected before any remote call.
    Validation,
    /// The wallet refused to sign or the signature did not verify.
    Wallet,
    /// Transport failure reaching the node or host.
    Network,
    /// The contract reverted or the node rejected the call.
    Contract,
    /// The relational store failed.
    Storage,
    /// The repository forge failed.
    Forge,
    /// Credentials lack permission for the operation.
    Permission,
    /// A referenced record does not exist.
    NotFound,
}

impl FailureKind {
    /// Returns the canonical lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Wallet => "wallet",
            Self::Network => "network",
            Self::Contract => "contract",
            Self::Storage => "storage",
            Self::Forge => "forge",
            Self::Permission => "permission",
            Self::NotFound => "not_found",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal error of a lifecycle flow.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct FlowError {
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable detail.
    pub message: String,
}

impl FlowError {
    /// Creates a flow error.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Validation, message)
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NotFound, message)
    }
}

impl From<EscrowError> for FlowError {
    fn from(err: EscrowError) -> Self {
        let kind = match &err {
            EscrowError::WalletRejected(_) => FailureKind::Wallet,
            EscrowError::WrongChain { .. } | EscrowError::Network(_) => FailureKind::Network,
            EscrowError::Reverted { .. } | EscrowError::Rpc(_) => FailureKind::Contract,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<StoreError> for FlowError {
    fn from(err: StoreError) -> Self {
        let kind = match &err {
            StoreError::TaskNotFound(_) | StoreError::AssignmentMissing(_) => {
                FailureKind::NotFound
            }
            _ => FailureKind::Storage,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<ForgeError> for FlowError {
    fn from(err: ForgeError) -> Self {
        let kind = match &err {
            ForgeError::Permission(_) => FailureKind::Permission,
            ForgeError::NotFound(_) => FailureKind::NotFound,
            _ => FailureKind::Forge,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<SignatureError> for FlowError {
    fn from(err: SignatureError) -> Self {
        Self::new(FailureKind::Wallet, err.to_string())
    }
}

impl From<TaskDomainError> for FlowError {
    fn from(err: TaskDomainError) -> Self {
        Self::new(FailureKind::Validation, err.to_string())
    }
}

/// Receives step transitions as a flow progresses.
pub trait StepSink<S>: Send + Sync {
    /// Called after every reducer transition, including terminal ones.
    fn step_changed(&self, step: &S);
}

/// Sink that discards progress updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSteps;

impl<S> StepSink<S> for DiscardSteps {
    fn step_changed(&self, _step: &S) {}
}

/// Sink that records every transition, for tests and progress displays.
#[derive(Debug, Default)]
pub struct RecordingSink<S> {
    steps: Mutex<Vec<S>>,
}

impl<S: Clone> RecordingSink<S> {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: Mutex::new(Vec::new()),
        }
    }

    /// Returns the transitions observed so far.
    #[must_use]
    pub fn steps(&self) -> Vec<S> {
        self.steps
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl<S: Clone + Send> StepSink<S> for RecordingSink<S> {
    fn step_changed(&self, step: &S) {
        if let Ok(mut guard) = self.steps.lock() {
            guard.push(step.clone());
        }
    }
}
