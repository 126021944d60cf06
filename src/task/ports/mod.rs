//! Port contracts for task lifecycle orchestration.
//!
//! Ports define infrastructure-agnostic interfaces for the three external
//! systems every lifecycle transition coordinates: the relational store,
//! the escrow contract, and the repository forge.

pub mod escrow;
pub mod forge;
pub mod signature;
pub mod store;

pub use escrow::{EscrowContract, EscrowError, EscrowResult, SubmittedTransaction, TxReceipt};
pub use forge::{CreatedRepository, ForgeError, ForgeResult, RepositoryForge};
pub use signature::{SignatureError, SignatureResult, SignatureVerifier};
pub use store::{StoreError, StoreResult, TaskStore};

#[cfg(test)]
pub use escrow::MockEscrowContract;
#[cfg(test)]
pub use forge::MockRepositoryForge;
