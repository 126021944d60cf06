//! Task lifecycle management for GitFreelas.
//!
//! Every lifecycle transition coordinates three independently-failing
//! systems: the relational store holding canonical status, the on-chain
//! escrow contract holding deposited funds, and the GitHub repository host
//! providing the workspace. The per-operation orchestrators in
//! [`services`] sequence those calls, track an explicit step union, and
//! surface structured errors. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
