//! GitFreelas: escrow-backed task lifecycle orchestration.
//!
//! This crate coordinates paid coding tasks between clients and
//! developers. Every lifecycle transition sequences calls across three
//! independently-failing systems: a relational store (canonical task
//! status), an on-chain escrow contract (deposited funds), and a GitHub
//! repository host (the developer's workspace).
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: Pure lifecycle types with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for the store, the escrow
//!   contract, and the repository forge
//! - **Adapters**: Concrete implementations (memory, `PostgreSQL`,
//!   JSON-RPC, GitHub REST)
//! - **Services**: Per-operation orchestrators driving explicit step
//!   unions
//!
//! # Modules
//!
//! - [`task`]: Task lifecycle domain, ports, services, and adapters
//! - [`webhook`]: Authenticated, idempotent GitHub webhook ingestion
//! - [`server`]: Axum routes for the webhook and admin endpoints
//! - [`config`]: Layered file/environment configuration

pub mod config;
pub mod server;
pub mod task;
pub mod webhook;
