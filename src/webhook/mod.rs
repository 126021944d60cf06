//! GitHub webhook ingestion.
//!
//! Deliveries are authenticated with HMAC-SHA256 over the raw body,
//! filtered to `pull_request.opened` events on task repositories, and
//! applied idempotently: a pull request moves its task from in-progress to
//! pending approval exactly once.

pub mod event;
pub mod service;
pub mod signature;

pub use event::PullRequestEvent;
pub use service::{IgnoreReason, WebhookOutcome, WebhookService};
pub use signature::{SIGNATURE_HEADER, WebhookSecret};

#[cfg(test)]
mod tests;
