//! Deserialized shape of GitHub `pull_request` webhook payloads.
//!
//! Only the fields the ingestion service reads are modelled; everything
//! else in the delivery is ignored.

use serde::Deserialize;

/// `pull_request` event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    /// Event action (`opened`, `closed`, ...).
    pub action: String,
    /// The pull request the event describes.
    pub pull_request: PullRequestInfo,
    /// Repository the event originated from.
    pub repository: RepositoryInfo,
}

impl PullRequestEvent {
    /// Returns true for the `opened` action the platform ingests.
    #[must_use]
    pub fn is_opened(&self) -> bool {
        self.action == "opened"
    }
}

/// Pull request subset.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestInfo {
    /// Pull request number.
    pub number: u64,
    /// Author of the pull request.
    pub user: Author,
}

/// Event author subset.
#[derive(Debug, Clone, Deserialize)]
pub struct Author {
    /// GitHub login of the author.
    pub login: String,
}

/// Repository subset.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryInfo {
    /// Bare repository name (no owner prefix).
    pub name: String,
}
