//! Developer assignment and off-chain application signing.

use super::{GithubLogin, TaskId, WalletAddress};
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Maximum age of a signed application before it is considered stale.
#[must_use]
pub fn application_max_age() -> Duration {
    Duration::minutes(10)
}

/// Active developer assignment for a task.
///
/// At most one assignment exists per task; rejection removes it and the
/// task becomes visible to other developers again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeveloperAssignment {
    task_id: TaskId,
    wallet_address: WalletAddress,
    github_login: GithubLogin,
    applied_at: DateTime<Utc>,
}

impl DeveloperAssignment {
    /// Creates an assignment stamped with the current clock time.
    #[must_use]
    pub fn new(
        task_id: TaskId,
        wallet_address: WalletAddress,
        github_login: GithubLogin,
        clock: &impl Clock,
    ) -> Self {
        Self {
            task_id,
            wallet_address,
            github_login,
            applied_at: clock.utc(),
        }
    }

    /// Reconstructs an assignment from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        task_id: TaskId,
        wallet_address: WalletAddress,
        github_login: GithubLogin,
        applied_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            wallet_address,
            github_login,
            applied_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the developer's wallet address.
    #[must_use]
    pub const fn wallet_address(&self) -> &WalletAddress {
        &self.wallet_address
    }

    /// Returns the developer's GitHub login.
    #[must_use]
    pub const fn github_login(&self) -> &GithubLogin {
        &self.github_login
    }

    /// Returns the application timestamp.
    #[must_use]
    pub const fn applied_at(&self) -> DateTime<Utc> {
        self.applied_at
    }
}

/// Canonical off-chain message a developer signs when applying.
///
/// The message binds the wallet address to the task id and a timestamp so a
/// captured signature cannot be replayed for another task or indefinitely.
/// No gas is spent; escrow commitment happens at acceptance, not
/// application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationMessage {
    task_id: TaskId,
    wallet_address: WalletAddress,
    signed_at: DateTime<Utc>,
}

impl ApplicationMessage {
    /// Creates an application message.
    #[must_use]
    pub const fn new(
        task_id: TaskId,
        wallet_address: WalletAddress,
        signed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            wallet_address,
            signed_at,
        }
    }

    /// Produces the exact text the wallet signs.
    #[must_use]
    pub fn canonical_text(&self) -> String {
        format!(
            "gitfreelas:apply:{}:{}:{}",
            self.task_id,
            self.wallet_address,
            self.signed_at.timestamp()
        )
    }

    /// Returns the wallet address the message binds.
    #[must_use]
    pub const fn wallet_address(&self) -> &WalletAddress {
        &self.wallet_address
    }

    /// Returns true when the signature timestamp is within `max_age` of
    /// `now` and not from the future.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.signed_at <= now && now - self.signed_at <= max_age
    }
}

/// Reviewer verdict posted back to the pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReviewVerdict {
    /// The submission was approved and funds released.
    Approved,
    /// The submission was rejected and the task cancelled.
    Rejected {
        /// Optional reason shown to the developer.
        reason: Option<String>,
    },
    /// The client requested changes; the task returns to in-progress.
    RevisionRequested {
        /// Feedback describing the requested changes.
        feedback: String,
    },
}
