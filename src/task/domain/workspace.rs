//! Mirror record for the GitHub repository provisioned per task.

use super::{RepositoryName, TaskId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Local mirror of an externally provisioned task repository.
///
/// Created after developer acceptance, deleted on cancellation. The GitHub
/// side owns the repository; this record exists so lookups and cleanup do
/// not depend on the forge being reachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    task_id: TaskId,
    repository_name: RepositoryName,
    repository_url: String,
    github_repo_id: u64,
    created_at: DateTime<Utc>,
}

impl Workspace {
    /// Creates a workspace mirror stamped with the current clock time.
    #[must_use]
    pub fn new(
        task_id: TaskId,
        repository_name: RepositoryName,
        repository_url: impl Into<String>,
        github_repo_id: u64,
        clock: &impl Clock,
    ) -> Self {
        Self {
            task_id,
            repository_name,
            repository_url: repository_url.into(),
            github_repo_id,
            created_at: clock.utc(),
        }
    }

    /// Reconstructs a workspace from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        task_id: TaskId,
        repository_name: RepositoryName,
        repository_url: String,
        github_repo_id: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            repository_name,
            repository_url,
            github_repo_id,
            created_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the repository name.
    #[must_use]
    pub const fn repository_name(&self) -> &RepositoryName {
        &self.repository_name
    }

    /// Returns the repository URL.
    #[must_use]
    pub fn repository_url(&self) -> &str {
        &self.repository_url
    }

    /// Returns the GitHub repository identifier.
    #[must_use]
    pub const fn github_repo_id(&self) -> u64 {
        self.github_repo_id
    }

    /// Returns the provisioning timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
