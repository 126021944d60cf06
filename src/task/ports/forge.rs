//! Repository forge port: workspace provisioning and pull request review
//! actions against a GitHub-compatible host.

use crate::task::domain::{GithubLogin, RepositoryName, ReviewVerdict};
use async_trait::async_trait;
use thiserror::Error;

/// Result type for forge operations.
pub type ForgeResult<T> = Result<T, ForgeError>;

/// Repository returned by a successful provisioning call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRepository {
    /// Name of the created repository.
    pub name: RepositoryName,
    /// Browser URL of the repository.
    pub url: String,
    /// Host-side numeric repository identifier.
    pub github_repo_id: u64,
}

/// Forge surface consumed by the orchestrators and admin endpoints.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RepositoryForge: Send + Sync {
    /// Creates a private repository under the platform owner.
    async fn create_repository(
        &self,
        name: &RepositoryName,
        description: &str,
    ) -> ForgeResult<CreatedRepository>;

    /// Deletes a repository.
    async fn delete_repository(&self, name: &RepositoryName) -> ForgeResult<()>;

    /// Returns true when the repository exists.
    async fn repository_exists(&self, name: &RepositoryName) -> ForgeResult<bool>;

    /// Grants a user push access to a repository.
    async fn add_collaborator(
        &self,
        name: &RepositoryName,
        login: &GithubLogin,
    ) -> ForgeResult<()>;

    /// Revokes a user's access to a repository.
    async fn remove_collaborator(
        &self,
        name: &RepositoryName,
        login: &GithubLogin,
    ) -> ForgeResult<()>;

    /// Posts the review verdict as a comment on a pull request.
    async fn post_review_comment(
        &self,
        name: &RepositoryName,
        pull_request_number: u64,
        verdict: &ReviewVerdict,
    ) -> ForgeResult<()>;

    /// Merges a pull request.
    async fn merge_pull_request(
        &self,
        name: &RepositoryName,
        pull_request_number: u64,
    ) -> ForgeResult<()>;

    /// Moves repository access from the developer to the client: the client
    /// gains admin access, the developer's access is revoked.
    async fn transfer_access(
        &self,
        name: &RepositoryName,
        from: &GithubLogin,
        to: &GithubLogin,
    ) -> ForgeResult<()>;

    /// Verifies credentials; returns the authenticated login.
    async fn verify_connection(&self) -> ForgeResult<String>;
}

/// Errors returned by forge implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// The credentials lack permission for the operation.
    #[error("forge permission denied: {0}")]
    Permission(String),

    /// The repository, user, or pull request does not exist.
    #[error("forge resource not found: {0}")]
    NotFound(String),

    /// The API rate limit was exhausted.
    #[error("forge rate limit exhausted")]
    RateLimited,

    /// Transport-level failure reaching the host.
    #[error("forge network error: {0}")]
    Network(String),

    /// The host returned an unexpected API error.
    #[error("forge api error (status {status}): {message}")]
    Api {
        /// HTTP status of the response.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },
}
