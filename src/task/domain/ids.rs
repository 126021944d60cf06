//! Identifier and validated scalar types for the task domain.

use super::TaskDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an internal task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new random task identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a task identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<Uuid> for TaskId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for the client who posted a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Creates a new random client identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a client identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Checks that a string is entirely lowercase hex of the given length.
fn is_lower_hex(value: &str, expected_len: usize) -> bool {
    value.len() == expected_len
        && value
            .chars()
            .all(|ch| ch.is_ascii_digit() || ('a'..='f').contains(&ch))
}

/// Normalized EVM wallet address (`0x` + 40 hex characters, lowercased).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Creates a validated, lowercased wallet address.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidWalletAddress`] when the value is
    /// not a `0x`-prefixed 20-byte hex string.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        let normalized = raw.trim().to_ascii_lowercase();
        let Some(body) = normalized.strip_prefix("0x") else {
            return Err(TaskDomainError::InvalidWalletAddress(raw));
        };
        if !is_lower_hex(body, 40) {
            return Err(TaskDomainError::InvalidWalletAddress(raw));
        }
        Ok(Self(normalized))
    }

    /// Returns the address as `str`, including the `0x` prefix.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for WalletAddress {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalized EVM transaction hash (`0x` + 64 hex characters, lowercased).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    /// Creates a validated, lowercased transaction hash.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTxHash`] when the value is not a
    /// `0x`-prefixed 32-byte hex string.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        let normalized = raw.trim().to_ascii_lowercase();
        let Some(body) = normalized.strip_prefix("0x") else {
            return Err(TaskDomainError::InvalidTxHash(raw));
        };
        if !is_lower_hex(body, 64) {
            return Err(TaskDomainError::InvalidTxHash(raw));
        }
        Ok(Self(normalized))
    }

    /// Returns the hash as `str`, including the `0x` prefix.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TxHash {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated GitHub account login.
///
/// GitHub logins are 1-39 characters of alphanumerics and hyphens, and may
/// not start or end with a hyphen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GithubLogin(String);

impl GithubLogin {
    /// Creates a validated GitHub login.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidGithubLogin`] when the value
    /// violates GitHub's username rules.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        let valid_chars = normalized
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-');
        let is_valid = !normalized.is_empty()
            && normalized.len() <= 39
            && valid_chars
            && !normalized.starts_with('-')
            && !normalized.ends_with('-');
        if !is_valid {
            return Err(TaskDomainError::InvalidGithubLogin(raw));
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Returns the login as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for GithubLogin {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for GithubLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Prefix of every repository the platform provisions.
const TASK_REPOSITORY_PREFIX: &str = "gitfreelas-task-";

/// Validated repository name scoped to the platform's GitHub owner.
///
/// Task workspaces follow the `gitfreelas-task-<task-id>` convention, which
/// is stable and collision-free because task identifiers are UUIDs. The
/// webhook handler inverts the convention via [`RepositoryName::task_id`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryName(String);

impl RepositoryName {
    /// Creates a validated repository name.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidRepositoryName`] when the value is
    /// empty, longer than 100 characters, or contains characters outside
    /// `[A-Za-z0-9._-]`.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        let valid_chars = normalized
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'));
        if normalized.is_empty() || normalized.len() > 100 || !valid_chars {
            return Err(TaskDomainError::InvalidRepositoryName(raw));
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Builds the canonical workspace name for a task.
    #[must_use]
    pub fn for_task(task_id: TaskId) -> Self {
        Self(format!("{TASK_REPOSITORY_PREFIX}{task_id}"))
    }

    /// Extracts the task identifier from a canonical workspace name.
    ///
    /// Returns `None` for repositories outside the platform convention.
    #[must_use]
    pub fn task_id(&self) -> Option<TaskId> {
        let suffix = self.0.strip_prefix(TASK_REPOSITORY_PREFIX)?;
        Uuid::parse_str(suffix).ok().map(TaskId::from_uuid)
    }

    /// Returns the repository name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RepositoryName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
