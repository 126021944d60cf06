//! Webhook ingestion: PR-opened deliveries flip in-progress tasks to
//! pending approval.

use super::event::PullRequestEvent;
use super::signature::{WebhookSecret, verify};
use crate::task::domain::{RepositoryName, TaskId, TaskStatus};
use crate::task::ports::TaskStore;
use mockable::Clock;
use std::sync::Arc;
use tracing::{info, warn};

/// Why a delivery was acknowledged without acting on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The payload was not parseable JSON for a pull request event.
    MalformedPayload,
    /// The event is not a `pull_request` `opened` action.
    NotPullRequestOpened,
    /// The repository does not follow the task naming convention.
    UnrelatedRepository,
}

/// Result of handling one webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The task moved from in-progress to pending approval.
    Flipped {
        /// Task that moved.
        task_id: TaskId,
        /// Recorded pull request number.
        pull_request_number: u64,
    },
    /// Identical redelivery: the task is already pending approval for this
    /// pull request. Acknowledged without mutation.
    AlreadyPending {
        /// Task already pending approval.
        task_id: TaskId,
    },
    /// The delivery does not concern the platform; acknowledged.
    Ignored(IgnoreReason),
    /// The signature header is missing or does not verify (401).
    InvalidSignature,
    /// The PR author does not match the assigned developer (403).
    AuthorMismatch {
        /// Login the platform expected.
        expected: String,
        /// Login the event carried.
        actual: String,
    },
    /// The task is missing or not in the expected state (404).
    UnknownTask(String),
    /// The store failed while handling the delivery (500).
    StoreFailure(String),
}

/// Webhook ingestion service.
#[derive(Clone)]
pub struct WebhookService<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    secret: WebhookSecret,
}

impl<S, C> WebhookService<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    /// Creates a webhook service.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>, secret: WebhookSecret) -> Self {
        Self {
            store,
            clock,
            secret,
        }
    }

    /// Handles one delivery: verifies the signature over the raw body,
    /// filters for PR-opened events on task repositories, checks the
    /// author, and flips the task exactly once.
    pub async fn handle(
        &self,
        signature_header: Option<&str>,
        raw_body: &[u8],
    ) -> WebhookOutcome {
        if !verify(&self.secret, signature_header, raw_body) {
            warn!("webhook delivery rejected: bad signature");
            return WebhookOutcome::InvalidSignature;
        }

        let Ok(event) = serde_json::from_slice::<PullRequestEvent>(raw_body) else {
            return WebhookOutcome::Ignored(IgnoreReason::MalformedPayload);
        };
        if !event.is_opened() {
            return WebhookOutcome::Ignored(IgnoreReason::NotPullRequestOpened);
        }
        let task_id = match RepositoryName::new(event.repository.name.clone()) {
            Ok(name) => match name.task_id() {
                Some(task_id) => task_id,
                None => return WebhookOutcome::Ignored(IgnoreReason::UnrelatedRepository),
            },
            Err(_) => return WebhookOutcome::Ignored(IgnoreReason::UnrelatedRepository),
        };

        let mut task = match self.store.find_task(task_id).await {
            Ok(Some(task)) if !task.is_deleted() => task,
            Ok(_) => {
                return WebhookOutcome::UnknownTask(format!("task {task_id} not found"));
            }
            Err(err) => return WebhookOutcome::StoreFailure(err.to_string()),
        };

        let assignment = match self.store.find_assignment(task_id).await {
            Ok(Some(assignment)) => assignment,
            Ok(None) => {
                return WebhookOutcome::UnknownTask(format!(
                    "task {task_id} has no assigned developer"
                ));
            }
            Err(err) => return WebhookOutcome::StoreFailure(err.to_string()),
        };
        let actual_author = event.pull_request.user.login.as_str();
        if assignment.github_login().as_str() != actual_author {
            warn!(
                %task_id,
                expected = %assignment.github_login(),
                actual = actual_author,
                "webhook delivery rejected: author mismatch"
            );
            return WebhookOutcome::AuthorMismatch {
                expected: assignment.github_login().as_str().to_owned(),
                actual: actual_author.to_owned(),
            };
        }

        let pull_request_number = event.pull_request.number;
        match task.status() {
            TaskStatus::PendingApproval
                if task.pull_request_number() == Some(pull_request_number) =>
            {
                // Redelivery of an already-applied event.
                WebhookOutcome::AlreadyPending { task_id }
            }
            TaskStatus::InProgress => {
                if let Err(err) = task.record_pull_request(pull_request_number, &*self.clock)
                {
                    return WebhookOutcome::UnknownTask(err.to_string());
                }
                if let Err(err) =
                    task.transition_to(TaskStatus::PendingApproval, &*self.clock)
                {
                    return WebhookOutcome::StoreFailure(err.to_string());
                }
                if let Err(err) = self.store.update_task(&task).await {
                    return WebhookOutcome::StoreFailure(err.to_string());
                }
                info!(%task_id, pull_request_number, "task moved to pending approval");
                WebhookOutcome::Flipped {
                    task_id,
                    pull_request_number,
                }
            }
            other => WebhookOutcome::UnknownTask(format!(
                "task {task_id} is in status {other}, expected in_progress"
            )),
        }
    }
}
