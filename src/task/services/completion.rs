//! Code-review orchestration: approve, reject, or request revision on a
//! submitted pull request.
//!
//! Approval releases escrowed funds *before* the GitHub sub-steps run.
//! There is no compensating transaction if a sub-step fails afterwards;
//! failures are reported per sub-action and logged instead.

use super::flow::{DiscardSteps, FailureKind, FlowError, StepSink};
use crate::task::domain::{
    GithubLogin, RepositoryName, ReviewVerdict, Task, TaskId, TaskStatus, TransactionKind,
    TransactionRecord, TxHash,
};
use crate::task::ports::{EscrowContract, ForgeError, RepositoryForge, TaskStore};
use mockable::Clock;
use std::sync::Arc;
use tracing::{info, warn};

/// Step union of the approve flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApproveStep {
    /// Fund release submitted; awaiting the mined receipt.
    Blockchain,
    /// Recording the completed status.
    Database,
    /// Running the GitHub sub-actions (comment, merge, access transfer).
    Github,
    /// Flow finished; funds are released.
    Success,
    /// Flow terminated with an error.
    Failed {
        /// Failure category fixed at the point of failure.
        kind: FailureKind,
        /// Human-readable detail.
        message: String,
    },
}

/// Events the approve reducer consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApproveEvent {
    /// The fund-release receipt confirmed.
    TransactionConfirmed,
    /// The completed status was recorded.
    TaskCompleted,
    /// The GitHub sub-actions finished (possibly with partial failures).
    GithubFinished,
    /// A step failed.
    Failed(FlowError),
    /// Manual retry: return to the initial step.
    Reset,
}

impl ApproveStep {
    /// Single reducer for the approve flow.
    #[must_use]
    pub fn apply(self, event: ApproveEvent) -> Self {
        match (self, event) {
            (_, ApproveEvent::Failed(err)) => Self::Failed {
                kind: err.kind,
                message: err.message,
            },
            (Self::Failed { .. }, ApproveEvent::Reset) => Self::Blockchain,
            (Self::Blockchain, ApproveEvent::TransactionConfirmed) => Self::Database,
            (Self::Database, ApproveEvent::TaskCompleted) => Self::Github,
            (Self::Github, ApproveEvent::GithubFinished) => Self::Success,
            (step, _) => step,
        }
    }

    /// Returns true when abandoning the flow leaves no work in flight.
    #[must_use]
    pub const fn can_abandon(&self) -> bool {
        matches!(self, Self::Success | Self::Failed { .. })
    }

    /// Returns true when the flow has finished, successfully or not.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed { .. })
    }
}

/// Step union shared by the database-only review updates (reject and
/// revision request).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewUpdateStep {
    /// Recording the status change.
    Database,
    /// Flow finished.
    Success,
    /// Flow terminated with an error.
    Failed {
        /// Failure category fixed at the point of failure.
        kind: FailureKind,
        /// Human-readable detail.
        message: String,
    },
}

/// Outcome of one GitHub sub-action within the approve flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubActionResult {
    /// The sub-action completed.
    Completed,
    /// The sub-action failed after funds were already released.
    Failed(ForgeError),
}

impl SubActionResult {
    /// Returns true when the sub-action completed.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Aggregate report of the approve flow's GitHub step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubReport {
    /// Approval comment on the pull request.
    pub comment: SubActionResult,
    /// Pull request merge.
    pub merge: SubActionResult,
    /// Repository access transfer from developer to client.
    pub transfer: SubActionResult,
}

impl GithubReport {
    /// Returns true when every sub-action completed.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.comment.is_completed() && self.merge.is_completed() && self.transfer.is_completed()
    }
}

/// Result of a successful approve flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApproveOutcome {
    /// Completed task.
    pub task_id: TaskId,
    /// Hash of the confirmed fund-release transaction.
    pub tx_hash: TxHash,
    /// Per-sub-action GitHub report.
    pub github: GithubReport,
}

/// Code-review orchestrator.
#[derive(Clone)]
pub struct CompletionService<S, E, F, C>
where
    S: TaskStore,
    E: EscrowContract,
    F: RepositoryForge,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    escrow: Arc<E>,
    forge: Arc<F>,
    clock: Arc<C>,
    client_login: GithubLogin,
    approve_sink: Arc<dyn StepSink<ApproveStep>>,
    update_sink: Arc<dyn StepSink<ReviewUpdateStep>>,
}

impl<S, E, F, C> CompletionService<S, E, F, C>
where
    S: TaskStore,
    E: EscrowContract,
    F: RepositoryForge,
    C: Clock + Send + Sync,
{
    /// Creates a service that discards progress updates.
    ///
    /// `client_login` is the GitHub account that receives repository
    /// access when a task completes.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        escrow: Arc<E>,
        forge: Arc<F>,
        clock: Arc<C>,
        client_login: GithubLogin,
    ) -> Self {
        Self {
            store,
            escrow,
            forge,
            clock,
            client_login,
            approve_sink: Arc::new(DiscardSteps),
            update_sink: Arc::new(DiscardSteps),
        }
    }

    /// Replaces the approve-flow progress sink.
    #[must_use]
    pub fn with_approve_sink(mut self, sink: Arc<dyn StepSink<ApproveStep>>) -> Self {
        self.approve_sink = sink;
        self
    }

    /// Replaces the reject/revision progress sink.
    #[must_use]
    pub fn with_update_sink(mut self, sink: Arc<dyn StepSink<ReviewUpdateStep>>) -> Self {
        self.update_sink = sink;
        self
    }

    fn advance(&self, step: &mut ApproveStep, event: ApproveEvent) {
        *step = step.clone().apply(event);
        self.approve_sink.step_changed(step);
    }

    fn fail(&self, step: &mut ApproveStep, err: FlowError) -> FlowError {
        self.advance(step, ApproveEvent::Failed(err.clone()));
        err
    }

    fn emit_update(&self, step: &ReviewUpdateStep) {
        self.update_sink.step_changed(step);
    }

    fn fail_update(&self, err: FlowError) -> FlowError {
        self.emit_update(&ReviewUpdateStep::Failed {
            kind: err.kind,
            message: err.message.clone(),
        });
        err
    }

    /// Runs the approve flow: release funds, record completion, then run
    /// the three GitHub sub-actions sequentially.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when the release or the completion record
    /// fails. GitHub sub-action failures after the release do not fail the
    /// flow; they surface in [`ApproveOutcome::github`].
    pub async fn approve(&self, task_id: TaskId) -> Result<ApproveOutcome, FlowError> {
        let mut step = ApproveStep::Blockchain;
        self.approve_sink.step_changed(&step);

        let review = match self.load_review_context(task_id).await {
            Ok(review) => review,
            Err(err) => return Err(self.fail(&mut step, err)),
        };
        let ReviewContext {
            mut task,
            contract_task_id,
            repository_name,
            developer_login,
            pull_request_number,
        } = review;

        let tx_hash = match self.escrow.complete_task(contract_task_id).await {
            Ok(hash) => hash,
            Err(err) => return Err(self.fail(&mut step, err.into())),
        };
        let receipt = match self.escrow.wait_for_receipt(&tx_hash).await {
            Ok(receipt) => receipt,
            Err(err) => {
                self.record_release_attempt(&task, Some(tx_hash), false).await;
                return Err(self.fail(&mut step, err.into()));
            }
        };
        if !receipt.success {
            self.record_release_attempt(&task, Some(tx_hash.clone()), false)
                .await;
            let err = FlowError::new(
                FailureKind::Contract,
                format!("fund release reverted: {tx_hash}"),
            );
            return Err(self.fail(&mut step, err));
        }
        self.record_release_attempt(&task, Some(tx_hash.clone()), true)
            .await;
        self.advance(&mut step, ApproveEvent::TransactionConfirmed);

        if let Err(err) = task.transition_to(TaskStatus::Completed, &*self.clock) {
            return Err(self.fail(&mut step, err.into()));
        }
        if let Err(err) = self.store.update_task(&task).await {
            warn!(
                %task_id,
                tx_hash = %tx_hash,
                "funds released on chain but the completed status was not recorded"
            );
            return Err(self.fail(&mut step, err.into()));
        }
        self.advance(&mut step, ApproveEvent::TaskCompleted);

        let github = self
            .run_github_sub_actions(
                task_id,
                &repository_name,
                pull_request_number,
                &developer_login,
            )
            .await;
        self.advance(&mut step, ApproveEvent::GithubFinished);
        info!(%task_id, clean = github.is_clean(), "task approved and funds released");

        Ok(ApproveOutcome {
            task_id,
            tx_hash,
            github,
        })
    }

    /// Runs the reject flow: database-only cancellation plus a best-effort
    /// rejection comment. No on-chain call is wired into this path.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when the task is not pending approval or the
    /// store fails.
    pub async fn reject(
        &self,
        task_id: TaskId,
        reason: Option<String>,
    ) -> Result<(), FlowError> {
        self.emit_update(&ReviewUpdateStep::Database);

        let review = match self.load_review_context(task_id).await {
            Ok(review) => review,
            Err(err) => return Err(self.fail_update(err)),
        };
        let ReviewContext {
            mut task,
            repository_name,
            pull_request_number,
            ..
        } = review;

        if let Err(err) = task.transition_to(TaskStatus::Cancelled, &*self.clock) {
            return Err(self.fail_update(err.into()));
        }
        if let Err(err) = self.store.update_task(&task).await {
            return Err(self.fail_update(err.into()));
        }

        let verdict = ReviewVerdict::Rejected { reason };
        if let Err(err) = self
            .forge
            .post_review_comment(&repository_name, pull_request_number, &verdict)
            .await
        {
            warn!(%task_id, error = %err, "rejection recorded but the PR comment failed");
        }
        self.emit_update(&ReviewUpdateStep::Success);
        info!(%task_id, "submission rejected; task cancelled");
        Ok(())
    }

    /// Runs the revision flow: records feedback and returns the task to
    /// in-progress. Funds and repository access are unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when the task is not pending approval or the
    /// store fails.
    pub async fn request_revision(
        &self,
        task_id: TaskId,
        feedback: String,
    ) -> Result<(), FlowError> {
        self.emit_update(&ReviewUpdateStep::Database);

        let review = match self.load_review_context(task_id).await {
            Ok(review) => review,
            Err(err) => return Err(self.fail_update(err)),
        };
        let ReviewContext {
            mut task,
            repository_name,
            pull_request_number,
            ..
        } = review;

        if let Err(err) = self.store.record_review_feedback(task_id, &feedback).await {
            return Err(self.fail_update(err.into()));
        }
        if let Err(err) = task.transition_to(TaskStatus::InProgress, &*self.clock) {
            return Err(self.fail_update(err.into()));
        }
        if let Err(err) = self.store.update_task(&task).await {
            return Err(self.fail_update(err.into()));
        }

        let verdict = ReviewVerdict::RevisionRequested { feedback };
        if let Err(err) = self
            .forge
            .post_review_comment(&repository_name, pull_request_number, &verdict)
            .await
        {
            warn!(%task_id, error = %err, "revision recorded but the PR comment failed");
        }
        self.emit_update(&ReviewUpdateStep::Success);
        info!(%task_id, "revision requested; task back in progress");
        Ok(())
    }

    async fn run_github_sub_actions(
        &self,
        task_id: TaskId,
        repository_name: &RepositoryName,
        pull_request_number: u64,
        developer_login: &GithubLogin,
    ) -> GithubReport {
        let comment = self
            .forge
            .post_review_comment(repository_name, pull_request_number, &ReviewVerdict::Approved)
            .await;
        let merge = self
            .forge
            .merge_pull_request(repository_name, pull_request_number)
            .await;
        let transfer = self
            .forge
            .transfer_access(repository_name, developer_login, &self.client_login)
            .await;

        let to_result = |outcome: Result<(), ForgeError>, action: &str| match outcome {
            Ok(()) => SubActionResult::Completed,
            Err(err) => {
                warn!(
                    %task_id,
                    action,
                    error = %err,
                    "github sub-action failed after funds were released"
                );
                SubActionResult::Failed(err)
            }
        };
        GithubReport {
            comment: to_result(comment, "comment"),
            merge: to_result(merge, "merge"),
            transfer: to_result(transfer, "transfer"),
        }
    }

    async fn load_review_context(&self, task_id: TaskId) -> Result<ReviewContext, FlowError> {
        let task = match self.store.find_task(task_id).await? {
            Some(task) if !task.is_deleted() => task,
            _ => return Err(FlowError::not_found(format!("task {task_id} not found"))),
        };
        if task.status() != TaskStatus::PendingApproval {
            return Err(FlowError::validation(format!(
                "task {task_id} has no submission awaiting review"
            )));
        }
        let Some(contract_task_id) = task.contract_task_id() else {
            return Err(FlowError::validation(format!(
                "task {task_id} has no escrow contract backing"
            )));
        };
        let Some(pull_request_number) = task.pull_request_number() else {
            return Err(FlowError::validation(format!(
                "task {task_id} has no recorded pull request"
            )));
        };
        let workspace = match self.store.find_workspace(task_id).await? {
            Some(workspace) => workspace,
            None => {
                return Err(FlowError::validation(format!(
                    "task {task_id} has no provisioned workspace"
                )));
            }
        };
        let assignment = match self.store.find_assignment(task_id).await? {
            Some(assignment) => assignment,
            None => {
                return Err(FlowError::validation(format!(
                    "task {task_id} has no assigned developer"
                )));
            }
        };
        Ok(ReviewContext {
            task,
            contract_task_id,
            repository_name: workspace.repository_name().clone(),
            developer_login: assignment.github_login().clone(),
            pull_request_number,
        })
    }

    async fn record_release_attempt(
        &self,
        task: &Task,
        tx_hash: Option<TxHash>,
        confirmed: bool,
    ) {
        let record = if confirmed {
            match tx_hash {
                Some(hash) => TransactionRecord::confirmed(
                    task.id(),
                    TransactionKind::Complete,
                    task.value_in_wei(),
                    hash,
                    self.escrow.network_id(),
                    &*self.clock,
                ),
                None => return,
            }
        } else {
            TransactionRecord::failed(
                task.id(),
                TransactionKind::Complete,
                task.value_in_wei(),
                tx_hash,
                self.escrow.network_id(),
                &*self.clock,
            )
        };
        if let Err(err) = self.store.record_transaction(&record).await {
            warn!(task_id = %task.id(), error = %err, "failed to append release audit record");
        }
    }
}

/// Everything the review flows need about a pending-approval task.
struct ReviewContext {
    task: Task,
    contract_task_id: u64,
    repository_name: RepositoryName,
    developer_login: GithubLogin,
    pull_request_number: u64,
}
