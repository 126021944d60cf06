//! Apply-to-task orchestration: signed off-chain application, assignment
//! record, status flip to applied.

use super::flow::{DiscardSteps, FailureKind, FlowError, StepSink};
use crate::task::domain::{
    ApplicationMessage, DeveloperAssignment, GithubLogin, TaskId, TaskStatus, WalletAddress,
    application_max_age,
};
use crate::task::ports::{SignatureVerifier, TaskStore};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;

/// Request payload for applying to a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyRequest {
    /// Task the developer applies to.
    pub task_id: TaskId,
    /// Wallet address the application binds.
    pub wallet_address: WalletAddress,
    /// GitHub login used for workspace access and PR authorship checks.
    pub github_login: GithubLogin,
    /// Hex signature over the canonical application message.
    pub signature_hex: String,
    /// Timestamp embedded in the signed message.
    pub signed_at: DateTime<Utc>,
}

/// Step union of the apply flow. No blockchain transaction occurs here;
/// escrow commitment happens at acceptance, not application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyStep {
    /// Awaiting confirmation; nothing has been verified yet.
    Confirm,
    /// Verifying the off-chain signature.
    Signing,
    /// Recording the assignment and flipping the task to applied.
    Submitting,
    /// Flow finished; the developer awaits the client's decision.
    Success,
    /// Flow terminated with an error.
    Failed {
        /// Failure category fixed at the point of failure.
        kind: FailureKind,
        /// Human-readable detail.
        message: String,
    },
}

/// Events the apply reducer consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyEvent {
    /// The caller confirmed the application.
    Confirmed,
    /// The signature verified against the claimed wallet.
    SignatureVerified,
    /// The assignment was recorded and the status flipped.
    AssignmentRecorded,
    /// A step failed.
    Failed(FlowError),
    /// Manual retry: return to the initial step.
    Reset,
}

impl ApplyStep {
    /// Single reducer for the apply flow.
    #[must_use]
    pub fn apply(self, event: ApplyEvent) -> Self {
        match (self, event) {
            (_, ApplyEvent::Failed(err)) => Self::Failed {
                kind: err.kind,
                message: err.message,
            },
            (Self::Failed { .. }, ApplyEvent::Reset) => Self::Confirm,
            (Self::Confirm, ApplyEvent::Confirmed) => Self::Signing,
            (Self::Signing, ApplyEvent::SignatureVerified) => Self::Submitting,
            (Self::Submitting, ApplyEvent::AssignmentRecorded) => Self::Success,
            (step, _) => step,
        }
    }

    /// Returns true when abandoning the flow leaves no work in flight.
    #[must_use]
    pub const fn can_abandon(&self) -> bool {
        matches!(self, Self::Confirm | Self::Success | Self::Failed { .. })
    }

    /// Returns true when the flow has finished, successfully or not.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed { .. })
    }
}

/// Result of a successful apply flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Task the developer applied to.
    pub task_id: TaskId,
    /// Recorded assignment.
    pub assignment: DeveloperAssignment,
}

/// Apply-to-task orchestrator.
#[derive(Clone)]
pub struct ApplyService<S, V, C>
where
    S: TaskStore,
    V: SignatureVerifier,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    verifier: Arc<V>,
    clock: Arc<C>,
    sink: Arc<dyn StepSink<ApplyStep>>,
}

impl<S, V, C> ApplyService<S, V, C>
where
    S: TaskStore,
    V: SignatureVerifier,
    C: Clock + Send + Sync,
{
    /// Creates a service that discards progress updates.
    #[must_use]
    pub fn new(store: Arc<S>, verifier: Arc<V>, clock: Arc<C>) -> Self {
        Self {
            store,
            verifier,
            clock,
            sink: Arc::new(DiscardSteps),
        }
    }

    /// Replaces the progress sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn StepSink<ApplyStep>>) -> Self {
        self.sink = sink;
        self
    }

    fn advance(&self, step: &mut ApplyStep, event: ApplyEvent) {
        *step = step.clone().apply(event);
        self.sink.step_changed(step);
    }

    fn fail(&self, step: &mut ApplyStep, err: FlowError) -> FlowError {
        self.advance(step, ApplyEvent::Failed(err.clone()));
        err
    }

    /// Runs the apply flow.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] with the discriminant of the failing step:
    /// validation for a missing/closed task or stale signature, wallet for
    /// a signature mismatch, storage for persistence failures.
    pub async fn apply(&self, request: ApplyRequest) -> Result<ApplyOutcome, FlowError> {
        let mut step = ApplyStep::Confirm;
        self.sink.step_changed(&step);

        let message = ApplicationMessage::new(
            request.task_id,
            request.wallet_address.clone(),
            request.signed_at,
        );
        if !message.is_fresh(self.clock.utc(), application_max_age()) {
            let err = FlowError::validation("application signature is stale");
            return Err(self.fail(&mut step, err));
        }

        let mut task = match self.store.find_task(request.task_id).await {
            Ok(Some(task)) if !task.is_deleted() => task,
            Ok(_) => {
                let err = FlowError::not_found(format!("task {} not found", request.task_id));
                return Err(self.fail(&mut step, err));
            }
            Err(err) => return Err(self.fail(&mut step, err.into())),
        };
        if task.status() != TaskStatus::Open {
            let err = FlowError::validation(format!(
                "task {} is not open for applications",
                task.id()
            ));
            return Err(self.fail(&mut step, err));
        }
        self.advance(&mut step, ApplyEvent::Confirmed);

        if let Err(err) = self.verifier.verify(
            &message.canonical_text(),
            &request.signature_hex,
            &request.wallet_address,
        ) {
            return Err(self.fail(&mut step, err.into()));
        }
        self.advance(&mut step, ApplyEvent::SignatureVerified);

        let assignment = DeveloperAssignment::new(
            task.id(),
            request.wallet_address,
            request.github_login,
            &*self.clock,
        );
        if let Err(err) = self.store.assign_developer(&assignment).await {
            return Err(self.fail(&mut step, err.into()));
        }
        if let Err(err) = task.transition_to(TaskStatus::Applied, &*self.clock) {
            return Err(self.fail(&mut step, err.into()));
        }
        if let Err(err) = self.store.update_task(&task).await {
            return Err(self.fail(&mut step, err.into()));
        }
        self.advance(&mut step, ApplyEvent::AssignmentRecorded);

        Ok(ApplyOutcome {
            task_id: task.id(),
            assignment,
        })
    }
}
