//! Shared harness wiring the in-memory adapters into the orchestrators.

use crate::task::adapters::memory::{
    InMemoryEscrow, InMemoryForge, InMemorySignatureVerifier, InMemoryTaskStore,
};
use crate::task::domain::{
    ApplicationMessage, ClientId, GithubLogin, TaskId, TaskStatus, WalletAddress, WeiAmount,
};
use crate::task::ports::TaskStore;
use crate::task::services::{
    ApplyRequest, ApplyService, CancelTaskService, CompletionService, CreateTaskOutcome,
    CreateTaskRequest, CreateTaskService, DeveloperReviewService, FlowError,
    OverdueSweepService,
};
use chrono::{Duration, Utc};
use mockable::DefaultClock;
use std::sync::Arc;

/// Developer wallet used across flow tests.
pub const DEV_WALLET: &str = "0xde709f2102306220921060314715629080e2fb77";

/// Developer GitHub login used across flow tests.
pub const DEV_LOGIN: &str = "octocat";

/// Client GitHub login receiving repository access on completion.
pub const CLIENT_LOGIN: &str = "gitfreelas-admin";

/// In-memory adapter set plus service constructors.
pub struct FlowHarness {
    pub store: Arc<InMemoryTaskStore>,
    pub escrow: Arc<InMemoryEscrow>,
    pub forge: Arc<InMemoryForge>,
    pub verifier: Arc<InMemorySignatureVerifier>,
    pub clock: Arc<DefaultClock>,
}

impl Default for FlowHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowHarness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryTaskStore::new()),
            escrow: Arc::new(InMemoryEscrow::new()),
            forge: Arc::new(InMemoryForge::new()),
            verifier: Arc::new(InMemorySignatureVerifier::new()),
            clock: Arc::new(DefaultClock),
        }
    }

    pub fn create_service(
        &self,
    ) -> CreateTaskService<InMemoryTaskStore, InMemoryEscrow, DefaultClock> {
        CreateTaskService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.escrow),
            Arc::clone(&self.clock),
        )
    }

    pub fn apply_service(
        &self,
    ) -> ApplyService<InMemoryTaskStore, InMemorySignatureVerifier, DefaultClock> {
        ApplyService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.verifier),
            Arc::clone(&self.clock),
        )
    }

    pub fn review_service(
        &self,
    ) -> DeveloperReviewService<InMemoryTaskStore, InMemoryEscrow, InMemoryForge, DefaultClock>
    {
        DeveloperReviewService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.escrow),
            Arc::clone(&self.forge),
            Arc::clone(&self.clock),
        )
    }

    pub fn completion_service(
        &self,
    ) -> CompletionService<InMemoryTaskStore, InMemoryEscrow, InMemoryForge, DefaultClock>
    {
        CompletionService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.escrow),
            Arc::clone(&self.forge),
            Arc::clone(&self.clock),
            GithubLogin::new(CLIENT_LOGIN).expect("client login is well-formed"),
        )
    }

    pub fn cancel_service(
        &self,
    ) -> CancelTaskService<InMemoryTaskStore, InMemoryEscrow, InMemoryForge, DefaultClock>
    {
        CancelTaskService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.escrow),
            Arc::clone(&self.forge),
            Arc::clone(&self.clock),
        )
    }

    pub fn sweep_service(
        &self,
    ) -> OverdueSweepService<InMemoryTaskStore, InMemoryEscrow, DefaultClock> {
        OverdueSweepService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.escrow),
            Arc::clone(&self.clock),
        )
    }

    /// Standard create request: 0.05 ether, one-week deadline.
    pub fn create_request(&self) -> CreateTaskRequest {
        CreateTaskRequest::new(
            "Implement CSV export",
            WeiAmount::from_ether("0.05").expect("amount is well-formed"),
            Utc::now() + Duration::days(7),
            ClientId::new(),
        )
        .with_description("Export reports as CSV")
        .with_requirements("Tests included")
    }

    /// Runs the create flow to a funded open task.
    pub async fn funded_open_task(&self) -> Result<CreateTaskOutcome, FlowError> {
        self.create_service().create(self.create_request()).await
    }

    /// Builds a signed application for the standard developer.
    pub fn application_for(&self, task_id: TaskId) -> ApplyRequest {
        let wallet = WalletAddress::new(DEV_WALLET).expect("wallet is well-formed");
        let signed_at = Utc::now();
        let message = ApplicationMessage::new(task_id, wallet.clone(), signed_at);
        let signature_hex = InMemorySignatureVerifier::sign(&message.canonical_text(), &wallet);
        ApplyRequest {
            task_id,
            wallet_address: wallet,
            github_login: GithubLogin::new(DEV_LOGIN).expect("login is well-formed"),
            signature_hex,
            signed_at,
        }
    }

    /// Drives create + apply.
    pub async fn applied_task(&self) -> Result<CreateTaskOutcome, FlowError> {
        let outcome = self.funded_open_task().await?;
        self.apply_service()
            .apply(self.application_for(outcome.task_id))
            .await?;
        Ok(outcome)
    }

    /// Drives create + apply + accept.
    pub async fn in_progress_task(&self) -> Result<CreateTaskOutcome, FlowError> {
        let outcome = self.applied_task().await?;
        self.review_service().accept(outcome.task_id).await?;
        Ok(outcome)
    }

    /// Drives create + apply + accept, then records the pull request the
    /// way webhook ingestion does.
    pub async fn pending_approval_task(
        &self,
        pull_request_number: u64,
    ) -> Result<CreateTaskOutcome, FlowError> {
        let outcome = self.in_progress_task().await?;
        let mut task = self
            .store
            .find_task(outcome.task_id)
            .await?
            .ok_or_else(|| FlowError::not_found("task vanished"))?;
        task.record_pull_request(pull_request_number, &*self.clock)?;
        task.transition_to(TaskStatus::PendingApproval, &*self.clock)?;
        self.store.update_task(&task).await?;
        Ok(outcome)
    }
}
