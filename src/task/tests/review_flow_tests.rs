//! Orchestration tests for developer acceptance and rejection.

use super::helpers::{DEV_LOGIN, DEV_WALLET, FlowHarness};
use crate::task::domain::{RepositoryName, TaskStatus, TransactionKind, TransactionOutcome};
use crate::task::ports::{ForgeError, TaskStore};
use crate::task::services::{AcceptStep, FailureKind, FlowError, RecordingSink, StepSink};
use eyre::{ensure, eyre};
use rstest::{fixture, rstest};
use std::sync::Arc;

#[fixture]
fn harness() -> FlowHarness {
    FlowHarness::new()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn accept_commits_escrow_and_provisions_workspace(
    harness: FlowHarness,
) -> eyre::Result<()> {
    let created = harness.applied_task().await.map_err(|err| eyre!(err))?;

    let outcome = harness
        .review_service()
        .accept(created.task_id)
        .await
        .map_err(|err| eyre!(err))?;

    let task = harness
        .store
        .find_task(created.task_id)
        .await?
        .ok_or_else(|| eyre!("task row missing"))?;
    ensure!(task.status() == TaskStatus::InProgress);

    let accepted = harness.escrow.accepted_developer_for(created.contract_task_id);
    ensure!(accepted.as_ref().map(|wallet| wallet.as_str().to_owned()) == Some(DEV_WALLET.to_owned()));

    let expected_name = RepositoryName::for_task(created.task_id);
    ensure!(outcome.repository.name == expected_name);
    let collaborators = harness.forge.collaborators_of(&expected_name);
    ensure!(collaborators.iter().any(|login| login.as_str() == DEV_LOGIN));

    let workspace = harness
        .store
        .find_workspace(created.task_id)
        .await?
        .ok_or_else(|| eyre!("workspace mirror missing"))?;
    ensure!(workspace.repository_name() == &expected_name);

    let records = harness.store.transactions_for_task(created.task_id).await?;
    ensure!(
        records
            .iter()
            .any(|record| record.kind() == TransactionKind::Accept
                && record.outcome() == TransactionOutcome::Confirmed)
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn accept_reports_blockchain_before_database(harness: FlowHarness) -> eyre::Result<()> {
    let created = harness.applied_task().await.map_err(|err| eyre!(err))?;
    let sink: Arc<RecordingSink<AcceptStep>> = Arc::new(RecordingSink::new());
    let service = harness
        .review_service()
        .with_accept_sink(Arc::clone(&sink) as Arc<dyn StepSink<AcceptStep>>);

    service
        .accept(created.task_id)
        .await
        .map_err(|err| eyre!(err))?;

    let steps = sink.steps();
    ensure!(
        steps
            == vec![
                AcceptStep::Confirm,
                AcceptStep::Blockchain,
                AcceptStep::Database,
                AcceptStep::Success,
            ],
        "got {steps:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn forge_failure_after_confirmed_receipt_leaves_documented_window(
    harness: FlowHarness,
) -> eyre::Result<()> {
    let created = harness.applied_task().await.map_err(|err| eyre!(err))?;
    harness
        .forge
        .fail_next_operation(ForgeError::Permission("installation suspended".to_owned()));

    let result = harness.review_service().accept(created.task_id).await;

    let err = match result {
        Err(err) => err,
        Ok(_) => return Err(eyre!("expected workspace provisioning to fail")),
    };
    ensure!(err.kind == FailureKind::Permission);

    // On-chain acceptance happened; no workspace exists; the task is still
    // applied. This is the documented inconsistency window.
    ensure!(
        harness
            .escrow
            .accepted_developer_for(created.contract_task_id)
            .is_some()
    );
    ensure!(harness.store.find_workspace(created.task_id).await?.is_none());
    let task = harness
        .store
        .find_task(created.task_id)
        .await?
        .ok_or_else(|| eyre!("task row missing"))?;
    ensure!(task.status() == TaskStatus::Applied);

    // The audit trail still records the confirmed chain operation.
    let records = harness.store.transactions_for_task(created.task_id).await?;
    ensure!(
        records
            .iter()
            .any(|record| record.kind() == TransactionKind::Accept
                && record.outcome() == TransactionOutcome::Confirmed)
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reject_reopens_task_without_touching_escrow(
    harness: FlowHarness,
) -> eyre::Result<()> {
    let created = harness.applied_task().await.map_err(|err| eyre!(err))?;

    harness
        .review_service()
        .reject(created.task_id)
        .await
        .map_err(|err| eyre!(err))?;

    let task = harness
        .store
        .find_task(created.task_id)
        .await?
        .ok_or_else(|| eyre!("task row missing"))?;
    ensure!(task.status() == TaskStatus::Open, "task is visible to other developers");
    ensure!(harness.store.find_assignment(created.task_id).await?.is_none());

    // Escrowed funds remain untouched and uncommitted.
    ensure!(
        harness.escrow.deposit_for(created.contract_task_id) == Some(created.deposit)
    );
    ensure!(
        harness
            .escrow
            .accepted_developer_for(created.contract_task_id)
            .is_none()
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn accept_without_application_is_rejected(harness: FlowHarness) -> eyre::Result<()> {
    let created = harness.funded_open_task().await.map_err(|err| eyre!(err))?;

    let result = harness.review_service().accept(created.task_id).await;

    ensure!(matches!(
        result,
        Err(FlowError {
            kind: FailureKind::Validation,
            ..
        })
    ));
    Ok(())
}
