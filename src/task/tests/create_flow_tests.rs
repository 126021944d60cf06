//! Orchestration tests for the create-task flow.

use super::helpers::FlowHarness;
use crate::task::domain::{
    ClientId, TaskStatus, TransactionKind, TransactionOutcome, WeiAmount,
};
use crate::task::ports::{EscrowError, TaskStore};
use crate::task::services::{
    CreateTaskEvent, CreateTaskRequest, CreateTaskStep, FailureKind, FlowError, RecordingSink,
    StepSink,
};
use chrono::{Duration, Utc};
use eyre::{ensure, eyre};
use rstest::{fixture, rstest};
use std::sync::Arc;

#[fixture]
fn harness() -> FlowHarness {
    FlowHarness::new()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_funds_escrow_with_three_percent_fee(harness: FlowHarness) -> eyre::Result<()> {
    let outcome = harness.funded_open_task().await.map_err(|err| eyre!(err))?;

    ensure!(outcome.deposit.to_ether_string() == "0.0515");
    ensure!(
        harness.escrow.deposit_for(outcome.contract_task_id) == Some(outcome.deposit),
        "escrow holds the full deposit"
    );

    let task = harness
        .store
        .find_task(outcome.task_id)
        .await?
        .ok_or_else(|| eyre!("task row missing"))?;
    ensure!(task.status() == TaskStatus::Open, "status stays open until acceptance");
    ensure!(task.contract_task_id() == Some(outcome.contract_task_id));
    ensure!(task.contract_tx_hash() == Some(&outcome.tx_hash));

    let records = harness.store.transactions_for_task(outcome.task_id).await?;
    ensure!(records.len() == 1);
    let record = records.first().ok_or_else(|| eyre!("no audit record"))?;
    ensure!(record.kind() == TransactionKind::Create);
    ensure!(record.outcome() == TransactionOutcome::Confirmed);
    ensure!(record.value_in_wei() == outcome.deposit);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_reports_every_step_in_order(harness: FlowHarness) -> eyre::Result<()> {
    let sink: Arc<RecordingSink<CreateTaskStep>> = Arc::new(RecordingSink::new());
    let service = harness
        .create_service()
        .with_sink(Arc::clone(&sink) as Arc<dyn StepSink<CreateTaskStep>>);

    service
        .create(harness.create_request())
        .await
        .map_err(|err| eyre!(err))?;

    let steps = sink.steps();
    ensure!(
        steps
            == vec![
                CreateTaskStep::Form,
                CreateTaskStep::Confirm,
                CreateTaskStep::Database,
                CreateTaskStep::Blockchain,
                CreateTaskStep::DatabaseTx,
                CreateTaskStep::Success,
            ],
        "got {steps:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_rejects_value_below_contract_minimum(harness: FlowHarness) {
    let request = CreateTaskRequest::new(
        "Tiny task",
        WeiAmount::from_wei(10),
        Utc::now() + Duration::days(1),
        ClientId::new(),
    );
    let result = harness.create_service().create(request).await;

    assert!(matches!(
        result,
        Err(FlowError {
            kind: FailureKind::Validation,
            ..
        })
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_rejects_past_deadline_before_any_remote_call(
    harness: FlowHarness,
) -> eyre::Result<()> {
    let request = CreateTaskRequest::new(
        "Expired",
        WeiAmount::from_ether("0.05").map_err(|err| eyre!(err))?,
        Utc::now() - Duration::hours(1),
        ClientId::new(),
    );
    let result = harness.create_service().create(request).await;

    ensure!(matches!(
        result,
        Err(FlowError {
            kind: FailureKind::Validation,
            ..
        })
    ));
    let open = harness.store.tasks_in_status(TaskStatus::Open).await?;
    ensure!(open.is_empty(), "no row is written on validation failure");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn escrow_failure_leaves_orphaned_open_row(harness: FlowHarness) -> eyre::Result<()> {
    harness
        .escrow
        .fail_next_submission(EscrowError::WalletRejected("user denied".to_owned()));

    let result = harness.create_service().create(harness.create_request()).await;

    let err = match result {
        Err(err) => err,
        Ok(_) => return Err(eyre!("expected the funding step to fail")),
    };
    ensure!(err.kind == FailureKind::Wallet);

    // The database row written before the funding attempt is deliberately
    // not rolled back.
    let open = harness.store.tasks_in_status(TaskStatus::Open).await?;
    ensure!(open.len() == 1);
    let orphan = open.first().ok_or_else(|| eyre!("orphan row missing"))?;
    ensure!(orphan.contract_tx_hash().is_none());
    ensure!(orphan.contract_task_id().is_none());
    Ok(())
}

#[rstest]
fn reducer_ignores_events_that_do_not_apply() {
    let step = CreateTaskStep::Form.apply(CreateTaskEvent::TransactionConfirmed);
    assert_eq!(step, CreateTaskStep::Form);
}

#[rstest]
fn reducer_resets_only_from_failure() {
    let failed = CreateTaskStep::Form.apply(CreateTaskEvent::Failed(FlowError::validation(
        "bad input",
    )));
    assert!(matches!(failed, CreateTaskStep::Failed { .. }));

    let reset = failed.apply(CreateTaskEvent::Reset);
    assert_eq!(reset, CreateTaskStep::Form);

    let not_reset = CreateTaskStep::Blockchain.apply(CreateTaskEvent::Reset);
    assert_eq!(not_reset, CreateTaskStep::Blockchain);
}

#[rstest]
#[case(CreateTaskStep::Form, true)]
#[case(CreateTaskStep::Confirm, true)]
#[case(CreateTaskStep::Database, false)]
#[case(CreateTaskStep::Blockchain, false)]
#[case(CreateTaskStep::DatabaseTx, false)]
#[case(CreateTaskStep::Success, true)]
fn can_abandon_blocks_mid_flow_steps(#[case] step: CreateTaskStep, #[case] expected: bool) {
    assert_eq!(step.can_abandon(), expected);
}
