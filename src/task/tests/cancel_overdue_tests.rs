//! Orchestration tests for cancellation/refund and the overdue sweep.

use super::helpers::FlowHarness;
use crate::task::domain::{
    ClientId, RepositoryName, Task, TaskDraft, TaskStatus, TransactionKind,
    TransactionOutcome, WeiAmount,
};
use crate::task::ports::TaskStore;
use eyre::{ensure, eyre};
use rstest::{fixture, rstest};

#[fixture]
fn harness() -> FlowHarness {
    FlowHarness::new()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancel_refunds_an_open_task(harness: FlowHarness) -> eyre::Result<()> {
    let created = harness.funded_open_task().await.map_err(|err| eyre!(err))?;

    let outcome = harness
        .cancel_service()
        .cancel(created.task_id, "no longer needed")
        .await
        .map_err(|err| eyre!(err))?;

    let task = harness
        .store
        .find_task(created.task_id)
        .await?
        .ok_or_else(|| eyre!("task row missing"))?;
    ensure!(task.status() == TaskStatus::Refunded);

    let records = harness.store.transactions_for_task(outcome.task_id).await?;
    ensure!(
        records
            .iter()
            .any(|record| record.kind() == TransactionKind::Cancel
                && record.outcome() == TransactionOutcome::Confirmed)
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancel_tears_down_the_workspace(harness: FlowHarness) -> eyre::Result<()> {
    let created = harness.in_progress_task().await.map_err(|err| eyre!(err))?;
    let name = RepositoryName::for_task(created.task_id);

    harness
        .cancel_service()
        .cancel(created.task_id, "scope changed")
        .await
        .map_err(|err| eyre!(err))?;

    ensure!(harness.store.find_workspace(created.task_id).await?.is_none());
    ensure!(harness.forge.collaborators_of(&name).is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancel_rejects_completed_tasks(harness: FlowHarness) -> eyre::Result<()> {
    let created = harness
        .pending_approval_task(1)
        .await
        .map_err(|err| eyre!(err))?;
    harness
        .completion_service()
        .approve(created.task_id)
        .await
        .map_err(|err| eyre!(err))?;

    let result = harness
        .cancel_service()
        .cancel(created.task_id, "too late")
        .await;

    ensure!(result.is_err(), "completed tasks cannot be cancelled");
    Ok(())
}

/// Stores an in-progress task with a deadline in the past, bypassing the
/// create-flow deadline validation the way a task naturally ages.
async fn store_expired_in_progress_task(
    harness: &FlowHarness,
    allow_overdue: bool,
) -> eyre::Result<Task> {
    let draft = TaskDraft::new(
        "Aged task",
        WeiAmount::from_ether("0.05").map_err(|err| eyre!(err))?,
        chrono::Utc::now() - chrono::Duration::days(30),
        ClientId::new(),
    )
    .map_err(|err| eyre!(err))?
    .with_allow_overdue(allow_overdue);
    let mut task = Task::new(draft, &*harness.clock);
    task.transition_to(TaskStatus::Applied, &*harness.clock)
        .map_err(|err| eyre!(err))?;
    task.transition_to(TaskStatus::InProgress, &*harness.clock)
        .map_err(|err| eyre!(err))?;
    harness.store.create_task(&task).await?;
    Ok(task)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sweep_flips_expired_in_progress_tasks(harness: FlowHarness) -> eyre::Result<()> {
    let expired = store_expired_in_progress_task(&harness, false).await?;
    let fresh = harness.in_progress_task().await.map_err(|err| eyre!(err))?;

    let report = harness.sweep_service().sweep().await.map_err(|err| eyre!(err))?;

    ensure!(report.flipped == 1, "got {report:?}");
    let aged = harness
        .store
        .find_task(expired.id())
        .await?
        .ok_or_else(|| eyre!("aged task missing"))?;
    ensure!(aged.status() == TaskStatus::Overdue);

    let untouched = harness
        .store
        .find_task(fresh.task_id)
        .await?
        .ok_or_else(|| eyre!("fresh task missing"))?;
    ensure!(untouched.status() == TaskStatus::InProgress);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sweep_is_idempotent(harness: FlowHarness) -> eyre::Result<()> {
    store_expired_in_progress_task(&harness, false).await?;

    let first = harness.sweep_service().sweep().await.map_err(|err| eyre!(err))?;
    let second = harness.sweep_service().sweep().await.map_err(|err| eyre!(err))?;

    ensure!(first.flipped == 1);
    ensure!(second.flipped == 0, "second run makes no further mutation");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sweep_honours_the_overdue_grace_period(harness: FlowHarness) -> eyre::Result<()> {
    // Deadline 30 days past but the simulator's overdue period is 7 days,
    // so even a lenient task has exhausted its grace window.
    let lenient = store_expired_in_progress_task(&harness, true).await?;

    let report = harness.sweep_service().sweep().await.map_err(|err| eyre!(err))?;

    ensure!(report.flipped == 1);
    let task = harness
        .store
        .find_task(lenient.id())
        .await?
        .ok_or_else(|| eyre!("task missing"))?;
    ensure!(task.status() == TaskStatus::Overdue);
    Ok(())
}
