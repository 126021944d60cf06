//! Unit tests for task status transition validation.

use crate::task::domain::{
    ClientId, Task, TaskDomainError, TaskDraft, TaskStatus, WeiAmount,
};
use chrono::{Duration, Utc};
use eyre::{bail, ensure};
use mockable::DefaultClock;
use rstest::{fixture, rstest};

const ALL_STATUSES: [TaskStatus; 8] = [
    TaskStatus::Open,
    TaskStatus::Applied,
    TaskStatus::InProgress,
    TaskStatus::PendingApproval,
    TaskStatus::Completed,
    TaskStatus::Cancelled,
    TaskStatus::Overdue,
    TaskStatus::Refunded,
];

#[fixture]
fn clock() -> DefaultClock {
    DefaultClock
}

#[fixture]
fn open_task(clock: DefaultClock) -> Result<Task, TaskDomainError> {
    let draft = TaskDraft::new(
        "Status transition test",
        WeiAmount::from_ether("0.05")?,
        Utc::now() + Duration::days(7),
        ClientId::new(),
    )?;
    Ok(Task::new(draft, &clock))
}

/// Drives a fresh task to the target status along valid edges.
fn task_in_status(
    mut task: Task,
    target: TaskStatus,
    clock: &DefaultClock,
) -> Result<Task, TaskDomainError> {
    let path: &[TaskStatus] = match target {
        TaskStatus::Open => &[],
        TaskStatus::Applied => &[TaskStatus::Applied],
        TaskStatus::InProgress => &[TaskStatus::Applied, TaskStatus::InProgress],
        TaskStatus::PendingApproval => &[
            TaskStatus::Applied,
            TaskStatus::InProgress,
            TaskStatus::PendingApproval,
        ],
        TaskStatus::Completed => &[
            TaskStatus::Applied,
            TaskStatus::InProgress,
            TaskStatus::PendingApproval,
            TaskStatus::Completed,
        ],
        TaskStatus::Cancelled => &[TaskStatus::Cancelled],
        TaskStatus::Overdue => &[
            TaskStatus::Applied,
            TaskStatus::InProgress,
            TaskStatus::Overdue,
        ],
        TaskStatus::Refunded => &[TaskStatus::Cancelled, TaskStatus::Refunded],
    };
    for status in path {
        task.transition_to(*status, clock)?;
    }
    Ok(task)
}

#[rstest]
#[case(TaskStatus::Open, TaskStatus::Open, false)]
#[case(TaskStatus::Open, TaskStatus::Applied, true)]
#[case(TaskStatus::Open, TaskStatus::InProgress, false)]
#[case(TaskStatus::Open, TaskStatus::PendingApproval, false)]
#[case(TaskStatus::Open, TaskStatus::Completed, false)]
#[case(TaskStatus::Open, TaskStatus::Cancelled, true)]
#[case(TaskStatus::Open, TaskStatus::Overdue, false)]
#[case(TaskStatus::Open, TaskStatus::Refunded, false)]
#[case(TaskStatus::Applied, TaskStatus::Open, true)]
#[case(TaskStatus::Applied, TaskStatus::Applied, false)]
#[case(TaskStatus::Applied, TaskStatus::InProgress, true)]
#[case(TaskStatus::Applied, TaskStatus::PendingApproval, false)]
#[case(TaskStatus::Applied, TaskStatus::Completed, false)]
#[case(TaskStatus::Applied, TaskStatus::Cancelled, false)]
#[case(TaskStatus::Applied, TaskStatus::Overdue, false)]
#[case(TaskStatus::Applied, TaskStatus::Refunded, false)]
#[case(TaskStatus::InProgress, TaskStatus::Open, false)]
#[case(TaskStatus::InProgress, TaskStatus::Applied, false)]
#[case(TaskStatus::InProgress, TaskStatus::InProgress, false)]
#[case(TaskStatus::InProgress, TaskStatus::PendingApproval, true)]
#[case(TaskStatus::InProgress, TaskStatus::Completed, false)]
#[case(TaskStatus::InProgress, TaskStatus::Cancelled, true)]
#[case(TaskStatus::InProgress, TaskStatus::Overdue, true)]
#[case(TaskStatus::InProgress, TaskStatus::Refunded, false)]
#[case(TaskStatus::PendingApproval, TaskStatus::Open, false)]
#[case(TaskStatus::PendingApproval, TaskStatus::Applied, false)]
#[case(TaskStatus::PendingApproval, TaskStatus::InProgress, true)]
#[case(TaskStatus::PendingApproval, TaskStatus::PendingApproval, false)]
#[case(TaskStatus::PendingApproval, TaskStatus::Completed, true)]
#[case(TaskStatus::PendingApproval, TaskStatus::Cancelled, true)]
#[case(TaskStatus::PendingApproval, TaskStatus::Overdue, false)]
#[case(TaskStatus::PendingApproval, TaskStatus::Refunded, false)]
#[case(TaskStatus::Completed, TaskStatus::Open, false)]
#[case(TaskStatus::Completed, TaskStatus::Applied, false)]
#[case(TaskStatus::Completed, TaskStatus::InProgress, false)]
#[case(TaskStatus::Completed, TaskStatus::PendingApproval, false)]
#[case(TaskStatus::Completed, TaskStatus::Completed, false)]
#[case(TaskStatus::Completed, TaskStatus::Cancelled, false)]
#[case(TaskStatus::Completed, TaskStatus::Overdue, false)]
#[case(TaskStatus::Completed, TaskStatus::Refunded, false)]
#[case(TaskStatus::Cancelled, TaskStatus::Open, false)]
#[case(TaskStatus::Cancelled, TaskStatus::Applied, false)]
#[case(TaskStatus::Cancelled, TaskStatus::InProgress, false)]
#[case(TaskStatus::Cancelled, TaskStatus::PendingApproval, false)]
#[case(TaskStatus::Cancelled, TaskStatus::Completed, false)]
#[case(TaskStatus::Cancelled, TaskStatus::Cancelled, false)]
#[case(TaskStatus::Cancelled, TaskStatus::Overdue, false)]
#[case(TaskStatus::Cancelled, TaskStatus::Refunded, true)]
#[case(TaskStatus::Overdue, TaskStatus::Open, false)]
#[case(TaskStatus::Overdue, TaskStatus::Applied, false)]
#[case(TaskStatus::Overdue, TaskStatus::InProgress, false)]
#[case(TaskStatus::Overdue, TaskStatus::PendingApproval, false)]
#[case(TaskStatus::Overdue, TaskStatus::Completed, false)]
#[case(TaskStatus::Overdue, TaskStatus::Cancelled, false)]
#[case(TaskStatus::Overdue, TaskStatus::Overdue, false)]
#[case(TaskStatus::Overdue, TaskStatus::Refunded, true)]
#[case(TaskStatus::Refunded, TaskStatus::Open, false)]
#[case(TaskStatus::Refunded, TaskStatus::Applied, false)]
#[case(TaskStatus::Refunded, TaskStatus::InProgress, false)]
#[case(TaskStatus::Refunded, TaskStatus::PendingApproval, false)]
#[case(TaskStatus::Refunded, TaskStatus::Completed, false)]
#[case(TaskStatus::Refunded, TaskStatus::Cancelled, false)]
#[case(TaskStatus::Refunded, TaskStatus::Overdue, false)]
#[case(TaskStatus::Refunded, TaskStatus::Refunded, false)]
fn can_transition_to_returns_expected(
    #[case] from: TaskStatus,
    #[case] to: TaskStatus,
    #[case] expected: bool,
) {
    assert_eq!(from.can_transition_to(to), expected);
}

#[rstest]
#[case(TaskStatus::Open, false)]
#[case(TaskStatus::Applied, false)]
#[case(TaskStatus::InProgress, false)]
#[case(TaskStatus::PendingApproval, false)]
#[case(TaskStatus::Completed, true)]
#[case(TaskStatus::Cancelled, false)]
#[case(TaskStatus::Overdue, false)]
#[case(TaskStatus::Refunded, true)]
fn is_terminal_returns_expected(#[case] status: TaskStatus, #[case] expected: bool) {
    assert_eq!(status.is_terminal(), expected);
}

#[rstest]
fn transition_from_open_to_applied_succeeds(
    clock: DefaultClock,
    open_task: Result<Task, TaskDomainError>,
) -> eyre::Result<()> {
    let mut task = open_task?;
    let original_updated_at = task.updated_at();

    task.transition_to(TaskStatus::Applied, &clock)?;

    ensure!(task.status() == TaskStatus::Applied);
    ensure!(task.updated_at() >= original_updated_at);
    Ok(())
}

#[rstest]
fn transition_from_open_to_completed_is_rejected(
    clock: DefaultClock,
    open_task: Result<Task, TaskDomainError>,
) -> eyre::Result<()> {
    let mut task = open_task?;
    let task_id = task.id();
    let original_status = task.status();

    let result = task.transition_to(TaskStatus::Completed, &clock);
    let expected = Err(TaskDomainError::InvalidStatusTransition {
        task_id,
        from: TaskStatus::Open,
        to: TaskStatus::Completed,
    });

    if result != expected {
        bail!("expected {expected:?}, got {result:?}");
    }
    ensure!(task.status() == original_status);
    Ok(())
}

#[rstest]
#[case(TaskStatus::Completed)]
#[case(TaskStatus::Refunded)]
fn terminal_status_rejects_all_transitions(
    #[case] terminal_status: TaskStatus,
    clock: DefaultClock,
    open_task: Result<Task, TaskDomainError>,
) -> eyre::Result<()> {
    let mut task = task_in_status(open_task?, terminal_status, &clock)?;

    let task_id = task.id();
    for target_status in ALL_STATUSES {
        let result = task.transition_to(target_status, &clock);
        let expected = Err(TaskDomainError::InvalidStatusTransition {
            task_id,
            from: terminal_status,
            to: target_status,
        });
        if result != expected {
            bail!("expected {expected:?}, got {result:?}");
        }
        ensure!(task.status() == terminal_status);
    }
    Ok(())
}

#[rstest]
fn revision_returns_pending_approval_to_in_progress(
    clock: DefaultClock,
    open_task: Result<Task, TaskDomainError>,
) -> eyre::Result<()> {
    let mut task = task_in_status(open_task?, TaskStatus::PendingApproval, &clock)?;

    task.transition_to(TaskStatus::InProgress, &clock)?;

    ensure!(task.status() == TaskStatus::InProgress);
    Ok(())
}

#[rstest]
fn every_status_parses_its_storage_representation() -> eyre::Result<()> {
    for status in ALL_STATUSES {
        let parsed = TaskStatus::try_from(status.as_str())
            .map_err(|err| eyre::eyre!("{err}"))?;
        ensure!(parsed == status);
    }
    Ok(())
}

#[rstest]
fn unknown_status_string_is_rejected() {
    assert!(TaskStatus::try_from("archived").is_err());
}
