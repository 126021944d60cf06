//! Unit tests for domain value objects and aggregate guards.

use crate::task::domain::{
    ApplicationMessage, ClientId, GithubLogin, RepositoryName, Task, TaskDomainError,
    TaskDraft, TaskId, TxHash, WalletAddress, WeiAmount, application_max_age,
};
use chrono::{Duration, Utc};
use eyre::ensure;
use mockable::{Clock, DefaultClock};
use rstest::{fixture, rstest};

#[fixture]
fn clock() -> DefaultClock {
    DefaultClock
}

#[fixture]
fn task(clock: DefaultClock) -> Result<Task, TaskDomainError> {
    let draft = TaskDraft::new(
        "Domain guard test",
        WeiAmount::from_ether("0.05")?,
        Utc::now() + Duration::days(3),
        ClientId::new(),
    )?;
    Ok(Task::new(draft, &clock))
}

#[rstest]
#[case("0x52908400098527886E0F7030069857D2E4169EE7")]
#[case("0xde709f2102306220921060314715629080e2fb77")]
fn wallet_address_normalises_to_lowercase(#[case] input: &str) -> eyre::Result<()> {
    let address = WalletAddress::new(input)?;
    ensure!(address.as_str() == input.to_ascii_lowercase());
    Ok(())
}

#[rstest]
#[case("52908400098527886E0F7030069857D2E4169EE7")]
#[case("0x123")]
#[case("0xzz908400098527886e0f7030069857d2e4169ee7")]
#[case("")]
fn malformed_wallet_addresses_are_rejected(#[case] input: &str) {
    assert!(WalletAddress::new(input).is_err());
}

#[rstest]
fn tx_hash_requires_thirty_two_bytes() {
    let valid = format!("0x{}", "ab".repeat(32));
    assert!(TxHash::new(valid).is_ok());
    assert!(TxHash::new(format!("0x{}", "ab".repeat(31))).is_err());
    assert!(TxHash::new("not-a-hash").is_err());
}

#[rstest]
#[case("octocat", true)]
#[case("dev-123", true)]
#[case("-leading", false)]
#[case("trailing-", false)]
#[case("has space", false)]
#[case("", false)]
fn github_login_validation(#[case] input: &str, #[case] valid: bool) {
    assert_eq!(GithubLogin::new(input).is_ok(), valid);
}

#[rstest]
fn repository_naming_convention_round_trips() -> eyre::Result<()> {
    let task_id = TaskId::new();
    let name = RepositoryName::for_task(task_id);

    ensure!(name.as_str() == format!("gitfreelas-task-{task_id}"));
    ensure!(name.task_id() == Some(task_id));
    Ok(())
}

#[rstest]
#[case("unrelated-repo")]
#[case("gitfreelas-task-")]
#[case("gitfreelas-task-not-a-uuid")]
fn repository_names_outside_the_convention_carry_no_task_id(
    #[case] input: &str,
) -> eyre::Result<()> {
    let name = RepositoryName::new(input)?;
    ensure!(name.task_id().is_none());
    Ok(())
}

#[rstest]
fn application_message_binds_task_wallet_and_timestamp() -> eyre::Result<()> {
    let task_id = TaskId::new();
    let wallet = WalletAddress::new("0xde709f2102306220921060314715629080e2fb77")?;
    let signed_at = Utc::now();
    let message = ApplicationMessage::new(task_id, wallet.clone(), signed_at);

    let text = message.canonical_text();
    ensure!(text.starts_with("gitfreelas:apply:"));
    ensure!(text.contains(&task_id.to_string()));
    ensure!(text.contains(wallet.as_str()));
    ensure!(text.ends_with(&signed_at.timestamp().to_string()));
    Ok(())
}

#[rstest]
fn application_freshness_window(clock: DefaultClock) -> eyre::Result<()> {
    let task_id = TaskId::new();
    let wallet = WalletAddress::new("0xde709f2102306220921060314715629080e2fb77")?;
    let now = clock.utc();

    let fresh = ApplicationMessage::new(task_id, wallet.clone(), now - Duration::minutes(1));
    ensure!(fresh.is_fresh(now, application_max_age()));

    let stale = ApplicationMessage::new(task_id, wallet.clone(), now - Duration::minutes(11));
    ensure!(!stale.is_fresh(now, application_max_age()));

    let future = ApplicationMessage::new(task_id, wallet, now + Duration::minutes(5));
    ensure!(!future.is_fresh(now, application_max_age()));
    Ok(())
}

#[rstest]
fn link_contract_rejects_double_linkage(
    clock: DefaultClock,
    task: Result<Task, TaskDomainError>,
) -> eyre::Result<()> {
    let mut task = task?;
    let hash = TxHash::new(format!("0x{}", "cd".repeat(32)))?;
    task.link_contract(7, hash.clone(), &clock)?;

    let second = TxHash::new(format!("0x{}", "ef".repeat(32)))?;
    let result = task.link_contract(8, second, &clock);

    ensure!(result == Err(TaskDomainError::ContractAlreadyLinked(task.id())));
    ensure!(task.contract_task_id() == Some(7));
    ensure!(task.contract_tx_hash() == Some(&hash));
    Ok(())
}

#[rstest]
fn record_pull_request_is_idempotent_for_the_same_number(
    clock: DefaultClock,
    task: Result<Task, TaskDomainError>,
) -> eyre::Result<()> {
    let mut task = task?;
    task.record_pull_request(4, &clock)?;
    let updated_after_first = task.updated_at();

    task.record_pull_request(4, &clock)?;
    ensure!(task.pull_request_number() == Some(4));
    ensure!(task.updated_at() == updated_after_first);

    let conflicting = task.record_pull_request(5, &clock);
    ensure!(conflicting == Err(TaskDomainError::PullRequestAlreadyRecorded(task.id())));
    Ok(())
}

#[rstest]
fn soft_delete_is_sticky(
    clock: DefaultClock,
    task: Result<Task, TaskDomainError>,
) -> eyre::Result<()> {
    let mut task = task?;
    ensure!(!task.is_deleted());

    task.soft_delete(&clock);
    let deleted_at = task.deleted_at();
    ensure!(task.is_deleted());

    task.soft_delete(&clock);
    ensure!(task.deleted_at() == deleted_at);
    Ok(())
}

#[rstest]
fn empty_title_is_rejected() {
    let result = TaskDraft::new(
        "   ",
        WeiAmount::from_wei(1),
        Utc::now() + Duration::days(1),
        ClientId::new(),
    );
    assert!(matches!(result, Err(TaskDomainError::EmptyTitle)));
}

#[rstest]
fn zero_value_is_rejected() {
    let result = TaskDraft::new(
        "Zero value",
        WeiAmount::ZERO,
        Utc::now() + Duration::days(1),
        ClientId::new(),
    );
    assert!(matches!(result, Err(TaskDomainError::ZeroValue)));
}

#[rstest]
fn overdue_cutoff_extends_only_when_permitted(clock: DefaultClock) -> eyre::Result<()> {
    let deadline = clock.utc() - Duration::days(1);
    let strict = TaskDraft::new(
        "Strict deadline",
        WeiAmount::from_wei(1),
        deadline,
        ClientId::new(),
    )?;
    let strict_task = Task::new(strict, &clock);
    ensure!(strict_task.is_past_deadline(clock.utc(), Duration::days(7)));

    let lenient = TaskDraft::new(
        "Lenient deadline",
        WeiAmount::from_wei(1),
        deadline,
        ClientId::new(),
    )?
    .with_allow_overdue(true);
    let lenient_task = Task::new(lenient, &clock);
    ensure!(!lenient_task.is_past_deadline(clock.utc(), Duration::days(7)));
    Ok(())
}
