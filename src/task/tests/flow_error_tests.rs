//! Tests for failure-discriminant mapping and receipt-failure auditing.

use super::helpers::FlowHarness;
use crate::task::domain::{TransactionKind, TransactionOutcome, TxHash, WeiAmount};
use crate::task::ports::{
    EscrowError, ForgeError, MockEscrowContract, SignatureError, StoreError,
    SubmittedTransaction, TaskStore,
};
use crate::task::services::{CreateTaskService, FailureKind, FlowError};
use eyre::{ensure, eyre};
use mockable::DefaultClock;
use rstest::rstest;
use std::sync::Arc;

fn tx_hash(byte: &str) -> TxHash {
    TxHash::new(format!("0x{}", byte.repeat(32))).unwrap_or_else(|_| {
        // Test literals are two hex characters by construction.
        panic!("malformed test hash literal {byte}")
    })
}

#[rstest]
#[case(EscrowError::WalletRejected("denied".to_owned()), FailureKind::Wallet)]
#[case(EscrowError::WrongChain { expected: 1, actual: 5 }, FailureKind::Network)]
#[case(EscrowError::Network("timeout".to_owned()), FailureKind::Network)]
#[case(EscrowError::Rpc("bad params".to_owned()), FailureKind::Contract)]
fn escrow_errors_map_to_their_discriminant(
    #[case] err: EscrowError,
    #[case] expected: FailureKind,
) {
    assert_eq!(FlowError::from(err).kind, expected);
}

#[rstest]
fn reverted_escrow_error_maps_to_contract() {
    let err = EscrowError::Reverted {
        tx_hash: tx_hash("ab"),
    };
    assert_eq!(FlowError::from(err).kind, FailureKind::Contract);
}

#[rstest]
#[case(ForgeError::Permission("no scope".to_owned()), FailureKind::Permission)]
#[case(ForgeError::NotFound("repo".to_owned()), FailureKind::NotFound)]
#[case(ForgeError::RateLimited, FailureKind::Forge)]
#[case(ForgeError::Network("reset".to_owned()), FailureKind::Forge)]
fn forge_errors_map_to_their_discriminant(
    #[case] err: ForgeError,
    #[case] expected: FailureKind,
) {
    assert_eq!(FlowError::from(err).kind, expected);
}

#[rstest]
fn store_and_signature_errors_map_to_their_discriminant() {
    let not_found = StoreError::TaskNotFound(crate::task::domain::TaskId::new());
    assert_eq!(FlowError::from(not_found).kind, FailureKind::NotFound);

    let mismatch = SignatureError::Mismatch;
    assert_eq!(FlowError::from(mismatch).kind, FailureKind::Wallet);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn receipt_failure_records_a_failed_audit_row() -> eyre::Result<()> {
    let harness = FlowHarness::new();
    let submitted_hash = tx_hash("cd");

    let mut escrow = MockEscrowContract::new();
    escrow
        .expect_minimum_task_value()
        .returning(|| Ok(WeiAmount::from_wei(1)));
    escrow.expect_platform_fee_percent().returning(|| Ok(3));
    let hash_for_submit = submitted_hash.clone();
    escrow.expect_create_task().returning(move |_, _, _| {
        Ok(SubmittedTransaction {
            contract_task_id: 0,
            tx_hash: hash_for_submit.clone(),
        })
    });
    escrow
        .expect_wait_for_receipt()
        .returning(|_| Err(EscrowError::Network("node unreachable".to_owned())));
    escrow.expect_network_id().return_const(31_337_u64);

    let service = CreateTaskService::new(
        Arc::clone(&harness.store),
        Arc::new(escrow),
        Arc::new(DefaultClock),
    );
    let result = service.create(harness.create_request()).await;

    let err = match result {
        Err(err) => err,
        Ok(_) => return Err(eyre!("expected the receipt wait to fail")),
    };
    ensure!(err.kind == FailureKind::Network);

    // One row per on-chain attempt, including failed ones.
    let open = harness
        .store
        .tasks_in_status(crate::task::domain::TaskStatus::Open)
        .await?;
    let orphan = open.first().ok_or_else(|| eyre!("orphan row missing"))?;
    let records = harness.store.transactions_for_task(orphan.id()).await?;
    ensure!(records.len() == 1);
    let record = records.first().ok_or_else(|| eyre!("audit row missing"))?;
    ensure!(record.kind() == TransactionKind::Create);
    ensure!(record.outcome() == TransactionOutcome::Failed);
    ensure!(record.tx_hash() == Some(&submitted_hash));
    Ok(())
}
