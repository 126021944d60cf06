//! Deterministic escrow contract simulator for lifecycle tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::task::{
    domain::{TxHash, WalletAddress, WeiAmount},
    ports::{EscrowContract, EscrowError, EscrowResult, SubmittedTransaction, TxReceipt},
};

/// Default fee matching the production contract.
const DEFAULT_FEE_PERCENT: u8 = 3;

/// Default minimum task value: 0.001 ether.
const DEFAULT_MINIMUM_WEI: u128 = 1_000_000_000_000_000;

/// Contract-side state of one escrow entry.
#[derive(Debug, Clone)]
struct EscrowEntry {
    deposit: WeiAmount,
    accepted_developer: Option<WalletAddress>,
    completed: bool,
    cancelled: bool,
}

#[derive(Debug, Default)]
struct SimulatorState {
    entries: HashMap<u64, EscrowEntry>,
    receipts: HashMap<TxHash, TxReceipt>,
    tx_counter: u64,
    fail_next: Option<EscrowError>,
}

/// In-memory escrow contract with deterministic hashes.
///
/// Operations succeed unless a failure is injected with
/// [`InMemoryEscrow::fail_next_submission`], which makes the next write
/// operation return the given error, mimicking wallet rejections, RPC
/// outages, and reverts.
#[derive(Debug, Clone)]
pub struct InMemoryEscrow {
    state: Arc<Mutex<SimulatorState>>,
    fee_percent: u8,
    minimum: WeiAmount,
    overdue_period: Duration,
    network_id: u64,
}

impl Default for InMemoryEscrow {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEscrow {
    /// Creates a simulator with the production defaults: 3% fee, 0.001
    /// ether minimum, seven-day overdue period.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimulatorState::default())),
            fee_percent: DEFAULT_FEE_PERCENT,
            minimum: WeiAmount::from_wei(DEFAULT_MINIMUM_WEI),
            overdue_period: Duration::days(7),
            network_id: 31_337,
        }
    }

    /// Overrides the minimum task value.
    #[must_use]
    pub const fn with_minimum(mut self, minimum: WeiAmount) -> Self {
        self.minimum = minimum;
        self
    }

    /// Makes the next write operation fail with the given error.
    pub fn fail_next_submission(&self, err: EscrowError) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_next = Some(err);
        }
    }

    /// Returns the deposit held for a contract task entry, when present.
    #[must_use]
    pub fn deposit_for(&self, contract_task_id: u64) -> Option<WeiAmount> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.entries.get(&contract_task_id).map(|e| e.deposit))
    }

    /// Returns the accepted developer for a contract task entry.
    #[must_use]
    pub fn accepted_developer_for(&self, contract_task_id: u64) -> Option<WalletAddress> {
        self.state.lock().ok().and_then(|state| {
            state
                .entries
                .get(&contract_task_id)
                .and_then(|e| e.accepted_developer.clone())
        })
    }

    fn locked(&self) -> EscrowResult<std::sync::MutexGuard<'_, SimulatorState>> {
        self.state
            .lock()
            .map_err(|err| EscrowError::Rpc(err.to_string()))
    }

    fn take_injected_failure(
        state: &mut SimulatorState,
    ) -> Option<EscrowError> {
        state.fail_next.take()
    }

    /// Derives a deterministic transaction hash from the submission
    /// counter. A 32-byte digest always hex-encodes to a well-formed hash.
    fn next_tx_hash(state: &mut SimulatorState) -> EscrowResult<TxHash> {
        state.tx_counter += 1;
        let digest = Sha256::digest(state.tx_counter.to_be_bytes());
        TxHash::new(format!("0x{}", hex::encode(digest)))
            .map_err(|err| EscrowError::Rpc(err.to_string()))
    }

    fn settle(state: &mut SimulatorState, tx_hash: &TxHash, success: bool) {
        let block_number = state.tx_counter;
        state.receipts.insert(
            tx_hash.clone(),
            TxReceipt {
                tx_hash: tx_hash.clone(),
                success,
                block_number,
            },
        );
    }
}

#[async_trait]
impl EscrowContract for InMemoryEscrow {
    async fn create_task(
        &self,
        _deadline: DateTime<Utc>,
        _allow_overdue: bool,
        deposit: WeiAmount,
    ) -> EscrowResult<SubmittedTransaction> {
        let mut state = self.locked()?;
        if let Some(err) = Self::take_injected_failure(&mut state) {
            return Err(err);
        }
        let contract_task_id = state.entries.len() as u64;
        let tx_hash = Self::next_tx_hash(&mut state)?;
        state.entries.insert(
            contract_task_id,
            EscrowEntry {
                deposit,
                accepted_developer: None,
                completed: false,
                cancelled: false,
            },
        );
        Self::settle(&mut state, &tx_hash, true);
        Ok(SubmittedTransaction {
            contract_task_id,
            tx_hash,
        })
    }

    async fn accept_developer(
        &self,
        contract_task_id: u64,
        developer: &WalletAddress,
    ) -> EscrowResult<TxHash> {
        let mut state = self.locked()?;
        if let Some(err) = Self::take_injected_failure(&mut state) {
            return Err(err);
        }
        let tx_hash = Self::next_tx_hash(&mut state)?;
        let accepted = match state.entries.get_mut(&contract_task_id) {
            Some(entry) if !entry.completed && !entry.cancelled => {
                entry.accepted_developer = Some(developer.clone());
                true
            }
            _ => false,
        };
        Self::settle(&mut state, &tx_hash, accepted);
        Ok(tx_hash)
    }

    async fn complete_task(&self, contract_task_id: u64) -> EscrowResult<TxHash> {
        let mut state = self.locked()?;
        if let Some(err) = Self::take_injected_failure(&mut state) {
            return Err(err);
        }
        let tx_hash = Self::next_tx_hash(&mut state)?;
        let completed = match state.entries.get_mut(&contract_task_id) {
            Some(entry)
                if entry.accepted_developer.is_some()
                    && !entry.completed
                    && !entry.cancelled =>
            {
                entry.completed = true;
                true
            }
            _ => false,
        };
        Self::settle(&mut state, &tx_hash, completed);
        Ok(tx_hash)
    }

    async fn cancel_task(
        &self,
        contract_task_id: u64,
        _reason: &str,
    ) -> EscrowResult<TxHash> {
        let mut state = self.locked()?;
        if let Some(err) = Self::take_injected_failure(&mut state) {
            return Err(err);
        }
        let tx_hash = Self::next_tx_hash(&mut state)?;
        let cancelled = match state.entries.get_mut(&contract_task_id) {
            Some(entry) if !entry.completed && !entry.cancelled => {
                entry.cancelled = true;
                true
            }
            _ => false,
        };
        Self::settle(&mut state, &tx_hash, cancelled);
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> EscrowResult<TxReceipt> {
        let state = self.locked()?;
        state
            .receipts
            .get(tx_hash)
            .cloned()
            .ok_or_else(|| EscrowError::Network(format!("no receipt for {tx_hash}")))
    }

    async fn platform_fee_percent(&self) -> EscrowResult<u8> {
        Ok(self.fee_percent)
    }

    async fn minimum_task_value(&self) -> EscrowResult<WeiAmount> {
        Ok(self.minimum)
    }

    async fn task_count(&self) -> EscrowResult<u64> {
        let state = self.locked()?;
        Ok(state.entries.len() as u64)
    }

    async fn overdue_period(&self) -> EscrowResult<Duration> {
        Ok(self.overdue_period)
    }

    fn network_id(&self) -> u64 {
        self.network_id
    }
}
