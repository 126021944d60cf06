//! JSON-RPC escrow contract adapter.
//!
//! Talks to an EVM node over JSON-RPC: `eth_call` for the contract reads,
//! `eth_sendTransaction` against a node-managed sender account for writes,
//! and `eth_getTransactionReceipt` polling for confirmation.

pub mod abi;

use crate::task::{
    domain::{TxHash, WalletAddress, WeiAmount},
    ports::{EscrowContract, EscrowError, EscrowResult, SubmittedTransaction, TxReceipt},
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use std::time::Duration as StdDuration;
use tracing::debug;

/// EIP-1193 "user rejected request" error code.
const USER_REJECTED_CODE: i64 = 4001;

/// Connection settings for the escrow contract client.
#[derive(Debug, Clone)]
pub struct EscrowClientConfig {
    /// JSON-RPC endpoint of the node.
    pub rpc_url: String,
    /// Deployed escrow contract address (`0x`-prefixed).
    pub contract_address: String,
    /// Sender account managed by the node or relayer.
    pub sender_address: String,
    /// Chain the contract is deployed on.
    pub chain_id: u64,
    /// Delay between receipt polls.
    pub poll_interval: StdDuration,
    /// Receipt polls before giving up.
    pub max_receipt_polls: u32,
}

impl EscrowClientConfig {
    /// Creates a config with default polling (2s interval, 60 polls).
    #[must_use]
    pub fn new(
        rpc_url: impl Into<String>,
        contract_address: impl Into<String>,
        sender_address: impl Into<String>,
        chain_id: u64,
    ) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            contract_address: contract_address.into(),
            sender_address: sender_address.into(),
            chain_id,
            poll_interval: StdDuration::from_secs(2),
            max_receipt_polls: 60,
        }
    }
}

/// Escrow contract client over JSON-RPC.
#[derive(Debug, Clone)]
pub struct JsonRpcEscrow {
    http: reqwest::Client,
    config: EscrowClientConfig,
}

impl JsonRpcEscrow {
    /// Creates a client.
    #[must_use]
    pub fn new(config: EscrowClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn rpc(&self, method: &str, params: Value) -> EscrowResult<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response = self
            .http
            .post(&self.config.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|err| EscrowError::Network(err.to_string()))?;
        let payload: Value = response
            .json()
            .await
            .map_err(|err| EscrowError::Network(err.to_string()))?;

        if let Some(error) = payload.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown rpc error")
                .to_owned();
            if code == USER_REJECTED_CODE {
                return Err(EscrowError::WalletRejected(message));
            }
            return Err(EscrowError::Rpc(message));
        }
        Ok(payload.get("result").cloned().unwrap_or(Value::Null))
    }

    async fn ensure_chain(&self) -> EscrowResult<()> {
        let result = self.rpc("eth_chainId", json!([])).await?;
        let actual = result
            .as_str()
            .and_then(|hex_id| hex_id.strip_prefix("0x"))
            .and_then(|hex_id| u64::from_str_radix(hex_id, 16).ok())
            .ok_or_else(|| EscrowError::Rpc(format!("malformed chain id: {result}")))?;
        if actual != self.config.chain_id {
            return Err(EscrowError::WrongChain {
                expected: self.config.chain_id,
                actual,
            });
        }
        Ok(())
    }

    async fn send_transaction(
        &self,
        data: String,
        value: Option<WeiAmount>,
    ) -> EscrowResult<TxHash> {
        self.ensure_chain().await?;
        let mut tx = json!({
            "from": self.config.sender_address,
            "to": self.config.contract_address,
            "data": data,
        });
        if let Some(deposit) = value
            && let Some(object) = tx.as_object_mut()
        {
            object.insert(
                "value".to_owned(),
                Value::String(format!("{:#x}", deposit.as_wei())),
            );
        }
        let result = self.rpc("eth_sendTransaction", json!([tx])).await?;
        let hash = result
            .as_str()
            .ok_or_else(|| EscrowError::Rpc(format!("malformed tx hash: {result}")))?;
        TxHash::new(hash).map_err(|err| EscrowError::Rpc(err.to_string()))
    }

    async fn eth_call(&self, data: String) -> EscrowResult<String> {
        let params = json!([{ "to": self.config.contract_address, "data": data }, "latest"]);
        let result = self.rpc("eth_call", params).await?;
        result
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| EscrowError::Rpc(format!("malformed call result: {result}")))
    }

    async fn read_u128(&self, signature: &str) -> EscrowResult<u128> {
        let data = abi::call_data(abi::selector(signature), &[]);
        let result = self.eth_call(data).await?;
        abi::decode_u256(&result).map_err(|err| EscrowError::Rpc(err.to_string()))
    }

    fn deadline_seconds(deadline: DateTime<Utc>) -> EscrowResult<u128> {
        u128::try_from(deadline.timestamp())
            .map_err(|_| EscrowError::Rpc(format!("deadline before epoch: {deadline}")))
    }
}

#[async_trait]
impl EscrowContract for JsonRpcEscrow {
    async fn create_task(
        &self,
        deadline: DateTime<Utc>,
        allow_overdue: bool,
        deposit: WeiAmount,
    ) -> EscrowResult<SubmittedTransaction> {
        // The contract assigns task ids sequentially; the next id is the
        // current count.
        let contract_task_id = self.task_count().await?;
        let data = abi::call_data(
            abi::selector("createTask(uint256,uint256,bool)"),
            &[
                abi::encode_u256(u128::from(contract_task_id)),
                abi::encode_u256(Self::deadline_seconds(deadline)?),
                abi::encode_bool(allow_overdue),
            ],
        );
        let tx_hash = self.send_transaction(data, Some(deposit)).await?;
        debug!(%tx_hash, contract_task_id, "createTask submitted");
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
        let address = abi::encode_address(developer.as_str())
            .map_err(|err| EscrowError::Rpc(err.to_string()))?;
        let data = abi::call_data(
            abi::selector("acceptDeveloper(uint256,address)"),
            &[abi::encode_u256(u128::from(contract_task_id)), address],
        );
        self.send_transaction(data, None).await
    }

    async fn complete_task(&self, contract_task_id: u64) -> EscrowResult<TxHash> {
        let data = abi::call_data(
            abi::selector("completeTask(uint256)"),
            &[abi::encode_u256(u128::from(contract_task_id))],
        );
        self.send_transaction(data, None).await
    }

    async fn cancel_task(&self, contract_task_id: u64, reason: &str) -> EscrowResult<TxHash> {
        let data = abi::call_data_with_string(
            abi::selector("cancelTask(uint256,string)"),
            &[abi::encode_u256(u128::from(contract_task_id))],
            reason,
        );
        self.send_transaction(data, None).await
    }

    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> EscrowResult<TxReceipt> {
        for _ in 0..self.config.max_receipt_polls {
            let result = self
                .rpc("eth_getTransactionReceipt", json!([tx_hash.as_str()]))
                .await?;
            if !result.is_null() {
                let success = result
                    .get("status")
                    .and_then(Value::as_str)
                    .is_some_and(|status| status == "0x1");
                let block_number = result
                    .get("blockNumber")
                    .and_then(Value::as_str)
                    .and_then(|hex_block| hex_block.strip_prefix("0x"))
                    .and_then(|hex_block| u64::from_str_radix(hex_block, 16).ok())
                    .unwrap_or_default();
                return Ok(TxReceipt {
                    tx_hash: tx_hash.clone(),
                    success,
                    block_number,
                });
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
        Err(EscrowError::Network(format!(
            "no receipt for {tx_hash} after {} polls",
            self.config.max_receipt_polls
        )))
    }

    async fn platform_fee_percent(&self) -> EscrowResult<u8> {
        let value = self.read_u128("PLATFORM_FEE_PERCENTAGE()").await?;
        u8::try_from(value)
            .map_err(|_| EscrowError::Rpc(format!("fee percentage out of range: {value}")))
    }

    async fn minimum_task_value(&self) -> EscrowResult<WeiAmount> {
        self.read_u128("MINIMUM_TASK_VALUE()")
            .await
            .map(WeiAmount::from_wei)
    }

    async fn task_count(&self) -> EscrowResult<u64> {
        let value = self.read_u128("getTaskCount()").await?;
        u64::try_from(value)
            .map_err(|_| EscrowError::Rpc(format!("task count out of range: {value}")))
    }

    async fn overdue_period(&self) -> EscrowResult<Duration> {
        let seconds = self.read_u128("OVERDUE_PERIOD()").await?;
        i64::try_from(seconds)
            .map(Duration::seconds)
            .map_err(|_| EscrowError::Rpc(format!("overdue period out of range: {seconds}")))
    }

    fn network_id(&self) -> u64 {
        self.config.chain_id
    }
}
