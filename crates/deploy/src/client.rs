//! Network client abstraction and its JSON-RPC implementation.

use std::{future::Future, time::Duration};

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256, Bytes, keccak256},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{ArtifactStore, rpc};

/// Default JSON-RPC endpoint (a local Hardhat node or Anvil).
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// Default maximum time to wait for a transaction receipt.
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;

/// Default interval between two receipt polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Hash of a submitted transaction.
pub type TxHash = B256;

/// Confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_hash: TxHash,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Receipt {
    /// Whether the transaction executed successfully.
    ///
    /// Pre-Byzantium receipts carry no status; they are treated as successful.
    pub fn succeeded(&self) -> bool {
        !matches!(self.status.as_deref(), Some("0x0") | Some("0x00"))
    }
}

/// Compute the 4-byte selector of a Solidity function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Encode a call to `signature` with the given arguments.
pub fn encode_call(signature: &str, args: Vec<DynSolValue>) -> Bytes {
    let mut data = selector(signature).to_vec();
    data.extend(DynSolValue::Tuple(args).abi_encode_params());
    data.into()
}

/// Everything the orchestrator needs from the network.
///
/// Submission and confirmation are separate calls so callers decide when to
/// wait; nothing in this crate submits a transaction before the previous one
/// is confirmed.
pub trait NetworkClient: Send + Sync {
    /// Accounts available for signing.
    fn accounts(&self) -> impl Future<Output = Result<Vec<Address>>> + Send;

    /// Submit a creation transaction for `contract` with ABI-encoded constructor `args`.
    fn deploy(
        &self,
        from: Address,
        contract: &str,
        args: Vec<DynSolValue>,
    ) -> impl Future<Output = Result<TxHash>> + Send;

    /// Submit a call transaction.
    fn transact(
        &self,
        from: Address,
        to: Address,
        calldata: Bytes,
    ) -> impl Future<Output = Result<TxHash>> + Send;

    /// Wait for the transaction to be included. Fails on revert or timeout.
    fn confirm(&self, tx: TxHash) -> impl Future<Output = Result<Receipt>> + Send;

    /// Runtime bytecode at `address`.
    fn code_at(&self, address: Address) -> impl Future<Output = Result<Bytes>> + Send;
}

/// Connection settings for [`JsonRpcClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint of the target network.
    pub rpc_url: Url,
    /// Index of the deploying account in `eth_accounts`.
    pub account_index: usize,
    /// Maximum time to wait for a receipt.
    pub confirmation_timeout_secs: u64,
    /// Interval between two receipt polls.
    pub poll_interval_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: Url::parse(DEFAULT_RPC_URL).expect("default RPC URL is valid"),
            account_index: 0,
            confirmation_timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

/// [`NetworkClient`] talking to a node over HTTP JSON-RPC.
///
/// Transactions go through `eth_sendTransaction`, so the node must hold the
/// deploying account unlocked (Hardhat node, Anvil, or a signing proxy).
#[derive(Debug, Clone)]
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    artifacts: ArtifactStore,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl JsonRpcClient {
    pub fn new(config: &NetworkConfig, artifacts: ArtifactStore) -> Result<Self> {
        Ok(Self {
            http: rpc::create_client(rpc::DEFAULT_REQUEST_TIMEOUT)?,
            url: config.rpc_url.to_string(),
            artifacts,
            confirmation_timeout: Duration::from_secs(config.confirmation_timeout_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        })
    }

    async fn send_transaction(&self, tx: serde_json::Value) -> Result<TxHash> {
        rpc::json_rpc_call(&self.http, &self.url, "eth_sendTransaction", vec![tx]).await
    }
}

impl NetworkClient for JsonRpcClient {
    async fn accounts(&self) -> Result<Vec<Address>> {
        rpc::json_rpc_call(&self.http, &self.url, "eth_accounts", vec![]).await
    }

    async fn deploy(&self, from: Address, contract: &str, args: Vec<DynSolValue>) -> Result<TxHash> {
        let mut data = self.artifacts.bytecode(contract)?.to_vec();
        if !args.is_empty() {
            data.extend(DynSolValue::Tuple(args).abi_encode_params());
        }

        tracing::debug!(contract = %contract, size = data.len(), "Sending creation transaction");

        self.send_transaction(serde_json::json!({
            "from": from,
            "data": Bytes::from(data),
        }))
        .await
        .with_context(|| format!("Creation transaction for {} rejected", contract))
    }

    async fn transact(&self, from: Address, to: Address, calldata: Bytes) -> Result<TxHash> {
        self.send_transaction(serde_json::json!({
            "from": from,
            "to": to,
            "data": calldata,
        }))
        .await
        .with_context(|| format!("Transaction to {} rejected", to))
    }

    async fn confirm(&self, tx: TxHash) -> Result<Receipt> {
        let name = format!("receipt of {}", tx);
        let receipt: Receipt =
            rpc::poll_until(&name, self.confirmation_timeout, self.poll_interval, || {
                let (http, url) = (&self.http, self.url.as_str());
                async move {
                    rpc::json_rpc_call::<Option<Receipt>>(
                        http,
                        url,
                        "eth_getTransactionReceipt",
                        vec![serde_json::json!(tx)],
                    )
                    .await
                }
            })
            .await?;

        if !receipt.succeeded() {
            anyhow::bail!("Transaction {} reverted", tx);
        }

        tracing::debug!(tx = %tx, block = ?receipt.block_number, "Transaction confirmed");

        Ok(receipt)
    }

    async fn code_at(&self, address: Address) -> Result<Bytes> {
        rpc::json_rpc_call(
            &self.http,
            &self.url,
            "eth_getCode",
            vec![serde_json::json!(address), serde_json::json!("latest")],
        )
        .await
    }
}
