//! Starknet JSON-RPC client.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{debug, info};

use starkscope_db::models::{HashDetails, ReceiptDetails, TxType};
use starkscope_telemetry::Metrics;

use crate::error::RpcError;

/// A bare transaction reference as it appears in a block listing.
#[derive(Debug, Clone, Deserialize)]
pub struct TxRef {
    pub transaction_hash: String,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    /// Hex-encoded felt; the node omits it for legacy DEPLOY transactions.
    #[serde(default)]
    pub nonce: Option<String>,
}

impl TxRef {
    /// Nonce as an integer; absent or unparseable nonces normalize to 0.
    pub fn nonce_value(&self) -> u64 {
        match self.nonce.as_deref() {
            Some(raw) => {
                let digits = raw.strip_prefix("0x").unwrap_or(raw);
                u64::from_str_radix(digits, 16).unwrap_or(0)
            }
            None => 0,
        }
    }
}

/// Result of `starknet_getBlockWithTxs`, reduced to what the pipeline
/// consumes. Unknown fields from the node are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockWithTxs {
    pub timestamp: u64,
    pub transactions: Vec<TxRef>,
}

/// Read-side view of the chain, as consumed by the pipeline.
///
/// `RpcClient` is the production implementation; tests substitute a
/// scripted fake to drive the enricher, ingestor, and poller without a
/// node.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Number of the most recently confirmed block.
    async fn latest_block_number(&self) -> Result<u64, RpcError>;

    /// Block timestamp and transaction listing for one block number.
    async fn block_with_txs(&self, block_number: u64) -> Result<BlockWithTxs, RpcError>;

    /// Per-hash detail payload.
    async fn transaction_by_hash(&self, hash: &str) -> Result<HashDetails, RpcError>;

    /// Receipt payload.
    async fn transaction_receipt(&self, hash: &str) -> Result<ReceiptDetails, RpcError>;
}

/// JSON-RPC 2.0 client over HTTP POST. Stateless; no retries of its own.
pub struct RpcClient {
    client: Client,
    rpc_url: String,
    metrics: Metrics,
}

impl RpcClient {
    pub fn new(rpc_url: &str, metrics: Metrics) -> Self {
        info!("Initialized RPC client for {}", rpc_url);

        Self {
            client: Client::new(),
            rpc_url: rpc_url.to_string(),
            metrics,
        }
    }

    /// Issue one JSON-RPC request and decode its `result` field.
    ///
    /// Responses are correlated by the synchronous call, so the request id
    /// is constant.
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let start = Instant::now();
        let result = self.call_inner(&payload).await;
        self.metrics
            .observe_rpc_latency(method, start.elapsed().as_secs_f64());

        let body = match result {
            Ok(body) => body,
            Err(err) => {
                self.metrics.inc_rpc_errors();
                return Err(err);
            }
        };

        if let Some(error) = body.get("error") {
            self.metrics.inc_rpc_errors();
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            return Err(RpcError::Rpc { code, message });
        }

        let result = body.get("result").cloned().ok_or(RpcError::MissingResult)?;
        debug!("RPC {} succeeded", method);
        Ok(serde_json::from_value(result)?)
    }

    async fn call_inner(&self, payload: &Value) -> Result<Value, RpcError> {
        let response = self
            .client
            .post(&self.rpc_url)
            .json(payload)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn latest_block_number(&self) -> Result<u64, RpcError> {
        self.call("starknet_blockNumber", json!([])).await
    }

    async fn block_with_txs(&self, block_number: u64) -> Result<BlockWithTxs, RpcError> {
        self.call(
            "starknet_getBlockWithTxs",
            json!([{ "block_number": block_number }]),
        )
        .await
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<HashDetails, RpcError> {
        self.call("starknet_getTransactionByHash", json!([hash])).await
    }

    async fn transaction_receipt(&self, hash: &str) -> Result<ReceiptDetails, RpcError> {
        self.call("starknet_getTransactionReceipt", json!([hash])).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_listing_deserializes() {
        let raw = serde_json::json!({
            "block_number": 990,
            "block_hash": "0xb",
            "timestamp": 1700000123,
            "transactions": [
                { "transaction_hash": "0x1", "type": "INVOKE", "nonce": "0x2a" },
                { "transaction_hash": "0x2", "type": "DEPLOY" }
            ]
        });
        let block: BlockWithTxs = serde_json::from_value(raw).unwrap();
        assert_eq!(block.timestamp, 1700000123);
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.transactions[0].tx_type, TxType::Invoke);
        assert_eq!(block.transactions[0].nonce_value(), 42);
        // Legacy DEPLOY carries no nonce.
        assert_eq!(block.transactions[1].nonce_value(), 0);
    }

    #[test]
    fn nonce_parsing_tolerates_junk() {
        let tx = TxRef {
            transaction_hash: "0x1".into(),
            tx_type: TxType::Invoke,
            nonce: Some("not-a-felt".into()),
        };
        assert_eq!(tx.nonce_value(), 0);
    }
}
