//! Transaction record types shared across the workspace.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

/// Starknet transaction kinds, as reported in block listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxType {
    Declare,
    Deploy,
    DeployAccount,
    Invoke,
    L1Handler,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Declare => "DECLARE",
            TxType::Deploy => "DEPLOY",
            TxType::DeployAccount => "DEPLOY_ACCOUNT",
            TxType::Invoke => "INVOKE",
            TxType::L1Handler => "L1_HANDLER",
        }
    }

    /// Parse the wire/storage spelling. Returns `None` for anything else.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "DECLARE" => Some(TxType::Declare),
            "DEPLOY" => Some(TxType::Deploy),
            "DEPLOY_ACCOUNT" => Some(TxType::DeployAccount),
            "INVOKE" => Some(TxType::Invoke),
            "L1_HANDLER" => Some(TxType::L1Handler),
            _ => None,
        }
    }
}

/// Confirmation-state label. The pipeline stamps every record
/// `ACCEPTED_ON_L2` at ingestion time and never updates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxStatus {
    AcceptedOnL2,
    AcceptedOnL1,
    Rejected,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::AcceptedOnL2 => "ACCEPTED_ON_L2",
            TxStatus::AcceptedOnL1 => "ACCEPTED_ON_L1",
            TxStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ACCEPTED_ON_L2" => Some(TxStatus::AcceptedOnL2),
            "ACCEPTED_ON_L1" => Some(TxStatus::AcceptedOnL1),
            "REJECTED" => Some(TxStatus::Rejected),
            _ => None,
        }
    }
}

/// Payload of `starknet_getTransactionByHash`.
///
/// The schema is owned by the chain and drifts across RPC versions, so
/// known sub-fields are optional and everything else lands in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HashDetails {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub tx_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calldata: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_bounds: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload of `starknet_getTransactionReceipt`. Same drift-tolerant shape
/// as [`HashDetails`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceiptDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_fee: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finality_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_resources: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A fully enriched transaction, the unit of storage.
///
/// Created once by the block ingestor after both detail calls succeed;
/// never mutated or deleted afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub hash: String,
    pub block_number: u64,
    /// Block timestamp in seconds since epoch, shared by every
    /// transaction in the block.
    pub timestamp: u64,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub status: TxStatus,
    pub nonce: u64,
    pub hash_details: HashDetails,
    pub receipt_details: ReceiptDetails,
}

/// Raw row shape as stored in SQLite. Detail payloads are JSON text.
#[derive(Debug, Clone, FromRow)]
pub struct TransactionRow {
    pub hash: String,
    pub block_number: i64,
    pub timestamp: i64,
    pub tx_type: String,
    pub status: String,
    pub nonce: i64,
    pub hash_details: String,
    pub receipt_details: String,
    pub created_at: String,
}
