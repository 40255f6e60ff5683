//! Failure taxonomy for the ingestion pipeline.

use thiserror::Error;

/// Failures issuing a JSON-RPC call to the node.
///
/// `Transport` covers network and HTTP-level failures; the remaining
/// variants are protocol-level: the node answered, but not with a usable
/// `result`. The client never retries; callers decide.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("node returned error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("response carries no result field")]
    MissingResult,
    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One of the two detail calls failed for a specific transaction.
/// Scoped to that transaction; the rest of the block proceeds.
#[derive(Debug, Error)]
#[error("enrichment failed for transaction {hash}")]
pub struct EnrichmentError {
    pub hash: String,
    #[source]
    pub source: RpcError,
}

/// The block listing call itself failed; the whole block is abandoned
/// for this cycle, without touching per-transaction work.
#[derive(Debug, Error)]
#[error("failed to fetch block {block_number}")]
pub struct BlockFetchError {
    pub block_number: u64,
    #[source]
    pub source: RpcError,
}
