//! Assembles full transaction records from bare block-listing references.

use std::sync::Arc;

use starkscope_db::models::{TransactionRecord, TxStatus};

use crate::error::EnrichmentError;
use crate::rpc_client::{ChainClient, TxRef};

/// Turns a bare transaction reference into a storable record by fetching
/// its two detail payloads.
pub struct Enricher {
    client: Arc<dyn ChainClient>,
}

impl Enricher {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client }
    }

    /// Fetch both detail payloads and merge them with the block context.
    ///
    /// The two calls are independent reads and run concurrently. If either
    /// fails, the whole enrichment fails; a partial record is never
    /// produced.
    pub async fn enrich(
        &self,
        block_number: u64,
        timestamp: u64,
        tx: &TxRef,
    ) -> Result<TransactionRecord, EnrichmentError> {
        let hash = tx.transaction_hash.as_str();

        let (hash_details, receipt_details) = tokio::try_join!(
            self.client.transaction_by_hash(hash),
            self.client.transaction_receipt(hash),
        )
        .map_err(|source| EnrichmentError {
            hash: hash.to_string(),
            source,
        })?;

        Ok(TransactionRecord {
            hash: tx.transaction_hash.clone(),
            block_number,
            timestamp,
            tx_type: tx.tx_type,
            status: TxStatus::AcceptedOnL2,
            nonce: tx.nonce_value(),
            hash_details,
            receipt_details,
        })
    }
}
