//! Per-block ingestion: fetch the listing, enrich and store each
//! transaction, aggregate outcomes.

use std::sync::Arc;

use tracing::{info, warn};

use starkscope_db::{TransactionStore, UpsertOutcome};
use starkscope_telemetry::Metrics;

use crate::enricher::Enricher;
use crate::error::BlockFetchError;
use crate::rpc_client::ChainClient;

/// Aggregate outcome counts for one ingested block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockResult {
    pub inserted: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Ingests a single block: fetch, enrich, upsert, count.
pub struct BlockIngestor {
    client: Arc<dyn ChainClient>,
    enricher: Enricher,
    store: TransactionStore,
    metrics: Metrics,
}

impl BlockIngestor {
    pub fn new(client: Arc<dyn ChainClient>, store: TransactionStore, metrics: Metrics) -> Self {
        Self {
            enricher: Enricher::new(client.clone()),
            client,
            store,
            metrics,
        }
    }

    /// Ingest one block.
    ///
    /// A failed block listing aborts the whole block. Per-transaction
    /// failures are counted and logged; one bad transaction never aborts
    /// the rest of the block. Re-ingested transactions resolve to
    /// duplicates and count as skipped.
    pub async fn ingest_block(&self, block_number: u64) -> Result<BlockResult, BlockFetchError> {
        let block = self
            .client
            .block_with_txs(block_number)
            .await
            .map_err(|source| BlockFetchError {
                block_number,
                source,
            })?;

        let mut result = BlockResult::default();
        for tx in &block.transactions {
            let record = match self.enricher.enrich(block_number, block.timestamp, tx).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(
                        "Failed to enrich transaction {} in block {}: {}",
                        tx.transaction_hash, block_number, e
                    );
                    result.failed += 1;
                    continue;
                }
            };

            match self.store.upsert(&record).await {
                Ok(UpsertOutcome::Inserted) => result.inserted += 1,
                Ok(UpsertOutcome::DuplicateSkipped) => result.skipped += 1,
                Err(e) => {
                    warn!(
                        "Failed to store transaction {} in block {}: {}",
                        record.hash, block_number, e
                    );
                    result.failed += 1;
                }
            }
        }

        self.metrics.inc_blocks_ingested();
        self.metrics.inc_transactions_inserted(result.inserted);
        self.metrics.inc_transactions_duplicate(result.skipped);
        self.metrics.inc_transactions_failed(result.failed);

        info!(
            "Ingested block {}: {} inserted, {} duplicate, {} failed",
            block_number, result.inserted, result.skipped, result.failed
        );

        Ok(result)
    }
}
