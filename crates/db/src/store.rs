//! Idempotent transaction persistence and the read-side queries.

use chrono::Utc;
use sqlx::Row;
use thiserror::Error;
use tracing::debug;

use crate::models::{TransactionRecord, TransactionRow, TxStatus, TxType};
use crate::pool::DbPool;

/// Result of an upsert attempt.
///
/// A duplicate hash is the expected steady-state outcome for re-polled
/// blocks, so it is a reported outcome rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    DuplicateSkipped,
}

/// Persistence failures other than the duplicate-key case.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
    #[error("payload codec failure: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

impl TryFrom<TransactionRow> for TransactionRecord {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, StoreError> {
        let tx_type = TxType::parse(&row.tx_type).ok_or_else(|| {
            StoreError::Corrupt(format!("unrecognized transaction type {:?}", row.tx_type))
        })?;
        let status = TxStatus::parse(&row.status).ok_or_else(|| {
            StoreError::Corrupt(format!("unrecognized status {:?}", row.status))
        })?;

        Ok(TransactionRecord {
            hash: row.hash,
            block_number: row.block_number as u64,
            timestamp: row.timestamp as u64,
            tx_type,
            status,
            nonce: row.nonce as u64,
            hash_details: serde_json::from_str(&row.hash_details)?,
            receipt_details: serde_json::from_str(&row.receipt_details)?,
        })
    }
}

/// Store for enriched transaction records.
///
/// The `hash` primary key is the sole concurrency-control mechanism of the
/// pipeline; everything else builds on upserts being idempotent.
#[derive(Clone)]
pub struct TransactionStore {
    db: DbPool,
}

impl TransactionStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Insert a record, keyed by hash.
    ///
    /// Returns [`UpsertOutcome::DuplicateSkipped`] when a record with the
    /// same hash is already present; the stored row is left untouched.
    pub async fn upsert(&self, record: &TransactionRecord) -> Result<UpsertOutcome, StoreError> {
        let hash_details = serde_json::to_string(&record.hash_details)?;
        let receipt_details = serde_json::to_string(&record.receipt_details)?;

        let result = sqlx::query(
            r#"
            INSERT INTO transactions (
                hash, block_number, timestamp, tx_type, status, nonce,
                hash_details, receipt_details, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(hash) DO NOTHING
            "#,
        )
        .bind(&record.hash)
        .bind(record.block_number as i64)
        .bind(record.timestamp as i64)
        .bind(record.tx_type.as_str())
        .bind(record.status.as_str())
        .bind(record.nonce as i64)
        .bind(&hash_details)
        .bind(&receipt_details)
        .bind(Utc::now().to_rfc3339())
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            debug!("Transaction {} already stored, skipping", record.hash);
            Ok(UpsertOutcome::DuplicateSkipped)
        } else {
            Ok(UpsertOutcome::Inserted)
        }
    }

    /// Fetch one page of records, newest block first, together with the
    /// total count matching the filter.
    pub async fn page(
        &self,
        page: u32,
        page_size: u32,
        tx_type: Option<TxType>,
    ) -> Result<(Vec<TransactionRecord>, u64), StoreError> {
        let offset = (page.saturating_sub(1) as i64) * page_size as i64;
        let limit = page_size as i64;

        let (rows, total) = match tx_type {
            Some(ty) => {
                let rows = sqlx::query_as::<_, TransactionRow>(
                    r#"
                    SELECT * FROM transactions
                    WHERE tx_type = ?
                    ORDER BY block_number DESC, hash ASC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(ty.as_str())
                .bind(limit)
                .bind(offset)
                .fetch_all(self.db.pool())
                .await?;
                let total: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE tx_type = ?")
                        .bind(ty.as_str())
                        .fetch_one(self.db.pool())
                        .await?;
                (rows, total)
            }
            None => {
                let rows = sqlx::query_as::<_, TransactionRow>(
                    r#"
                    SELECT * FROM transactions
                    ORDER BY block_number DESC, hash ASC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(self.db.pool())
                .await?;
                let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
                    .fetch_one(self.db.pool())
                    .await?;
                (rows, total)
            }
        };

        let records = rows
            .into_iter()
            .map(TransactionRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((records, total as u64))
    }

    /// Look up a single record by transaction hash.
    pub async fn by_hash(&self, hash: &str) -> Result<Option<TransactionRecord>, StoreError> {
        let row = sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE hash = ?")
            .bind(hash)
            .fetch_optional(self.db.pool())
            .await?;

        row.map(TransactionRecord::try_from).transpose()
    }

    /// Total number of stored records.
    pub async fn count(&self) -> Result<u64, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(self.db.pool())
            .await?;
        Ok(total as u64)
    }

    /// Distinct timestamps recorded for one block number.
    pub async fn timestamps_for_block(&self, block_number: u64) -> Result<Vec<u64>, StoreError> {
        let rows = sqlx::query(
            "SELECT DISTINCT timestamp FROM transactions WHERE block_number = ?",
        )
        .bind(block_number as i64)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.get::<i64, _>(0) as u64)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HashDetails, ReceiptDetails};

    async fn memory_store() -> TransactionStore {
        let db = DbPool::new(":memory:").await.unwrap();
        db.migrate().await.unwrap();
        TransactionStore::new(db)
    }

    fn record(hash: &str, block_number: u64, tx_type: TxType) -> TransactionRecord {
        TransactionRecord {
            hash: hash.to_string(),
            block_number,
            timestamp: 1700000000 + block_number,
            tx_type,
            status: TxStatus::AcceptedOnL2,
            nonce: 1,
            hash_details: HashDetails {
                sender_address: Some("0xsender".into()),
                ..Default::default()
            },
            receipt_details: ReceiptDetails::default(),
        }
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let store = memory_store().await;
        let r = record("0xabc", 5, TxType::Invoke);

        assert_eq!(store.upsert(&r).await.unwrap(), UpsertOutcome::Inserted);
        assert_eq!(
            store.upsert(&r).await.unwrap(),
            UpsertOutcome::DuplicateSkipped
        );
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_leaves_existing_row_untouched() {
        let store = memory_store().await;
        let first = record("0xabc", 5, TxType::Invoke);
        store.upsert(&first).await.unwrap();

        let mut second = record("0xabc", 9, TxType::Declare);
        second.nonce = 99;
        assert_eq!(
            store.upsert(&second).await.unwrap(),
            UpsertOutcome::DuplicateSkipped
        );

        let stored = store.by_hash("0xabc").await.unwrap().unwrap();
        assert_eq!(stored.block_number, 5);
        assert_eq!(stored.tx_type, TxType::Invoke);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn page_filters_by_type_and_reports_total() {
        let store = memory_store().await;
        for i in 0..15 {
            let ty = if i % 3 == 0 {
                TxType::Declare
            } else {
                TxType::Invoke
            };
            store.upsert(&record(&format!("0x{i:x}"), i, ty)).await.unwrap();
        }

        let (page_one, total) = store.page(1, 10, None).await.unwrap();
        assert_eq!(total, 15);
        assert_eq!(page_one.len(), 10);
        // Newest block first.
        assert_eq!(page_one[0].block_number, 14);

        let (declares, declare_total) =
            store.page(1, 10, Some(TxType::Declare)).await.unwrap();
        assert_eq!(declare_total, 5);
        assert!(declares.iter().all(|r| r.tx_type == TxType::Declare));

        let (page_two, _) = store.page(2, 10, None).await.unwrap();
        assert_eq!(page_two.len(), 5);
    }

    #[tokio::test]
    async fn by_hash_misses_return_none() {
        let store = memory_store().await;
        assert!(store.by_hash("0xmissing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn detail_payloads_round_trip_through_storage() {
        let store = memory_store().await;
        let mut r = record("0xdeadbeef", 3, TxType::DeployAccount);
        r.hash_details.calldata = Some(vec!["0x1".into(), "0x2".into()]);
        r.hash_details
            .extra
            .insert("tip".into(), serde_json::json!("0x0"));
        r.receipt_details.actual_fee = Some(serde_json::json!({
            "amount": "0x1234",
            "unit": "FRI"
        }));
        store.upsert(&r).await.unwrap();

        let stored = store.by_hash("0xdeadbeef").await.unwrap().unwrap();
        assert_eq!(stored.hash_details.calldata, r.hash_details.calldata);
        assert_eq!(stored.hash_details.extra["tip"], serde_json::json!("0x0"));
        assert_eq!(stored.receipt_details.actual_fee, r.receipt_details.actual_fee);
    }
}
