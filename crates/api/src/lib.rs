//! Read-side HTTP API over the ingestion store.
//!
//! A thin query layer: list with pagination and an optional type filter,
//! plus lookup by hash. It never writes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::error;

use starkscope_db::models::{TransactionRecord, TxType};
use starkscope_db::{StoreError, TransactionStore};

/// Fixed page size of the listing endpoint.
pub const PAGE_SIZE: u32 = 10;

/// Success envelope; the explorer frontend unwraps `data`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse<T> {
    status_code: u16,
    data: T,
    success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            status_code: StatusCode::OK.as_u16(),
            data,
            success: true,
        })
    }
}

/// Error envelope with the matching HTTP status.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        error!("Store failure serving query: {}", err);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "internal error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "statusCode": self.status.as_u16(),
            "message": self.message,
            "success": false,
        });
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct ListParams {
    page: Option<u32>,
    #[serde(rename = "type")]
    tx_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionPage {
    transactions: Vec<TransactionRecord>,
    total: u64,
    page: u32,
    page_size: u32,
}

/// Build the API router. CORS is permissive: the explorer frontend is
/// served from a different origin.
pub fn router(store: TransactionStore) -> Router {
    Router::new()
        .route("/api/v1/transactions", get(list_transactions))
        .route("/api/v1/transactions/:hash", get(get_transaction))
        .layer(CorsLayer::permissive())
        .with_state(store)
}

async fn list_transactions(
    State(store): State<TransactionStore>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<TransactionPage>>, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let tx_type = match params.tx_type.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            TxType::parse(raw)
                .ok_or_else(|| ApiError::bad_request(format!("unknown transaction type {raw:?}")))?,
        ),
    };

    let (transactions, total) = store.page(page, PAGE_SIZE, tx_type).await?;

    Ok(ApiResponse::ok(TransactionPage {
        transactions,
        total,
        page,
        page_size: PAGE_SIZE,
    }))
}

async fn get_transaction(
    State(store): State<TransactionStore>,
    Path(hash): Path<String>,
) -> Result<Json<ApiResponse<TransactionRecord>>, ApiError> {
    let record = store
        .by_hash(&hash)
        .await?
        .ok_or_else(|| ApiError::not_found("Transaction not found"))?;

    Ok(ApiResponse::ok(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use starkscope_db::models::{HashDetails, ReceiptDetails, TxStatus};
    use starkscope_db::DbPool;
    use tower::ServiceExt;

    async fn seeded_router(count: u64) -> Router {
        let db = DbPool::new(":memory:").await.unwrap();
        db.migrate().await.unwrap();
        let store = TransactionStore::new(db);
        for i in 0..count {
            let record = TransactionRecord {
                hash: format!("0x{i:x}"),
                block_number: i,
                timestamp: 1700000000 + i,
                tx_type: if i % 2 == 0 {
                    TxType::Invoke
                } else {
                    TxType::Declare
                },
                status: TxStatus::AcceptedOnL2,
                nonce: i,
                hash_details: HashDetails::default(),
                receipt_details: ReceiptDetails::default(),
            };
            store.upsert(&record).await.unwrap();
        }
        router(store)
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn listing_pages_newest_first() {
        let app = seeded_router(15).await;
        let (status, body) = get_json(app, "/api/v1/transactions?page=1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let data = &body["data"];
        assert_eq!(data["total"], 15);
        assert_eq!(data["page"], 1);
        assert_eq!(data["pageSize"], 10);
        let transactions = data["transactions"].as_array().unwrap();
        assert_eq!(transactions.len(), 10);
        assert_eq!(transactions[0]["blockNumber"], 14);
    }

    #[tokio::test]
    async fn listing_filters_by_type() {
        let app = seeded_router(10).await;
        let (status, body) = get_json(app, "/api/v1/transactions?type=DECLARE").await;

        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["total"], 5);
        for tx in data["transactions"].as_array().unwrap() {
            assert_eq!(tx["type"], "DECLARE");
        }
    }

    #[tokio::test]
    async fn unknown_type_is_rejected() {
        let app = seeded_router(1).await;
        let (status, body) = get_json(app, "/api/v1/transactions?type=TRANSFER").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn lookup_by_hash() {
        let app = seeded_router(3).await;
        let (status, body) = get_json(app, "/api/v1/transactions/0x2").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["hash"], "0x2");
        assert_eq!(body["data"]["status"], "ACCEPTED_ON_L2");
    }

    #[tokio::test]
    async fn missing_hash_is_not_found() {
        let app = seeded_router(1).await;
        let (status, body) = get_json(app, "/api/v1/transactions/0xmissing").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}
