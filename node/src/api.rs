//! # REST API
//!
//! Builds the axum router that exposes the ledger over HTTP. All endpoints
//! share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path               | Description                             |
//! |--------|--------------------|-----------------------------------------|
//! | GET    | `/health`          | Liveness check                          |
//! | GET    | `/status`          | Chain length, tail hash, degraded flag  |
//! | POST   | `/records`         | Append a diagnostic record              |
//! | GET    | `/records`         | All diagnostic records, oldest first    |
//! | GET    | `/blocks`          | Every block plus the validation result  |
//! | GET    | `/blocks/:index`   | Block by index                          |
//! | GET    | `/chain/validate`  | Full integrity report                   |
//!
//! Ledger calls are synchronous and may hit the disk, so every handler runs
//! them on tokio's blocking pool.

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use diabot_ledger::storage::{Block, BlockStore, Ledger};
use diabot_ledger::{ChainViolation, LedgerError};

use crate::metrics::SharedMetrics;

/// The ledger as shared by the node. The store is type-erased so the same
/// router serves both sled-backed and ephemeral nodes.
pub type SharedLedger = Arc<Ledger<Box<dyn BlockStore>>>;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    pub ledger: SharedLedger,
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/records", get(list_records_handler).post(append_record_handler))
        .route("/blocks", get(list_blocks_handler))
        .route("/blocks/:index", get(block_by_index_handler))
        .route("/chain/validate", get(validate_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    /// Number of blocks, genesis included.
    pub chain_length: usize,
    pub latest_index: u64,
    pub latest_hash: String,
    /// True when the node is running on an in-memory genesis because the
    /// store could not be loaded.
    pub degraded: bool,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `POST /records`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AppendResponse {
    pub index: u64,
    pub hash: String,
}

/// Response payload for `GET /records`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordsResponse {
    pub count: usize,
    pub records: Vec<Value>,
}

/// A block as presented to API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct BlockView {
    pub index: u64,
    /// `YYYY-MM-DD HH:MM:SS UTC`, or the raw seconds if out of range.
    pub timestamp: String,
    pub data: Value,
    pub previous_hash: String,
    pub hash: String,
}

impl From<&Block> for BlockView {
    fn from(block: &Block) -> Self {
        Self {
            index: block.index(),
            timestamp: format_block_time(block.timestamp()),
            data: block.data().clone(),
            previous_hash: block.previous_hash().to_string(),
            hash: block.hash().to_string(),
        }
    }
}

/// Response payload for `GET /blocks`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BlocksResponse {
    pub valid: bool,
    pub length: usize,
    pub blocks: Vec<BlockView>,
}

/// Result of a full-chain integrity check. Returned by
/// `GET /chain/validate` and printed by `diabot-node verify`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_invalid_index: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationReport {
    pub fn new(length: usize, result: Result<(), ChainViolation>) -> Self {
        match result {
            Ok(()) => Self {
                valid: true,
                length,
                first_invalid_index: None,
                message: None,
            },
            Err(violation) => Self {
                valid: false,
                length,
                first_invalid_index: Some(violation.block_index()),
                message: Some(violation.to_string()),
            },
        }
    }
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An error that renders as a status code plus [`ErrorResponse`] body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let status = match err {
            LedgerError::Construction(_) | LedgerError::InvalidTimestamp { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            LedgerError::PersistFailed { .. } | LedgerError::OutOfSync { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!(error = %err, "ledger task failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Run `f` against the ledger on the blocking pool.
async fn with_ledger<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Ledger<Box<dyn BlockStore>>) -> T + Send + 'static,
    T: Send + 'static,
{
    let ledger = Arc::clone(&state.ledger);
    Ok(tokio::task::spawn_blocking(move || f(&ledger)).await?)
}

/// Render Unix seconds as `YYYY-MM-DD HH:MM:SS UTC`.
pub fn format_block_time(timestamp: f64) -> String {
    let secs = timestamp.floor();
    let nanos = ((timestamp - secs) * 1e9).clamp(0.0, 999_999_999.0) as u32;
    match chrono::DateTime::from_timestamp(secs as i64, nanos) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => timestamp.to_string(),
    }
}

fn record_validation(metrics: &SharedMetrics, report: &ValidationReport) {
    metrics.chain_validations_total.inc();
    if !report.valid {
        metrics.chain_validation_failures_total.inc();
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the process is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — chain summary.
async fn status_handler(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let (length, latest, degraded) = with_ledger(&state, |ledger| {
        let latest = ledger.latest();
        let degraded = ledger
            .load_outcome()
            .is_some_and(|outcome| outcome.is_degraded());
        (ledger.len(), latest, degraded)
    })
    .await?;

    Ok(Json(StatusResponse {
        version: state.version.clone(),
        chain_length: length,
        latest_index: latest.index(),
        latest_hash: latest.hash().to_string(),
        degraded,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

/// `POST /records` — wrap the body as a diagnostic record and append it.
///
/// The body must be a JSON object. Responds 201 with the new block's index
/// and hash, 422 when the record cannot be stored in a block, and 503 when
/// the store refused the block.
async fn append_record_handler(
    State(state): State<AppState>,
    Json(record): Json<Value>,
) -> Result<(StatusCode, Json<AppendResponse>), ApiError> {
    if !record.is_object() {
        state.metrics.append_failures_total.inc();
        return Err(ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "a diagnostic record must be a JSON object",
        ));
    }

    let (result, elapsed, length) = with_ledger(&state, move |ledger| {
        let started = Instant::now();
        let result = ledger.append_diagnostic_record(&record);
        (result, started.elapsed(), ledger.len())
    })
    .await?;

    state
        .metrics
        .append_latency_seconds
        .observe(elapsed.as_secs_f64());
    state.metrics.chain_length.set(length as i64);

    match result {
        Ok(block) => {
            state.metrics.blocks_appended_total.inc();
            Ok((
                StatusCode::CREATED,
                Json(AppendResponse {
                    index: block.index(),
                    hash: block.hash().to_string(),
                }),
            ))
        }
        Err(e) => {
            state.metrics.append_failures_total.inc();
            tracing::warn!(error = %e, "diagnostic record rejected");
            Err(e.into())
        }
    }
}

/// `GET /records` — every diagnostic record, oldest first.
async fn list_records_handler(
    State(state): State<AppState>,
) -> Result<Json<RecordsResponse>, ApiError> {
    let records = with_ledger(&state, |ledger| ledger.records()).await?;
    Ok(Json(RecordsResponse {
        count: records.len(),
        records,
    }))
}

/// `GET /blocks` — the whole chain with its validation result.
async fn list_blocks_handler(
    State(state): State<AppState>,
) -> Result<Json<BlocksResponse>, ApiError> {
    let (blocks, verdict) =
        with_ledger(&state, |ledger| (ledger.blocks(), ledger.verify_chain())).await?;

    let report = ValidationReport::new(blocks.len(), verdict);
    record_validation(&state.metrics, &report);

    Ok(Json(BlocksResponse {
        valid: report.valid,
        length: blocks.len(),
        blocks: blocks.iter().map(BlockView::from).collect(),
    }))
}

/// `GET /blocks/:index` — a single block, or 404.
async fn block_by_index_handler(
    Path(index): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<BlockView>, ApiError> {
    match with_ledger(&state, move |ledger| ledger.block(index)).await? {
        Some(block) => Ok(Json(BlockView::from(&block))),
        None => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("Block not found at index {index}"),
        )),
    }
}

/// `GET /chain/validate` — full integrity report.
async fn validate_handler(
    State(state): State<AppState>,
) -> Result<Json<ValidationReport>, ApiError> {
    let (length, verdict) =
        with_ledger(&state, |ledger| (ledger.len(), ledger.verify_chain())).await?;

    let report = ValidationReport::new(length, verdict);
    record_validation(&state.metrics, &report);
    if let Some(message) = &report.message {
        tracing::warn!(%message, "chain validation failed");
    }
    Ok(Json(report))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
