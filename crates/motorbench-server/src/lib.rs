//! HTTP ingest guard — single-copy persistence of uploaded test records.
//!
//! One logical operation: `POST /api/v1/test-records` keyed by the
//! `x-record-id` header, answering 201 Accepted, 409 Duplicate, or 422
//! Invalid. The storage-layer uniqueness constraint lives in
//! [`store::RecordStore`]; this module only maps it onto HTTP.

pub mod store;

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use uuid::Uuid;

use motorbench_core::upload::{INGEST_PATH, RECORD_ID_HEADER};
use store::{IngestOutcome, RecordStore, StoreError};

/// Shared server state.
struct AppState {
    store: RecordStore,
}

#[derive(Serialize)]
struct IngestReply {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    record_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl IngestReply {
    fn ok(status: &'static str, record_id: Uuid) -> Self {
        Self {
            status,
            record_id: Some(record_id),
            error: None,
        }
    }

    fn err(status: &'static str, error: String) -> Self {
        Self {
            status,
            record_id: None,
            error: Some(error),
        }
    }
}

#[derive(Serialize)]
struct ListReply {
    records: Vec<store::RecordMeta>,
    total: usize,
}

#[derive(Serialize)]
struct HealthReply {
    status: &'static str,
    records_stored: usize,
}

async fn handle_ingest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<IngestReply>) {
    let record_id = match headers
        .get(RECORD_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Uuid>().ok())
    {
        Some(id) => id,
        None => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(IngestReply::err(
                    "invalid",
                    format!("missing or malformed {RECORD_ID_HEADER} header"),
                )),
            );
        }
    };

    match state.store.ingest(record_id, &body) {
        Ok(IngestOutcome::Accepted) => (
            StatusCode::CREATED,
            Json(IngestReply::ok("accepted", record_id)),
        ),
        Ok(IngestOutcome::Duplicate) => (
            StatusCode::CONFLICT,
            Json(IngestReply::ok("duplicate", record_id)),
        ),
        Err(StoreError::Invalid(reason)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(IngestReply::err("invalid", reason)),
        ),
        Err(StoreError::Io(e)) => {
            log::error!("ingest {record_id}: storage i/o failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(IngestReply::err("error", "storage failure".to_string())),
            )
        }
    }
}

async fn handle_list(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ListReply>) {
    match state.store.list() {
        Ok(records) => {
            let total = records.len();
            (StatusCode::OK, Json(ListReply { records, total }))
        }
        Err(e) => {
            log::error!("list failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ListReply {
                    records: Vec::new(),
                    total: 0,
                }),
            )
        }
    }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthReply> {
    let records_stored = state.store.list().map(|r| r.len()).unwrap_or(0);
    Json(HealthReply {
        status: "ok",
        records_stored,
    })
}

/// Build the axum router.
pub fn build_router(store: RecordStore) -> Router {
    let state = Arc::new(AppState { store });

    Router::new()
        .route(INGEST_PATH, post(handle_ingest).get(handle_list))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Run the ingest guard service until the process exits.
pub async fn run_server(store: RecordStore, host: &str, port: u16) -> std::io::Result<()> {
    let app = build_router(store);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("ingest guard listening on {addr}");
    axum::serve(listener, app).await
}
