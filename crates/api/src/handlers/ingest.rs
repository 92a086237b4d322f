//! Handlers for batch ingestion.
//!
//! Both endpoints run the same contract: validate the whole batch, then
//! apply it in one transaction while holding the state's write lock.

use std::io::ErrorKind;

use axum::extract::State;
use axum::Json;
use chrono::Local;
use salesbot_core::batch::IngestBatch;
use salesbot_core::error::CoreError;
use salesbot_db::{apply_plan, UpsertSummary};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::backup::save_backup;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Body of `POST /load-json`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoadJsonRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "json_path is required"))]
    pub json_path: String,
}

/// Success payload for both ingestion endpoints.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    pub message: String,
    pub timestamp: String,
    /// Orders upserted.
    pub confirmed_count: usize,
    /// Orders retracted.
    pub unconfirmed_count: usize,
    /// Line items written.
    pub items_count: usize,
    pub summary: UpsertSummary,
}

async fn ingest_document(state: &AppState, doc: &Value, source: &str) -> AppResult<IngestResponse> {
    let batch = IngestBatch::parse(doc)?;
    let plan = batch.plan();
    tracing::info!(
        source,
        records = batch.len(),
        confirmed = plan.orders.len(),
        unconfirmed = plan.deletions.len(),
        lines = plan.lines.len(),
        "Received sales batch",
    );

    let summary = {
        let _guard = state.write_lock.lock().await;
        apply_plan(&state.pool, &state.schema, &plan).await?
    };

    let (confirmed_count, unconfirmed_count, items_count) =
        (plan.orders.len(), plan.deletions.len(), plan.lines.len());
    Ok(IngestResponse {
        status: "success",
        message: format!(
            "Data from {source} processed. Upserted {confirmed_count} confirmed orders, \
             deleted {unconfirmed_count} unconfirmed orders, wrote {items_count} line items."
        ),
        timestamp: Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S").to_string(),
        confirmed_count,
        unconfirmed_count,
        items_count,
        summary,
    })
}

// ---------------------------------------------------------------------------
// POST /update
// ---------------------------------------------------------------------------

/// Ingest a batch posted as the request body and back it up on success.
pub async fn update(
    State(state): State<AppState>,
    Json(doc): Json<Value>,
) -> AppResult<Json<IngestResponse>> {
    let response = ingest_document(&state, &doc, "request").await?;
    save_backup(&state.config.backup_dir, &doc, Local::now().naive_local()).await;
    Ok(Json(response))
}

// ---------------------------------------------------------------------------
// POST /load-json
// ---------------------------------------------------------------------------

/// Ingest a batch file that already sits on the server's disk.
pub async fn load_json(
    State(state): State<AppState>,
    Json(input): Json<LoadJsonRequest>,
) -> AppResult<Json<IngestResponse>> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let path = input.json_path.trim();
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AppError::BadRequest(format!("File not found: {path}")));
        }
        Err(e) => return Err(CoreError::Io(e).into()),
    };
    let doc: Value = serde_json::from_slice(&bytes)
        .map_err(|e| CoreError::Parse(format!("{path}: {e}")))?;

    Ok(Json(ingest_document(&state, &doc, path).await?))
}
