//! Printer API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::models::{JobOutcome, Printer, PrinterCreate, PrinterUpdate};

use crate::api::{ApiResult, ok};
use crate::core::ServerState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub branch_id: Option<String>,
}

/// GET /api/printers?branch_id=
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Printer>> {
    let printers = state.config_store.list_printers(query.branch_id.as_deref())?;
    ok(printers)
}

/// GET /api/printers/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<Printer> {
    let printer = state.config_store.get_printer(&id)?.ok_or_else(|| {
        AppError::with_message(ErrorCode::PrinterNotFound, format!("Printer not found: {}", id))
            .with_detail("printer_id", id.clone())
    })?;
    ok(printer)
}

/// POST /api/printers
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<PrinterCreate>,
) -> ApiResult<Printer> {
    ok(state.config_store.create_printer(payload)?)
}

/// PUT /api/printers/{id}
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<PrinterUpdate>,
) -> ApiResult<Printer> {
    ok(state.config_store.update_printer(&id, payload)?)
}

/// DELETE /api/printers/{id}
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.config_store.delete_printer(&id)?;
    Ok(Json(ApiResponse::ok()))
}

/// POST /api/printers/{id}/enable
pub async fn enable(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<Printer> {
    ok(state.config_store.set_printer_active(&id, true)?)
}

/// POST /api/printers/{id}/disable
pub async fn disable(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<Printer> {
    ok(state.config_store.set_printer_active(&id, false)?)
}

/// POST /api/printers/{id}/test
///
/// Blocks until the agent answers; a failed delivery is an error response.
pub async fn test_print(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<JobOutcome> {
    ok(state.coordinator.dispatch_test_print(&id).await?)
}
