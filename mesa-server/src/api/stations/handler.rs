//! Station API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::error::{ApiResponse, AppError};
use shared::models::{Station, StationCreate, StationUpdate};

use crate::api::{ApiResult, ok};
use crate::core::ServerState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub branch_id: Option<String>,
}

/// GET /api/stations?branch_id=
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Station>> {
    let branch_id = query
        .branch_id
        .filter(|b| !b.trim().is_empty())
        .ok_or_else(|| AppError::validation("branch_id is required").with_detail("field", "branch_id"))?;
    ok(state.config_store.list_stations(&branch_id)?)
}

/// POST /api/stations
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<StationCreate>,
) -> ApiResult<Station> {
    ok(state.config_store.create_station(payload)?)
}

/// PUT /api/stations/{id}
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<StationUpdate>,
) -> ApiResult<Station> {
    ok(state.config_store.update_station(&id, payload)?)
}

/// DELETE /api/stations/{id}
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.config_store.delete_station(&id)?;
    Ok(Json(ApiResponse::ok()))
}
