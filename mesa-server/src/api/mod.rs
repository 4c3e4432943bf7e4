//! HTTP API
//!
//! - [`health`] - liveness and print-agent reachability
//! - [`printers`] - printer configuration, enable/disable, test page
//! - [`stations`] - station configuration
//! - [`catalog`] - product → category sync
//! - [`print`] - station, control and queued dispatch
//! - [`print_jobs`] - job audit trail and reprint

pub mod catalog;
pub mod health;
pub mod print;
pub mod print_jobs;
pub mod printers;
pub mod stations;

use axum::{Json, Router};
use shared::error::{ApiResponse, AppResult};
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// Handler result wrapped in the shared response envelope
pub type ApiResult<T> = AppResult<Json<ApiResponse<T>>>;

pub(crate) fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(printers::router())
        .merge(stations::router())
        .merge(catalog::router())
        .merge(print::router())
        .merge(print_jobs::router())
}

/// Router with middleware, used by the server and by tests
pub fn build_app() -> Router<ServerState> {
    build_router().layer(TraceLayer::new_for_http())
}
