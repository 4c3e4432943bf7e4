//! Health check
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /health | GET | Liveness plus print-agent reachability |
//!
//! ```json
//! { "status": "ok", "version": "0.1.0", "agent": "connected" }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "ok" while the process serves requests
    status: &'static str,
    version: &'static str,
    /// "connected" | "unreachable"
    agent: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent_error: Option<String>,
}

/// GET /health
pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let (agent, agent_error) = match state.transport.probe().await {
        Ok(()) => ("connected", None),
        Err(e) => ("unreachable", Some(e.to_string())),
    };

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        agent,
        agent_error,
    })
}
