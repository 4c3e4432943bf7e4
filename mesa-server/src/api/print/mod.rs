//! Print dispatch API
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /api/print/station | POST | Station dispatch, waits for every printer |
//! | /api/print/events/items-added | POST | Queue for the print event worker (202) |
//! | /api/print/control | POST | Control ticket; fails when no printer accepted it |

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/print", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/station", post(handler::station))
        .route("/events/items-added", post(handler::items_added))
        .route("/control", post(handler::control))
}
