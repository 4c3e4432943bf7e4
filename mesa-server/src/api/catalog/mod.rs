//! Catalog sync API
//!
//! The product service pushes each product's category here so routing can
//! backfill items that arrive without one.

mod handler;

use axum::{Router, routing::put};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/catalog/products/{id}", put(handler::set_category))
}
