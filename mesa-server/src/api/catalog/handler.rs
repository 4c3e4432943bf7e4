use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use shared::models::ProductCategory;

use crate::api::{ApiResult, ok};
use crate::core::ServerState;

#[derive(Debug, Deserialize)]
pub struct CategoryPayload {
    /// `null` clears the mapping
    #[serde(default)]
    pub category_id: Option<String>,
}

/// PUT /api/catalog/products/{id}
pub async fn set_category(
    State(state): State<ServerState>,
    Path(product_id): Path<String>,
    Json(payload): Json<CategoryPayload>,
) -> ApiResult<ProductCategory> {
    let mapping = state
        .config_store
        .set_product_category(&product_id, payload.category_id.as_deref())?;
    ok(mapping)
}
