//! Print dispatch handlers

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::models::{ControlTicket, DispatchResult, ItemsAddedEvent};

use crate::api::{ApiResult, ok};
use crate::core::ServerState;

/// POST /api/print/station
pub async fn station(
    State(state): State<ServerState>,
    Json(event): Json<ItemsAddedEvent>,
) -> ApiResult<DispatchResult> {
    let result = state
        .coordinator
        .dispatch_station_print(&event.order, &event.items)
        .await?;
    ok(result)
}

/// POST /api/print/events/items-added
pub async fn items_added(
    State(state): State<ServerState>,
    Json(event): Json<ItemsAddedEvent>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), AppError> {
    let order_id = event.order.order_id.clone();
    state.print_events.send(event).await.map_err(|_| {
        AppError::internal("Print event worker is not running").with_detail("order_id", order_id.clone())
    })?;

    tracing::debug!(order_id = %order_id, "Items-added event queued");
    Ok((StatusCode::ACCEPTED, Json(ApiResponse::ok())))
}

/// POST /api/print/control
///
/// Zero successful jobs (including no billing printer at all) is an error.
pub async fn control(
    State(state): State<ServerState>,
    Json(ticket): Json<ControlTicket>,
) -> ApiResult<DispatchResult> {
    let result = state.coordinator.dispatch_control_print(&ticket).await?;

    if result.success_count == 0 {
        let message = if result.is_empty() {
            "No active printer receives control tickets".to_string()
        } else {
            format!("All {} control ticket job(s) failed", result.failure_count)
        };
        return Err(AppError::with_message(ErrorCode::NoPrinterReached, message)
            .with_detail("order_id", ticket.order.order_id.clone())
            .with_detail("failure_count", result.failure_count)
            .with_detail(
                "outcomes",
                serde_json::to_value(&result.outcomes).unwrap_or_default(),
            ));
    }

    ok(result)
}
