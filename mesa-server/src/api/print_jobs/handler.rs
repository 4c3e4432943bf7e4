//! Print job handlers

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{JobOutcome, PrintJob, PrintJobStats};

use crate::api::{ApiResult, ok};
use crate::core::ServerState;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub order_id: Option<String>,
    pub printer_id: Option<String>,
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
}

/// GET /api/print-jobs?order_id=&printer_id=&offset=&limit=
///
/// Filtered lists are oldest first; the unfiltered list is newest first.
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<PrintJob>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);

    let jobs = match (&query.order_id, &query.printer_id) {
        (Some(order_id), printer_id) => state
            .jobs
            .jobs_for_order(order_id)?
            .into_iter()
            .filter(|j| printer_id.as_ref().is_none_or(|p| &j.printer_id == p))
            .skip(query.offset)
            .take(limit)
            .collect(),
        (None, Some(printer_id)) => state
            .jobs
            .jobs_for_printer(printer_id)?
            .into_iter()
            .skip(query.offset)
            .take(limit)
            .collect(),
        (None, None) => state.jobs.list_jobs(query.offset, limit)?,
    };
    ok(jobs)
}

/// GET /api/print-jobs/stats
pub async fn stats(State(state): State<ServerState>) -> ApiResult<PrintJobStats> {
    ok(state.jobs.stats()?)
}

/// GET /api/print-jobs/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<PrintJob> {
    let job = state.jobs.get_job(&id)?.ok_or_else(|| {
        AppError::with_message(ErrorCode::PrintJobNotFound, format!("Print job not found: {}", id))
            .with_detail("job_id", id.clone())
    })?;
    ok(job)
}

/// POST /api/print-jobs/{id}/reprint
pub async fn reprint(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<JobOutcome> {
    ok(state.coordinator.reprint_job(&id).await?)
}
