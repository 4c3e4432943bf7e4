//! Shared types for the Mesa print dispatch services
//!
//! Domain models, the unified error envelope and the print-agent wire
//! protocol, used by both `mesa-server` and `mesa-agent`.

pub mod agent;
pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
