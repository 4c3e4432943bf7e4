//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // 404 Not Found
            Self::NotFound
            | Self::PrinterNotFound
            | Self::StationNotFound
            | Self::PrintJobNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::PrinterNameExists
            | Self::PrinterAddressExists
            | Self::StationNameExists
            | Self::StationInUse => StatusCode::CONFLICT,

            // 422 Unprocessable (request understood, printer cannot take it)
            Self::InvalidTicketLayout | Self::PrinterNotAvailable => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            // 502 Bad Gateway (device behind the agent failed)
            Self::PrintFailed | Self::NoPrinterReached => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable (transient, client can retry)
            Self::AgentUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::InternalError | Self::DatabaseError | Self::ConfigError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            // 400 Bad Request
            Self::ValidationFailed | Self::InvalidRequest => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}
