//! Unified error codes
//!
//! Error codes are organized by category:
//! - 0xxx: General errors (0 itself means success on the wire)
//! - 6xxx: Printer configuration errors
//! - 7xxx: Printing / dispatch errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error codes
///
/// Serialized as the numeric code on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 6xxx: Printer configuration ====================
    /// Printer not found
    PrinterNotFound = 6001,
    /// Printer name already used in the branch
    PrinterNameExists = 6002,
    /// Printer system identifier already used in the branch
    PrinterAddressExists = 6003,
    /// Ticket layout is structurally invalid
    InvalidTicketLayout = 6004,
    /// Station not found
    StationNotFound = 6101,
    /// Station name already used in the branch
    StationNameExists = 6102,
    /// Station still referenced by printers
    StationInUse = 6103,

    // ==================== 7xxx: Printing ====================
    /// Print job not found
    PrintJobNotFound = 7001,
    /// Printer is not available (inactive)
    PrinterNotAvailable = 7002,
    /// Delivery to the device failed
    PrintFailed = 7003,
    /// Local print-agent cannot be reached
    AgentUnavailable = 7004,
    /// No printer accepted the control ticket
    NoPrinterReached = 7005,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the default message for this error code
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",

            ErrorCode::PrinterNotFound => "Printer not found",
            ErrorCode::PrinterNameExists => "Printer name already exists",
            ErrorCode::PrinterAddressExists => "Printer address already exists",
            ErrorCode::InvalidTicketLayout => "Invalid ticket layout",
            ErrorCode::StationNotFound => "Station not found",
            ErrorCode::StationNameExists => "Station name already exists",
            ErrorCode::StationInUse => "Station is assigned to printers",

            ErrorCode::PrintJobNotFound => "Print job not found",
            ErrorCode::PrinterNotAvailable => "Printer not available",
            ErrorCode::PrintFailed => "Print failed",
            ErrorCode::AgentUnavailable => "Print agent unavailable",
            ErrorCode::NoPrinterReached => "No printer accepted the ticket",

            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown numeric code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),

            6001 => Ok(ErrorCode::PrinterNotFound),
            6002 => Ok(ErrorCode::PrinterNameExists),
            6003 => Ok(ErrorCode::PrinterAddressExists),
            6004 => Ok(ErrorCode::InvalidTicketLayout),
            6101 => Ok(ErrorCode::StationNotFound),
            6102 => Ok(ErrorCode::StationNameExists),
            6103 => Ok(ErrorCode::StationInUse),

            7001 => Ok(ErrorCode::PrintJobNotFound),
            7002 => Ok(ErrorCode::PrinterNotAvailable),
            7003 => Ok(ErrorCode::PrintFailed),
            7004 => Ok(ErrorCode::AgentUnavailable),
            7005 => Ok(ErrorCode::NoPrinterReached),

            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}
