//! Device delivery
//!
//! Maps a wire [`PrintTarget`] onto the matching `mesa-printer` adapter.

use async_trait::async_trait;
use mesa_printer::{NetworkPrinter, PrintError, Printer, QueuePrinter};
use shared::agent::{AgentErrorKind, PrintTarget};
use shared::models::ConnectionKind;
use std::time::Duration;

/// Delivers raw bytes to one device
#[async_trait]
pub trait DeviceDelivery: Send + Sync {
    async fn deliver(&self, target: &PrintTarget, data: &[u8]) -> Result<(), PrintError>;
}

/// Real devices: raw TCP or the OS print queue
#[derive(Debug, Clone)]
pub struct SystemDelivery {
    timeout: Duration,
}

impl SystemDelivery {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl DeviceDelivery for SystemDelivery {
    async fn deliver(&self, target: &PrintTarget, data: &[u8]) -> Result<(), PrintError> {
        match target.kind {
            ConnectionKind::Network => {
                NetworkPrinter::from_target(&target.address)?
                    .with_timeout(self.timeout)
                    .print(data)
                    .await
            }
            ConnectionKind::Usb => {
                QueuePrinter::new(&target.address)?
                    .with_timeout(self.timeout)
                    .print(data)
                    .await
            }
        }
    }
}

/// Wire error class for a delivery failure
pub fn classify_print_error(err: &PrintError) -> AgentErrorKind {
    match err {
        PrintError::Timeout(_) => AgentErrorKind::Timeout,
        PrintError::DeviceNotFound(_) => AgentErrorKind::DeviceNotFound,
        PrintError::QueueBusy(_) => AgentErrorKind::QueueBusy,
        PrintError::Refused(_) | PrintError::Connection(_) => AgentErrorKind::ConnectionRefused,
        PrintError::InvalidConfig(_) => AgentErrorKind::InvalidRequest,
        PrintError::Io(_) | PrintError::Unsupported(_) => AgentErrorKind::Internal,
    }
}
