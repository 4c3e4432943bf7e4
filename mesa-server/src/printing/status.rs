//! Device status tracking
//!
//! Status is informational: it is written after every delivery attempt and
//! never consulted when deciding whether to print.

use std::sync::Arc;

use shared::models::PrinterStatus;
use shared::util::now_millis;

use super::types::PrinterStatusStore;

#[derive(Clone)]
pub struct DeviceStatusTracker {
    store: Arc<dyn PrinterStatusStore>,
}

impl DeviceStatusTracker {
    pub fn new(store: Arc<dyn PrinterStatusStore>) -> Self {
        Self { store }
    }

    /// Success → ONLINE, failure → ERROR
    pub fn record_outcome(&self, printer_id: &str, success: bool) {
        let status = if success {
            PrinterStatus::Online
        } else {
            PrinterStatus::Error
        };

        match self.store.set_printer_status(printer_id, status, now_millis()) {
            Ok(true) => {
                tracing::debug!(printer_id = %printer_id, status = ?status, "Printer status updated");
            }
            Ok(false) => {
                tracing::debug!(printer_id = %printer_id, "Printer vanished before status update");
            }
            Err(e) => {
                tracing::warn!(printer_id = %printer_id, error = %e, "Failed to record printer status");
            }
        }
    }
}
