//! Printing types
//!
//! Lookup seams used by routing and status tracking, plus the kitchen ticket
//! data the comanda renderer consumes.

use std::collections::HashMap;

use async_trait::async_trait;
use shared::models::{OrderRef, Printer, PrinterStatus, RoutableItem, Station};
use thiserror::Error;

/// Configuration lookup failed
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct DirectoryError(pub String);

/// Printer and station configuration as seen by the dispatcher
#[async_trait]
pub trait PrinterDirectory: Send + Sync {
    /// All printers of a branch, in creation order
    async fn branch_printers(&self, branch_id: &str) -> Result<Vec<Printer>, DirectoryError>;

    async fn branch_stations(&self, branch_id: &str) -> Result<Vec<Station>, DirectoryError>;

    async fn printer(&self, printer_id: &str) -> Result<Option<Printer>, DirectoryError>;
}

/// Product → category lookup
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Batch lookup; products without a category are absent from the map
    async fn categories_for(
        &self,
        product_ids: &[String],
    ) -> Result<HashMap<String, String>, DirectoryError>;
}

/// Single-row status persistence
pub trait PrinterStatusStore: Send + Sync {
    /// Returns `false` when the printer no longer exists
    fn set_printer_status(
        &self,
        printer_id: &str,
        status: PrinterStatus,
        at: i64,
    ) -> Result<bool, DirectoryError>;
}

/// One line of a kitchen comanda
///
/// Carries no price: kitchen tickets cannot print what they do not have.
#[derive(Debug, Clone, PartialEq)]
pub struct KitchenLine {
    pub name: String,
    pub quantity: u32,
    pub notes: Option<String>,
}

impl From<&RoutableItem> for KitchenLine {
    fn from(item: &RoutableItem) -> Self {
        Self {
            name: item.name.clone(),
            quantity: item.quantity,
            notes: item.notes.clone().filter(|n| !n.trim().is_empty()),
        }
    }
}

/// Kitchen comanda content for one station printer
#[derive(Debug, Clone, PartialEq)]
pub struct KitchenTicket {
    pub station_name: Option<String>,
    pub public_code: Option<String>,
    pub table_label: Option<String>,
    pub lines: Vec<KitchenLine>,
}

impl KitchenTicket {
    pub fn new(station_name: Option<&str>, order: &OrderRef, items: &[RoutableItem]) -> Self {
        Self {
            station_name: station_name.map(str::to_string),
            public_code: order.public_code.clone(),
            table_label: order.table_label.clone(),
            lines: items.iter().map(KitchenLine::from).collect(),
        }
    }
}
