//! Dispatch request and result types
//!
//! Inputs arrive from the order service; results go back to it (or to the
//! UI for the explicit test and control actions).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An order line as seen by the print dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutableItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    /// Only used by control tickets
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Backfilled from the catalog when absent
    #[serde(default)]
    pub category_id: Option<String>,
}

/// Identity of the order an event refers to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRef {
    pub order_id: String,
    pub branch_id: String,
    /// Short code printed on tickets (e.g. "A-042")
    #[serde(default)]
    pub public_code: Option<String>,
    #[serde(default)]
    pub table_label: Option<String>,
}

/// Items newly persisted on an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemsAddedEvent {
    pub order: OrderRef,
    pub items: Vec<RoutableItem>,
}

/// Business identity printed at the top of control tickets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessHeader {
    pub name: String,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Full order data for a control ticket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlTicket {
    pub order: OrderRef,
    #[serde(default)]
    pub business: Option<BusinessHeader>,
    /// e.g. "Mesa", "Para llevar"
    #[serde(default)]
    pub order_type: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub server_name: Option<String>,
    pub items: Vec<RoutableItem>,
    /// Percentage (10 = 10%); the discount line is printed whenever this is set
    #[serde(default)]
    pub discount_percentage: Option<Decimal>,
    /// Tax rate included in prices, as a percentage
    #[serde(default)]
    pub tax_rate: Decimal,
}

/// Result of one (printer, copy) attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    /// `None` when the job record itself could not be written
    pub job_id: Option<String>,
    pub copy_index: u32,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// All attempts made against one printer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterOutcome {
    pub printer_id: String,
    pub printer_name: String,
    pub jobs: Vec<JobOutcome>,
}

impl PrinterOutcome {
    pub fn success_count(&self) -> usize {
        self.jobs.iter().filter(|j| j.success).count()
    }

    pub fn failure_count(&self) -> usize {
        self.jobs.len() - self.success_count()
    }
}

/// Aggregate of a dispatch; counts are per job (printer × copy)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub outcomes: Vec<PrinterOutcome>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl DispatchResult {
    pub fn from_outcomes(outcomes: Vec<PrinterOutcome>) -> Self {
        let success_count = outcomes.iter().map(PrinterOutcome::success_count).sum();
        let failure_count = outcomes.iter().map(PrinterOutcome::failure_count).sum();
        Self {
            outcomes,
            success_count,
            failure_count,
        }
    }

    /// No printer was targeted
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
