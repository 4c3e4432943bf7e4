//! Station Model

use serde::{Deserialize, Serialize};

/// Logical kitchen/bar destination routing a set of product categories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub branch_id: String,
    pub name: String,
    /// Ordered, duplicate-free
    #[serde(default)]
    pub category_ids: Vec<String>,
    pub created_at: i64,
}

/// Create station payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationCreate {
    pub branch_id: String,
    pub name: String,
    #[serde(default)]
    pub category_ids: Vec<String>,
}

/// Update station payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StationUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_ids: Option<Vec<String>>,
}

/// Catalog entry mapping a product to its category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCategory {
    pub product_id: String,
    pub category_id: Option<String>,
}
