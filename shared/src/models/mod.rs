//! Data models
//!
//! Shared between mesa-server, mesa-agent and API clients.
//! All IDs are UUID v4 strings; timestamps are UTC milliseconds.

pub mod dispatch;
pub mod print_job;
pub mod printer;
pub mod station;

// Re-exports
pub use dispatch::*;
pub use print_job::*;
pub use printer::*;
pub use station::*;

use serde::{Deserialize, Deserializer};

/// Distinguish "field absent" from "field set to null" in update payloads
///
/// Absent → `None`, `null` → `Some(None)`, value → `Some(Some(v))`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
