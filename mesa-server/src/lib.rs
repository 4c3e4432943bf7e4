//! # mesa-server
//!
//! Print dispatch engine for the Mesa restaurant back office.
//!
//! For a kitchen order or billing event it decides which ticket printers
//! receive which content, renders ESC/POS tickets, fans jobs out through
//! the local print-agent and records per-job outcome and per-device status.
//!
//! - [`printing`]: routing, formatting, job store, status, transport, coordinator
//! - [`db`]: printer / station / catalog configuration store
//! - [`api`]: HTTP surface
//! - [`core`]: configuration, shared state, server lifecycle

pub mod api;
pub mod core;
pub mod db;
pub mod printing;
pub mod utils;

pub use crate::core::{Config, Server, ServerError, ServerState};
pub use printing::{DispatchCoordinator, DispatchError};
