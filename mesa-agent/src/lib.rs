//! # mesa-agent
//!
//! Same-host helper process that owns physical printer I/O.
//!
//! `mesa-server` keeps one persistent connection to the agent and sends
//! `PrintRequest` frames; the agent delivers the bytes to the device and
//! answers each request with exactly one correlated `PrintAck`.
//!
//! - NETWORK targets: raw TCP to `host[:port]` (port 9100 by default)
//! - USB targets: OS print queue, by exact device name

pub mod config;
pub mod delivery;
pub mod error;
pub mod logger;
pub mod server;

pub use config::AgentConfig;
pub use delivery::{DeviceDelivery, SystemDelivery, classify_print_error};
pub use error::{AgentError, AgentResult};
pub use server::AgentServer;
