//! # mesa-printer
//!
//! ESC/POS thermal printer library - low-level printing capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - ESC/POS command building
//! - Windows-1252 encoding for Latin receipt printers
//! - Column-width layout helpers (pad, truncate, wrap)
//! - Network printing (raw TCP, port 9100)
//! - OS print queue delivery by device name
//!
//! Business logic (WHAT to print) stays in application code:
//! - Comanda / control ticket rendering → mesa-server
//! - Device brokering → mesa-agent
//!
//! ## Example
//!
//! ```ignore
//! use mesa_printer::{EscPosBuilder, NetworkPrinter, Printer};
//!
//! let mut builder = EscPosBuilder::new(48);
//! builder.center();
//! builder.size(2);
//! builder.line("COMANDA");
//! builder.size(1);
//! builder.sep_double();
//! builder.left();
//! builder.line("Mesa: 12");
//! builder.cut_feed(3);
//!
//! let printer = NetworkPrinter::new("192.168.1.100", 9100)?;
//! printer.print(&builder.build()).await?;
//! ```

mod encoding;
mod error;
mod escpos;
mod printer;

// Re-exports
pub use encoding::{encode_cp1252, pad_width, text_width, truncate_width, wrap_text};
pub use error::{PrintError, PrintResult};
pub use escpos::EscPosBuilder;
pub use printer::{DEFAULT_RAW_PORT, NetworkPrinter, Printer, QueuePrinter};
