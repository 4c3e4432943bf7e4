//! Printer Model

use serde::{Deserialize, Serialize};

/// Narrowest supported ticket width in characters
pub const MIN_CHARS_PER_LINE: u16 = 32;
/// Widest supported ticket width in characters
pub const MAX_CHARS_PER_LINE: u16 = 48;
/// Largest emphasis scale for header/footer/control text
pub const MAX_EMPHASIS: u8 = 4;
/// Thermal printer raw port, implied when a network address has no port
pub const RAW_PRINT_PORT: u16 = 9100;

/// How the device is reached by the print-agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionKind {
    /// Raw socket to `host[:port]`
    Network,
    /// OS print queue, by exact device name
    Usb,
}

/// Which event classes route to a printer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrintMode {
    /// Kitchen comandas for items added to an order
    #[default]
    StationItems,
    /// Control tickets with the complete order
    FullOrder,
    Both,
}

impl PrintMode {
    pub fn receives_station_items(self) -> bool {
        matches!(self, Self::StationItems | Self::Both)
    }

    pub fn receives_full_order(self) -> bool {
        matches!(self, Self::FullOrder | Self::Both)
    }
}

/// Paper roll class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PaperWidth {
    #[serde(rename = "58mm")]
    Mm58,
    #[default]
    #[serde(rename = "80mm")]
    Mm80,
}

impl PaperWidth {
    /// Printable columns for this roll at the given pitch
    pub fn max_columns(self, pitch: CharPitch) -> u16 {
        match (self, pitch) {
            (Self::Mm58, CharPitch::Normal) => 32,
            (Self::Mm58, CharPitch::Condensed) => 42,
            (Self::Mm80, CharPitch::Normal) => 48,
            (Self::Mm80, CharPitch::Condensed) => 64,
        }
    }

    /// Default ticket width for a new printer
    pub fn default_chars_per_line(self, pitch: CharPitch) -> u16 {
        self.max_columns(pitch).min(MAX_CHARS_PER_LINE)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mm58 => "58mm",
            Self::Mm80 => "80mm",
        }
    }
}

/// Character pitch (font A vs. condensed font B)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CharPitch {
    #[default]
    Normal,
    Condensed,
}

/// Last known reachability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrinterStatus {
    #[default]
    Offline,
    Online,
    Error,
}

/// Printer entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Printer {
    pub id: String,
    pub branch_id: String,
    pub name: String,
    /// Network address (`host` or `host:port`) or exact OS queue name
    pub system_identifier: String,
    pub connection: ConnectionKind,
    pub print_mode: PrintMode,
    pub copies: u32,
    pub paper_width: PaperWidth,
    pub char_pitch: CharPitch,
    pub chars_per_line: u16,
    pub station_id: Option<String>,
    pub auto_print: bool,
    pub header_text: Option<String>,
    pub footer_text: Option<String>,
    pub header_size: u8,
    pub footer_size: u8,
    pub control_font_size: u8,
    /// Line spacing in motion units for control tickets; printer default if unset
    pub control_line_spacing: Option<u8>,
    #[serde(default)]
    pub status: PrinterStatus,
    pub status_changed_at: Option<i64>,
    pub is_active: bool,
    pub created_at: i64,
}

impl Printer {
    /// Key used for the per-branch system identifier uniqueness check
    pub fn address_key(&self) -> String {
        address_key(self.connection, &self.system_identifier)
    }
}

/// Normalize a system identifier for comparison
///
/// Network addresses compare case-insensitively with the raw port implied;
/// queue names compare exactly (after trimming).
pub fn address_key(connection: ConnectionKind, system_identifier: &str) -> String {
    let trimmed = system_identifier.trim();
    match connection {
        ConnectionKind::Network => {
            let lower = trimmed.to_ascii_lowercase();
            let default_port = format!(":{}", RAW_PRINT_PORT);
            match lower.strip_suffix(&default_port) {
                Some(host) => format!("net:{}", host),
                None => format!("net:{}", lower),
            }
        }
        ConnectionKind::Usb => format!("usb:{}", trimmed),
    }
}

fn default_copies() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_header_size() -> u8 {
    2
}

fn default_size() -> u8 {
    1
}

/// Create printer payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterCreate {
    pub branch_id: String,
    pub name: String,
    pub system_identifier: String,
    pub connection: ConnectionKind,
    #[serde(default)]
    pub print_mode: PrintMode,
    #[serde(default = "default_copies")]
    pub copies: u32,
    #[serde(default)]
    pub paper_width: PaperWidth,
    #[serde(default)]
    pub char_pitch: CharPitch,
    /// Defaults to the paper's normal width
    #[serde(default)]
    pub chars_per_line: Option<u16>,
    #[serde(default)]
    pub station_id: Option<String>,
    #[serde(default = "default_true")]
    pub auto_print: bool,
    #[serde(default)]
    pub header_text: Option<String>,
    #[serde(default)]
    pub footer_text: Option<String>,
    #[serde(default = "default_header_size")]
    pub header_size: u8,
    #[serde(default = "default_size")]
    pub footer_size: u8,
    #[serde(default = "default_size")]
    pub control_font_size: u8,
    #[serde(default)]
    pub control_line_spacing: Option<u8>,
}

/// Update printer payload
///
/// Nullable fields use `Option<Option<_>>`: absent keeps the current value,
/// `null` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrinterUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_mode: Option<PrintMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copies: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_width: Option<PaperWidth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_pitch: Option<CharPitch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chars_per_line: Option<u16>,
    #[serde(
        default,
        deserialize_with = "super::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub station_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_print: Option<bool>,
    #[serde(
        default,
        deserialize_with = "super::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub header_text: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "super::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub footer_text: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_size: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer_size: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_font_size: Option<u8>,
    #[serde(
        default,
        deserialize_with = "super::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub control_line_spacing: Option<Option<u8>>,
}
