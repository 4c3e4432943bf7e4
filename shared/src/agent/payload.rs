//! Print-agent payload types

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::models::{ConnectionKind, PaperWidth};

/// First frame on a connection, in both directions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakePayload {
    pub protocol_version: u16,
    /// "mesa-server" / "mesa-agent" plus version
    pub peer: String,
}

/// Where the agent should deliver the bytes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintTarget {
    pub kind: ConnectionKind,
    /// `host[:port]` for NETWORK, exact queue name for USB
    pub address: String,
}

/// Basic paper parameters for the device
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaperSpec {
    pub paper_width: PaperWidth,
    pub chars_per_line: u16,
}

/// Deliver a rendered ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintRequest {
    pub target: PrintTarget,
    /// Base64 of the ESC/POS byte stream
    pub content: String,
    pub paper: PaperSpec,
}

impl PrintRequest {
    pub fn new(target: PrintTarget, content: &[u8], paper: PaperSpec) -> Self {
        Self {
            target,
            content: BASE64.encode(content),
            paper,
        }
    }

    pub fn decode_content(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(&self.content)
    }
}

/// Failure classes reported by the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentErrorKind {
    Timeout,
    DeviceNotFound,
    QueueBusy,
    ConnectionRefused,
    InvalidRequest,
    Internal,
}

/// Delivery acknowledgement for one [`PrintRequest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintAck {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<AgentErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PrintAck {
    pub fn ok() -> Self {
        Self {
            success: true,
            error_kind: None,
            error: None,
        }
    }

    pub fn failed(kind: AgentErrorKind, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error_kind: Some(kind),
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_request_json_shape() {
        let request = PrintRequest::new(
            PrintTarget {
                kind: ConnectionKind::Network,
                address: "192.168.1.50".to_string(),
            },
            b"hi",
            PaperSpec {
                paper_width: PaperWidth::Mm80,
                chars_per_line: 48,
            },
        );
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["target"]["kind"], "NETWORK");
        assert_eq!(value["content"], "aGk=");
        assert_eq!(value["paper"]["paper_width"], "80mm");
        assert_eq!(value["paper"]["chars_per_line"], 48);
    }

    #[test]
    fn test_ack_json_shape() {
        let ok = serde_json::to_string(&PrintAck::ok()).unwrap();
        assert_eq!(ok, r#"{"success":true}"#);

        let failed = PrintAck::failed(AgentErrorKind::QueueBusy, "Queue busy: BARRA");
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["error_kind"], "queue_busy");
        assert_eq!(value["error"], "Queue busy: BARRA");
    }
}
