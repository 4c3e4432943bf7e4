//! Print-agent wire protocol
//!
//! Frames exchanged between `mesa-server` and the local `mesa-agent` over a
//! persistent TCP connection:
//!
//! ```text
//! [kind u8][request_id 16B][correlation_id 16B, nil = none][len u32 LE][payload]
//! ```
//!
//! Payloads are JSON (see [`payload`]). A reply carries the request's
//! `request_id` as its `correlation_id`.

pub mod payload;
pub use payload::*;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

/// Protocol version exchanged in the handshake
pub const PROTOCOL_VERSION: u16 = 1;

/// Largest accepted payload
pub const MAX_PAYLOAD_LEN: usize = 8 * 1024 * 1024;

const HEADER_LEN: usize = 1 + 16 + 16 + 4;

/// Frame kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    Handshake = 0,
    PrintRequest = 1,
    PrintAck = 2,
    Ping = 3,
    Pong = 4,
}

impl TryFrom<u8> for FrameKind {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FrameKind::Handshake),
            1 => Ok(FrameKind::PrintRequest),
            2 => Ok(FrameKind::PrintAck),
            3 => Ok(FrameKind::Ping),
            4 => Ok(FrameKind::Pong),
            other => Err(FrameError::InvalidKind(other)),
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Handshake => write!(f, "handshake"),
            FrameKind::PrintRequest => write!(f, "print_request"),
            FrameKind::PrintAck => write!(f, "print_ack"),
            FrameKind::Ping => write!(f, "ping"),
            FrameKind::Pong => write!(f, "pong"),
        }
    }
}

/// Frame codec errors
#[derive(Debug, Error)]
pub enum FrameError {
    /// Peer closed the connection at a frame boundary
    #[error("Peer disconnected")]
    Disconnected,

    #[error("Invalid frame kind: {0}")]
    InvalidKind(u8),

    #[error("Payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// One protocol frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub kind: FrameKind,
    pub request_id: Uuid,
    pub correlation_id: Option<Uuid>,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(kind: FrameKind, payload: Vec<u8>) -> Self {
        Self {
            kind,
            request_id: Uuid::new_v4(),
            correlation_id: None,
            payload,
        }
    }

    /// Build a frame with a JSON payload
    pub fn json<T: Serialize>(kind: FrameKind, payload: &T) -> Result<Self, FrameError> {
        Ok(Self::new(kind, serde_json::to_vec(payload)?))
    }

    /// Build a reply correlated to `self`
    pub fn reply<T: Serialize>(&self, kind: FrameKind, payload: &T) -> Result<Self, FrameError> {
        let mut frame = Self::json(kind, payload)?;
        frame.correlation_id = Some(self.request_id);
        Ok(frame)
    }

    /// Parse the payload as JSON
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, FrameError> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}

/// Read one frame
///
/// EOF before the first header byte is reported as [`FrameError::Disconnected`].
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Frame, FrameError> {
    let mut kind_buf = [0u8; 1];
    match reader.read_exact(&mut kind_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(FrameError::Disconnected);
        }
        Err(e) => return Err(FrameError::Io(e)),
    }
    let kind = FrameKind::try_from(kind_buf[0])?;

    let mut uuid_buf = [0u8; 16];
    reader.read_exact(&mut uuid_buf).await?;
    let request_id = Uuid::from_bytes(uuid_buf);

    reader.read_exact(&mut uuid_buf).await?;
    let correlation_raw = Uuid::from_bytes(uuid_buf);
    let correlation_id = (!correlation_raw.is_nil()).then_some(correlation_raw);

    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_PAYLOAD_LEN {
        return Err(FrameError::PayloadTooLarge(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    Ok(Frame {
        kind,
        request_id,
        correlation_id,
        payload,
    })
}

/// Write one frame and flush
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &Frame,
) -> Result<(), FrameError> {
    if frame.payload.len() > MAX_PAYLOAD_LEN {
        return Err(FrameError::PayloadTooLarge(frame.payload.len()));
    }

    let mut data = Vec::with_capacity(HEADER_LEN + frame.payload.len());
    data.push(frame.kind as u8);
    data.extend_from_slice(frame.request_id.as_bytes());
    data.extend_from_slice(frame.correlation_id.unwrap_or(Uuid::nil()).as_bytes());
    data.extend_from_slice(&(frame.payload.len() as u32).to_le_bytes());
    data.extend_from_slice(&frame.payload);

    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}
