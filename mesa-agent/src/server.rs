//! Agent TCP server
//!
//! Accepts connections from `mesa-server`, performs the protocol handshake,
//! then serves `Ping` and `PrintRequest` frames. Requests on one connection
//! are handled concurrently; every reply goes through a single writer task.

use std::net::SocketAddr;
use std::sync::Arc;

use shared::agent::{
    AgentErrorKind, Frame, FrameError, FrameKind, HandshakePayload, PROTOCOL_VERSION, PrintAck,
    PrintRequest, read_frame, write_frame,
};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::delivery::{DeviceDelivery, classify_print_error};
use crate::error::{AgentError, AgentResult};

/// Outbound frames buffered per connection
const REPLY_BUFFER: usize = 64;

/// Print-agent server
pub struct AgentServer {
    delivery: Arc<dyn DeviceDelivery>,
    shutdown: CancellationToken,
}

impl AgentServer {
    pub fn new(delivery: Arc<dyn DeviceDelivery>, shutdown: CancellationToken) -> Self {
        Self { delivery, shutdown }
    }

    /// Bind `addr` and serve until shutdown
    pub async fn run(self, addr: &str) -> AgentResult<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| AgentError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> AgentResult<()> {
        info!(addr = ?listener.local_addr().ok(), "Print agent listening");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Print agent shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            debug!(%addr, "Server connected");
                            self.spawn_connection(stream, addr);
                        }
                        Err(e) => {
                            warn!(error = %e, "Failed to accept connection");
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let delivery = self.delivery.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(
            async move {
                match handle_connection(stream, delivery, shutdown).await {
                    Ok(()) => debug!("Connection closed"),
                    Err(e) => debug!(error = %e, "Connection ended"),
                }
            }
            .instrument(info_span!("agent_conn", %addr)),
        );
    }
}

async fn handle_connection(
    stream: TcpStream,
    delivery: Arc<dyn DeviceDelivery>,
    shutdown: CancellationToken,
) -> AgentResult<()> {
    stream.set_nodelay(true)?;
    let (mut reader, mut writer) = stream.into_split();

    perform_handshake(&mut reader, &mut writer).await?;

    let (reply_tx, reply_rx) = mpsc::channel::<Frame>(REPLY_BUFFER);
    let writer_task = tokio::spawn(write_replies(writer, reply_rx));

    let result = loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => break Ok(()),
            frame = read_frame(&mut reader) => frame,
        };

        let frame = match frame {
            Ok(frame) => frame,
            Err(FrameError::Disconnected) => break Ok(()),
            Err(e) => break Err(AgentError::from(e)),
        };

        match frame.kind {
            FrameKind::Ping => {
                let pong = frame.reply(FrameKind::Pong, &serde_json::json!({}))?;
                if reply_tx.send(pong).await.is_err() {
                    break Ok(());
                }
            }
            FrameKind::PrintRequest => {
                let delivery = delivery.clone();
                let reply_tx = reply_tx.clone();
                tokio::spawn(
                    async move {
                        let ack = handle_print_request(&frame, delivery.as_ref()).await;
                        match frame.reply(FrameKind::PrintAck, &ack) {
                            Ok(reply) => {
                                // Receiver gone means the connection is closing
                                let _ = reply_tx.send(reply).await;
                            }
                            Err(e) => warn!(error = %e, "Failed to encode ack"),
                        }
                    }
                    .in_current_span(),
                );
            }
            other => {
                debug!(kind = %other, "Ignoring unexpected frame");
            }
        }
    };

    drop(reply_tx);
    let _ = writer_task.await;
    result
}

/// Expect a `Handshake`, answer with ours, reject version mismatches
async fn perform_handshake(
    reader: &mut tokio::net::tcp::OwnedReadHalf,
    writer: &mut OwnedWriteHalf,
) -> AgentResult<()> {
    let frame = read_frame(reader).await?;
    if frame.kind != FrameKind::Handshake {
        return Err(AgentError::Handshake(format!(
            "expected handshake, got {}",
            frame.kind
        )));
    }

    let payload: HandshakePayload = frame.parse_payload()?;
    let reply = frame.reply(
        FrameKind::Handshake,
        &HandshakePayload {
            protocol_version: PROTOCOL_VERSION,
            peer: format!("mesa-agent/{}", env!("CARGO_PKG_VERSION")),
        },
    )?;
    write_frame(writer, &reply).await?;

    if payload.protocol_version != PROTOCOL_VERSION {
        warn!(
            expected = PROTOCOL_VERSION,
            got = payload.protocol_version,
            "Protocol version mismatch"
        );
        return Err(AgentError::Handshake(format!(
            "protocol version mismatch: agent={}, peer={}",
            PROTOCOL_VERSION, payload.protocol_version
        )));
    }

    info!(peer = %payload.peer, "Handshake complete");
    Ok(())
}

async fn write_replies(mut writer: OwnedWriteHalf, mut rx: mpsc::Receiver<Frame>) {
    while let Some(frame) = rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &frame).await {
            warn!(error = %e, "Failed to write reply");
            break;
        }
    }
}

async fn handle_print_request(frame: &Frame, delivery: &dyn DeviceDelivery) -> PrintAck {
    let request: PrintRequest = match frame.parse_payload() {
        Ok(request) => request,
        Err(e) => {
            return PrintAck::failed(AgentErrorKind::InvalidRequest, e.to_string());
        }
    };

    let data = match request.decode_content() {
        Ok(data) => data,
        Err(e) => {
            return PrintAck::failed(
                AgentErrorKind::InvalidRequest,
                format!("Invalid content encoding: {}", e),
            );
        }
    };

    match delivery.deliver(&request.target, &data).await {
        Ok(()) => {
            info!(
                device = %request.target.address,
                bytes = data.len(),
                "Delivered print request"
            );
            PrintAck::ok()
        }
        Err(e) => {
            let kind = classify_print_error(&e);
            warn!(
                device = %request.target.address,
                kind = ?kind,
                error = %e,
                "Print request failed"
            );
            PrintAck::failed(kind, e.to_string())
        }
    }
}
