//! Print-agent transport
//!
//! [`AgentTransport`] keeps one persistent connection to the local
//! print-agent and multiplexes concurrent requests over it by correlation id.
//! Connect, handshake and reconnect (with exponential backoff) happen inside
//! the transport; callers only ever see a per-request result.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use shared::agent::{
    AgentErrorKind, Frame, FrameError, FrameKind, HandshakePayload, PROTOCOL_VERSION, PaperSpec,
    PrintAck, PrintRequest, PrintTarget, read_frame, write_frame,
};
use shared::models::Printer;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use crate::core::Config;

const INITIAL_BACKOFF: Duration = Duration::from_millis(250);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Why a payload did not reach its device
///
/// Each variant carries text suitable for an operator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    DeviceNotFound(String),

    #[error("{0}")]
    QueueBusy(String),

    #[error("{0}")]
    ConnectionRefused(String),

    #[error("{0}")]
    AgentUnavailable(String),

    #[error("{0}")]
    Channel(String),

    #[error("{0}")]
    Rejected(String),
}

impl TransportError {
    fn from_ack(ack: PrintAck) -> Self {
        let message = ack
            .error
            .unwrap_or_else(|| "Print agent reported a failure".to_string());
        match ack.error_kind {
            Some(AgentErrorKind::Timeout) => Self::Timeout(message),
            Some(AgentErrorKind::DeviceNotFound) => Self::DeviceNotFound(message),
            Some(AgentErrorKind::QueueBusy) => Self::QueueBusy(message),
            Some(AgentErrorKind::ConnectionRefused) => Self::ConnectionRefused(message),
            Some(AgentErrorKind::InvalidRequest)
            | Some(AgentErrorKind::Internal)
            | None => Self::Rejected(message),
        }
    }
}

impl From<FrameError> for TransportError {
    fn from(err: FrameError) -> Self {
        Self::Channel(format!("Print agent channel error: {}", err))
    }
}

/// Delivers rendered bytes to a printer
#[async_trait]
pub trait PrintTransport: Send + Sync {
    async fn send(&self, printer: &Printer, content: &[u8]) -> Result<(), TransportError>;

    /// Reachability check for health reporting
    async fn probe(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Reconnect pacing: 250 ms doubling to 10 s, reset on success
#[derive(Debug)]
struct Backoff {
    delay: Duration,
    retry_at: Option<Instant>,
}

impl Backoff {
    fn new() -> Self {
        Self {
            delay: INITIAL_BACKOFF,
            retry_at: None,
        }
    }

    /// Wait left before the next connect attempt
    fn remaining(&self, now: Instant) -> Option<Duration> {
        self.retry_at
            .and_then(|at| at.checked_duration_since(now))
            .filter(|wait| !wait.is_zero())
    }

    fn failed(&mut self, now: Instant) {
        self.retry_at = Some(now + self.delay);
        self.delay = (self.delay * 2).min(MAX_BACKOFF);
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

type PendingReplies = Arc<DashMap<Uuid, oneshot::Sender<Frame>>>;

#[derive(Clone)]
struct Connection {
    writer: Arc<Mutex<OwnedWriteHalf>>,
    pending: PendingReplies,
    closed: CancellationToken,
}

impl Connection {
    async fn request(&self, frame: Frame, timeout: Duration) -> Result<Frame, TransportError> {
        let deadline = Instant::now() + timeout;
        let request_id = frame.request_id;
        let (tx, rx) = oneshot::channel();
        self.pending.insert(request_id, tx);

        let write = async {
            let mut writer = self.writer.lock().await;
            write_frame(&mut *writer, &frame).await
        };
        let written = match tokio::time::timeout_at(deadline, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TransportError::Channel(format!(
                "Failed to send to print agent: {}",
                e
            ))),
            Err(_) => Err(TransportError::Timeout(format!(
                "Print agent did not accept the request within {}ms",
                timeout.as_millis()
            ))),
        };
        if let Err(e) = written {
            // A half-written frame leaves the stream unusable
            self.closed.cancel();
            self.pending.remove(&request_id);
            return Err(e);
        }

        match tokio::time::timeout_at(deadline, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(TransportError::Channel(
                "Connection to print agent lost".to_string(),
            )),
            Err(_) => {
                self.pending.remove(&request_id);
                Err(TransportError::Timeout(format!(
                    "Print agent did not answer within {}ms",
                    timeout.as_millis()
                )))
            }
        }
    }
}

struct Link {
    conn: Option<Connection>,
    backoff: Backoff,
}

/// Persistent, multiplexed connection to the print-agent
pub struct AgentTransport {
    addr: String,
    request_timeout: Duration,
    connect_timeout: Duration,
    link: Mutex<Link>,
}

impl AgentTransport {
    pub fn new(addr: impl Into<String>, request_timeout: Duration, connect_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            request_timeout,
            connect_timeout,
            link: Mutex::new(Link {
                conn: None,
                backoff: Backoff::new(),
            }),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.agent_addr.clone(),
            config.agent_request_timeout(),
            config.agent_connect_timeout(),
        )
    }

    /// Live connection, dialing if needed
    ///
    /// Concurrent callers wait for a single dial attempt.
    async fn connection(&self) -> Result<Connection, TransportError> {
        let mut link = self.link.lock().await;

        if let Some(conn) = link.conn.as_ref().filter(|c| !c.closed.is_cancelled()) {
            return Ok(conn.clone());
        }
        link.conn = None;

        if let Some(wait) = link.backoff.remaining(Instant::now()) {
            return Err(TransportError::AgentUnavailable(format!(
                "Print agent at {} is unreachable, retrying in {}ms",
                self.addr,
                wait.as_millis()
            )));
        }

        match self.connect().await {
            Ok(conn) => {
                link.backoff.reset();
                link.conn = Some(conn.clone());
                Ok(conn)
            }
            Err(e) => {
                link.backoff.failed(Instant::now());
                tracing::warn!(
                    addr = %self.addr,
                    retry_in_ms = link.backoff.remaining(Instant::now()).map(|d| d.as_millis() as u64),
                    error = %e,
                    "Print agent connect failed"
                );
                Err(e)
            }
        }
    }

    async fn connect(&self) -> Result<Connection, TransportError> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| {
                TransportError::AgentUnavailable(format!(
                    "Timed out connecting to print agent at {}",
                    self.addr
                ))
            })?
            .map_err(|e| {
                TransportError::AgentUnavailable(format!(
                    "Cannot reach print agent at {}: {}",
                    self.addr, e
                ))
            })?;
        stream.set_nodelay(true).ok();

        let (mut reader, mut writer) = stream.into_split();
        tokio::time::timeout(self.connect_timeout, handshake(&mut reader, &mut writer))
            .await
            .map_err(|_| {
                TransportError::AgentUnavailable("Print agent handshake timed out".to_string())
            })??;

        let conn = Connection {
            writer: Arc::new(Mutex::new(writer)),
            pending: Arc::new(DashMap::new()),
            closed: CancellationToken::new(),
        };
        tokio::spawn(read_replies(reader, conn.pending.clone(), conn.closed.clone()));

        tracing::info!(addr = %self.addr, "Connected to print agent");
        Ok(conn)
    }

    async fn request(&self, frame: Frame) -> Result<Frame, TransportError> {
        let conn = self.connection().await?;
        conn.request(frame, self.request_timeout).await
    }
}

impl Drop for AgentTransport {
    fn drop(&mut self) {
        if let Some(conn) = &self.link.get_mut().conn {
            conn.closed.cancel();
        }
    }
}

#[async_trait]
impl PrintTransport for AgentTransport {
    #[instrument(skip(self, printer, content), fields(printer_id = %printer.id, bytes = content.len()))]
    async fn send(&self, printer: &Printer, content: &[u8]) -> Result<(), TransportError> {
        let request = PrintRequest::new(
            PrintTarget {
                kind: printer.connection,
                address: printer.system_identifier.trim().to_string(),
            },
            content,
            PaperSpec {
                paper_width: printer.paper_width,
                chars_per_line: printer.chars_per_line,
            },
        );

        let reply = self
            .request(Frame::json(FrameKind::PrintRequest, &request)?)
            .await?;
        if reply.kind != FrameKind::PrintAck {
            return Err(TransportError::Channel(format!(
                "Unexpected {} reply to print request",
                reply.kind
            )));
        }

        let ack: PrintAck = reply.parse_payload()?;
        if ack.success {
            Ok(())
        } else {
            Err(TransportError::from_ack(ack))
        }
    }

    async fn probe(&self) -> Result<(), TransportError> {
        let reply = self
            .request(Frame::json(FrameKind::Ping, &serde_json::json!({}))?)
            .await?;
        match reply.kind {
            FrameKind::Pong => Ok(()),
            other => Err(TransportError::Channel(format!(
                "Unexpected {} reply to ping",
                other
            ))),
        }
    }
}

async fn handshake(
    reader: &mut OwnedReadHalf,
    writer: &mut OwnedWriteHalf,
) -> Result<(), TransportError> {
    let unavailable = |e: FrameError| {
        TransportError::AgentUnavailable(format!("Print agent handshake failed: {}", e))
    };

    let hello = Frame::json(
        FrameKind::Handshake,
        &HandshakePayload {
            protocol_version: PROTOCOL_VERSION,
            peer: format!("mesa-server/{}", env!("CARGO_PKG_VERSION")),
        },
    )?;
    write_frame(writer, &hello).await.map_err(unavailable)?;

    let reply = read_frame(reader).await.map_err(unavailable)?;
    if reply.kind != FrameKind::Handshake || reply.correlation_id != Some(hello.request_id) {
        return Err(TransportError::AgentUnavailable(format!(
            "Print agent answered the handshake with {}",
            reply.kind
        )));
    }

    let payload: HandshakePayload = reply.parse_payload().map_err(unavailable)?;
    if payload.protocol_version != PROTOCOL_VERSION {
        return Err(TransportError::AgentUnavailable(format!(
            "Print agent speaks protocol v{}, expected v{}",
            payload.protocol_version, PROTOCOL_VERSION
        )));
    }

    tracing::debug!(peer = %payload.peer, "Print agent handshake complete");
    Ok(())
}

/// Route replies to their waiters until the connection ends
async fn read_replies(
    mut reader: OwnedReadHalf,
    pending: PendingReplies,
    closed: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            _ = closed.cancelled() => break,
            frame = read_frame(&mut reader) => frame,
        };

        match frame {
            Ok(frame) => match frame.correlation_id.and_then(|id| pending.remove(&id)) {
                Some((_, waiter)) => {
                    // Waiter gone means the request already timed out
                    let _ = waiter.send(frame);
                }
                None => {
                    tracing::debug!(kind = %frame.kind, "Dropping uncorrelated agent frame");
                }
            },
            Err(FrameError::Disconnected) => {
                tracing::warn!("Print agent closed the connection");
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Print agent connection failed");
                break;
            }
        }
    }

    closed.cancel();
    // Dropping the senders fails every in-flight request
    pending.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesa_agent::{AgentServer, DeviceDelivery};
    use mesa_printer::PrintError;
    use shared::models::{
        CharPitch, ConnectionKind, PaperWidth, PrintMode, PrinterStatus,
    };
    use std::sync::Mutex as StdMutex;
    use tokio::net::TcpListener;

    #[derive(Default)]
    struct RecordingDevice {
        received: StdMutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl DeviceDelivery for RecordingDevice {
        async fn deliver(&self, target: &PrintTarget, data: &[u8]) -> Result<(), PrintError> {
            if target.kind == ConnectionKind::Usb {
                return Err(PrintError::DeviceNotFound(target.address.clone()));
            }
            self.received
                .lock()
                .unwrap()
                .push((target.address.clone(), data.to_vec()));
            Ok(())
        }
    }

    fn printer(connection: ConnectionKind, system_identifier: &str) -> Printer {
        Printer {
            id: "p1".to_string(),
            branch_id: "b1".to_string(),
            name: "Barra".to_string(),
            system_identifier: system_identifier.to_string(),
            connection,
            print_mode: PrintMode::StationItems,
            copies: 1,
            paper_width: PaperWidth::Mm80,
            char_pitch: CharPitch::Normal,
            chars_per_line: 48,
            station_id: None,
            auto_print: true,
            header_text: None,
            footer_text: None,
            header_size: 2,
            footer_size: 1,
            control_font_size: 1,
            control_line_spacing: None,
            status: PrinterStatus::Offline,
            status_changed_at: None,
            is_active: true,
            created_at: 0,
        }
    }

    async fn start_agent(device: Arc<RecordingDevice>) -> (String, CancellationToken) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let shutdown = CancellationToken::new();
        let server = AgentServer::new(device, shutdown.clone());
        tokio::spawn(server.serve(listener));
        (addr, shutdown)
    }

    fn transport(addr: &str, timeout_ms: u64) -> AgentTransport {
        AgentTransport::new(
            addr,
            Duration::from_millis(timeout_ms),
            Duration::from_millis(500),
        )
    }

    #[test]
    fn test_backoff_doubles_to_cap() {
        let now = Instant::now();
        let mut backoff = Backoff::new();
        assert!(backoff.remaining(now).is_none());

        backoff.failed(now);
        assert_eq!(backoff.remaining(now), Some(INITIAL_BACKOFF));
        for _ in 0..10 {
            backoff.failed(now);
        }
        assert_eq!(backoff.remaining(now), Some(MAX_BACKOFF));
        assert!(backoff.remaining(now + MAX_BACKOFF).is_none());

        backoff.reset();
        assert!(backoff.remaining(now).is_none());
    }

    #[test]
    fn test_ack_error_classes() {
        let err = TransportError::from_ack(PrintAck::failed(
            AgentErrorKind::QueueBusy,
            "Queue busy: COCINA",
        ));
        assert_eq!(err, TransportError::QueueBusy("Queue busy: COCINA".to_string()));
        assert_eq!(err.to_string(), "Queue busy: COCINA");

        let err = TransportError::from_ack(PrintAck::failed(AgentErrorKind::Internal, "boom"));
        assert!(matches!(err, TransportError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_send_through_agent() {
        let device = Arc::new(RecordingDevice::default());
        let (addr, shutdown) = start_agent(device.clone()).await;
        let transport = transport(&addr, 2000);

        transport.probe().await.unwrap();
        transport
            .send(&printer(ConnectionKind::Network, " 10.0.0.5 "), b"\x1b@comanda")
            .await
            .unwrap();

        let received = device.received.lock().unwrap().clone();
        assert_eq!(received, vec![("10.0.0.5".to_string(), b"\x1b@comanda".to_vec())]);
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_connection() {
        let device = Arc::new(RecordingDevice::default());
        let (addr, shutdown) = start_agent(device.clone()).await;
        let transport = Arc::new(transport(&addr, 2000));

        let sends = (0..8).map(|i| {
            let transport = transport.clone();
            async move {
                let p = printer(ConnectionKind::Network, &format!("10.0.0.{}", i));
                transport.send(&p, &[i as u8]).await
            }
        });
        for result in futures::future::join_all(sends).await {
            result.unwrap();
        }
        assert_eq!(device.received.lock().unwrap().len(), 8);
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_device_error_is_classified() {
        let device = Arc::new(RecordingDevice::default());
        let (addr, shutdown) = start_agent(device).await;
        let transport = transport(&addr, 2000);

        let err = transport
            .send(&printer(ConnectionKind::Usb, "COCINA"), b"x")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransportError::DeviceNotFound("Device not found: COCINA".to_string())
        );
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_silent_agent_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        // Handshakes, then never answers
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let hello = read_frame(&mut socket).await.unwrap();
            let reply = hello
                .reply(
                    FrameKind::Handshake,
                    &HandshakePayload {
                        protocol_version: PROTOCOL_VERSION,
                        peer: "silent".to_string(),
                    },
                )
                .unwrap();
            write_frame(&mut socket, &reply).await.unwrap();
            while read_frame(&mut socket).await.is_ok() {}
        });

        let transport = transport(&addr, 150);
        let err = transport
            .send(&printer(ConnectionKind::Network, "10.0.0.5"), b"x")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_unreachable_agent_backs_off() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let transport = transport(&addr, 500);
        let p = printer(ConnectionKind::Network, "10.0.0.5");

        let first = transport.send(&p, b"x").await.unwrap_err();
        assert!(matches!(first, TransportError::AgentUnavailable(_)));

        let second = transport.send(&p, b"x").await.unwrap_err();
        match second {
            TransportError::AgentUnavailable(msg) => assert!(msg.contains("retrying")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reconnects_after_agent_restart() {
        let device = Arc::new(RecordingDevice::default());
        let (addr, shutdown) = start_agent(device.clone()).await;
        let transport = transport(&addr, 2000);
        let p = printer(ConnectionKind::Network, "10.0.0.5");

        transport.send(&p, b"one").await.unwrap();

        // Stop the agent and start a new one on the same port
        shutdown.cancel();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let listener = TcpListener::bind(&addr).await.unwrap();
        let restarted = CancellationToken::new();
        tokio::spawn(AgentServer::new(device.clone(), restarted.clone()).serve(listener));

        transport.send(&p, b"two").await.unwrap();
        assert_eq!(device.received.lock().unwrap().len(), 2);
        restarted.cancel();
    }
}
