//! Protocol-level tests against a running agent with a scripted device

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use mesa_agent::{AgentServer, DeviceDelivery};
use mesa_printer::PrintError;
use shared::agent::{
    AgentErrorKind, Frame, FrameKind, HandshakePayload, PROTOCOL_VERSION, PaperSpec, PrintAck,
    PrintRequest, PrintTarget, read_frame, write_frame,
};
use shared::models::{ConnectionKind, PaperWidth};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

/// Accepts NETWORK targets, reports every USB queue as missing
#[derive(Default)]
struct ScriptedDevice {
    delivered: Mutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait]
impl DeviceDelivery for ScriptedDevice {
    async fn deliver(&self, target: &PrintTarget, data: &[u8]) -> Result<(), PrintError> {
        match target.kind {
            ConnectionKind::Network => {
                self.delivered
                    .lock()
                    .unwrap()
                    .push((target.address.clone(), data.to_vec()));
                Ok(())
            }
            ConnectionKind::Usb => Err(PrintError::DeviceNotFound(target.address.clone())),
        }
    }
}

async fn start_agent(device: Arc<ScriptedDevice>) -> (String, CancellationToken) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let shutdown = CancellationToken::new();
    let server = AgentServer::new(device, shutdown.clone());
    tokio::spawn(server.serve(listener));
    (addr, shutdown)
}

async fn connect(addr: &str, version: u16) -> (TcpStream, Frame) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let hello = Frame::json(
        FrameKind::Handshake,
        &HandshakePayload {
            protocol_version: version,
            peer: "test".to_string(),
        },
    )
    .unwrap();
    write_frame(&mut stream, &hello).await.unwrap();
    let reply = read_frame(&mut stream).await.unwrap();
    assert_eq!(reply.correlation_id, Some(hello.request_id));
    (stream, reply)
}

fn print_request(kind: ConnectionKind, address: &str, content: &[u8]) -> Frame {
    let request = PrintRequest::new(
        PrintTarget {
            kind,
            address: address.to_string(),
        },
        content,
        PaperSpec {
            paper_width: PaperWidth::Mm80,
            chars_per_line: 48,
        },
    );
    Frame::json(FrameKind::PrintRequest, &request).unwrap()
}

#[tokio::test]
async fn handshake_then_ping() {
    let (addr, shutdown) = start_agent(Arc::default()).await;
    let (mut stream, reply) = connect(&addr, PROTOCOL_VERSION).await;

    let hello: HandshakePayload = reply.parse_payload().unwrap();
    assert_eq!(hello.protocol_version, PROTOCOL_VERSION);

    let ping = Frame::new(FrameKind::Ping, b"{}".to_vec());
    write_frame(&mut stream, &ping).await.unwrap();
    let pong = read_frame(&mut stream).await.unwrap();
    assert_eq!(pong.kind, FrameKind::Pong);
    assert_eq!(pong.correlation_id, Some(ping.request_id));

    shutdown.cancel();
}

#[tokio::test]
async fn every_request_gets_one_correlated_ack() {
    let device = Arc::new(ScriptedDevice::default());
    let (addr, shutdown) = start_agent(device.clone()).await;
    let (mut stream, _) = connect(&addr, PROTOCOL_VERSION).await;

    let ok = print_request(ConnectionKind::Network, "10.0.0.7", b"ticket-1");
    let missing = print_request(ConnectionKind::Usb, "COCINA", b"ticket-2");
    write_frame(&mut stream, &ok).await.unwrap();
    write_frame(&mut stream, &missing).await.unwrap();

    let mut acks = Vec::new();
    for _ in 0..2 {
        let frame = read_frame(&mut stream).await.unwrap();
        assert_eq!(frame.kind, FrameKind::PrintAck);
        let ack: PrintAck = frame.parse_payload().unwrap();
        acks.push((frame.correlation_id.unwrap(), ack));
    }

    let ok_ack = acks.iter().find(|(id, _)| *id == ok.request_id).unwrap();
    assert!(ok_ack.1.success);

    let missing_ack = acks
        .iter()
        .find(|(id, _)| *id == missing.request_id)
        .unwrap();
    assert!(!missing_ack.1.success);
    assert_eq!(missing_ack.1.error_kind, Some(AgentErrorKind::DeviceNotFound));
    assert!(missing_ack.1.error.as_deref().unwrap().contains("COCINA"));

    let delivered = device.delivered.lock().unwrap().clone();
    assert_eq!(delivered, vec![("10.0.0.7".to_string(), b"ticket-1".to_vec())]);

    shutdown.cancel();
}

#[tokio::test]
async fn malformed_content_is_an_invalid_request() {
    let (addr, shutdown) = start_agent(Arc::default()).await;
    let (mut stream, _) = connect(&addr, PROTOCOL_VERSION).await;

    let bogus = Frame::new(
        FrameKind::PrintRequest,
        br#"{"target":{"kind":"NETWORK","address":"10.0.0.7"},"content":"***","paper":{"paper_width":"58mm","chars_per_line":32}}"#
            .to_vec(),
    );
    write_frame(&mut stream, &bogus).await.unwrap();

    let ack: PrintAck = read_frame(&mut stream).await.unwrap().parse_payload().unwrap();
    assert_eq!(ack.error_kind, Some(AgentErrorKind::InvalidRequest));

    shutdown.cancel();
}

#[tokio::test]
async fn version_mismatch_closes_connection() {
    let (addr, shutdown) = start_agent(Arc::default()).await;
    let (mut stream, reply) = connect(&addr, PROTOCOL_VERSION + 1).await;

    let hello: HandshakePayload = reply.parse_payload().unwrap();
    assert_eq!(hello.protocol_version, PROTOCOL_VERSION);

    let next = read_frame(&mut stream).await;
    assert!(next.is_err());

    shutdown.cancel();
}
