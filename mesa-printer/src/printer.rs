//! Printer adapters for sending ESC/POS data
//!
//! Supports:
//! - Network printers (raw TCP, port 9100)
//! - OS print queue printers addressed by exact device name (CUPS `lp`)

use crate::error::{PrintError, PrintResult};
use std::net::SocketAddr;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

/// Raw printing port used by thermal printers
pub const DEFAULT_RAW_PORT: u16 = 9100;

/// Trait for printer adapters
#[allow(async_fn_in_trait)]
pub trait Printer {
    /// Send raw ESC/POS data to the printer
    async fn print(&self, data: &[u8]) -> PrintResult<()>;

    /// Check if the printer is online/reachable
    async fn is_online(&self) -> bool;
}

/// Network printer (TCP port 9100)
///
/// Most thermal printers support raw TCP printing on port 9100.
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    addr: SocketAddr,
    timeout: Duration,
}

impl NetworkPrinter {
    /// Create a new network printer
    pub fn new(host: &str, port: u16) -> PrintResult<Self> {
        let addr_str = format!("{}:{}", host, port);
        Self::from_addr(&addr_str)
    }

    /// Create from a socket address string (e.g., "192.168.1.100:9100")
    pub fn from_addr(addr: &str) -> PrintResult<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|_| PrintError::InvalidConfig(format!("Invalid address: {}", addr)))?;

        Ok(Self {
            addr,
            timeout: Duration::from_secs(5),
        })
    }

    /// Create from a configured target: either "host" or "host:port"
    ///
    /// A bare host gets [`DEFAULT_RAW_PORT`].
    pub fn from_target(target: &str) -> PrintResult<Self> {
        let target = target.trim();
        if target.parse::<SocketAddr>().is_ok() {
            return Self::from_addr(target);
        }
        Self::new(target, DEFAULT_RAW_PORT)
    }

    /// Set the overall connect + write timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the printer address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Printer for NetworkPrinter {
    #[instrument(skip(data), fields(addr = %self.addr, data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        info!("Connecting to printer");
        // Connect and write share one deadline
        let deadline = Instant::now() + self.timeout;

        let mut stream = tokio::time::timeout_at(deadline, TcpStream::connect(self.addr))
            .await
            .map_err(|_| PrintError::Timeout(format!("Connection timeout: {}", self.addr)))?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::ConnectionRefused {
                    PrintError::Refused(self.addr.to_string())
                } else {
                    PrintError::Connection(format!("{}: {}", self.addr, e))
                }
            })?;

        let write = async {
            stream.write_all(data).await?;
            stream.flush().await?;
            stream.shutdown().await
        };
        tokio::time::timeout_at(deadline, write)
            .await
            .map_err(|_| PrintError::Timeout(format!("Write timeout: {}", self.addr)))?
            .map_err(|e| {
                PrintError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Write failed: {}", e),
                ))
            })?;

        info!("Print job sent successfully");
        Ok(())
    }

    #[instrument(fields(addr = %self.addr))]
    async fn is_online(&self) -> bool {
        let check_timeout = Duration::from_millis(500);

        match tokio::time::timeout(check_timeout, TcpStream::connect(self.addr)).await {
            Ok(Ok(_)) => {
                info!("Printer online");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Printer offline");
                false
            }
            Err(_) => {
                warn!("Printer check timeout");
                false
            }
        }
    }
}

/// Printer behind the operating system's print queue
///
/// Data is submitted as a raw job so the ESC/POS stream reaches the device
/// unmodified.
#[derive(Debug, Clone)]
pub struct QueuePrinter {
    name: String,
    timeout: Duration,
}

impl QueuePrinter {
    /// Create a printer with an exact queue name
    pub fn new(name: &str) -> PrintResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PrintError::InvalidConfig("Empty device name".to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            timeout: Duration::from_secs(10),
        })
    }

    /// Set submission timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the queue name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Map `lp` stderr output to an error class
    fn classify_failure(&self, stderr: &str) -> PrintError {
        let lower = stderr.to_lowercase();
        if lower.contains("does not exist")
            || lower.contains("unknown destination")
            || lower.contains("not found")
        {
            PrintError::DeviceNotFound(self.name.clone())
        } else if lower.contains("busy") || lower.contains("not accepting") {
            PrintError::QueueBusy(format!("{}: {}", self.name, stderr.trim()))
        } else {
            PrintError::Connection(format!("{}: {}", self.name, stderr.trim()))
        }
    }
}

#[cfg(unix)]
impl Printer for QueuePrinter {
    #[instrument(skip(data), fields(queue = %self.name, data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        use tokio::process::Command;

        let submit = async {
            let mut child = Command::new("lp")
                .arg("-d")
                .arg(&self.name)
                .arg("-o")
                .arg("raw")
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => {
                        PrintError::Unsupported("lp command not available".to_string())
                    }
                    _ => PrintError::Io(e),
                })?;

            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(data).await?;
                stdin.shutdown().await?;
            }

            let output = child.wait_with_output().await?;
            if output.status.success() {
                Ok(())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(self.classify_failure(&stderr))
            }
        };

        tokio::time::timeout(self.timeout, submit)
            .await
            .map_err(|_| PrintError::Timeout(format!("Queue submission timeout: {}", self.name)))??;

        info!("Queued print job");
        Ok(())
    }

    async fn is_online(&self) -> bool {
        use tokio::process::Command;

        match Command::new("lpstat")
            .arg("-p")
            .arg(&self.name)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
        {
            Ok(status) => status.success(),
            Err(e) => {
                warn!(error = %e, "lpstat unavailable");
                false
            }
        }
    }
}

/// Fallback for non-Unix: queue printing not supported
#[cfg(not(unix))]
impl Printer for QueuePrinter {
    async fn print(&self, _data: &[u8]) -> PrintResult<()> {
        Err(PrintError::Unsupported(
            "Queue printing not supported on this platform".to_string(),
        ))
    }

    async fn is_online(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[test]
    fn test_network_printer_new() {
        let printer = NetworkPrinter::new("192.168.1.100", 9100).unwrap();
        assert_eq!(printer.addr().port(), 9100);
    }

    #[test]
    fn test_network_printer_from_target() {
        let bare = NetworkPrinter::from_target("10.0.0.7").unwrap();
        assert_eq!(bare.addr().port(), DEFAULT_RAW_PORT);

        let with_port = NetworkPrinter::from_target("10.0.0.7:9200").unwrap();
        assert_eq!(with_port.addr().port(), 9200);
    }

    #[test]
    fn test_invalid_addr() {
        let result = NetworkPrinter::from_addr("invalid");
        assert!(matches!(result, Err(PrintError::InvalidConfig(_))));
    }

    #[test]
    fn test_queue_printer_rejects_empty_name() {
        assert!(QueuePrinter::new("  ").is_err());
    }

    #[test]
    fn test_classify_queue_failure() {
        let printer = QueuePrinter::new("BARRA").unwrap();
        assert!(matches!(
            printer.classify_failure("lp: The printer or class does not exist."),
            PrintError::DeviceNotFound(_)
        ));
        assert!(matches!(
            printer.classify_failure("lp: Destination \"BARRA\" is not accepting jobs."),
            PrintError::QueueBusy(_)
        ));
    }

    #[tokio::test]
    async fn test_network_print_delivers_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
        });

        let printer = NetworkPrinter::from_addr(&addr.to_string()).unwrap();
        printer.print(b"\x1B@hola\n").await.unwrap();

        assert_eq!(server.await.unwrap(), b"\x1B@hola\n".to_vec());
    }

    #[tokio::test]
    async fn test_stalled_printer_bounded_by_one_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accepts, then never reads
        let _device = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });

        let printer = NetworkPrinter::from_addr(&addr.to_string())
            .unwrap()
            .with_timeout(Duration::from_millis(300));
        let data = vec![b'x'; 32 * 1024 * 1024];

        let started = std::time::Instant::now();
        let err = printer.print(&data).await.unwrap_err();
        assert!(matches!(err, PrintError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_millis(550));
    }
}
