use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

/// Must stay above the agent's device deadline so a slow success still acks in time
pub const DEFAULT_AGENT_REQUEST_TIMEOUT_MS: u64 = 12_000;

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | WORK_DIR | /var/lib/mesa | Databases live here |
/// | HTTP_PORT | 8080 | HTTP API port |
/// | AGENT_ADDR | 127.0.0.1:9311 | Local print-agent address |
/// | AGENT_REQUEST_TIMEOUT_MS | 12000 | Per-request wait for a print ack |
/// | AGENT_CONNECT_TIMEOUT_MS | 2000 | Connect + handshake timeout |
/// | TIMEZONE | Europe/Madrid | Timestamps printed on tickets |
/// | LOG_LEVEL | info | Log filter when RUST_LOG is unset |
/// | LOG_DIR | (unset) | Daily rolling log files go here when set |
/// | PRINT_EVENT_BUFFER | 256 | Queued items-added events before senders wait |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/mesa HTTP_PORT=9000 cargo run -p mesa-server
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: String,
    pub http_port: u16,
    pub agent_addr: String,
    pub agent_request_timeout_ms: u64,
    pub agent_connect_timeout_ms: u64,
    pub timezone: Tz,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub print_event_buffer: usize,
}

impl Config {
    /// Load from environment, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/mesa".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            agent_addr: std::env::var("AGENT_ADDR").unwrap_or_else(|_| "127.0.0.1:9311".into()),
            agent_request_timeout_ms: std::env::var("AGENT_REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_AGENT_REQUEST_TIMEOUT_MS),
            agent_connect_timeout_ms: std::env::var("AGENT_CONNECT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2000),
            timezone: std::env::var("TIMEZONE")
                .ok()
                .and_then(|tz| tz.parse().ok())
                .unwrap_or(chrono_tz::Europe::Madrid),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
            print_event_buffer: std::env::var("PRINT_EVENT_BUFFER")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(256),
        }
    }

    /// Override the values tests care about
    pub fn with_overrides(
        work_dir: impl Into<String>,
        http_port: u16,
        agent_addr: impl Into<String>,
    ) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config.agent_addr = agent_addr.into();
        config
    }

    pub fn config_db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("config.redb")
    }

    pub fn jobs_db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("print_jobs.redb")
    }

    pub fn agent_request_timeout(&self) -> Duration {
        Duration::from_millis(self.agent_request_timeout_ms)
    }

    pub fn agent_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.agent_connect_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
