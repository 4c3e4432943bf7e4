use std::time::Duration;

/// Overall deadline for one device delivery
pub const DEFAULT_DEVICE_TIMEOUT_MS: u64 = 5000;

/// Print-agent configuration
///
/// # Environment variables
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | AGENT_LISTEN_ADDR | 127.0.0.1:9311 | Address the agent listens on |
/// | DEVICE_TIMEOUT_MS | 5000 | Overall deadline per device delivery |
/// | LOG_LEVEL | info | Log filter when RUST_LOG is unset |
/// | LOG_DIR | (unset) | Daily rolling log files go here when set |
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub listen_addr: String,
    pub device_timeout_ms: u64,
    pub log_level: String,
    pub log_dir: Option<String>,
}

impl AgentConfig {
    pub fn from_env() -> Self {
        Self {
            listen_addr: std::env::var("AGENT_LISTEN_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:9311".into()),
            device_timeout_ms: std::env::var("DEVICE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DEVICE_TIMEOUT_MS),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
        }
    }

    /// Override the listen address, keeping everything else from the environment
    pub fn with_listen_addr(listen_addr: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.listen_addr = listen_addr.into();
        config
    }

    pub fn device_timeout(&self) -> Duration {
        Duration::from_millis(self.device_timeout_ms)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
