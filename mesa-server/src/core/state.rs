use std::sync::Arc;

use shared::models::ItemsAddedEvent;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::{Config, Result, ServerError};
use crate::db::ConfigStore;
use crate::printing::{
    AgentTransport, DispatchCoordinator, PrintEventWorker, PrintJobStore, PrintTransport,
};

/// Server state, shared by every handler
///
/// Cloning is cheap: every service is `Arc`-backed.
///
/// | Field | Description |
/// |-------|-------------|
/// | config | Immutable configuration |
/// | config_store | Printers, stations, catalog |
/// | jobs | Print job audit trail |
/// | coordinator | Print dispatch |
/// | transport | Channel to the print-agent |
/// | print_events | Queue feeding the print event worker |
/// | shutdown | Cancelled when the server stops |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub config_store: ConfigStore,
    pub jobs: PrintJobStore,
    pub coordinator: DispatchCoordinator,
    pub transport: Arc<dyn PrintTransport>,
    pub print_events: mpsc::Sender<ItemsAddedEvent>,
    pub shutdown: CancellationToken,
}

impl ServerState {
    /// Open the databases under `work_dir` and connect the agent transport
    ///
    /// Must be called inside a tokio runtime.
    pub fn initialize(config: &Config) -> Result<Self> {
        if config.print_event_buffer == 0 {
            return Err(ServerError::Config(
                "PRINT_EVENT_BUFFER must be at least 1".to_string(),
            ));
        }

        std::fs::create_dir_all(&config.work_dir)?;
        let config_store = ConfigStore::open(config.config_db_path())?;
        let jobs = PrintJobStore::open(config.jobs_db_path())?;
        let transport: Arc<dyn PrintTransport> = Arc::new(AgentTransport::from_config(config));

        tracing::info!(
            work_dir = %config.work_dir,
            agent_addr = %config.agent_addr,
            timezone = %config.timezone,
            "Server state initialized"
        );
        Ok(Self::with_parts(config.clone(), config_store, jobs, transport))
    }

    /// Assemble state from existing services and start the print event worker
    pub fn with_parts(
        config: Config,
        config_store: ConfigStore,
        jobs: PrintJobStore,
        transport: Arc<dyn PrintTransport>,
    ) -> Self {
        let store = Arc::new(config_store.clone());
        let coordinator = DispatchCoordinator::new(
            store.clone(),
            store.clone(),
            store,
            jobs.clone(),
            transport.clone(),
            config.timezone,
        );

        let (print_events, event_rx) = mpsc::channel(config.print_event_buffer.max(1));
        let shutdown = CancellationToken::new();
        tokio::spawn(PrintEventWorker::new(coordinator.clone()).run(event_rx, shutdown.clone()));

        Self {
            config,
            config_store,
            jobs,
            coordinator,
            transport,
            print_events,
            shutdown,
        }
    }
}
