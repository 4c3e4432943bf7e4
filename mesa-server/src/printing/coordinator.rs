//! Dispatch coordinator
//!
//! Turns an order event into rendered tickets, one job record per
//! (printer, copy), and submits them through the transport. Printers run in
//! parallel on detached tasks; copies of one printer run in order.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::future::join_all;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    ControlTicket, DispatchResult, JobOutcome, JobStatus, JobType, OrderRef, PrintJob, Printer,
    PrinterOutcome, RoutableItem,
};
use shared::util::{new_id, now_millis};
use thiserror::Error;
use tracing::instrument;

use super::renderer::{self, TicketLayout};
use super::routing::RoutingResolver;
use super::status::DeviceStatusTracker;
use super::storage::{PrintJobStore, PrintStorageError};
use super::transport::{PrintTransport, TransportError};
use super::types::{DirectoryError, KitchenTicket, PrinterDirectory, PrinterStatusStore, ProductCatalog};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Printer/station/catalog lookup failed; nothing was printed
    #[error("Printer configuration unavailable: {0}")]
    Configuration(#[from] DirectoryError),

    #[error("Printer not found: {0}")]
    PrinterNotFound(String),

    #[error("Printer {0} is disabled")]
    PrinterNotAvailable(String),

    #[error("Print job not found: {0}")]
    JobNotFound(String),

    #[error("Print job storage error: {0}")]
    Storage(#[from] PrintStorageError),

    #[error("Print agent unavailable: {message}")]
    AgentUnavailable {
        job_id: Option<String>,
        message: String,
    },

    #[error("Print failed: {message}")]
    Delivery {
        job_id: Option<String>,
        message: String,
    },

    #[error("Print job {job_id} has no printable content: {reason}")]
    CorruptContent { job_id: String, reason: String },
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        let message = err.to_string();
        match err {
            DispatchError::Configuration(_) => AppError::with_message(ErrorCode::ConfigError, message),
            DispatchError::PrinterNotFound(id) => {
                AppError::with_message(ErrorCode::PrinterNotFound, message).with_detail("printer_id", id)
            }
            DispatchError::PrinterNotAvailable(id) => {
                AppError::with_message(ErrorCode::PrinterNotAvailable, message)
                    .with_detail("printer_id", id)
            }
            DispatchError::JobNotFound(id) => {
                AppError::with_message(ErrorCode::PrintJobNotFound, message).with_detail("job_id", id)
            }
            DispatchError::Storage(_) => AppError::database(message),
            DispatchError::AgentUnavailable { job_id, .. } => {
                AppError::with_message(ErrorCode::AgentUnavailable, message).with_detail("job_id", job_id)
            }
            DispatchError::Delivery { job_id, .. } => {
                AppError::print_failed(message).with_detail("job_id", job_id)
            }
            DispatchError::CorruptContent { job_id, .. } => {
                AppError::internal(message).with_detail("job_id", job_id)
            }
        }
    }
}

/// What one printer gets in a dispatch
struct Delivery {
    printer: Printer,
    job_type: JobType,
    order_id: Option<String>,
    copies: u32,
    /// Rendered bytes, or the layout error that prevented rendering
    content: Result<Vec<u8>, String>,
    reprint_of: Option<String>,
}

/// Result of one job plus the transport error behind a failure
struct Attempt {
    outcome: JobOutcome,
    cause: Option<TransportError>,
}

impl Attempt {
    fn failed(job_id: Option<String>, copy_index: u32, error: String) -> Self {
        Self {
            outcome: JobOutcome {
                job_id,
                copy_index,
                success: false,
                error: Some(error),
            },
            cause: None,
        }
    }

    /// Blocking callers see a failure as an error
    fn into_result(self) -> Result<JobOutcome, DispatchError> {
        if self.outcome.success {
            return Ok(self.outcome);
        }
        let job_id = self.outcome.job_id;
        let message = self.outcome.error.unwrap_or_else(|| "Print failed".to_string());
        match self.cause {
            Some(TransportError::AgentUnavailable(_)) => {
                Err(DispatchError::AgentUnavailable { job_id, message })
            }
            _ => Err(DispatchError::Delivery { job_id, message }),
        }
    }
}

#[derive(Clone)]
pub struct DispatchCoordinator {
    directory: Arc<dyn PrinterDirectory>,
    resolver: RoutingResolver,
    jobs: PrintJobStore,
    status: DeviceStatusTracker,
    transport: Arc<dyn PrintTransport>,
    timezone: Tz,
}

impl DispatchCoordinator {
    pub fn new(
        directory: Arc<dyn PrinterDirectory>,
        catalog: Arc<dyn ProductCatalog>,
        status_store: Arc<dyn PrinterStatusStore>,
        jobs: PrintJobStore,
        transport: Arc<dyn PrintTransport>,
        timezone: Tz,
    ) -> Self {
        Self {
            resolver: RoutingResolver::new(directory.clone(), catalog),
            directory,
            jobs,
            status: DeviceStatusTracker::new(status_store),
            transport,
            timezone,
        }
    }

    fn local_now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.timezone)
    }

    /// Kitchen comandas for items just added to an order
    #[instrument(skip_all, fields(order_id = %order.order_id, branch_id = %order.branch_id))]
    pub async fn dispatch_station_print(
        &self,
        order: &OrderRef,
        items: &[RoutableItem],
    ) -> Result<DispatchResult, DispatchError> {
        let targets = self
            .resolver
            .resolve_station_targets(&order.branch_id, items)
            .await?;

        if targets.is_empty() {
            tracing::debug!(item_count = items.len(), "No station printer accepts these items");
            return Ok(DispatchResult::default());
        }

        let printed_at = self.local_now();
        let deliveries = targets
            .into_iter()
            .map(|target| {
                let layout = TicketLayout::from_printer(&target.printer);
                let ticket = KitchenTicket::new(target.route.station_name(), order, &target.items);
                let content = renderer::render_comanda(&layout, &ticket, &printed_at)
                    .map(|t| t.to_escpos())
                    .map_err(|e| e.to_string());
                Delivery {
                    copies: target.printer.copies,
                    printer: target.printer,
                    job_type: JobType::StationOrder,
                    order_id: Some(order.order_id.clone()),
                    content,
                    reprint_of: None,
                }
            })
            .collect();

        let result = DispatchResult::from_outcomes(self.fan_out(deliveries).await);
        tracing::info!(
            printers = result.outcomes.len(),
            success_count = result.success_count,
            failure_count = result.failure_count,
            "Station dispatch finished"
        );
        Ok(result)
    }

    /// Control ticket with the complete order to every billing printer
    #[instrument(skip_all, fields(order_id = %ticket.order.order_id, branch_id = %ticket.order.branch_id))]
    pub async fn dispatch_control_print(
        &self,
        ticket: &ControlTicket,
    ) -> Result<DispatchResult, DispatchError> {
        let printers = self
            .resolver
            .resolve_billing_targets(&ticket.order.branch_id)
            .await?;

        if printers.is_empty() {
            tracing::debug!("No printer receives control tickets");
            return Ok(DispatchResult::default());
        }

        let printed_at = self.local_now();
        let deliveries = printers
            .into_iter()
            .map(|printer| {
                let layout = TicketLayout::from_printer(&printer);
                let content = renderer::render_control_ticket(&layout, ticket, &printed_at)
                    .map(|t| t.to_escpos())
                    .map_err(|e| e.to_string());
                Delivery {
                    copies: printer.copies,
                    printer,
                    job_type: JobType::FullOrder,
                    order_id: Some(ticket.order.order_id.clone()),
                    content,
                    reprint_of: None,
                }
            })
            .collect();

        let result = DispatchResult::from_outcomes(self.fan_out(deliveries).await);
        tracing::info!(
            printers = result.outcomes.len(),
            success_count = result.success_count,
            failure_count = result.failure_count,
            "Control dispatch finished"
        );
        Ok(result)
    }

    /// One test page, ignoring `copies` and `auto_print`
    #[instrument(skip(self))]
    pub async fn dispatch_test_print(&self, printer_id: &str) -> Result<JobOutcome, DispatchError> {
        let printer = self
            .directory
            .printer(printer_id)
            .await?
            .ok_or_else(|| DispatchError::PrinterNotFound(printer_id.to_string()))?;

        let content = renderer::render_test_page(&printer, &self.local_now())
            .map(|t| t.to_escpos())
            .map_err(|e| e.to_string());

        let delivery = Delivery {
            printer,
            job_type: JobType::Test,
            order_id: None,
            copies: 1,
            content,
            reprint_of: None,
        };
        self.deliver(&delivery, 1).await.into_result()
    }

    /// Replay a stored job as a new job; the original stays as it was
    #[instrument(skip(self))]
    pub async fn reprint_job(&self, job_id: &str) -> Result<JobOutcome, DispatchError> {
        let original = self
            .jobs
            .get_job(job_id)?
            .ok_or_else(|| DispatchError::JobNotFound(job_id.to_string()))?;

        let printer = self
            .directory
            .printer(&original.printer_id)
            .await?
            .ok_or_else(|| DispatchError::PrinterNotFound(original.printer_id.clone()))?;
        if !printer.is_active {
            return Err(DispatchError::PrinterNotAvailable(printer.id));
        }

        let content = BASE64
            .decode(original.content.as_bytes())
            .map_err(|e| DispatchError::CorruptContent {
                job_id: job_id.to_string(),
                reason: e.to_string(),
            })?;
        if content.is_empty() {
            return Err(DispatchError::CorruptContent {
                job_id: job_id.to_string(),
                reason: "the ticket was never rendered".to_string(),
            });
        }

        let delivery = Delivery {
            printer,
            job_type: original.job_type,
            order_id: original.order_id.clone(),
            copies: 1,
            content: Ok(content),
            reprint_of: Some(original.id.clone()),
        };
        self.deliver(&delivery, original.copy_index).await.into_result()
    }

    /// One detached task per printer, gathered without short-circuit
    async fn fan_out(&self, deliveries: Vec<Delivery>) -> Vec<PrinterOutcome> {
        let mut labels = Vec::with_capacity(deliveries.len());
        let mut handles = Vec::with_capacity(deliveries.len());

        for delivery in deliveries {
            labels.push((
                delivery.printer.id.clone(),
                delivery.printer.name.clone(),
                delivery.copies,
            ));
            let this = self.clone();
            handles.push(tokio::spawn(async move { this.deliver_copies(delivery).await }));
        }

        join_all(handles)
            .await
            .into_iter()
            .zip(labels)
            .map(|(joined, (printer_id, printer_name, copies))| match joined {
                Ok(jobs) => PrinterOutcome {
                    printer_id,
                    printer_name,
                    jobs,
                },
                Err(e) => {
                    tracing::error!(printer_id = %printer_id, error = %e, "Printer task aborted");
                    PrinterOutcome {
                        jobs: (1..=copies)
                            .map(|copy_index| {
                                Attempt::failed(None, copy_index, format!("Printer task failed: {}", e))
                                    .outcome
                            })
                            .collect(),
                        printer_id,
                        printer_name,
                    }
                }
            })
            .collect()
    }

    async fn deliver_copies(&self, delivery: Delivery) -> Vec<JobOutcome> {
        let mut jobs = Vec::with_capacity(delivery.copies as usize);
        for copy_index in 1..=delivery.copies {
            jobs.push(self.deliver(&delivery, copy_index).await.outcome);
        }
        jobs
    }

    /// Record, submit and settle one copy
    async fn deliver(&self, delivery: &Delivery, copy_index: u32) -> Attempt {
        let printer = &delivery.printer;
        let job = PrintJob {
            id: new_id(),
            printer_id: printer.id.clone(),
            branch_id: printer.branch_id.clone(),
            order_id: delivery.order_id.clone(),
            job_type: delivery.job_type,
            copy_index,
            content: delivery
                .content
                .as_ref()
                .map(|bytes| BASE64.encode(bytes))
                .unwrap_or_default(),
            status: JobStatus::Pending,
            error: None,
            attempts: 0,
            created_at: now_millis(),
            sent_at: None,
            finished_at: None,
            reprint_of: delivery.reprint_of.clone(),
        };

        if let Err(e) = self.jobs.create_pending(&job) {
            tracing::error!(printer_id = %printer.id, copy_index, error = %e, "Failed to record print job");
            return Attempt::failed(None, copy_index, format!("Failed to record print job: {}", e));
        }

        let bytes = match &delivery.content {
            Ok(bytes) => bytes,
            Err(layout_error) => {
                tracing::warn!(printer_id = %printer.id, job_id = %job.id, error = %layout_error, "Ticket could not be rendered");
                self.settle_failed(&job.id, layout_error);
                return Attempt::failed(Some(job.id), copy_index, layout_error.clone());
            }
        };

        match self.transport.send(printer, bytes).await {
            Ok(()) => {
                let error = self.settle_sent(&job.id);
                self.status.record_outcome(&printer.id, true);
                tracing::debug!(printer_id = %printer.id, job_id = %job.id, copy_index, "Print job sent");
                Attempt {
                    outcome: JobOutcome {
                        job_id: Some(job.id),
                        copy_index,
                        success: true,
                        error,
                    },
                    cause: None,
                }
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(printer_id = %printer.id, job_id = %job.id, copy_index, error = %message, "Print job failed");
                self.settle_failed(&job.id, &message);
                self.status.record_outcome(&printer.id, false);
                let mut attempt = Attempt::failed(Some(job.id), copy_index, message);
                attempt.cause = Some(e);
                attempt
            }
        }
    }

    /// The paper is out either way; a record that stays PENDING is reported on the outcome
    fn settle_sent(&self, job_id: &str) -> Option<String> {
        let first = match self.jobs.mark_sent(job_id, now_millis()) {
            Ok(_) => return None,
            Err(e) => e,
        };
        tracing::warn!(job_id = %job_id, error = %first, "Failed to mark print job sent, retrying");
        match self.jobs.mark_sent(job_id, now_millis()) {
            Ok(_) => None,
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Print job record left unsettled");
                Some(format!("Printed, but the job record was not updated: {}", e))
            }
        }
    }

    fn settle_failed(&self, job_id: &str, error: &str) {
        if let Err(e) = self.jobs.mark_failed(job_id, error, now_millis()) {
            tracing::error!(job_id = %job_id, error = %e, "Failed to mark print job failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ConfigStore;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use shared::models::{
        PrintMode, PrinterCreate, PrinterStatus, PrinterUpdate, StationCreate,
    };
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every submission; addresses listed in `failing` fail
    #[derive(Default)]
    struct FakeTransport {
        sent: Mutex<Vec<(String, Vec<u8>)>>,
        failing: Mutex<HashMap<String, TransportError>>,
        delay: Option<Duration>,
    }

    impl FakeTransport {
        fn fail(&self, address: &str, error: TransportError) {
            self.failing.lock().unwrap().insert(address.to_string(), error);
        }

        fn sent_to(&self, address: &str) -> Vec<Vec<u8>> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(a, _)| a == address)
                .map(|(_, bytes)| bytes.clone())
                .collect()
        }

        fn total(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PrintTransport for FakeTransport {
        async fn send(&self, printer: &Printer, content: &[u8]) -> Result<(), TransportError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.sent
                .lock()
                .unwrap()
                .push((printer.system_identifier.clone(), content.to_vec()));
            match self.failing.lock().unwrap().get(&printer.system_identifier) {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }
    }

    struct Fixture {
        store: ConfigStore,
        jobs: PrintJobStore,
        transport: Arc<FakeTransport>,
        coordinator: DispatchCoordinator,
    }

    fn coordinator_over(
        store: &ConfigStore,
        jobs: &PrintJobStore,
        transport: Arc<dyn PrintTransport>,
    ) -> DispatchCoordinator {
        let store_arc = Arc::new(store.clone());
        DispatchCoordinator::new(
            store_arc.clone(),
            store_arc.clone(),
            store_arc,
            jobs.clone(),
            transport,
            chrono_tz::Europe::Madrid,
        )
    }

    fn fixture_with(transport: FakeTransport) -> Fixture {
        let store = ConfigStore::open_in_memory().unwrap();
        let jobs = PrintJobStore::open_in_memory().unwrap();
        let transport = Arc::new(transport);
        let coordinator = coordinator_over(&store, &jobs, transport.clone());
        Fixture {
            store,
            jobs,
            transport,
            coordinator,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(FakeTransport::default())
    }

    impl Fixture {
        fn printer(&self, name: &str, address: &str, configure: impl FnOnce(&mut PrinterCreate)) -> Printer {
            let mut create: PrinterCreate = serde_json::from_value(serde_json::json!({
                "branch_id": "b1",
                "name": name,
                "system_identifier": address,
                "connection": "NETWORK",
            }))
            .unwrap();
            configure(&mut create);
            self.store.create_printer(create).unwrap()
        }

        fn station(&self, name: &str, categories: &[&str]) -> String {
            self.store
                .create_station(StationCreate {
                    branch_id: "b1".to_string(),
                    name: name.to_string(),
                    category_ids: categories.iter().map(|c| c.to_string()).collect(),
                })
                .unwrap()
                .id
        }
    }

    fn order() -> OrderRef {
        OrderRef {
            order_id: "o1".to_string(),
            branch_id: "b1".to_string(),
            public_code: Some("A-042".to_string()),
            table_label: Some("7".to_string()),
        }
    }

    fn item(product_id: &str, name: &str, category: Option<&str>) -> RoutableItem {
        RoutableItem {
            product_id: product_id.to_string(),
            name: name.to_string(),
            quantity: 1,
            unit_price: Some(Decimal::new(1250, 2)),
            notes: None,
            category_id: category.map(str::to_string),
        }
    }

    fn text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    #[tokio::test]
    async fn test_grill_bar_routing_scenario() {
        let fx = fixture();
        let grill = fx.station("Grill", &["meat"]);
        let bar = fx.station("Bar", &["drinks"]);
        fx.printer("Grill", "10.0.0.1", |p| p.station_id = Some(grill.clone()));
        fx.printer("Bar", "10.0.0.2", |p| p.station_id = Some(bar.clone()));
        fx.printer("Pase", "10.0.0.3", |_| {});

        let items = [
            item("steak", "Entrecot", Some("meat")),
            item("beer", "Cerveza", Some("drinks")),
            item("bread", "Pan", None),
        ];
        let result = fx.coordinator.dispatch_station_print(&order(), &items).await.unwrap();

        assert_eq!(result.outcomes.len(), 3);
        assert_eq!(result.success_count, 3);

        let grill_ticket = text(&fx.transport.sent_to("10.0.0.1")[0]);
        assert!(grill_ticket.contains("Entrecot"));
        assert!(!grill_ticket.contains("Cerveza"));
        assert!(!grill_ticket.contains("Pan"));

        let bar_ticket = text(&fx.transport.sent_to("10.0.0.2")[0]);
        assert!(bar_ticket.contains("Cerveza"));
        assert!(!bar_ticket.contains("Entrecot"));

        let pass_ticket = text(&fx.transport.sent_to("10.0.0.3")[0]);
        for name in ["Entrecot", "Cerveza", "Pan"] {
            assert!(pass_ticket.contains(name));
        }
        // No prices on kitchen tickets
        assert!(!pass_ticket.contains("12.50"));
    }

    #[tokio::test]
    async fn test_copies_create_one_job_each() {
        let fx = fixture();
        let printer = fx.printer("Cocina", "10.0.0.1", |p| p.copies = 3);

        let result = fx
            .coordinator
            .dispatch_station_print(&order(), &[item("steak", "Entrecot", None)])
            .await
            .unwrap();

        assert_eq!(result.success_count, 3);
        assert_eq!(fx.transport.total(), 3);

        let jobs = fx.jobs.jobs_for_printer(&printer.id).unwrap();
        let copies: HashSet<u32> = jobs.iter().map(|j| j.copy_index).collect();
        assert_eq!(copies, HashSet::from([1, 2, 3]));
        assert!(jobs.iter().all(|j| j.status == JobStatus::Sent && j.sent_at.is_some()));
    }

    /// Watches the job store while each send is in flight
    struct SequencingTransport {
        jobs: PrintJobStore,
        in_flight: Mutex<HashMap<String, usize>>,
        peak: Mutex<HashMap<String, usize>>,
        pending_seen: Mutex<HashMap<String, Vec<Vec<u32>>>>,
    }

    impl SequencingTransport {
        fn new(jobs: PrintJobStore) -> Self {
            Self {
                jobs,
                in_flight: Mutex::new(HashMap::new()),
                peak: Mutex::new(HashMap::new()),
                pending_seen: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl PrintTransport for SequencingTransport {
        async fn send(&self, printer: &Printer, _content: &[u8]) -> Result<(), TransportError> {
            let address = printer.system_identifier.clone();
            {
                let mut in_flight = self.in_flight.lock().unwrap();
                let now = in_flight.entry(address.clone()).or_default();
                *now += 1;
                let mut peak = self.peak.lock().unwrap();
                let max = peak.entry(address.clone()).or_default();
                *max = (*max).max(*now);
            }

            let pending: Vec<u32> = self
                .jobs
                .jobs_for_printer(&printer.id)
                .unwrap()
                .into_iter()
                .filter(|j| j.status == JobStatus::Pending)
                .map(|j| j.copy_index)
                .collect();
            self.pending_seen
                .lock()
                .unwrap()
                .entry(address.clone())
                .or_default()
                .push(pending);

            tokio::time::sleep(Duration::from_millis(40)).await;
            *self.in_flight.lock().unwrap().get_mut(&address).unwrap() -= 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_copies_go_out_one_at_a_time_in_order() {
        let store = ConfigStore::open_in_memory().unwrap();
        let jobs = PrintJobStore::open_in_memory().unwrap();
        let transport = Arc::new(SequencingTransport::new(jobs.clone()));
        let coordinator = coordinator_over(&store, &jobs, transport.clone());

        let mut printers = Vec::new();
        for (name, address) in [("Cocina", "10.0.0.1"), ("Barra", "10.0.0.2")] {
            let mut create: PrinterCreate = serde_json::from_value(serde_json::json!({
                "branch_id": "b1",
                "name": name,
                "system_identifier": address,
                "connection": "NETWORK",
            }))
            .unwrap();
            create.copies = 3;
            printers.push(store.create_printer(create).unwrap());
        }

        let result = coordinator
            .dispatch_station_print(&order(), &[item("steak", "Entrecot", None)])
            .await
            .unwrap();
        assert_eq!(result.success_count, 6);

        let peak = transport.peak.lock().unwrap().clone();
        let seen = transport.pending_seen.lock().unwrap().clone();
        for printer in &printers {
            assert_eq!(peak[&printer.system_identifier], 1);
            // Exactly the current copy is PENDING while it is on the wire
            assert_eq!(seen[&printer.system_identifier], vec![vec![1], vec![2], vec![3]]);

            let stored = jobs.jobs_for_printer(&printer.id).unwrap();
            let copies: Vec<u32> = stored.iter().map(|j| j.copy_index).collect();
            assert_eq!(copies, vec![1, 2, 3]);
            for pair in stored.windows(2) {
                assert!(pair[0].created_at < pair[1].created_at);
                assert!(pair[0].sent_at.unwrap() <= pair[1].created_at);
            }
        }
    }

    /// Settles the job behind the coordinator's back, so marking it sent fails
    struct SettlingTransport {
        jobs: PrintJobStore,
    }

    #[async_trait]
    impl PrintTransport for SettlingTransport {
        async fn send(&self, printer: &Printer, _content: &[u8]) -> Result<(), TransportError> {
            for job in self.jobs.jobs_for_printer(&printer.id).unwrap() {
                if job.status == JobStatus::Pending {
                    self.jobs.mark_failed(&job.id, "settled elsewhere", 1).unwrap();
                }
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unrecorded_send_is_reported_on_outcome() {
        let store = ConfigStore::open_in_memory().unwrap();
        let jobs = PrintJobStore::open_in_memory().unwrap();
        let transport = Arc::new(SettlingTransport { jobs: jobs.clone() });
        let coordinator = coordinator_over(&store, &jobs, transport);

        let create: PrinterCreate = serde_json::from_value(serde_json::json!({
            "branch_id": "b1",
            "name": "Cocina",
            "system_identifier": "10.0.0.1",
            "connection": "NETWORK",
        }))
        .unwrap();
        let printer = store.create_printer(create).unwrap();

        let outcome = coordinator.dispatch_test_print(&printer.id).await.unwrap();
        assert!(outcome.success);
        assert!(
            outcome
                .error
                .as_deref()
                .unwrap()
                .contains("job record was not updated")
        );
        let status = store.get_printer(&printer.id).unwrap().unwrap().status;
        assert_eq!(status, PrinterStatus::Online);
    }

    #[tokio::test]
    async fn test_partial_failure_is_isolated() {
        let fx = fixture();
        fx.printer("Grill", "10.0.0.1", |_| {});
        let bar = fx.printer("Bar", "10.0.0.2", |_| {});
        fx.printer("Pase", "10.0.0.3", |_| {});
        fx.transport.fail(
            "10.0.0.2",
            TransportError::Timeout("Printer did not answer within 5000ms".to_string()),
        );

        let result = fx
            .coordinator
            .dispatch_station_print(&order(), &[item("steak", "Entrecot", None)])
            .await
            .unwrap();

        assert_eq!(result.success_count, 2);
        assert_eq!(result.failure_count, 1);

        let jobs = fx.jobs.jobs_for_order("o1").unwrap();
        assert_eq!(jobs.len(), 3);
        let failed: Vec<&PrintJob> = jobs.iter().filter(|j| j.status == JobStatus::Failed).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].printer_id, bar.id);
        assert_eq!(failed[0].attempts, 1);
        assert_eq!(failed[0].error.as_deref(), Some("Printer did not answer within 5000ms"));

        let bar = fx.store.get_printer(&bar.id).unwrap().unwrap();
        assert_eq!(bar.status, PrinterStatus::Error);
    }

    #[tokio::test]
    async fn test_no_targets_is_a_noop() {
        let fx = fixture();
        let grill = fx.station("Grill", &["meat"]);
        fx.printer("Grill", "10.0.0.1", |p| p.station_id = Some(grill.clone()));

        let result = fx
            .coordinator
            .dispatch_station_print(&order(), &[item("beer", "Cerveza", Some("drinks"))])
            .await
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(fx.transport.total(), 0);
        assert_eq!(fx.jobs.stats().unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_error_status_never_gates_dispatch() {
        let fx = fixture();
        let printer = fx.printer("Cocina", "10.0.0.1", |_| {});
        fx.store
            .set_printer_status(&printer.id, PrinterStatus::Error, 1)
            .unwrap();

        let result = fx
            .coordinator
            .dispatch_station_print(&order(), &[item("steak", "Entrecot", None)])
            .await
            .unwrap();

        assert_eq!(result.success_count, 1);
        let stored = fx.store.get_printer(&printer.id).unwrap().unwrap();
        assert_eq!(stored.status, PrinterStatus::Online);
    }

    #[tokio::test]
    async fn test_layout_error_skips_device() {
        let fx = fixture();
        let printer = fx.printer("Cocina", "10.0.0.1", |_| {});
        // Bypass validation to simulate a layout stored by an older release
        let mut broken = fx.store.get_printer(&printer.id).unwrap().unwrap();
        broken.chars_per_line = 20;
        let directory = Arc::new(SinglePrinter(broken));
        let coordinator = DispatchCoordinator::new(
            directory.clone(),
            directory,
            Arc::new(fx.store.clone()),
            fx.jobs.clone(),
            fx.transport.clone(),
            chrono_tz::UTC,
        );

        let result = coordinator
            .dispatch_station_print(&order(), &[item("steak", "Entrecot", None)])
            .await
            .unwrap();

        assert_eq!(result.failure_count, 1);
        assert_eq!(fx.transport.total(), 0);
        let jobs = fx.jobs.jobs_for_printer(&printer.id).unwrap();
        assert_eq!(jobs[0].status, JobStatus::Failed);
        assert!(jobs[0].error.as_deref().unwrap_or_default().contains("20"));

        let stored = fx.store.get_printer(&printer.id).unwrap().unwrap();
        assert_eq!(stored.status, PrinterStatus::Offline);
    }

    struct SinglePrinter(Printer);

    #[async_trait]
    impl PrinterDirectory for SinglePrinter {
        async fn branch_printers(&self, _branch_id: &str) -> Result<Vec<Printer>, DirectoryError> {
            Ok(vec![self.0.clone()])
        }

        async fn branch_stations(
            &self,
            _branch_id: &str,
        ) -> Result<Vec<shared::models::Station>, DirectoryError> {
            Ok(Vec::new())
        }

        async fn printer(&self, _printer_id: &str) -> Result<Option<Printer>, DirectoryError> {
            Ok(Some(self.0.clone()))
        }
    }

    #[async_trait]
    impl ProductCatalog for SinglePrinter {
        async fn categories_for(
            &self,
            _product_ids: &[String],
        ) -> Result<HashMap<String, String>, DirectoryError> {
            Err(DirectoryError("catalog offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_configuration_failure_creates_no_jobs() {
        let fx = fixture();
        let printer = fx.printer("Cocina", "10.0.0.1", |_| {});
        let mut grill = fx.store.get_printer(&printer.id).unwrap().unwrap();
        grill.station_id = Some("s1".to_string());

        // Station filter forces a catalog lookup, which fails
        struct StationDirectory(Printer);

        #[async_trait]
        impl PrinterDirectory for StationDirectory {
            async fn branch_printers(&self, _: &str) -> Result<Vec<Printer>, DirectoryError> {
                Ok(vec![self.0.clone()])
            }
            async fn branch_stations(
                &self,
                _: &str,
            ) -> Result<Vec<shared::models::Station>, DirectoryError> {
                Ok(vec![shared::models::Station {
                    id: "s1".to_string(),
                    branch_id: "b1".to_string(),
                    name: "Grill".to_string(),
                    category_ids: vec!["meat".to_string()],
                    created_at: 0,
                }])
            }
            async fn printer(&self, _: &str) -> Result<Option<Printer>, DirectoryError> {
                Ok(Some(self.0.clone()))
            }
        }

        let coordinator = DispatchCoordinator::new(
            Arc::new(StationDirectory(grill.clone())),
            Arc::new(SinglePrinter(grill)),
            Arc::new(fx.store.clone()),
            fx.jobs.clone(),
            fx.transport.clone(),
            chrono_tz::UTC,
        );

        let err = coordinator
            .dispatch_station_print(&order(), &[item("steak", "Entrecot", None)])
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Configuration(_)));
        assert_eq!(fx.jobs.stats().unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_control_ticket_goes_to_billing_printers() {
        let fx = fixture();
        fx.printer("Caja", "10.0.0.1", |p| p.print_mode = PrintMode::FullOrder);
        fx.printer("Cocina", "10.0.0.2", |_| {});
        // Billing ignores auto_print
        fx.printer("Barra", "10.0.0.3", |p| {
            p.print_mode = PrintMode::Both;
            p.auto_print = false;
        });

        let mut line = item("menu", "Menu degustacion", None);
        line.unit_price = Some(Decimal::new(100000, 2));
        let ticket = ControlTicket {
            order: order(),
            business: None,
            order_type: Some("Mesa".to_string()),
            customer_name: None,
            server_name: Some("Lucia".to_string()),
            items: vec![line],
            discount_percentage: Some(Decimal::TEN),
            tax_rate: Decimal::TEN,
        };

        let result = fx.coordinator.dispatch_control_print(&ticket).await.unwrap();
        assert_eq!(result.success_count, 2);
        assert!(fx.transport.sent_to("10.0.0.2").is_empty());

        let printed = text(&fx.transport.sent_to("10.0.0.1")[0]);
        assert!(printed.contains("900.00"));
        assert!(printed.contains("-100.00"));

        let jobs = fx.jobs.jobs_for_order("o1").unwrap();
        assert!(jobs.iter().all(|j| j.job_type == JobType::FullOrder));
    }

    #[tokio::test]
    async fn test_test_print_ignores_copies_and_blocks_on_failure() {
        let fx = fixture();
        let printer = fx.printer("Cocina", "10.0.0.1", |p| {
            p.copies = 3;
            p.auto_print = false;
        });

        let outcome = fx.coordinator.dispatch_test_print(&printer.id).await.unwrap();
        assert!(outcome.success);
        assert_eq!(fx.transport.total(), 1);
        let job = fx.jobs.get_job(outcome.job_id.as_deref().unwrap()).unwrap().unwrap();
        assert_eq!(job.job_type, JobType::Test);
        assert!(job.order_id.is_none());

        fx.transport.fail(
            "10.0.0.1",
            TransportError::ConnectionRefused("Connection refused by 10.0.0.1:9100".to_string()),
        );
        let err = fx.coordinator.dispatch_test_print(&printer.id).await.unwrap_err();
        assert!(matches!(err, DispatchError::Delivery { job_id: Some(_), .. }));

        fx.transport.fail(
            "10.0.0.1",
            TransportError::AgentUnavailable("Print agent unreachable".to_string()),
        );
        let err = fx.coordinator.dispatch_test_print(&printer.id).await.unwrap_err();
        assert_eq!(AppError::from(err).code, ErrorCode::AgentUnavailable);

        assert!(matches!(
            fx.coordinator.dispatch_test_print("missing").await,
            Err(DispatchError::PrinterNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reprint_creates_new_job() {
        let fx = fixture();
        let printer = fx.printer("Cocina", "10.0.0.1", |_| {});
        fx.transport.fail(
            "10.0.0.1",
            TransportError::QueueBusy("Printer is busy".to_string()),
        );
        let result = fx
            .coordinator
            .dispatch_station_print(&order(), &[item("steak", "Entrecot", None)])
            .await
            .unwrap();
        let original_id = result.outcomes[0].jobs[0].job_id.clone().unwrap();

        fx.transport.failing.lock().unwrap().clear();
        let outcome = fx.coordinator.reprint_job(&original_id).await.unwrap();
        assert!(outcome.success);
        assert_ne!(outcome.job_id.as_deref(), Some(original_id.as_str()));

        let original = fx.jobs.get_job(&original_id).unwrap().unwrap();
        assert_eq!(original.status, JobStatus::Failed);
        let reprint = fx.jobs.get_job(outcome.job_id.as_deref().unwrap()).unwrap().unwrap();
        assert_eq!(reprint.status, JobStatus::Sent);
        assert_eq!(reprint.reprint_of.as_deref(), Some(original_id.as_str()));
        assert_eq!(reprint.content, original.content);

        let sent = fx.transport.sent_to("10.0.0.1");
        assert_eq!(sent[0], sent[1]);

        fx.store.set_printer_active(&printer.id, false).unwrap();
        assert!(matches!(
            fx.coordinator.reprint_job(&original_id).await,
            Err(DispatchError::PrinterNotAvailable(_))
        ));
        assert!(matches!(
            fx.coordinator.reprint_job("missing").await,
            Err(DispatchError::JobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_printers_run_concurrently() {
        let fx = fixture_with(FakeTransport {
            delay: Some(Duration::from_millis(200)),
            ..Default::default()
        });
        for i in 1..=4 {
            fx.printer(&format!("P{}", i), &format!("10.0.0.{}", i), |_| {});
        }

        let started = std::time::Instant::now();
        let result = fx
            .coordinator
            .dispatch_station_print(&order(), &[item("steak", "Entrecot", None)])
            .await
            .unwrap();

        assert_eq!(result.success_count, 4);
        assert!(started.elapsed() < Duration::from_millis(700));
    }

    #[tokio::test]
    async fn test_disabled_printer_is_skipped() {
        let fx = fixture();
        let printer = fx.printer("Cocina", "10.0.0.1", |_| {});
        fx.store
            .update_printer(
                &printer.id,
                PrinterUpdate {
                    auto_print: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        let barra = fx.printer("Barra", "10.0.0.2", |_| {});
        fx.store.set_printer_active(&barra.id, false).unwrap();
        fx.printer("Caja", "10.0.0.3", |p| p.print_mode = PrintMode::FullOrder);

        let result = fx
            .coordinator
            .dispatch_station_print(&order(), &[item("steak", "Entrecot", None)])
            .await
            .unwrap();
        assert!(result.is_empty());
    }
}
