//! Print event worker
//!
//! Lets the order service fire `ItemsAdded` events without waiting for the
//! printers. Each event is dispatched in arrival order.

use shared::models::ItemsAddedEvent;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::coordinator::DispatchCoordinator;

pub struct PrintEventWorker {
    coordinator: DispatchCoordinator,
}

impl PrintEventWorker {
    pub fn new(coordinator: DispatchCoordinator) -> Self {
        Self { coordinator }
    }

    /// Run until the channel closes or shutdown is requested
    pub async fn run(self, mut event_rx: mpsc::Receiver<ItemsAddedEvent>, shutdown: CancellationToken) {
        tracing::info!("Print event worker started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Print event worker received shutdown signal");
                    break;
                }
                event = event_rx.recv() => {
                    let Some(event) = event else {
                        tracing::info!("Print event channel closed, worker stopping");
                        break;
                    };
                    self.handle_items_added(event).await;
                }
            }
        }
    }

    async fn handle_items_added(&self, event: ItemsAddedEvent) {
        tracing::debug!(
            order_id = %event.order.order_id,
            item_count = event.items.len(),
            "handle_items_added: start"
        );

        match self
            .coordinator
            .dispatch_station_print(&event.order, &event.items)
            .await
        {
            Ok(result) if result.failure_count > 0 => {
                tracing::warn!(
                    order_id = %event.order.order_id,
                    success_count = result.success_count,
                    failure_count = result.failure_count,
                    "Kitchen print partially failed"
                );
            }
            Ok(result) => {
                tracing::debug!(
                    order_id = %event.order.order_id,
                    success_count = result.success_count,
                    "Kitchen print done"
                );
            }
            Err(e) => {
                tracing::error!(
                    order_id = %event.order.order_id,
                    error = %e,
                    "Kitchen print dispatch failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ConfigStore;
    use crate::printing::storage::PrintJobStore;
    use crate::printing::transport::{PrintTransport, TransportError};
    use async_trait::async_trait;
    use shared::models::{OrderRef, Printer, PrinterCreate, RoutableItem};
    use std::sync::Arc;
    use std::time::Duration;

    struct Accepting;

    #[async_trait]
    impl PrintTransport for Accepting {
        async fn send(&self, _printer: &Printer, _content: &[u8]) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn event(order_id: &str) -> ItemsAddedEvent {
        ItemsAddedEvent {
            order: OrderRef {
                order_id: order_id.to_string(),
                branch_id: "b1".to_string(),
                public_code: None,
                table_label: None,
            },
            items: vec![RoutableItem {
                product_id: "steak".to_string(),
                name: "Entrecot".to_string(),
                quantity: 2,
                unit_price: None,
                notes: Some("poco hecho".to_string()),
                category_id: None,
            }],
        }
    }

    #[tokio::test]
    async fn test_worker_dispatches_until_channel_closes() {
        let store = ConfigStore::open_in_memory().unwrap();
        let create: PrinterCreate = serde_json::from_value(serde_json::json!({
            "branch_id": "b1",
            "name": "Cocina",
            "system_identifier": "10.0.0.1",
            "connection": "NETWORK",
        }))
        .unwrap();
        store.create_printer(create).unwrap();

        let jobs = PrintJobStore::open_in_memory().unwrap();
        let store = Arc::new(store);
        let coordinator = DispatchCoordinator::new(
            store.clone(),
            store.clone(),
            store,
            jobs.clone(),
            Arc::new(Accepting),
            chrono_tz::UTC,
        );

        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(PrintEventWorker::new(coordinator).run(rx, CancellationToken::new()));

        tx.send(event("o1")).await.unwrap();
        tx.send(event("o2")).await.unwrap();
        drop(tx);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(jobs.jobs_for_order("o1").unwrap().len(), 1);
        assert_eq!(jobs.jobs_for_order("o2").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_worker_stops_on_shutdown() {
        let store = Arc::new(ConfigStore::open_in_memory().unwrap());
        let coordinator = DispatchCoordinator::new(
            store.clone(),
            store.clone(),
            store,
            PrintJobStore::open_in_memory().unwrap(),
            Arc::new(Accepting),
            chrono_tz::UTC,
        );

        let (_tx, rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(PrintEventWorker::new(coordinator).run(rx, shutdown.clone()));
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
