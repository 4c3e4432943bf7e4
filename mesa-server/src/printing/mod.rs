//! Print dispatch
//!
//! Routing → formatting → job record → transport → status, for kitchen
//! comandas, control tickets, test pages and reprints.

pub mod coordinator;
pub mod renderer;
pub mod routing;
pub mod status;
pub mod storage;
pub mod transport;
pub mod types;
pub mod worker;

pub use coordinator::{DispatchCoordinator, DispatchError};
pub use routing::{AutoRoute, RoutingResolver, StationTarget};
pub use status::DeviceStatusTracker;
pub use storage::{PrintJobStore, PrintStorageError};
pub use transport::{AgentTransport, PrintTransport, TransportError};
pub use types::{DirectoryError, PrinterDirectory, PrinterStatusStore, ProductCatalog};
pub use worker::PrintEventWorker;
