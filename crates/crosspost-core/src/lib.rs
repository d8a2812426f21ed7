//! crosspost-core
//!
//! Engine for scheduled cross-posting to third-party content platforms:
//! a durable queue of deferred publish tasks with bounded retries and
//! failure classification, a daily login-status monitor with a look-ahead
//! pre-flight, and an on-demand reconciliation pass that merges local
//! publication records with the platforms' paginated listings.
//!
//! # Module layout
//! - **domain**: identifiers, task and document records, errors, notifications
//! - **ports**: abstraction layer (TaskStore, DocumentStore, SessionStore,
//!   PlatformClient, Notifier, Clock)
//! - **store**: in-memory port implementations (development and tests)
//! - **scheduler**: TaskScheduler, backoff strategies, failure classifier
//! - **monitor**: LoginStatusMonitor (daily sweep + pre-flight)
//! - **reconcile**: ReconciliationEngine and the remote status table
//! - **app**: background loops behind an EngineHandle

pub mod app;
pub mod domain;
pub mod monitor;
pub mod ports;
pub mod reconcile;
pub mod scheduler;
pub mod store;

pub use app::{EngineConfig, EngineHandle};
pub use monitor::{LoginStatusMonitor, MonitorConfig, SweepReport};
pub use reconcile::{ReconcileConfig, ReconciliationEngine, ReconciliationReport};
pub use scheduler::{DEFAULT_MAX_RETRIES, TaskScheduler, TickReport};
