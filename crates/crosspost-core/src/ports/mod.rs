//! Ports - the abstraction layer.
//!
//! Each trait is the seam between the engine and an external system (task
//! storage, the document repository, platform APIs, the notification
//! gateway, time). Implementations are swappable; the in-memory ones under
//! `store` back the tests and the demo CLI.

pub mod clock;
pub mod document_store;
pub mod id_generator;
pub mod notifier;
pub mod platform_client;
pub mod session_store;
pub mod task_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::document_store::DocumentStore;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::notifier::Notifier;
pub use self::platform_client::{
    ClientRegistry, DuplicateClient, PlatformClient, PublishReceipt, RemoteEntry,
};
pub use self::session_store::SessionStore;
pub use self::task_store::TaskStore;
