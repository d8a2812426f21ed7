//! In-memory store implementations (development and test backends).

mod memory;

pub use memory::{
    InMemoryDocumentStore, InMemorySessionStore, InMemoryTaskStore, RecordingNotifier,
};
