//! IdGenerator port - ID minting behind a trait for testability.

use ulid::Ulid;

use crate::domain::ids::{DocumentId, TaskId, UserId};
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn task_id(&self) -> TaskId;
    fn document_id(&self) -> DocumentId;
    fn user_id(&self) -> UserId;
}

/// ULID-based generator seeded from a `Clock`, so `FixedClock` yields IDs
/// with a deterministic timestamp component.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn task_id(&self) -> TaskId {
        TaskId::from(self.next())
    }

    fn document_id(&self) -> DocumentId {
        DocumentId::from(self.next())
    }

    fn user_id(&self) -> UserId {
        UserId::from(self.next())
    }
}
