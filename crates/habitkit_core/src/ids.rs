//! Habit id generation.

use crate::model::habit::HabitId;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Produces candidate ids for new habits.
///
/// The store re-draws when a candidate collides with an existing id, so a
/// generator only needs to be collision-resistant, not collision-free.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> HabitId;
}

/// Random UUID v4 ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> HabitId {
        Uuid::new_v4().to_string()
    }
}

/// Monotonic `<prefix>-<n>` ids, starting at 1.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> HabitId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{n}", self.prefix)
    }
}
