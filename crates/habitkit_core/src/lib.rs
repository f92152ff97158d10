//! Core state for habitkit: habits, daily completions and notifications.
//! This crate is the single source of truth for habit invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod ids;
pub mod logging;
pub mod model;
pub mod observable;
pub mod service;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{StoreConfig, DEFAULT_STORAGE_KEY};
pub use ids::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::day::{DayBoundary, DayKey, DayKeyError};
pub use model::habit::{
    parse_created_at, Completions, Habit, HabitId, NewHabit, DEFAULT_CATEGORY,
};
pub use model::notification::{Notification, NotificationKind};
pub use observable::{Observable, Subscription};
pub use service::habit_store::{CorruptState, HabitSnapshot, HabitStore, LoadOutcome};
pub use service::notification_queue::{NotificationQueue, NotificationSnapshot};
pub use service::tracker::HabitTracker;
pub use storage::{KeyValueStorage, MemoryStorage, SqliteStorage, StorageError, StorageResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
