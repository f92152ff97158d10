//! Store configuration.
//!
//! # Invariants
//! - `storage_key` is the single key under which the whole habit list lives.
//! - When `has_persistent_storage` is false the store never touches storage.

use crate::model::day::DayBoundary;
use crate::model::habit::DEFAULT_CATEGORY;

/// Storage key used by earlier web builds; keep it for data continuity.
pub const DEFAULT_STORAGE_KEY: &str = "habits";

/// Habit store settings supplied by the host at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Key holding the JSON array of habits.
    pub storage_key: String,
    /// Whether the host provides durable storage in this context.
    pub has_persistent_storage: bool,
    /// Rule for turning "now" into the default toggle day.
    pub day_boundary: DayBoundary,
    /// Category used when `add_habit` gets none.
    pub default_category: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            has_persistent_storage: true,
            day_boundary: DayBoundary::default(),
            default_category: DEFAULT_CATEGORY.to_string(),
        }
    }
}

impl StoreConfig {
    /// Config for contexts without durable storage (state lives in memory only).
    pub fn ephemeral() -> Self {
        Self::default().persistent_storage(false)
    }

    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn persistent_storage(mut self, available: bool) -> Self {
        self.has_persistent_storage = available;
        self
    }

    pub fn day_boundary(mut self, boundary: DayBoundary) -> Self {
        self.day_boundary = boundary;
        self
    }

    pub fn default_category(mut self, category: impl Into<String>) -> Self {
        self.default_category = category.into();
        self
    }
}
