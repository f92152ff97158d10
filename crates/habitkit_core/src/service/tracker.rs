//! Application context owning both stores.
//!
//! # Responsibility
//! - Build the habit store and notification queue once, with shared clock.
//! - Route habit-store storage failures into the notification queue.

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::ids::IdGenerator;
use crate::model::notification::{Notification, NotificationKind};
use crate::service::habit_store::{HabitStore, LoadOutcome};
use crate::service::notification_queue::NotificationQueue;
use crate::storage::KeyValueStorage;
use std::sync::Arc;

/// Single-instance state for one running application.
pub struct HabitTracker<S: KeyValueStorage> {
    habits: HabitStore<S>,
    notifications: NotificationQueue,
}

impl<S: KeyValueStorage> HabitTracker<S> {
    /// Builds a tracker on the wall clock with UUID habit ids.
    pub fn new(storage: S, config: StoreConfig) -> Self {
        Self::with_clock(storage, config, Arc::new(SystemClock))
    }

    pub fn with_clock(storage: S, config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        let notifications = NotificationQueue::new(Arc::clone(&clock));
        let habits = HabitStore::new(storage, config)
            .with_clock(clock)
            .with_notifications(notifications.clone());
        Self {
            habits,
            notifications,
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.habits = self.habits.with_id_generator(ids);
        self
    }

    /// Loads persisted habits. Call once at startup.
    pub fn start(&mut self) -> LoadOutcome {
        self.habits.init()
    }

    pub fn habits(&self) -> &HabitStore<S> {
        &self.habits
    }

    pub fn habits_mut(&mut self) -> &mut HabitStore<S> {
        &mut self.habits
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    /// Shortcut for `notifications().add_notification(..)`.
    pub fn notify(&self, message: impl Into<String>, kind: NotificationKind) -> Notification {
        self.notifications.add_notification(message, kind)
    }
}
