//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose habit and notification use-cases to Dart via FRB.
//! - Hold the one process-wide `HabitTracker` the UI talks to.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Storage problems degrade to in-memory state; they never fail a call.
//! - Snapshots are returned as plain records; Dart re-reads after each action.

use chrono::{DateTime, SecondsFormat, Utc};
use habitkit_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, DayBoundary, DayKey,
    Habit, HabitTracker, KeyValueStorage, MemoryStorage, NewHabit, Notification,
    NotificationKind, SqliteStorage, StoreConfig,
};
use log::{info, warn};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

const DB_FILE_NAME: &str = "habitkit.sqlite3";
const DB_PATH_ENV: &str = "HABITKIT_DB_PATH";
const DAY_BOUNDARY_ENV: &str = "HABITKIT_DAY_BOUNDARY";

type DeviceStorage = Box<dyn KeyValueStorage + Send>;

static TRACKER: OnceCell<Mutex<HabitTracker<DeviceStorage>>> = OnceCell::new();

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Habit record as shown by list/calendar views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitItem {
    pub id: String,
    pub name: String,
    pub category: String,
    /// RFC 3339 UTC timestamp with millisecond precision.
    pub created_at: String,
    /// Completed days (`YYYY-MM-DD`), oldest first.
    pub completions: Vec<String>,
    /// Consecutive completed days ending today (or yesterday).
    pub current_streak: u32,
}

/// Notification record for toast/snackbar views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationItem {
    pub id: u64,
    pub message: String,
    /// `success|error|info|warning`.
    pub kind: String,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
}

/// Generic action response envelope for habit commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitActionResponse {
    /// Whether the command was accepted.
    pub ok: bool,
    /// Affected habit id, when there is one.
    pub habit_id: Option<String>,
    /// Human-readable message for diagnostics/UI.
    pub message: String,
}

impl HabitActionResponse {
    fn success(message: impl Into<String>, habit_id: Option<String>) -> Self {
        Self {
            ok: true,
            habit_id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            habit_id: None,
            message: message.into(),
        }
    }
}

/// Returns the current habit list.
///
/// # FFI contract
/// - Sync call; first call opens device storage and loads habits.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn habits_list() -> Vec<HabitItem> {
    with_tracker(|tracker| {
        let today = tracker.habits().today();
        tracker
            .habits()
            .snapshot()
            .iter()
            .map(|habit| to_habit_item(habit, today))
            .collect()
    })
}

/// Creates a habit.
///
/// Input semantics:
/// - `name`: display label; trimmed, must not be blank.
/// - `category`: optional tag; `None` or blank means `general`.
/// - `created_at`: optional RFC 3339 override.
#[flutter_rust_bridge::frb(sync)]
pub fn habit_add(
    name: String,
    category: Option<String>,
    created_at: Option<String>,
) -> HabitActionResponse {
    if name.trim().is_empty() {
        return HabitActionResponse::failure("habit_add failed: name cannot be empty");
    }

    let mut request = NewHabit::new(name);
    if let Some(category) = category.filter(|value| !value.trim().is_empty()) {
        request = request.category(category.trim());
    }
    if let Some(raw) = created_at {
        match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(parsed) => request = request.created_at(parsed.with_timezone(&Utc)),
            Err(err) => {
                return HabitActionResponse::failure(format!(
                    "habit_add failed: invalid created_at `{raw}`: {err}"
                ));
            }
        }
    }

    let habit = with_tracker(|tracker| tracker.habits_mut().add_habit(request));
    HabitActionResponse::success("Habit added.", Some(habit.id))
}

/// Removes a habit. Unknown ids succeed as no-ops.
#[flutter_rust_bridge::frb(sync)]
pub fn habit_remove(id: String) -> HabitActionResponse {
    let removed = with_tracker(|tracker| tracker.habits_mut().remove_habit(&id));
    let message = if removed {
        "Habit removed."
    } else {
        "No habit with that id."
    };
    HabitActionResponse::success(message, Some(id))
}

/// Toggles completion for `date` (`YYYY-MM-DD`), defaulting to today.
#[flutter_rust_bridge::frb(sync)]
pub fn habit_toggle(id: String, date: Option<String>) -> HabitActionResponse {
    let day = match date.as_deref().map(DayKey::parse).transpose() {
        Ok(day) => day,
        Err(err) => return HabitActionResponse::failure(format!("habit_toggle failed: {err}")),
    };

    let toggled = with_tracker(|tracker| tracker.habits_mut().toggle_completion(&id, day));
    let message = match toggled {
        Some(true) => "Marked done.",
        Some(false) => "Marked not done.",
        None => "No habit with that id.",
    };
    HabitActionResponse::success(message, Some(id))
}

/// Clears all habits from device storage. Debug/test use only.
#[flutter_rust_bridge::frb(sync)]
pub fn habits_reset() -> HabitActionResponse {
    with_tracker(|tracker| tracker.habits_mut().reset());
    HabitActionResponse::success("Habits reset.", None)
}

/// Returns queued notifications, oldest first.
#[flutter_rust_bridge::frb(sync)]
pub fn notifications_list() -> Vec<NotificationItem> {
    with_tracker(|tracker| {
        tracker
            .notifications()
            .snapshot()
            .iter()
            .map(to_notification_item)
            .collect()
    })
}

/// Queues a notification. `kind` defaults to `success`.
///
/// Returns `None` when `kind` is not a known notification type.
#[flutter_rust_bridge::frb(sync)]
pub fn notification_add(message: String, kind: Option<String>) -> Option<NotificationItem> {
    let kind = match kind {
        Some(raw) => NotificationKind::parse(&raw)?,
        None => NotificationKind::default(),
    };
    let created = with_tracker(|tracker| tracker.notify(message, kind));
    Some(to_notification_item(&created))
}

/// Removes one notification. Returns whether it existed.
#[flutter_rust_bridge::frb(sync)]
pub fn notification_dismiss(id: u64) -> bool {
    with_tracker(|tracker| tracker.notifications().dismiss(id))
}

fn with_tracker<T>(f: impl FnOnce(&mut HabitTracker<DeviceStorage>) -> T) -> T {
    let tracker = TRACKER.get_or_init(|| Mutex::new(start_tracker()));
    let mut guard = tracker.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut *guard)
}

fn start_tracker() -> HabitTracker<DeviceStorage> {
    let path = resolve_db_path();
    let day_boundary = resolve_day_boundary();

    let (storage, config): (DeviceStorage, StoreConfig) = match SqliteStorage::open(&path) {
        Ok(storage) => (
            Box::new(storage),
            StoreConfig::default().day_boundary(day_boundary),
        ),
        Err(err) => {
            warn!(
                "event=tracker_start module=ffi status=degraded error_code=storage_open_failed error={}",
                err
            );
            (
                Box::new(MemoryStorage::new()),
                StoreConfig::ephemeral().day_boundary(day_boundary),
            )
        }
    };

    let persistent = config.has_persistent_storage;
    let mut tracker = HabitTracker::new(storage, config);
    tracker.start();
    info!(
        "event=tracker_start module=ffi status=ok persistent={} day_boundary={}",
        persistent,
        day_boundary.as_str()
    );
    tracker
}

fn resolve_db_path() -> PathBuf {
    match std::env::var(DB_PATH_ENV) {
        Ok(raw) if !raw.trim().is_empty() => PathBuf::from(raw.trim()),
        _ => std::env::temp_dir().join(DB_FILE_NAME),
    }
}

fn resolve_day_boundary() -> DayBoundary {
    std::env::var(DAY_BOUNDARY_ENV)
        .ok()
        .and_then(|raw| DayBoundary::parse(&raw))
        .unwrap_or_default()
}

fn to_habit_item(habit: &Habit, today: DayKey) -> HabitItem {
    HabitItem {
        id: habit.id.clone(),
        name: habit.name.clone(),
        category: habit.category.clone(),
        created_at: habit
            .created_at
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        completions: habit
            .completed_days()
            .into_iter()
            .map(|day| day.to_string())
            .collect(),
        current_streak: habit.current_streak(today),
    }
}

fn to_notification_item(notification: &Notification) -> NotificationItem {
    NotificationItem {
        id: notification.id,
        message: notification.message.clone(),
        kind: notification.kind.as_str().to_string(),
        timestamp: notification.timestamp,
    }
}
