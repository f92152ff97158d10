//! Habit store: authoritative habit list, mirrored to durable storage.
//!
//! # Responsibility
//! - Own the in-memory habit list and publish an immutable snapshot after
//!   every mutation.
//! - Persist the whole list as one JSON array under one storage key.
//! - Contain storage failures; no public operation returns one.
//!
//! # Invariants
//! - Habit ids are unique in every published snapshot.
//! - Every mutating call persists at most once and publishes exactly once,
//!   including no-op removes/toggles of unknown ids.
//! - When `has_persistent_storage` is false, storage is never touched.
//! - Habit names and completion data are never written to logs.

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::ids::{IdGenerator, UuidIdGenerator};
use crate::model::day::DayKey;
use crate::model::habit::{Habit, HabitId, NewHabit};
use crate::model::notification::NotificationKind;
use crate::observable::{Observable, Subscription};
use crate::service::notification_queue::NotificationQueue;
use crate::storage::{KeyValueStorage, StorageError, StorageResult};
use log::{info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Published habit list.
pub type HabitSnapshot = Arc<Vec<Habit>>;

const MAX_ID_DRAWS: u32 = 8;
const CORRUPT_STATE_MESSAGE: &str = "Saved habits could not be read and were reset.";
const STORAGE_WRITE_FAILED_MESSAGE: &str = "Habits could not be saved on this device.";
const STORAGE_READ_FAILED_MESSAGE: &str = "Saved habits could not be loaded.";
const SKIPPED_RECORDS_MESSAGE: &str = "Some saved habits could not be read and were skipped.";

/// Stored habit data that failed to decode.
///
/// Carries only structural metadata (line/column and error class), never the
/// stored text itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptState {
    pub key: String,
    pub line: usize,
    pub column: usize,
    pub category: &'static str,
}

impl CorruptState {
    fn from_json_error(key: &str, err: &serde_json::Error) -> Self {
        let category = match err.classify() {
            serde_json::error::Category::Io => "io",
            serde_json::error::Category::Syntax => "syntax",
            serde_json::error::Category::Data => "data",
            serde_json::error::Category::Eof => "eof",
        };
        Self {
            key: key.to_string(),
            line: err.line(),
            column: err.column(),
            category,
        }
    }
}

impl Display for CorruptState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "stored value under `{}` is not a valid habit list ({} error at line {} column {})",
            self.key, self.category, self.line, self.column
        )
    }
}

impl Error for CorruptState {}

/// What `HabitStore::init` found in storage.
///
/// Every variant leaves the store initialized and published; none of them is
/// a failure of `init` itself.
#[derive(Debug)]
pub enum LoadOutcome {
    /// A stored list was decoded.
    Restored { count: usize },
    /// The stored list was readable but some records were not; those were
    /// dropped and the remaining list was written back.
    Salvaged { count: usize, dropped: usize },
    /// Storage had no value under the key.
    Empty,
    /// No durable storage in this context; state is memory-only.
    Ephemeral,
    /// Storage read failed; started empty.
    Unreadable(StorageError),
    /// Stored value was corrupt; it was discarded and the store started empty.
    Recovered(CorruptState),
}

impl LoadOutcome {
    fn as_status(&self) -> &'static str {
        match self {
            Self::Restored { .. } => "restored",
            Self::Salvaged { .. } => "salvaged",
            Self::Empty => "empty",
            Self::Ephemeral => "ephemeral",
            Self::Unreadable(_) => "unreadable",
            Self::Recovered(_) => "recovered",
        }
    }
}

/// Observable habit list with whole-list persistence.
pub struct HabitStore<S: KeyValueStorage> {
    storage: S,
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    habits: Observable<Vec<Habit>>,
    notifications: Option<NotificationQueue>,
}

impl<S: KeyValueStorage> HabitStore<S> {
    /// Creates an empty, uninitialized store using the wall clock and UUID ids.
    ///
    /// Call `init` to load persisted habits.
    pub fn new(storage: S, config: StoreConfig) -> Self {
        Self {
            storage,
            config,
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidIdGenerator),
            habits: Observable::new(Vec::new()),
            notifications: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Routes storage failure reports to `queue` as user-facing notifications.
    pub fn with_notifications(mut self, queue: NotificationQueue) -> Self {
        self.notifications = Some(queue);
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Loads the persisted list and publishes it.
    ///
    /// # Contract
    /// - Starts empty when storage is unavailable, empty or unreadable.
    /// - A corrupt stored value is removed from storage, the store starts
    ///   empty, and a warning notification is queued.
    /// - Inside a readable array, only records that fail to decode are
    ///   dropped; the rest load and the cleaned list is written back.
    /// - Duplicate ids in stored data keep their first occurrence.
    pub fn init(&mut self) -> LoadOutcome {
        let (habits, outcome) = self.load();
        let count = habits.len();
        self.habits.set(habits);

        match &outcome {
            LoadOutcome::Unreadable(err) => {
                warn!(
                    "event=habits_init module=habit_store status=error error_code=storage_read_failed error={}",
                    err
                );
                self.notify(STORAGE_READ_FAILED_MESSAGE, NotificationKind::Error);
            }
            LoadOutcome::Recovered(corrupt) => {
                warn!(
                    "event=habits_init module=habit_store status=recovered error_code=corrupt_state error={}",
                    corrupt
                );
                self.notify(CORRUPT_STATE_MESSAGE, NotificationKind::Warning);
            }
            LoadOutcome::Salvaged { count, dropped } => {
                warn!(
                    "event=habits_init module=habit_store status=salvaged habits={} dropped={}",
                    count, dropped
                );
                self.notify(SKIPPED_RECORDS_MESSAGE, NotificationKind::Warning);
            }
            other => {
                info!(
                    "event=habits_init module=habit_store status=ok source={} habits={}",
                    other.as_status(),
                    count
                );
            }
        }

        outcome
    }

    /// Appends a new habit, persists and publishes. Returns the new habit.
    ///
    /// Names are trimmed but not validated; duplicate names are allowed.
    pub fn add_habit(&mut self, new_habit: impl Into<NewHabit>) -> Habit {
        let new_habit = new_habit.into();
        let current = self.habits.get();

        let habit = Habit::new(
            self.fresh_id(&current),
            new_habit.name.as_str(),
            new_habit
                .category
                .unwrap_or_else(|| self.config.default_category.clone()),
            new_habit.created_at.unwrap_or_else(|| self.clock.now()),
        );

        let mut next = current.to_vec();
        next.push(habit.clone());
        self.commit(next, "habit_add");
        habit
    }

    /// Removes the habit with `id`. Returns whether a habit was removed.
    ///
    /// Unknown ids still persist and publish the unchanged list.
    pub fn remove_habit(&mut self, id: &str) -> bool {
        let current = self.habits.get();
        let next: Vec<Habit> = current
            .iter()
            .filter(|habit| habit.id != id)
            .cloned()
            .collect();
        let removed = next.len() != current.len();
        self.commit(next, "habit_remove");
        removed
    }

    /// Flips completion of `day` (default: today) for habit `id`.
    ///
    /// Returns `Some(true)` when the day is now completed, `Some(false)` when
    /// it was cleared, and `None` for an unknown id. Unknown ids still persist
    /// and publish.
    pub fn toggle_completion(&mut self, id: &str, day: Option<DayKey>) -> Option<bool> {
        let day = day.unwrap_or_else(|| self.today());
        let mut toggled = None;
        let next: Vec<Habit> = self
            .habits
            .get()
            .iter()
            .map(|habit| {
                if habit.id != id {
                    return habit.clone();
                }
                let mut updated = habit.clone();
                toggled = Some(updated.completions.toggle(day));
                updated
            })
            .collect();
        self.commit(next, "habit_toggle");
        toggled
    }

    /// Removes the stored list and publishes an empty one.
    ///
    /// Meant for debug/test flows, not a user action.
    pub fn reset(&mut self) {
        let removed = if self.config.has_persistent_storage {
            self.storage.remove(&self.config.storage_key)
        } else {
            Ok(())
        };
        self.habits.set(Vec::new());
        match removed {
            Ok(()) => info!("event=habits_reset module=habit_store status=ok"),
            Err(err) => self.report_write_failure("habits_reset", &err),
        }
    }

    /// See [`Observable::subscribe`].
    pub fn subscribe(
        &self,
        observer: impl Fn(&HabitSnapshot) + Send + Sync + 'static,
    ) -> Subscription {
        self.habits.subscribe(observer)
    }

    pub fn snapshot(&self) -> HabitSnapshot {
        self.habits.get()
    }

    pub fn habit(&self, id: &str) -> Option<Habit> {
        self.habits.get().iter().find(|habit| habit.id == id).cloned()
    }

    /// Today's day key under the configured boundary.
    pub fn today(&self) -> DayKey {
        self.config.day_boundary.day_of(self.clock.now())
    }

    fn load(&self) -> (Vec<Habit>, LoadOutcome) {
        if !self.config.has_persistent_storage {
            return (Vec::new(), LoadOutcome::Ephemeral);
        }

        let raw = match self.storage.read(&self.config.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return (Vec::new(), LoadOutcome::Empty),
            Err(err) => return (Vec::new(), LoadOutcome::Unreadable(err)),
        };

        let records = match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
            Ok(records) => records,
            Err(err) => {
                let corrupt = CorruptState::from_json_error(&self.config.storage_key, &err);
                if let Err(remove_err) = self.storage.remove(&self.config.storage_key) {
                    warn!(
                        "event=habits_discard module=habit_store status=error error_code=storage_remove_failed error={}",
                        remove_err
                    );
                }
                return (Vec::new(), LoadOutcome::Recovered(corrupt));
            }
        };

        let total = records.len();
        let habits: Vec<Habit> = records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value::<Habit>(record) {
                Ok(habit) => Some(habit),
                Err(err) => {
                    warn!(
                        "event=habits_init module=habit_store status=skipped index={} error_category={:?}",
                        index,
                        err.classify()
                    );
                    None
                }
            })
            .collect();
        let dropped = total - habits.len();
        let habits = dedupe_ids(habits);
        let count = habits.len();
        if dropped == 0 {
            return (habits, LoadOutcome::Restored { count });
        }

        if let Err(err) = self.persist(&habits) {
            warn!(
                "event=habits_salvage module=habit_store status=error error_code=storage_write_failed error={}",
                err
            );
        }
        (habits, LoadOutcome::Salvaged { count, dropped })
    }

    fn commit(&mut self, next: Vec<Habit>, event: &'static str) {
        let persisted = self.persist(&next);
        let snapshot = self.habits.set(next);
        match persisted {
            Ok(()) => info!(
                "event={} module=habit_store status=ok habits={} persisted={}",
                event,
                snapshot.len(),
                self.config.has_persistent_storage
            ),
            Err(err) => self.report_write_failure(event, &err),
        }
    }

    fn persist(&self, habits: &[Habit]) -> StorageResult<()> {
        if !self.config.has_persistent_storage {
            return Ok(());
        }
        let encoded = serde_json::to_string(habits).map_err(StorageError::Encode)?;
        self.storage.write(&self.config.storage_key, &encoded)
    }

    fn report_write_failure(&self, event: &str, err: &StorageError) {
        warn!(
            "event={} module=habit_store status=error error_code=storage_write_failed error={}",
            event, err
        );
        self.notify(STORAGE_WRITE_FAILED_MESSAGE, NotificationKind::Error);
    }

    fn notify(&self, message: &str, kind: NotificationKind) {
        if let Some(queue) = &self.notifications {
            queue.add_notification(message, kind);
        }
    }

    fn fresh_id(&self, existing: &[Habit]) -> HabitId {
        let taken = |candidate: &str| existing.iter().any(|habit| habit.id == candidate);
        let mut candidate = self.ids.next_id();
        let mut attempt = 1;
        while taken(candidate.as_str()) {
            candidate = if attempt < MAX_ID_DRAWS {
                self.ids.next_id()
            } else {
                format!("{candidate}-{attempt}")
            };
            attempt += 1;
        }
        candidate
    }
}

fn dedupe_ids(habits: Vec<Habit>) -> Vec<Habit> {
    let total = habits.len();
    let mut seen = HashSet::with_capacity(total);
    let unique: Vec<Habit> = habits
        .into_iter()
        .filter(|habit| seen.insert(habit.id.clone()))
        .collect();
    if unique.len() != total {
        warn!(
            "event=habits_init module=habit_store status=deduplicated dropped={}",
            total - unique.len()
        );
    }
    unique
}
