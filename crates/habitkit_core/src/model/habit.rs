//! Habit domain model.
//!
//! # Responsibility
//! - Define the durable habit record and its persisted JSON shape.
//! - Provide completion lookups and streak helpers for calendar views.
//!
//! # Invariants
//! - `id` is stable and never reused for another habit.
//! - `name` is stored trimmed.
//! - `completions` holds only days that are marked done; an absent day means
//!   "not completed".
//!
//! # See also
//! - `crate::service::habit_store` for the mutation contract.

use crate::model::day::DayKey;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Stable identifier of a habit.
///
/// Plain string on the wire, so lists written by earlier builds (which used
/// millisecond timestamps as ids) still load.
pub type HabitId = String;

/// Category assigned when the caller does not supply one.
pub const DEFAULT_CATEGORY: &str = "general";

/// Set of days on which a habit was completed.
///
/// Serialized as a JSON object `{"YYYY-MM-DD": true}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completions(BTreeSet<DayKey>);

impl Completions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, day: DayKey) -> bool {
        self.0.contains(&day)
    }

    /// Flips presence of `day`. Returns `true` when the day is now completed.
    pub fn toggle(&mut self, day: DayKey) -> bool {
        if self.0.remove(&day) {
            false
        } else {
            self.0.insert(day);
            true
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Completed days in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = DayKey> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<DayKey> for Completions {
    fn from_iter<I: IntoIterator<Item = DayKey>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for Completions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for day in &self.0 {
            map.serialize_entry(day, &true)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Completions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // A `false` marker reads as "not completed", same as an absent key.
        let raw = BTreeMap::<DayKey, bool>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .filter_map(|(day, done)| done.then_some(day))
            .collect())
    }
}

/// Naive timestamp layouts accepted for `createdAt`, read as UTC.
const NAIVE_CREATED_AT_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses a stored `createdAt` value.
///
/// Accepts RFC 3339, ISO-8601 date-times without an offset and bare
/// `YYYY-MM-DD` dates. Offset-less forms are taken as UTC.
pub fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NAIVE_CREATED_AT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

fn deserialize_created_at<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_created_at(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid createdAt `{raw}`")))
}

/// Durable habit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    /// Stable id, unique within one store.
    pub id: HabitId,
    /// Display label, trimmed at creation.
    pub name: String,
    /// Free-form tag.
    pub category: String,
    /// Creation moment. Serialized as RFC 3339; see `parse_created_at` for
    /// the forms accepted on load.
    #[serde(deserialize_with = "deserialize_created_at")]
    pub created_at: DateTime<Utc>,
    /// Days marked done.
    #[serde(default)]
    pub completions: Completions,
}

impl Habit {
    /// Creates a habit with no completions.
    ///
    /// # Invariants
    /// - `name` is trimmed of surrounding whitespace.
    /// - No validation is applied to an empty name; callers own that check.
    pub fn new(
        id: impl Into<HabitId>,
        name: &str,
        category: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.trim().to_string(),
            category: category.into(),
            created_at,
            completions: Completions::new(),
        }
    }

    pub fn is_completed_on(&self, day: DayKey) -> bool {
        self.completions.contains(day)
    }

    pub fn completion_count(&self) -> usize {
        self.completions.len()
    }

    /// Completed days in chronological order.
    pub fn completed_days(&self) -> Vec<DayKey> {
        self.completions.iter().collect()
    }

    /// Number of consecutive completed days ending at `today`.
    ///
    /// When `today` is not completed yet the run may end yesterday instead, so
    /// an open day does not break a streak before it is over.
    pub fn current_streak(&self, today: DayKey) -> u32 {
        let mut cursor = if self.is_completed_on(today) {
            Some(today)
        } else {
            today.pred()
        };

        let mut streak = 0;
        while let Some(day) = cursor {
            if !self.is_completed_on(day) {
                break;
            }
            streak += 1;
            cursor = day.pred();
        }
        streak
    }
}

/// Request model for creating a habit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHabit {
    /// Raw display label; trimmed by the store.
    pub name: String,
    /// Optional category; `None` falls back to the configured default.
    pub category: Option<String>,
    /// Optional creation moment override; `None` uses the store clock.
    pub created_at: Option<DateTime<Utc>>,
}

impl NewHabit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            created_at: None,
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

impl From<&str> for NewHabit {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for NewHabit {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}
