//! Domain model for habits, calendar days and notifications.
//!
//! # Responsibility
//! - Define the canonical records shared by stores and UI projections.
//! - Own the persisted JSON shape of a habit.
//!
//! # Invariants
//! - Every habit is identified by a stable `HabitId` that is never reused.
//! - Calendar days are always `YYYY-MM-DD` and always a real date.
//! - Notifications are immutable after creation and never persisted.

pub mod day;
pub mod habit;
pub mod notification;
