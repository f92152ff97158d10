//! Stateful services exposed to UI layers.
//!
//! # Responsibility
//! - Own the habit list and notification queue, and publish their snapshots.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod habit_store;
pub mod notification_queue;
pub mod tracker;
