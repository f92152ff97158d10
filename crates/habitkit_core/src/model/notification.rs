//! Transient user-facing notification record.

use serde::{Deserialize, Serialize};

/// Severity used by the UI to style a notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[default]
    Success,
    Error,
    Info,
    Warning,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
            Self::Warning => "warning",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            "info" => Some(Self::Info),
            "warning" | "warn" => Some(Self::Warning),
            _ => None,
        }
    }
}

/// One queued notification. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique within its queue; strictly increasing.
    pub id: u64,
    pub message: String,
    /// Serialized as `type` to match the UI schema.
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Unix epoch milliseconds at creation.
    pub timestamp: i64,
}
