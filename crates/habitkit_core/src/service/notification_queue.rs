//! Transient notification queue.
//!
//! # Responsibility
//! - Append user-facing messages and publish the full list to observers.
//!
//! # Invariants
//! - Ids are strictly increasing within one queue (and its clones), in list
//!   order, even when clones append from several threads.
//! - Nothing here expires notifications; the UI decides visibility from
//!   `timestamp`, or calls `dismiss`.
//! - Message text is never logged.

use crate::clock::Clock;
use crate::model::notification::{Notification, NotificationKind};
use crate::observable::{Observable, Subscription};
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Published notification list.
pub type NotificationSnapshot = Arc<Vec<Notification>>;

/// Append-only (plus UI dismiss) notification list.
///
/// Clones share the same list, so the habit store can push into the queue the
/// UI subscribes to.
#[derive(Clone)]
pub struct NotificationQueue {
    list: Observable<Vec<Notification>>,
    clock: Arc<dyn Clock>,
    last_id: Arc<AtomicU64>,
}

impl NotificationQueue {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            list: Observable::new(Vec::new()),
            clock,
            last_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Appends a notification and republishes the whole list.
    ///
    /// The id is the creation time in epoch milliseconds, bumped past the
    /// previous id when two notifications land in the same millisecond.
    pub fn add_notification(
        &self,
        message: impl Into<String>,
        kind: NotificationKind,
    ) -> Notification {
        let message = message.into();
        let (published, notification) = self.list.modify(|current| {
            let timestamp = self.clock.now_epoch_ms();
            let notification = Notification {
                id: self.next_id(timestamp),
                message,
                kind,
                timestamp,
            };
            let mut next = current.clone();
            next.push(notification.clone());
            (next, notification)
        });

        debug!(
            "event=notification_add module=notifications status=ok kind={} id={} queued={}",
            kind.as_str(),
            notification.id,
            published.len()
        );
        notification
    }

    /// Removes one notification by id and republishes.
    ///
    /// Unknown ids still republish the unchanged list. Returns whether a
    /// notification was removed.
    pub fn dismiss(&self, id: u64) -> bool {
        let (_, removed) = self.list.modify(|current| {
            let next: Vec<Notification> = current
                .iter()
                .filter(|notification| notification.id != id)
                .cloned()
                .collect();
            let removed = next.len() != current.len();
            (next, removed)
        });
        removed
    }

    pub fn snapshot(&self) -> NotificationSnapshot {
        self.list.get()
    }

    pub fn len(&self) -> usize {
        self.list.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.get().is_empty()
    }

    /// See [`Observable::subscribe`].
    pub fn subscribe(
        &self,
        observer: impl Fn(&NotificationSnapshot) + Send + Sync + 'static,
    ) -> Subscription {
        self.list.subscribe(observer)
    }

    /// Called with the list locked, so ids follow append order.
    fn next_id(&self, timestamp: i64) -> u64 {
        let candidate = u64::try_from(timestamp).unwrap_or(0);
        let previous = self
            .last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(candidate.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        candidate.max(previous + 1)
    }
}

impl std::fmt::Debug for NotificationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationQueue")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::NotificationQueue;
    use crate::clock::ManualClock;
    use crate::model::notification::NotificationKind;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn frozen_queue() -> NotificationQueue {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        NotificationQueue::new(Arc::new(ManualClock::new(start)))
    }

    #[test]
    fn same_millisecond_ids_stay_unique() {
        let queue = frozen_queue();
        let first = queue.add_notification("a", NotificationKind::Info);
        let second = queue.add_notification("b", NotificationKind::Info);

        assert_eq!(first.timestamp, second.timestamp);
        assert_eq!(second.id, first.id + 1);
    }

    #[test]
    fn dismiss_removes_only_matching_id() {
        let queue = frozen_queue();
        let keep = queue.add_notification("keep", NotificationKind::Success);
        let dropped = queue.add_notification("drop", NotificationKind::Error);

        assert!(queue.dismiss(dropped.id));
        assert!(!queue.dismiss(dropped.id));

        let snapshot = queue.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, keep.id);
    }

    #[test]
    fn clones_share_one_list() {
        let queue = frozen_queue();
        let handle = queue.clone();
        handle.add_notification("from clone", NotificationKind::Warning);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn concurrent_appends_from_clones_are_all_kept_in_id_order() {
        let queue = frozen_queue();
        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    for n in 0..500 {
                        queue.add_notification(format!("{worker}-{n}"), NotificationKind::Info);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let snapshot = queue.snapshot();
        assert_eq!(snapshot.len(), 4000);
        assert!(snapshot.windows(2).all(|pair| pair[0].id < pair[1].id));
    }
}
