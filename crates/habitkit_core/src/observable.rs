//! Publish/subscribe value cell used by both stores.
//!
//! # Responsibility
//! - Hold the current immutable snapshot of a store's state.
//! - Deliver every published snapshot to registered observers, in order.
//!
//! # Invariants
//! - A new subscriber receives the current snapshot immediately.
//! - Each `set`/`update` call produces exactly one delivery per observer.
//! - `update` derives and stores the next value under the lock, so concurrent
//!   updates through clones never overwrite each other.
//! - Observers run after the internal lock is released, so they may read the
//!   cell or drop their own subscription while being called.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Observer<T> = Arc<dyn Fn(&Arc<T>) + Send + Sync>;

struct Shared<T> {
    value: Arc<T>,
    observers: BTreeMap<u64, Observer<T>>,
    next_observer_id: u64,
}

/// Shared, observable value. Clones refer to the same cell.
pub struct Observable<T> {
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + Sync + 'static> Observable<T> {
    pub fn new(initial: T) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                value: Arc::new(initial),
                observers: BTreeMap::new(),
                next_observer_id: 0,
            })),
        }
    }

    /// Returns the current snapshot.
    pub fn get(&self) -> Arc<T> {
        Arc::clone(&lock(&self.shared).value)
    }

    /// Replaces the snapshot and notifies every observer.
    pub fn set(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        let observers = {
            let mut shared = lock(&self.shared);
            shared.value = Arc::clone(&value);
            shared.observers.values().cloned().collect::<Vec<_>>()
        };
        for observer in observers {
            observer(&value);
        }
        value
    }

    /// Derives the next snapshot from the current one and publishes it.
    pub fn update(&self, next: impl FnOnce(&T) -> T) -> Arc<T> {
        self.modify(|current| (next(current), ())).0
    }

    /// Like `update`, but `next` also returns a side value computed under the
    /// same lock.
    ///
    /// `next` runs while the cell is locked and must not touch this cell.
    pub fn modify<R>(&self, next: impl FnOnce(&T) -> (T, R)) -> (Arc<T>, R) {
        let (value, extra, observers) = {
            let mut shared = lock(&self.shared);
            let (value, extra) = next(&*shared.value);
            let value = Arc::new(value);
            shared.value = Arc::clone(&value);
            let observers = shared.observers.values().cloned().collect::<Vec<_>>();
            (value, extra, observers)
        };
        for observer in observers {
            observer(&value);
        }
        (value, extra)
    }

    /// Registers `observer` and immediately calls it with the current value.
    ///
    /// The observer stays registered until the returned `Subscription` is
    /// unsubscribed or dropped.
    pub fn subscribe(&self, observer: impl Fn(&Arc<T>) + Send + Sync + 'static) -> Subscription {
        let observer: Observer<T> = Arc::new(observer);
        let (id, current) = {
            let mut shared = lock(&self.shared);
            let id = shared.next_observer_id;
            shared.next_observer_id += 1;
            shared.observers.insert(id, Arc::clone(&observer));
            (id, Arc::clone(&shared.value))
        };

        observer(&current);

        let weak: Weak<Mutex<Shared<T>>> = Arc::downgrade(&self.shared);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    lock(&shared).observers.remove(&id);
                }
            })),
        }
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.shared).observers.len()
    }
}

fn lock<T>(shared: &Mutex<Shared<T>>) -> MutexGuard<'_, Shared<T>> {
    // An observer panic must not wedge the store for the rest of the process.
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle that keeps an observer registered.
#[must_use = "dropping a Subscription unsubscribes the observer"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Stops further deliveries to the observer.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Observable;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(&Arc<u32>) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |value: &Arc<u32>| sink.lock().unwrap().push(**value))
    }

    #[test]
    fn subscribe_delivers_current_then_each_publication() {
        let cell = Observable::new(1_u32);
        let (seen, observer) = recorder();
        let _subscription = cell.subscribe(observer);

        cell.set(2);
        cell.update(|value| value + 10);

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 12]);
    }

    #[test]
    fn unsubscribe_stops_deliveries() {
        let cell = Observable::new(0_u32);
        let (seen, observer) = recorder();
        let subscription = cell.subscribe(observer);
        assert_eq!(cell.observer_count(), 1);

        subscription.unsubscribe();
        cell.set(5);

        assert_eq!(*seen.lock().unwrap(), vec![0]);
        assert_eq!(cell.observer_count(), 0);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let cell = Observable::new(0_u32);
        let (seen, observer) = recorder();
        drop(cell.subscribe(observer));

        cell.set(9);
        assert_eq!(*seen.lock().unwrap(), vec![0]);
    }

    #[test]
    fn concurrent_updates_through_clones_are_not_lost() {
        let cell = Observable::new(0_u32);
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let cell = cell.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        cell.update(|value| value + 1);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(*cell.get(), 2000);
    }

    #[test]
    fn modify_returns_side_value() {
        let cell = Observable::new(vec![1_u32, 2]);
        let (published, removed) = cell.modify(|current| {
            let next: Vec<u32> = current.iter().copied().filter(|v| *v != 2).collect();
            let removed = next.len() != current.len();
            (next, removed)
        });

        assert!(removed);
        assert_eq!(*published, vec![1]);
    }

    #[test]
    fn observer_may_read_cell_during_delivery() {
        let cell = Observable::new(3_u32);
        let reader = cell.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _subscription = cell.subscribe(move |_| sink.lock().unwrap().push(*reader.get()));

        cell.set(4);
        assert_eq!(*seen.lock().unwrap(), vec![3, 4]);
    }
}
