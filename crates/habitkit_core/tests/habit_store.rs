use chrono::{Duration, TimeZone, Utc};
use habitkit_core::{
    DayKey, Habit, HabitSnapshot, HabitStore, KeyValueStorage, LoadOutcome, ManualClock,
    MemoryStorage, NewHabit, StoreConfig, Subscription,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

fn day(raw: &str) -> DayKey {
    DayKey::parse(raw).unwrap()
}

fn fixed_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap(),
    ))
}

fn store_on(storage: MemoryStorage) -> HabitStore<MemoryStorage> {
    let mut store = HabitStore::new(storage, StoreConfig::default()).with_clock(fixed_clock());
    store.init();
    store
}

fn record_publications(
    store: &HabitStore<MemoryStorage>,
) -> (Arc<Mutex<Vec<HabitSnapshot>>>, Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription =
        store.subscribe(move |snapshot| sink.lock().unwrap().push(Arc::clone(snapshot)));
    (seen, subscription)
}

#[test]
fn add_habit_publishes_trimmed_habit_with_defaults() {
    let mut store = store_on(MemoryStorage::new());

    store.add_habit(NewHabit::new("  Read  ").category("general"));

    let snapshot = store.snapshot();
    let last = snapshot.last().expect("one habit");
    assert_eq!(last.name, "Read");
    assert_eq!(last.category, "general");
    assert!(last.completions.is_empty());
    assert!(!last.id.is_empty());
    assert_eq!(
        last.created_at,
        Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap()
    );
}

#[test]
fn add_habit_defaults_category_and_honors_created_at_override() {
    let mut store = store_on(MemoryStorage::new());
    let created_at = Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap();

    let plain = store.add_habit("Walk");
    let backdated = store.add_habit(NewHabit::new("Stretch").created_at(created_at));

    assert_eq!(plain.category, "general");
    assert_eq!(backdated.created_at, created_at);
}

#[test]
fn duplicate_names_are_allowed_with_distinct_ids() {
    let mut store = store_on(MemoryStorage::new());
    let first = store.add_habit("Read");
    let second = store.add_habit("Read");

    assert_eq!(store.snapshot().len(), 2);
    assert_ne!(first.id, second.id);
}

#[test]
fn ids_stay_unique_across_mixed_mutations() {
    let mut store = store_on(MemoryStorage::new());
    let mut created = Vec::new();
    for round in 0..20 {
        let habit = store.add_habit(format!("habit {round}"));
        if round % 3 == 0 {
            store.toggle_completion(&habit.id, Some(day("2024-01-01")));
        }
        if round % 4 == 0 {
            store.remove_habit(&habit.id);
        }
        created.push(habit.id);
    }

    let snapshot = store.snapshot();
    let ids: HashSet<&str> = snapshot.iter().map(|habit| habit.id.as_str()).collect();
    assert_eq!(ids.len(), snapshot.len());
    let all: HashSet<&String> = created.iter().collect();
    assert_eq!(all.len(), created.len());
}

#[test]
fn toggle_twice_restores_completions() {
    let mut store = store_on(MemoryStorage::new());
    let habit = store.add_habit("Read");

    assert_eq!(
        store.toggle_completion(&habit.id, Some(day("2024-01-01"))),
        Some(true)
    );
    assert!(store
        .habit(&habit.id)
        .unwrap()
        .is_completed_on(day("2024-01-01")));

    assert_eq!(
        store.toggle_completion(&habit.id, Some(day("2024-01-01"))),
        Some(false)
    );
    assert_eq!(store.habit(&habit.id).unwrap().completions, habit.completions);
}

#[test]
fn toggle_defaults_to_today_and_leaves_other_habits_untouched() {
    let mut store = store_on(MemoryStorage::new());
    let target = store.add_habit("Read");
    let other = store.add_habit("Run");

    store.toggle_completion(&target.id, None);

    assert!(store
        .habit(&target.id)
        .unwrap()
        .is_completed_on(day("2024-06-15")));
    assert_eq!(store.habit(&other.id).unwrap(), other);
}

#[test]
fn today_uses_utc_boundary_by_default() {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 6, 15, 23, 59, 0).unwrap(),
    ));
    let store = HabitStore::new(MemoryStorage::new(), StoreConfig::default())
        .with_clock(clock.clone());
    assert_eq!(store.today(), day("2024-06-15"));

    clock.advance(Duration::minutes(2));
    assert_eq!(store.today(), day("2024-06-16"));
}

#[test]
fn unknown_ids_are_noops_that_still_publish_and_persist() {
    let storage = MemoryStorage::new();
    let mut store = store_on(storage.clone());
    store.add_habit("Read");
    let before = store.snapshot();
    let (seen, _subscription) = record_publications(&store);
    storage.remove("habits").unwrap();

    assert!(!store.remove_habit("missing"));
    assert_eq!(store.toggle_completion("missing", None), None);

    let seen = seen.lock().unwrap();
    // initial delivery + one per call
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[1], before);
    assert_eq!(seen[2], before);
    assert!(storage.read("habits").unwrap().is_some());
}

#[test]
fn every_mutation_publishes_exactly_once() {
    let mut store = store_on(MemoryStorage::new());
    let (seen, _subscription) = record_publications(&store);

    let habit = store.add_habit("Read");
    store.toggle_completion(&habit.id, Some(day("2024-02-02")));
    store.remove_habit(&habit.id);
    store.reset();

    let lens: Vec<usize> = seen.lock().unwrap().iter().map(|s| s.len()).collect();
    assert_eq!(lens, vec![0, 1, 1, 0, 0]);
}

#[test]
fn snapshots_are_not_mutated_by_later_calls() {
    let mut store = store_on(MemoryStorage::new());
    let habit = store.add_habit("Read");
    let earlier = store.snapshot();

    store.toggle_completion(&habit.id, Some(day("2024-01-01")));

    assert!(earlier[0].completions.is_empty());
    assert_eq!(store.snapshot()[0].completion_count(), 1);
}

#[test]
fn persisted_list_reloads_deep_equal() {
    let storage = MemoryStorage::new();
    let expected: Vec<Habit> = {
        let mut store = store_on(storage.clone());
        let read = store.add_habit(NewHabit::new("Read").category("mind"));
        store.add_habit("Run");
        store.toggle_completion(&read.id, Some(day("2024-01-01")));
        store.toggle_completion(&read.id, Some(day("2024-01-03")));
        store.snapshot().to_vec()
    };

    let mut reloaded = HabitStore::new(storage, StoreConfig::default());
    let outcome = reloaded.init();

    assert!(matches!(outcome, LoadOutcome::Restored { count: 2 }));
    assert_eq!(*reloaded.snapshot(), expected);
}

#[test]
fn reset_then_init_yields_empty_list() {
    let storage = MemoryStorage::new();
    let mut store = store_on(storage.clone());
    store.add_habit("Read");

    store.reset();
    assert!(store.snapshot().is_empty());
    assert!(storage.read("habits").unwrap().is_none());

    let outcome = store.init();
    assert!(matches!(outcome, LoadOutcome::Empty));
    assert!(store.snapshot().is_empty());
}

#[test]
fn unavailable_storage_keeps_state_in_memory_only() {
    let storage = MemoryStorage::new();
    storage.write("habits", "not even json").unwrap();
    let mut store = HabitStore::new(storage.clone(), StoreConfig::ephemeral());

    assert!(matches!(store.init(), LoadOutcome::Ephemeral));
    assert!(store.snapshot().is_empty());

    store.add_habit("X");
    assert_eq!(store.snapshot().len(), 1);
    store.reset();

    assert_eq!(
        storage.read("habits").unwrap().as_deref(),
        Some("not even json")
    );
}

#[test]
fn corrupt_stored_value_is_discarded() {
    let storage = MemoryStorage::new();
    storage.write("habits", "[{\"id\": \"1\"").unwrap();
    let mut store = HabitStore::new(storage.clone(), StoreConfig::default());

    let outcome = store.init();

    match outcome {
        LoadOutcome::Recovered(corrupt) => {
            assert_eq!(corrupt.key, "habits");
            assert_eq!(corrupt.category, "eof");
        }
        other => panic!("expected recovery, got {other:?}"),
    }
    assert!(store.snapshot().is_empty());
    assert!(storage.read("habits").unwrap().is_none());
}

#[test]
fn custom_storage_key_is_respected() {
    let storage = MemoryStorage::new();
    let config = StoreConfig::default().storage_key("habits-v2");
    let mut store = HabitStore::new(storage.clone(), config);
    store.init();
    store.add_habit("Read");

    assert!(storage.read("habits").unwrap().is_none());
    assert!(storage.read("habits-v2").unwrap().is_some());
}

#[test]
fn dropped_subscription_stops_receiving() {
    let mut store = store_on(MemoryStorage::new());
    let seen = Arc::new(Mutex::new(0_usize));
    let sink = Arc::clone(&seen);
    let subscription = store.subscribe(move |_| *sink.lock().unwrap() += 1);

    store.add_habit("Read");
    subscription.unsubscribe();
    store.add_habit("Run");

    assert_eq!(*seen.lock().unwrap(), 2);
}
