//! Integration test: the versioned queue-state protocol end to end.
//!
//! ## Scenarios
//! 1. Worked example: two calls then a full reset (versions 1, 2, 3).
//! 2. Shared sequence is strictly increasing across all shared counters.
//! 3. The independent (cashier) sequence moves on its own.
//! 4. Resetting a shared counter resets the whole shared group only.
//! 5. Version is strictly monotonic over a mixed action sequence.
//! 6. Daily reset: yesterday's state is zeroed once, `version = prior + 1`.
//! 7. Sled persistence survives reopening the database, and concurrent callers on one
//!    store never receive the same number.
//! 8. A follower over the local store never applies stale versions.

use antrian_core::{
    default_counters, Clock, Counter, KeyValueStore, MemoryStore, QueueAction, QueueFollower,
    QueueState, QueueStore, SledStore, StateSource, DEFAULT_STATE_KEY,
};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Clock whose time and date the test moves by hand.
struct ManualClock {
    now_ms: AtomicI64,
    day: AtomicU32,
}

impl ManualClock {
    fn new(day: u32) -> Arc<Self> {
        Arc::new(Self {
            now_ms: AtomicI64::new(1_760_000_000_000),
            day: AtomicU32::new(day),
        })
    }

    fn tick(&self, ms: i64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }

    fn set_day(&self, day: u32) {
        self.day.store(day, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn today(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, self.day.load(Ordering::SeqCst)).unwrap()
    }
}

fn memory_store(clock: Arc<ManualClock>) -> QueueStore {
    QueueStore::new(Arc::new(MemoryStore::new()), clock, default_counters())
}

fn cashier_layout() -> Vec<Counter> {
    vec![
        Counter::new("loket-1", "LOKET 1", "A", true),
        Counter::new("loket-2", "LOKET 2", "A", true),
        Counter::new("loket-3", "LOKET 3", "A", true),
        Counter::new("kasir", "KASIR", "K", false),
    ]
}

fn number(state: &QueueState, id: &str) -> u32 {
    state.counter(id).unwrap().current_number
}

// ===========================================================================
// 1. Worked example
// ===========================================================================

#[test]
fn worked_example_call_call_reset_all() {
    let store = memory_store(ManualClock::new(16));

    let initial = store.read().unwrap();
    assert_eq!(initial.version, 0);
    assert!(initial.counters.iter().all(|c| c.shared_queue && c.current_number == 0));

    let s1 = store.call_next("loket-1").unwrap();
    assert_eq!(number(&s1, "loket-1"), 1);
    assert_eq!(s1.shared_sequence, 1);
    assert_eq!(s1.version, 1);

    let s2 = store.call_next("loket-2").unwrap();
    assert_eq!(number(&s2, "loket-2"), 2);
    assert_eq!(s2.shared_sequence, 2);
    assert_eq!(s2.version, 2);

    let s3 = store.reset_all().unwrap();
    assert!(s3.counters.iter().all(|c| c.current_number == 0 && c.last_called.is_none()));
    assert_eq!(s3.shared_sequence, 0);
    assert_eq!(s3.independent_sequence, 0);
    assert_eq!(s3.version, 3);
}

// ===========================================================================
// 2–3. Sequences
// ===========================================================================

#[test]
fn shared_sequence_is_strictly_increasing_across_shared_counters() {
    let store = memory_store(ManualClock::new(16));
    let order = ["loket-3", "loket-1", "loket-1", "loket-4", "loket-2", "loket-3"];
    let handed_out: Vec<u32> = order
        .iter()
        .map(|id| number(&store.call_next(id).unwrap(), id))
        .collect();
    assert_eq!(handed_out, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn independent_sequence_moves_on_its_own() {
    let clock = ManualClock::new(16);
    let store = QueueStore::new(Arc::new(MemoryStore::new()), clock, cashier_layout());

    store.call_next("loket-1").unwrap();
    store.call_next("loket-2").unwrap();
    let s = store.call_next("kasir").unwrap();
    assert_eq!(number(&s, "kasir"), 1);
    assert_eq!(s.independent_sequence, 1);
    assert_eq!(s.shared_sequence, 2);

    store.call_next("kasir").unwrap();
    let s = store.call_next("loket-3").unwrap();
    assert_eq!(number(&s, "kasir"), 2);
    assert_eq!(number(&s, "loket-3"), 3);
}

// ===========================================================================
// 4. Group reset
// ===========================================================================

#[test]
fn resetting_a_shared_counter_resets_the_shared_group_only() {
    let store = QueueStore::new(
        Arc::new(MemoryStore::new()),
        ManualClock::new(16),
        cashier_layout(),
    );
    store.call_next("loket-1").unwrap();
    store.call_next("loket-2").unwrap();
    store.call_next("kasir").unwrap();

    let s = store.reset_one("loket-2").unwrap();
    assert_eq!(s.shared_sequence, 0);
    for id in ["loket-1", "loket-2", "loket-3"] {
        assert_eq!(number(&s, id), 0);
        assert!(s.counter(id).unwrap().last_called.is_none());
    }
    assert_eq!(number(&s, "kasir"), 1);
    assert_eq!(s.independent_sequence, 1);

    let s = store.reset_one("kasir").unwrap();
    assert_eq!(number(&s, "kasir"), 0);
    assert_eq!(s.independent_sequence, 0);

    // Next shared call starts again at 1.
    assert_eq!(number(&store.call_next("loket-3").unwrap(), "loket-3"), 1);
}

// ===========================================================================
// 5. Version monotonicity
// ===========================================================================

#[test]
fn version_is_strictly_monotonic() {
    let clock = ManualClock::new(16);
    let store = memory_store(clock.clone());
    let actions = [
        QueueAction::CallNext("loket-1".into()),
        QueueAction::Recall("loket-1".into()),
        QueueAction::ResetOne("loket-1".into()),
        QueueAction::ResetAll,
        QueueAction::Unrecognized("bogus".into()),
        QueueAction::CallNext("loket-4".into()),
        QueueAction::ResetAll,
    ];
    let mut last = store.read().unwrap().version;
    for action in &actions {
        clock.tick(1_000);
        let v = store.apply(action).unwrap().version;
        assert!(v > last, "{} did not advance version ({} -> {})", action.name(), last, v);
        last = v;
    }
    assert_eq!(last, actions.len() as u64);
}

// ===========================================================================
// 6. Daily reset
// ===========================================================================

#[test]
fn daily_reset_happens_once_per_day() {
    let clock = ManualClock::new(15);
    let store = memory_store(clock.clone());
    store.call_next("loket-1").unwrap();
    let prior = store.call_next("loket-2").unwrap();
    assert_eq!(prior.version, 2);

    clock.set_day(16);
    let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();

    let reset = store.read().unwrap();
    assert!(reset.counters.iter().all(|c| c.current_number == 0));
    assert_eq!(reset.shared_sequence, 0);
    assert_eq!(reset.last_reset_date, Some(today));
    assert_eq!(reset.version, prior.version + 1);

    // A second reader noticing the same transition changes nothing.
    assert_eq!(store.read().unwrap(), reset);
}

#[test]
fn mutation_on_a_new_day_applies_to_the_reset_state() {
    let clock = ManualClock::new(15);
    let store = memory_store(clock.clone());
    store.call_next("loket-1").unwrap();
    store.call_next("loket-1").unwrap();

    clock.set_day(16);
    let s = store.call_next("loket-2").unwrap();
    assert_eq!(number(&s, "loket-1"), 0);
    assert_eq!(number(&s, "loket-2"), 1);
    // 2 calls, 1 daily reset, 1 call.
    assert_eq!(s.version, 4);
}

#[test]
fn record_without_reset_date_is_reset_on_read() {
    let kv = Arc::new(MemoryStore::new());
    let legacy = serde_json::json!({
        "lokets": [{
            "id": "loket-1", "name": "LOKET 1", "prefix": "A", "currentNumber": 12,
            "lastCalled": 99, "isActive": true, "sharedQueue": true
        }],
        "sharedQueueCounter": 12,
        "kasirCounter": 0,
        "lastUpdate": 99,
        "version": 40
    });
    kv.set(DEFAULT_STATE_KEY, legacy.to_string().as_bytes()).unwrap();

    let store = QueueStore::new(kv, ManualClock::new(16), default_counters());
    let s = store.read().unwrap();
    assert_eq!(s.version, 41);
    assert_eq!(s.counters.len(), 1);
    assert_eq!(number(&s, "loket-1"), 0);
}

#[test]
fn record_with_empty_reset_date_recovers_on_read() {
    let kv = Arc::new(MemoryStore::new());
    let damaged = serde_json::json!({
        "lokets": [{
            "id": "loket-1", "name": "LOKET 1", "prefix": "A", "currentNumber": 3,
            "lastCalled": 99, "isActive": true, "sharedQueue": true
        }],
        "sharedQueueCounter": 3,
        "kasirCounter": 0,
        "lastUpdate": 99,
        "version": 7,
        "lastResetDate": ""
    });
    kv.set(DEFAULT_STATE_KEY, damaged.to_string().as_bytes()).unwrap();

    let store = QueueStore::new(kv.clone(), ManualClock::new(16), default_counters());
    let s = store.read().unwrap();
    assert_eq!(s.version, 8);
    assert_eq!(s.last_reset_date, NaiveDate::from_ymd_opt(2026, 10, 16));
    assert_eq!(number(&s, "loket-1"), 0);

    // The record was rewritten, so writes work again.
    let s = store.call_next("loket-1").unwrap();
    assert_eq!(s.version, 9);
    assert_eq!(number(&s, "loket-1"), 1);
    let s = store.call_next("loket-1").unwrap();
    assert_eq!(number(&s, "loket-1"), 2);

    let stored: serde_json::Value =
        serde_json::from_slice(&kv.get(DEFAULT_STATE_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(stored["lastResetDate"], "2026-10-16");
}

// ===========================================================================
// 7. Sled persistence
// ===========================================================================

#[test]
fn sled_backed_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new(16);
    {
        let kv = Arc::new(SledStore::open(Some(dir.path())).unwrap());
        let store = QueueStore::new(kv, clock.clone(), default_counters());
        store.call_next("loket-1").unwrap();
        store.call_next("loket-1").unwrap();
    }
    let kv = Arc::new(SledStore::open(Some(dir.path())).unwrap());
    let store = QueueStore::new(kv, clock, default_counters());
    let s = store.read().unwrap();
    assert_eq!(s.version, 2);
    assert_eq!(number(&s, "loket-1"), 2);
}

#[test]
fn concurrent_calls_on_one_store_hand_out_unique_numbers() {
    const THREADS: usize = 4;
    const CALLS: usize = 25;

    let dir = tempfile::tempdir().unwrap();
    let kv = Arc::new(SledStore::open(Some(dir.path())).unwrap());
    let store = Arc::new(QueueStore::new(kv, ManualClock::new(16), default_counters()));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = Arc::clone(&store);
            let id = format!("loket-{}", t + 1);
            thread::spawn(move || {
                (0..CALLS)
                    .map(|_| number(&store.call_next(&id).unwrap(), &id))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut numbers = HashSet::new();
    for h in handles {
        for n in h.join().unwrap() {
            assert!(numbers.insert(n), "number {} handed out twice", n);
        }
    }
    let total = (THREADS * CALLS) as u32;
    assert_eq!(numbers, (1..=total).collect::<HashSet<_>>());

    let s = store.read().unwrap();
    assert_eq!(s.version, u64::from(total));
    assert_eq!(s.shared_sequence, total);
}

// ===========================================================================
// 8. Followers
// ===========================================================================

#[tokio::test]
async fn follower_over_local_store_tracks_latest_version() {
    let clock = ManualClock::new(16);
    let kv = Arc::new(MemoryStore::new());
    let store = Arc::new(QueueStore::new(kv.clone(), clock, default_counters()));
    let follower = Arc::new(QueueFollower::new());
    let mut rx = follower.subscribe();

    let source: Arc<dyn StateSource> = Arc::new(store.clone());
    let runner = {
        let follower = follower.clone();
        let changes = kv.subscribe();
        tokio::spawn(async move {
            follower
                .run(source, Duration::from_secs(3600), Some(changes))
                .await
        })
    };

    // First tick of the interval fires immediately.
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().as_ref().unwrap().version, 0);

    // The change notification wakes the follower long before the next poll.
    store.call_next("loket-1").unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            rx.changed().await.unwrap();
            if rx.borrow_and_update().as_ref().map(|s| s.version) == Some(1) {
                break;
            }
        }
    })
    .await
    .unwrap();

    // An older snapshot offered later is ignored.
    let mut stale = store.read().unwrap();
    stale.version = 0;
    assert!(!follower.apply(stale));
    assert_eq!(follower.last_applied_version(), Some(1));

    runner.abort();
}
