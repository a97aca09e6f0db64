//! **QueueStore**: the canonical queue state behind one key.
//!
//! Every operation is a whole-state read-modify-write against the key-value seam:
//! load (initializing or applying the daily reset as needed), transform, bump
//! `version`, write back. Across processes there is no locking and the later write
//! wins; the version lets readers detect staleness. Inside one store instance the
//! read-modify-write cycles are serialized so concurrent requests handled by the same
//! gateway cannot clobber each other.

use crate::action::QueueAction;
use crate::clock::Clock;
use crate::error::{QueueError, QueueResult};
use crate::kv::KeyValueStore;
use crate::model::{Counter, QueueState};
use chrono::NaiveDate;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Fixed key of the state record.
pub const DEFAULT_STATE_KEY: &str = "antrian-ptsp-queue";

/// What a transform did to the loaded state.
enum Change {
    /// Nothing to write (e.g. unknown counter id).
    Unchanged,
    /// Fields changed; the store bumps `version` and `last_update`.
    Mutated,
    /// The transform already advanced `version` itself (full reset).
    Reset,
}

pub struct QueueStore {
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    key: String,
    counters: Vec<Counter>,
    write_lock: Mutex<()>,
}

impl QueueStore {
    /// Store over `kv` using `counters` as the configuration for a fresh state.
    pub fn new(kv: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, counters: Vec<Counter>) -> Self {
        Self {
            kv,
            clock,
            key: DEFAULT_STATE_KEY.to_string(),
            counters,
            write_lock: Mutex::new(()),
        }
    }

    /// Use a different record key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// In-memory default (version 0) used when storage is unavailable. Not persisted.
    pub fn default_state(&self) -> QueueState {
        QueueState::initial(&self.counters, self.clock.today())
    }

    /// Current state; creates it on first read and applies the daily reset.
    pub fn read(&self) -> QueueResult<QueueState> {
        let _guard = self.write_lock.lock().map_err(|_| QueueError::Lock)?;
        self.load()
    }

    /// Hand the next number of the counter's sequence to `counter_id`.
    pub fn call_next(&self, counter_id: &str) -> QueueResult<QueueState> {
        self.mutate(|state, now, _| {
            let Some(shared) = state.counter(counter_id).map(|c| c.shared_queue) else {
                return Change::Unchanged;
            };
            let number = if shared {
                state.shared_sequence += 1;
                state.shared_sequence
            } else {
                state.independent_sequence += 1;
                state.independent_sequence
            };
            if let Some(counter) = state.counter_mut(counter_id) {
                counter.current_number = number;
                counter.last_called = Some(now);
            }
            info!(counter = counter_id, number, "[ANTRIAN] number called");
            Change::Mutated
        })
    }

    /// Re-announce the current number: only `last_called` moves.
    pub fn recall(&self, counter_id: &str) -> QueueResult<QueueState> {
        self.mutate(|state, now, _| match state.counter_mut(counter_id) {
            Some(counter) => {
                counter.last_called = Some(now);
                info!(counter = counter_id, number = counter.current_number, "[ANTRIAN] number recalled");
                Change::Mutated
            }
            None => Change::Unchanged,
        })
    }

    /// Reset one counter. A shared counter resets the whole shared group and the
    /// shared sequence; an independent counter resets itself and the independent sequence.
    pub fn reset_one(&self, counter_id: &str) -> QueueResult<QueueState> {
        self.mutate(|state, _, _| {
            let Some(shared) = state.counter(counter_id).map(|c| c.shared_queue) else {
                return Change::Unchanged;
            };
            if shared {
                state.shared_sequence = 0;
                state
                    .counters
                    .iter_mut()
                    .filter(|c| c.shared_queue)
                    .for_each(Counter::reset);
            } else {
                state.independent_sequence = 0;
                if let Some(counter) = state.counter_mut(counter_id) {
                    counter.reset();
                }
            }
            info!(counter = counter_id, shared, "[ANTRIAN] queue reset");
            Change::Mutated
        })
    }

    /// Zero every counter and both sequences, keeping the counter configuration.
    pub fn reset_all(&self) -> QueueResult<QueueState> {
        self.mutate(|state, now, today| {
            state.reset_all(now, today);
            info!("[ANTRIAN] all queues reset");
            Change::Reset
        })
    }

    /// Dispatch a parsed wire action.
    pub fn apply(&self, action: &QueueAction) -> QueueResult<QueueState> {
        match action {
            QueueAction::CallNext(id) => self.call_next(id),
            QueueAction::Recall(id) => self.recall(id),
            QueueAction::ResetOne(id) => self.reset_one(id),
            QueueAction::ResetAll => self.reset_all(),
            QueueAction::Unrecognized(name) => self.mutate(|_, _, _| {
                warn!(action = %name, "[ANTRIAN] unrecognized action; recording version bump only");
                Change::Mutated
            }),
        }
    }

    fn mutate<F>(&self, transform: F) -> QueueResult<QueueState>
    where
        F: FnOnce(&mut QueueState, i64, NaiveDate) -> Change,
    {
        let _guard = self.write_lock.lock().map_err(|_| QueueError::Lock)?;
        let mut state = self.load()?;
        let now = self.clock.now_millis();
        match transform(&mut state, now, self.clock.today()) {
            Change::Unchanged => {
                debug!("[ANTRIAN] no-op mutation (unknown counter)");
                return Ok(state);
            }
            Change::Mutated => {
                state.version += 1;
                state.last_update = now;
            }
            Change::Reset => {}
        }
        self.persist(&state)?;
        Ok(state)
    }

    /// Load without taking the lock. Caller holds `write_lock`.
    fn load(&self) -> QueueResult<QueueState> {
        let today = self.clock.today();
        let Some(raw) = self.kv.get(&self.key)? else {
            let state = QueueState::initial(&self.counters, today);
            info!(key = %self.key, "[ANTRIAN] initializing queue state");
            self.persist(&state)?;
            return Ok(state);
        };
        let mut state: QueueState = serde_json::from_slice(&raw)?;
        if state.needs_daily_reset(today) {
            info!(
                previous = ?state.last_reset_date,
                current = %today,
                "[ANTRIAN] daily reset triggered"
            );
            state.reset_all(self.clock.now_millis(), today);
            self.persist(&state)?;
        }
        Ok(state)
    }

    fn persist(&self, state: &QueueState) -> QueueResult<()> {
        let bytes = serde_json::to_vec(state)?;
        self.kv.set(&self.key, &bytes)
    }
}
