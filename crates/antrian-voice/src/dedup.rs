//! Memory of calls that were already announced.

use antrian_core::Counter;
use std::collections::{HashSet, VecDeque};

/// Identity of one call: the same number recalled later has a new timestamp and is
/// therefore a new call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallKey {
    pub counter_id: String,
    pub number: u32,
    pub called_at: i64,
}

impl CallKey {
    /// Key for the counter's current call, if it has one.
    pub fn of(counter: &Counter) -> Option<Self> {
        if counter.current_number == 0 {
            return None;
        }
        counter.last_called.map(|called_at| Self {
            counter_id: counter.id.clone(),
            number: counter.current_number,
            called_at,
        })
    }
}

/// Insertion-ordered set capped at `capacity`: once it grows past the cap the oldest
/// half is dropped, so memory stays bounded while recent calls stay deduplicated.
#[derive(Debug)]
pub struct AnnouncedCalls {
    capacity: usize,
    order: VecDeque<CallKey>,
    seen: HashSet<CallKey>,
}

impl AnnouncedCalls {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity + 1),
            seen: HashSet::with_capacity(capacity + 1),
        }
    }

    /// Record `key`; `false` if it was already announced.
    pub fn insert(&mut self, key: CallKey) -> bool {
        if !self.seen.insert(key.clone()) {
            return false;
        }
        self.order.push_back(key);
        if self.order.len() > self.capacity {
            let evict = self.capacity / 2;
            for old in self.order.drain(..evict) {
                self.seen.remove(&old);
            }
        }
        true
    }

    pub fn contains(&self, key: &CallKey) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for AnnouncedCalls {
    fn default() -> Self {
        Self::new(100)
    }
}
