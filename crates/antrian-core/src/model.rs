//! Queue state model.
//!
//! Field names on the wire follow the browser clients (`lokets`, `lastCalled`,
//! `sharedQueueCounter`, `kasirCounter`, ...) so the JSON record is shared unchanged
//! between the gateway, the display runner and any existing web front end.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// One service counter (loket).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counter {
    pub id: String,
    pub name: String,
    pub prefix: String,
    pub current_number: u32,
    /// Epoch milliseconds of the last call or recall; `None` after a reset.
    #[serde(rename = "lastCalled")]
    pub last_called: Option<i64>,
    pub is_active: bool,
    /// `true` draws from the shared sequence, `false` from the independent one.
    pub shared_queue: bool,
}

impl Counter {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        prefix: impl Into<String>,
        shared_queue: bool,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            prefix: prefix.into(),
            current_number: 0,
            last_called: None,
            is_active: true,
            shared_queue,
        }
    }

    /// Clear the called number, keeping identity and configuration.
    pub fn reset(&mut self) {
        self.current_number = 0;
        self.last_called = None;
    }

    /// Display form of the current number, e.g. `A-007`, or `---` when nothing was called.
    pub fn ticket(&self) -> String {
        if self.current_number == 0 {
            "---".to_string()
        } else {
            format!("{}-{:03}", self.prefix, self.current_number)
        }
    }
}

/// The canonical queue state stored under a single key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueState {
    #[serde(rename = "lokets")]
    pub counters: Vec<Counter>,
    #[serde(rename = "sharedQueueCounter")]
    pub shared_sequence: u32,
    #[serde(rename = "kasirCounter")]
    pub independent_sequence: u32,
    /// Epoch milliseconds of the last accepted write.
    #[serde(rename = "lastUpdate")]
    pub last_update: i64,
    pub version: u64,
    /// Calendar date (fixed timezone) of the last full reset. Missing, empty or
    /// unparsable counts as stale.
    #[serde(rename = "lastResetDate", default, deserialize_with = "lenient_date")]
    pub last_reset_date: Option<NaiveDate>,
}

/// Any value that is not a `YYYY-MM-DD` string reads as `None`, so the daily reset
/// rewrites the record instead of the record failing to load forever.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|s| s.trim().parse::<NaiveDate>().ok()))
}

impl QueueState {
    /// Fresh state for the given counter configuration: version 0, never updated.
    pub fn initial(counters: &[Counter], today: NaiveDate) -> Self {
        let mut counters = counters.to_vec();
        counters.iter_mut().for_each(Counter::reset);
        Self {
            counters,
            shared_sequence: 0,
            independent_sequence: 0,
            last_update: 0,
            version: 0,
            last_reset_date: Some(today),
        }
    }

    /// Reset in place: every counter and both sequences zeroed, version bumped once.
    pub fn reset_all(&mut self, now_ms: i64, today: NaiveDate) {
        self.counters.iter_mut().for_each(Counter::reset);
        self.shared_sequence = 0;
        self.independent_sequence = 0;
        self.version += 1;
        self.last_update = now_ms;
        self.last_reset_date = Some(today);
    }

    pub fn counter(&self, id: &str) -> Option<&Counter> {
        self.counters.iter().find(|c| c.id == id)
    }

    pub fn counter_mut(&mut self, id: &str) -> Option<&mut Counter> {
        self.counters.iter_mut().find(|c| c.id == id)
    }

    /// True when the daily reset for `today` has not happened yet.
    pub fn needs_daily_reset(&self, today: NaiveDate) -> bool {
        self.last_reset_date != Some(today)
    }
}

/// Default counter set: four counters sharing one sequence, prefix `A`.
pub fn default_counters() -> Vec<Counter> {
    (1..=4)
        .map(|n| Counter::new(format!("loket-{n}"), format!("LOKET {n}"), "A", true))
        .collect()
}
