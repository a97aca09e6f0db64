//! Wall clock with a fixed-offset calendar date.
//!
//! The daily reset compares calendar dates in one fixed timezone (UTC+7 for
//! Asia/Jakarta by default, which has no daylight saving).

use chrono::{FixedOffset, NaiveDate, Offset, Utc};

/// Source of "now" and "today" for the store. Swapped for a fixed clock in tests.
pub trait Clock: Send + Sync {
    /// Current time as epoch milliseconds.
    fn now_millis(&self) -> i64;
    /// Current calendar date in the store's timezone.
    fn today(&self) -> NaiveDate;
}

/// System clock observed through a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// Build from whole hours east of UTC. Out-of-range offsets fall back to UTC.
    pub fn with_offset_hours(hours: i32) -> Self {
        let offset = FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| {
            tracing::warn!("[ANTRIAN CLOCK] invalid UTC offset {}h, using UTC", hours);
            Utc.fix()
        });
        Self { offset }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::with_offset_hours(7)
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }
}
