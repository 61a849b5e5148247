//! Monotonic timestamp generation for status-history appends
//!
//! History timestamps must be strictly increasing per record. Under clock
//! skew or rapid successive updates the wall clock can be at or behind the
//! last recorded entry; in that case the new timestamp is the last one
//! advanced by one microsecond, the stored precision of the ledger's
//! ISO-8601 entries.

use chrono::{DateTime, Duration, Utc};

/// Compute the next history timestamp given the last recorded one
pub fn next_timestamp(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match last {
        Some(last) if now <= last => last + Duration::microseconds(1),
        _ => now,
    }
}

/// Clock used by the Transition Engine to stamp history entries
#[derive(Debug, Clone, Copy)]
pub enum MonotonicClock {
    /// Wall-clock time
    System,
    /// A fixed instant, for tests and replays
    Fixed(DateTime<Utc>),
}

impl MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        match self {
            MonotonicClock::System => Utc::now(),
            MonotonicClock::Fixed(at) => *at,
        }
    }

    /// Next strictly-increasing timestamp after `last`
    pub fn next(&self, last: Option<DateTime<Utc>>) -> DateTime<Utc> {
        next_timestamp(last, self.now())
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        MonotonicClock::System
    }
}
