//! Timestamps and the two window semantics used by reading queries.

use chrono::{DateTime, Utc};

/// UTC timestamp attached to every reading.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// `start < t < end`. Both bounds are excluded.
#[must_use]
pub fn strictly_between(t: Timestamp, start: Timestamp, end: Timestamp) -> bool {
    start < t && t < end
}

/// `start <= from && to <= end`. The interval `[from, to]` lies inside `[start, end]`.
#[must_use]
pub fn contained_in(from: Timestamp, to: Timestamp, start: Timestamp, end: Timestamp) -> bool {
    start <= from && to <= end
}
