//! Clock manipulation detection.
//!
//! - [`anchor`]: local drift detection against the persisted
//!   (wall, monotonic) anchor. Synchronous and cheap.
//! - [`network`]: best-effort comparison against HTTP `Date` headers.
//!   Asynchronous and fail-open.

pub mod anchor;
pub mod network;

pub use anchor::{detect_drift, ClockReading, DriftSignal, DriftThresholds, TimeAnchor, TimeAnchorTracker};
pub use network::{NetworkTimeValidator, TimeVerdict};

use chrono::{DateTime, TimeZone, Utc};

/// Wall time as persisted epoch milliseconds.
pub(crate) fn to_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

/// Epoch milliseconds back to wall time; out-of-range values clamp to the
/// representable bounds.
pub(crate) fn from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or(if millis < 0 {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}
