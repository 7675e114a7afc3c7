//! Time anchor persistence and drift detection.
//!
//! The anchor is the last observed pair of (wall clock, monotonic clock)
//! readings. A user can move the wall clock but not the monotonic one, so a
//! disagreement between the two is evidence of manipulation.

use crate::clock::Clock;
use crate::config::TrustgateConfig;
use crate::store::{Namespace, TrustStore};
use crate::time::{from_millis, to_millis};
use crate::TrustgateError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const KEY_LAST_WALL: &str = "last_wall_time";
const KEY_LAST_ELAPSED: &str = "last_elapsed_time";

/// One reading of both clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    /// Wall-clock time.
    pub wall: DateTime<Utc>,
    /// Monotonic time since boot.
    pub elapsed: Duration,
}

impl ClockReading {
    /// Read both sources of `clock`.
    pub fn from_clock(clock: &dyn Clock) -> Self {
        Self {
            wall: clock.now_utc(),
            elapsed: clock.elapsed(),
        }
    }
}

/// Persisted anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeAnchor {
    /// Last observed wall time.
    pub last_wall: DateTime<Utc>,
    /// Last observed monotonic time.
    pub last_elapsed: Duration,
}

impl From<ClockReading> for TimeAnchor {
    fn from(reading: ClockReading) -> Self {
        Self {
            last_wall: reading.wall,
            last_elapsed: reading.elapsed,
        }
    }
}

/// Tolerances for drift detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftThresholds {
    /// Tolerated backward movement of either clock.
    pub backward: Duration,
    /// Maximum forward jump of the wall clock between observations.
    pub max_forward: Duration,
}

impl DriftThresholds {
    /// Thresholds from configuration.
    pub fn from_config(config: &TrustgateConfig) -> Self {
        Self {
            backward: config.backward_threshold,
            max_forward: config.max_forward_jump,
        }
    }
}

/// Which drift rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftSignal {
    /// Wall clock moved backward beyond tolerance.
    WallBackward,
    /// Wall clock jumped forward beyond tolerance.
    WallForwardJump,
    /// Monotonic clock reads lower than the anchor.
    MonotonicRewound,
}

impl fmt::Display for DriftSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriftSignal::WallBackward => write!(f, "wall clock moved backward"),
            DriftSignal::WallForwardJump => write!(f, "wall clock jumped forward"),
            DriftSignal::MonotonicRewound => write!(f, "monotonic clock rewound"),
        }
    }
}

fn chrono_duration(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::MAX)
}

/// Check `now` against `anchor`.
///
/// Returns the first rule that fires, in order: wall backward, wall forward
/// jump, monotonic rewind. The monotonic rule only applies when both the
/// anchor and `now` carry a non-zero monotonic reading.
pub fn detect_drift(
    anchor: &TimeAnchor,
    now: &ClockReading,
    thresholds: &DriftThresholds,
) -> Option<DriftSignal> {
    let backward = chrono_duration(thresholds.backward);
    let max_forward = chrono_duration(thresholds.max_forward);

    let now_plus_tolerance = now.wall.checked_add_signed(backward).unwrap_or(now.wall);
    if now_plus_tolerance < anchor.last_wall {
        return Some(DriftSignal::WallBackward);
    }

    if let Some(limit) = anchor.last_wall.checked_add_signed(max_forward) {
        if now.wall > limit {
            return Some(DriftSignal::WallForwardJump);
        }
    }

    if !anchor.last_elapsed.is_zero()
        && !now.elapsed.is_zero()
        && now.elapsed.saturating_add(thresholds.backward) < anchor.last_elapsed
    {
        return Some(DriftSignal::MonotonicRewound);
    }

    None
}

/// Loads and refreshes the persisted anchor.
#[derive(Clone)]
pub struct TimeAnchorTracker {
    store: Arc<dyn TrustStore>,
}

impl TimeAnchorTracker {
    /// Tracker backed by `store`.
    pub fn new(store: Arc<dyn TrustStore>) -> Self {
        Self { store }
    }

    /// Read the anchor. `None` until a wall time has been recorded.
    pub fn load(&self) -> Result<Option<TimeAnchor>, TrustgateError> {
        let Some(wall_ms) = self.store.get_i64(Namespace::License, KEY_LAST_WALL)? else {
            return Ok(None);
        };
        let elapsed_ms = self
            .store
            .get_i64(Namespace::License, KEY_LAST_ELAPSED)?
            .unwrap_or(0);

        Ok(Some(TimeAnchor {
            last_wall: from_millis(wall_ms),
            last_elapsed: Duration::from_millis(elapsed_ms.max(0) as u64),
        }))
    }

    /// Persist `reading` as the new anchor.
    pub fn refresh(&self, reading: &ClockReading) -> Result<(), TrustgateError> {
        let elapsed_ms = i64::try_from(reading.elapsed.as_millis()).unwrap_or(i64::MAX);
        self.store
            .set_i64(Namespace::License, KEY_LAST_WALL, to_millis(reading.wall))?;
        self.store
            .set_i64(Namespace::License, KEY_LAST_ELAPSED, elapsed_ms)
    }
}
