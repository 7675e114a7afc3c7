//! Deterministic clock abstraction for testable time-dependent logic.
//!
//! Two independent sources are exposed: the wall clock, which the user can
//! change, and a monotonic boot-relative reading, which they cannot.

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::warn;

/// Clock trait for deterministic time in tests.
pub trait Clock: Send + Sync {
    /// Get the current UTC time.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Monotonic time since boot, including suspend.
    ///
    /// `Duration::ZERO` means no boot-relative reading is available; drift
    /// detection skips the monotonic rule for such readings.
    fn elapsed(&self) -> Duration;
}

static BOOT_CLOCK_MISSING: OnceCell<()> = OnceCell::new();

/// System clock using actual wall time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn elapsed(&self) -> Duration {
        boot_uptime().unwrap_or_else(|| {
            BOOT_CLOCK_MISSING.get_or_init(|| {
                warn!("boot clock unavailable, monotonic rewind check disabled")
            });
            Duration::ZERO
        })
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn boot_uptime() -> Option<Duration> {
    clock_since_boot(libc::CLOCK_BOOTTIME).or_else(proc_uptime)
}

/// Darwin's `CLOCK_MONOTONIC` counts from boot and keeps running in sleep.
#[cfg(any(target_os = "macos", target_os = "ios"))]
fn boot_uptime() -> Option<Duration> {
    clock_since_boot(libc::CLOCK_MONOTONIC)
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios"
)))]
fn boot_uptime() -> Option<Duration> {
    None
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios"
))]
fn clock_since_boot(id: libc::clockid_t) -> Option<Duration> {
    // SAFETY: timespec is plain old data; all-zero is a valid value.
    let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
    // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
    let rc = unsafe { libc::clock_gettime(id, &mut ts) };
    if rc != 0 || ts.tv_sec < 0 || !(0..1_000_000_000).contains(&ts.tv_nsec) {
        return None;
    }
    let nanos = u32::try_from(ts.tv_nsec).ok()?;
    let secs = u64::try_from(ts.tv_sec).ok()?;
    Some(Duration::new(secs, nanos))
}

/// Read uptime since boot from `/proc/uptime`.
#[cfg(any(target_os = "linux", target_os = "android"))]
fn proc_uptime() -> Option<Duration> {
    let raw = std::fs::read_to_string("/proc/uptime").ok()?;
    let secs: f64 = raw.split_whitespace().next()?.parse().ok()?;
    if secs.is_finite() && secs >= 0.0 {
        Some(Duration::from_secs_f64(secs))
    } else {
        None
    }
}

/// Mock clock for deterministic testing.
#[cfg(any(test, feature = "test-seams"))]
#[derive(Debug, Clone)]
pub struct MockClock {
    now: DateTime<Utc>,
    elapsed: Duration,
}

#[cfg(any(test, feature = "test-seams"))]
impl MockClock {
    /// Create a mock clock frozen at the given time, one hour after boot.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            elapsed: Duration::from_secs(3600),
        }
    }

    /// Create a mock clock from an RFC 3339 string.
    pub fn from_rfc3339(s: &str) -> Self {
        Self::new(
            DateTime::parse_from_rfc3339(s)
                .expect("valid RFC 3339")
                .with_timezone(&Utc),
        )
    }

    /// Advance both clocks by a duration.
    pub fn advance(&mut self, duration: chrono::Duration) {
        self.now = self.now + duration;
        if let Ok(d) = duration.to_std() {
            self.elapsed += d;
        }
    }

    /// Move only the wall clock, as a user changing the system time would.
    pub fn set_wall(&mut self, now: DateTime<Utc>) {
        self.now = now;
    }

    /// Override the monotonic reading.
    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }
}

#[cfg(any(test, feature = "test-seams"))]
impl Clock for MockClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.now
    }

    fn elapsed(&self) -> Duration {
        self.elapsed
    }
}
