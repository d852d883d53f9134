//! Timestamps for records and stores.
//!
//! Merging is last-write-wins on `updated`, so the library never reads the
//! wall clock directly: every store carries a [`Clock`] and stamps records
//! through it. [`SystemClock`] is the default. With the `testing` feature,
//! [`FixedClock`] gives tests full control over the timeline.
//!
//! ```
//! use recordvault::{Clock, SystemClock};
//!
//! let stamp = SystemClock.now();
//! assert!(stamp.timestamp_millis() > 0);
//! ```

use std::fmt::Debug;

use chrono::{DateTime, Utc};

#[cfg(any(test, feature = "testing"))]
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Source of record timestamps, in epoch milliseconds.
pub trait Clock: Send + Sync + Debug {
    fn now_millis(&self) -> u64;

    /// [`Clock::now_millis`] as a UTC timestamp.
    fn now(&self) -> DateTime<Utc> {
        millis_to_datetime(self.now_millis())
    }
}

/// Epoch milliseconds to UTC. Values past chrono's range clamp to its maximum.
pub(crate) fn millis_to_datetime(millis: u64) -> DateTime<Utc> {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        // Pre-epoch system clocks read as zero.
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// Deterministic clock for tests.
///
/// Every reading ticks the clock forward by one millisecond, so two records
/// stamped back to back never share a timestamp. While a [`ClockHold`] is
/// alive the clock stands still instead, which is how tests stage two edits
/// with the same `updated` value.
///
/// ```
/// # #[cfg(feature = "testing")] {
/// use recordvault::{Clock, FixedClock};
///
/// let clock = FixedClock::new(5_000);
/// assert_eq!(clock.now_millis(), 5_000);
/// assert_eq!(clock.now_millis(), 5_001);
///
/// let hold = clock.hold();
/// assert_eq!(clock.now_millis(), clock.now_millis());
/// drop(hold);
/// # }
/// ```
#[cfg(any(test, feature = "testing"))]
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicU64,
    holds: AtomicUsize,
}

/// Keeps a [`FixedClock`] from ticking. Holds nest.
#[cfg(any(test, feature = "testing"))]
#[must_use = "the clock resumes ticking as soon as the hold is dropped"]
#[derive(Debug)]
pub struct ClockHold<'a> {
    clock: &'a FixedClock,
}

#[cfg(any(test, feature = "testing"))]
impl Drop for ClockHold<'_> {
    fn drop(&mut self) {
        self.clock.holds.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "testing"))]
impl FixedClock {
    /// Start the timeline at `millis`.
    pub fn new(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
            holds: AtomicUsize::new(0),
        }
    }

    pub fn hold(&self) -> ClockHold<'_> {
        self.holds.fetch_add(1, Ordering::SeqCst);
        ClockHold { clock: self }
    }

    pub fn is_held(&self) -> bool {
        self.holds.load(Ordering::SeqCst) > 0
    }

    /// Jump forward, e.g. to make a later edit clearly newer.
    pub fn advance(&self, ms: u64) {
        self.millis.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.millis.store(ms, Ordering::SeqCst);
    }

    /// The next reading, without consuming it.
    pub fn get(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "testing"))]
impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        if self.is_held() {
            self.get()
        } else {
            self.millis.fetch_add(1, Ordering::SeqCst)
        }
    }
}

#[cfg(any(test, feature = "testing"))]
impl Default for FixedClock {
    /// 2024-01-01T00:00:00Z
    fn default() -> Self {
        Self::new(1_704_067_200_000)
    }
}
