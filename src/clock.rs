//! Time sources for the trace engine.
//!
//! The engine reads a [`Clock`] once per emitted event. Timestamps are
//! represented in milliseconds since the Unix epoch, matching the external
//! encoded form. `now()` is expected to be non-decreasing within a single
//! trace; if a clock misbehaves, sequence numbers still define the canonical
//! event order.

use core::fmt;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A wall-clock instant in milliseconds since the Unix epoch.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The Unix epoch.
    pub const UNIX_EPOCH: Self = Self(0);

    /// Creates a timestamp from milliseconds since the Unix epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as milliseconds since the Unix epoch.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Converts a [`SystemTime`], truncating to millisecond resolution.
    ///
    /// Instants before the epoch clamp to the epoch.
    #[must_use]
    pub fn from_system_time(time: SystemTime) -> Self {
        let millis = time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self(millis)
    }

    /// Adds a duration, saturating on overflow.
    #[must_use]
    pub const fn saturating_add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.as_millis() as u64))
    }

    /// Returns the duration since an earlier timestamp, or zero if `earlier`
    /// is actually later.
    #[must_use]
    pub const fn saturating_since(self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}ms)", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of timestamps and accumulated execution durations.
///
/// `cpu_time` and `wall_time` are read once per trace, when the terminal
/// outcome event is built.
pub trait Clock {
    /// Returns the current wall-clock time.
    fn now(&self) -> Timestamp;

    /// Returns CPU time consumed by the traced workload so far.
    fn cpu_time(&self) -> Duration;

    /// Returns wall time elapsed for the traced workload so far.
    fn wall_time(&self) -> Duration;
}

/// Clock backed by the OS wall clock.
///
/// Wall time is measured from construction. CPU accounting is not available
/// from the standard library, so `cpu_time` reports zero; hosts that track
/// CPU consumption inject their own [`Clock`].
#[derive(Debug)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    /// Creates a clock anchored at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_system_time(SystemTime::now())
    }

    fn cpu_time(&self) -> Duration {
        Duration::ZERO
    }

    fn wall_time(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Manually driven clock for deterministic tests and virtual-time hosts.
///
/// Time only moves when [`set`](ManualClock::set) or
/// [`advance`](ManualClock::advance) is called.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Timestamp>,
    cpu_time: Cell<Duration>,
    wall_time: Cell<Duration>,
}

impl ManualClock {
    /// Creates a clock starting at the given timestamp.
    #[must_use]
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: Cell::new(now),
            cpu_time: Cell::new(Duration::ZERO),
            wall_time: Cell::new(Duration::ZERO),
        }
    }

    /// Sets the current time.
    pub fn set(&self, now: Timestamp) {
        self.now.set(now);
    }

    /// Advances the current time and the reported wall time.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get().saturating_add(by));
        self.wall_time.set(self.wall_time.get().saturating_add(by));
    }

    /// Sets the reported CPU time.
    pub fn set_cpu_time(&self, cpu: Duration) {
        self.cpu_time.set(cpu);
    }

    /// Sets the reported wall time.
    pub fn set_wall_time(&self, wall: Duration) {
        self.wall_time.set(wall);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.get()
    }

    fn cpu_time(&self) -> Duration {
        self.cpu_time.get()
    }

    fn wall_time(&self) -> Duration {
        self.wall_time.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_millis_round_trip() {
        let ts = Timestamp::from_millis(1_700_000_000_123);
        assert_eq!(ts.as_millis(), 1_700_000_000_123);
    }

    #[test]
    fn timestamp_saturating_arithmetic() {
        let ts = Timestamp::from_millis(u64::MAX);
        assert_eq!(ts.saturating_add(Duration::from_millis(10)), ts);

        let early = Timestamp::from_millis(100);
        let late = Timestamp::from_millis(250);
        assert_eq!(late.saturating_since(early), Duration::from_millis(150));
        assert_eq!(early.saturating_since(late), Duration::ZERO);
    }

    #[test]
    fn pre_epoch_system_time_clamps_to_epoch() {
        let before = UNIX_EPOCH - Duration::from_secs(10);
        assert_eq!(Timestamp::from_system_time(before), Timestamp::UNIX_EPOCH);
    }

    #[test]
    fn manual_clock_only_moves_when_told() {
        let clock = ManualClock::new(Timestamp::from_millis(5));
        assert_eq!(clock.now(), Timestamp::from_millis(5));
        assert_eq!(clock.now(), Timestamp::from_millis(5));

        clock.advance(Duration::from_millis(20));
        assert_eq!(clock.now(), Timestamp::from_millis(25));
        assert_eq!(clock.wall_time(), Duration::from_millis(20));

        clock.set(Timestamp::from_millis(1_000));
        assert_eq!(clock.now(), Timestamp::from_millis(1_000));
    }

    #[test]
    fn manual_clock_reports_configured_durations() {
        let clock = ManualClock::default();
        clock.set_cpu_time(Duration::from_millis(7));
        clock.set_wall_time(Duration::from_millis(11));
        assert_eq!(clock.cpu_time(), Duration::from_millis(7));
        assert_eq!(clock.wall_time(), Duration::from_millis(11));
    }

    #[test]
    fn system_clock_is_monotonic_enough() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn timestamp_serializes_transparently() {
        let ts = Timestamp::from_millis(42);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "42");
        let back: Timestamp = serde_json::from_str("42").unwrap();
        assert_eq!(back, ts);
    }
}
