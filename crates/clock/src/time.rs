//! Time sources: OS-backed clocks and a deterministic tick-driven
//! variant for tests and simulation.

use std::cell::Cell;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Monotonic and realtime clock readings for the synchronizer.
///
/// The synchronizer is generic over its time source so the same state
/// machine runs against the OS clocks in production and against logical
/// time in tests and simulation. Static dispatch: the choice is made at
/// construction and costs nothing per reading.
pub trait TimeSource {
    /// Nanoseconds of monotonic time. Never decreases across calls.
    fn monotonic(&self) -> u64;

    /// Nanoseconds since the Unix epoch, signed. May jump arbitrarily.
    fn realtime(&self) -> i64;

    /// Advance logical time. A no-op for OS-backed time.
    fn tick(&mut self);
}

/// OS-backed time source.
///
/// `monotonic()` is measured from process start; `realtime()` reads the
/// wall clock. A guard remembers the last monotonic value handed out
/// and panics on regression: a monotonic clock running backwards would
/// stall window progression forever, and crashing into a restart is
/// strictly safer than wedging silently.
#[derive(Debug)]
pub struct SystemTimeSource {
    /// Anchor for monotonic readings.
    started: Instant,

    /// Last monotonic value handed out.
    monotonic_guard: Cell<u64>,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            monotonic_guard: Cell::new(0),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn monotonic(&self) -> u64 {
        let monotonic = self.started.elapsed().as_nanos() as u64;
        assert!(
            monotonic >= self.monotonic_guard.get(),
            "monotonic clock regressed"
        );
        self.monotonic_guard.set(monotonic);
        monotonic
    }

    fn realtime(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since_epoch) => since_epoch.as_nanos() as i64,
            // The wall clock can legitimately sit before the epoch.
            Err(e) => -(e.duration().as_nanos() as i64),
        }
    }

    fn tick(&mut self) {}
}

/// Tick-driven time source with configurable resolution and epoch
/// offset.
///
/// `monotonic()` is `ticks * resolution`; `realtime()` adds the epoch
/// offset. Time advances only through [`TimeSource::tick`], which is
/// what makes whole clusters reproducible: every replica's clock is a
/// pure function of how often it has been ticked and how its epoch has
/// been shifted.
#[derive(Debug, Clone)]
pub struct DeterministicTimeSource {
    /// Nanoseconds advanced per tick.
    resolution: u64,

    /// Ticks elapsed since construction.
    ticks: u64,

    /// Realtime offset at tick zero.
    epoch: i64,
}

impl DeterministicTimeSource {
    /// Create a source advancing `resolution` nanoseconds per tick.
    pub fn new(resolution: u64) -> Self {
        assert!(resolution > 0, "a tick must advance time");
        Self {
            resolution,
            ticks: 0,
            epoch: 0,
        }
    }

    /// Set the realtime offset at tick zero, modelling initial skew.
    pub fn with_epoch(mut self, epoch: i64) -> Self {
        self.epoch = epoch;
        self
    }

    /// Shift the realtime epoch while leaving monotonic time untouched,
    /// modelling a wall-clock jump or accumulated drift.
    pub fn adjust_epoch(&mut self, delta: i64) {
        self.epoch += delta;
    }

    /// Ticks elapsed since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Nanoseconds advanced per tick.
    pub fn resolution(&self) -> u64 {
        self.resolution
    }
}

impl TimeSource for DeterministicTimeSource {
    fn monotonic(&self) -> u64 {
        self.ticks * self.resolution
    }

    fn realtime(&self) -> i64 {
        self.epoch + self.monotonic() as i64
    }

    fn tick(&mut self) {
        self.ticks += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_advances_per_tick() {
        let mut time = DeterministicTimeSource::new(1_000_000);
        assert_eq!(time.monotonic(), 0);
        assert_eq!(time.realtime(), 0);

        time.tick();
        time.tick();
        assert_eq!(time.monotonic(), 2_000_000);
        assert_eq!(time.realtime(), 2_000_000);
        assert_eq!(time.ticks(), 2);
    }

    #[test]
    fn test_deterministic_epoch_offsets_realtime_only() {
        let mut time = DeterministicTimeSource::new(1_000).with_epoch(-500);
        time.tick();
        assert_eq!(time.monotonic(), 1_000);
        assert_eq!(time.realtime(), 500);

        time.adjust_epoch(250);
        assert_eq!(time.monotonic(), 1_000);
        assert_eq!(time.realtime(), 750);
    }

    #[test]
    fn test_system_monotonic_never_decreases() {
        let time = SystemTimeSource::new();
        let first = time.monotonic();
        let second = time.monotonic();
        assert!(second >= first);
    }

    #[test]
    fn test_system_realtime_is_past_epoch() {
        let time = SystemTimeSource::new();
        // Any sane host clock reads well after 1970.
        assert!(time.realtime() > 0);
    }
}
