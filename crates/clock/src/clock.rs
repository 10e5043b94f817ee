//! The cluster clock synchronizer state machine.
//!
//! This is a synchronous state machine driven entirely by its host:
//! pong receipts become [`Clock::learn`] calls, the host's tick timer
//! becomes [`Clock::tick`], and the replicated state machine queries
//! [`Clock::realtime_synchronized`] when it needs an authoritative
//! timestamp. All network I/O is performed by the host.
//!
//! Two epochs alternate roles. The `window` epoch collects the best
//! sample per peer; once it has been observed long enough and a
//! majority of sources agree on an offset interval, it is promoted to
//! `current` and a fresh window starts collecting. `current` only ever
//! serves queries, so no query can observe a half-updated window.

use crate::config::ClockConfig;
use crate::epoch::{Epoch, Sample};
use crate::fmt::SignedDuration;
use crate::marzullo::{self, Bound, Tuple};
use crate::time::TimeSource;

/// Fuses round-trip time samples from peer replicas into a bounded
/// interval of cluster time.
///
/// The synchronizer tolerates drifting, jumping, and lying clocks on a
/// minority of replicas: an offset interval is only installed when a
/// strict majority of sources (ourselves included) agree on it.
pub struct Clock<T: TimeSource> {
    /// The time source all readings come from.
    time: T,

    /// Our replica index within the cluster.
    replica: u8,

    /// Tunables.
    config: ClockConfig,

    /// The synchronized epoch serving queries.
    current: Epoch,

    /// The epoch collecting samples, destined to replace `current`.
    window: Epoch,

    /// Scratch buffer for the interval search, reused across ticks.
    tuples: Vec<Tuple>,
}

impl<T: TimeSource> Clock<T> {
    /// Create a synchronizer for `replica` in a cluster of
    /// `replica_count` members.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid, `replica_count` is zero,
    /// or `replica` is out of range. These are programming errors, not
    /// runtime conditions.
    pub fn new(config: ClockConfig, replica_count: u8, replica: u8, time: T) -> Self {
        config.validate().expect("invalid clock configuration");
        assert!(replica_count > 0, "a cluster has at least one replica");
        assert!(
            replica < replica_count,
            "replica index out of range for cluster"
        );

        let mut current = Epoch::new(replica_count);
        let mut window = Epoch::new(replica_count);
        current.reset(replica, &time);
        window.reset(replica, &time);

        Self {
            time,
            replica,
            config,
            current,
            window,
            tuples: Vec::with_capacity(2 * replica_count as usize),
        }
    }

    /// Ingest a round-trip sample for `peer`.
    ///
    /// `m0` is our monotonic reading when the ping was sent, `t1` the
    /// peer's realtime when it replied, and `m2` our monotonic reading
    /// when the pong arrived. Samples that cannot have been produced by
    /// a well-formed exchange within the current window are dropped
    /// without further effect.
    pub fn learn(&mut self, peer: u8, m0: u64, t1: i64, m2: u64) {
        if peer == self.replica {
            // A routing fault looped our own message back to us.
            tracing::debug!(replica = self.replica, "dropped sample from ourselves");
            return;
        }
        if m0 >= m2 {
            // Send-before-receive violated on our own monotonic clock.
            tracing::debug!(peer, m0, m2, "dropped sample: sent after received");
            return;
        }
        if m0 < self.window.monotonic || m2 < self.window.monotonic {
            // Straggler from before the window, e.g. a pong crossing a
            // window reset or a reboot.
            tracing::debug!(peer, "dropped sample: predates the window");
            return;
        }
        if m2 - self.window.monotonic > self.config.window_max_ns() {
            tracing::debug!(peer, "dropped sample: window has expired");
            return;
        }

        let round_trip_time = m2 - m0;
        let one_way_delay = round_trip_time / 2;
        // Derive our realtime at the pong from the window anchor rather
        // than reading the wall clock, so a wall-clock jump after the
        // anchor cannot corrupt the offset estimate.
        let t2 = self.window.realtime + (m2 - self.window.monotonic) as i64;
        let clock_offset = t1 + one_way_delay as i64 - t2;

        tracing::debug!(
            peer,
            round_trip_time = %SignedDuration(round_trip_time as i64),
            clock_offset = %SignedDuration(clock_offset),
            "learned sample"
        );

        let sample = Sample {
            clock_offset,
            one_way_delay,
        };
        let better = match self.window.sources[peer as usize] {
            // Ties go to the newer sample: an equal delay carries
            // fresher offset information at the same uncertainty.
            Some(existing) => sample.one_way_delay <= existing.one_way_delay,
            None => true,
        };
        if better {
            self.window.sources[peer as usize] = Some(sample);
        }
        self.window.learned = true;
    }

    /// Advance time and drive synchronization. The host calls this once
    /// per logical tick, and at least once every `window_min`.
    pub fn tick(&mut self) {
        self.time.tick();
        self.synchronize();

        // A synchronized epoch that has outlived `epoch_max` without a
        // replacement is past safe drift bounds.
        if self.current.synchronized.is_some()
            && self.current.elapsed(&self.time) >= self.config.epoch_max_ns()
        {
            tracing::error!(
                replica = self.replica,
                epoch_age = %SignedDuration(self.current.elapsed(&self.time) as i64),
                "synchronized epoch expired without replacement, cluster time lost"
            );
            self.current.reset(self.replica, &self.time);
        }
    }

    /// Monotonic reading, for stamping outgoing pings and incoming
    /// pongs.
    pub fn monotonic(&self) -> u64 {
        self.time.monotonic()
    }

    /// Wall clock preferring synchronized cluster time.
    ///
    /// For replying to pings only. State-machine timestamps must come
    /// from [`Clock::realtime_synchronized`], which refuses rather than
    /// falling back to the raw OS clock.
    pub fn realtime(&self) -> i64 {
        self.realtime_synchronized()
            .unwrap_or_else(|| self.time.realtime())
    }

    /// The OS wall clock clamped into the agreed cluster interval, or
    /// `None` while no agreement is installed.
    ///
    /// The returned timestamp is never outside the interval a majority
    /// of the cluster agreed on, and is exactly the OS wall clock
    /// whenever that clock already sits within the interval.
    pub fn realtime_synchronized(&self) -> Option<i64> {
        let interval = self.current.synchronized?;
        let elapsed = self.current.elapsed(&self.time) as i64;
        let lower = self.current.realtime + elapsed + interval.lower_bound;
        let upper = self.current.realtime + elapsed + interval.upper_bound;
        Some(self.time.realtime().clamp(lower, upper))
    }

    /// Whether a synchronized interval currently serves queries.
    pub fn is_synchronized(&self) -> bool {
        self.current.synchronized.is_some()
    }

    /// Number of sources with an accepted sample in the collecting
    /// window, ourselves included.
    pub fn window_sources_sampled(&self) -> usize {
        self.window.sources_sampled()
    }

    /// Our replica index.
    pub fn replica(&self) -> u8 {
        self.replica
    }

    /// The configured tunables.
    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    /// The underlying time source.
    pub fn time(&self) -> &T {
        &self.time
    }

    /// Mutable access to the time source, for hosts that model drift or
    /// jumps (simulation).
    pub fn time_mut(&mut self) -> &mut T {
        &mut self.time
    }

    /// Attempt to converge the window onto a majority interval and, on
    /// success, promote it to serve queries.
    fn synchronize(&mut self) {
        // The window is only ever promoted through this path.
        assert!(self.window.synchronized.is_none());

        let elapsed = self.window.elapsed(&self.time);
        if elapsed < self.config.window_min_ns() {
            // Insufficient observation time.
            return;
        }
        if elapsed >= self.config.window_max_ns() {
            tracing::warn!(
                replica = self.replica,
                elapsed = %SignedDuration(elapsed as i64),
                sources_sampled = self.window.sources_sampled(),
                "synchronization window expired without agreement"
            );
            self.window.reset(self.replica, &self.time);
            return;
        }
        if !self.window.learned {
            // No new information since the last attempt.
            return;
        }

        // Start permissive so a majority can be found at all, then
        // tighten: halve the tolerance while a majority still agrees,
        // keeping the tightest interval that held.
        let mut tolerance = self.config.offset_tolerance_max_ns();
        let mut terminating = false;
        for _ in 0..64 {
            self.tuples.clear();
            for (source, sample) in self.window.sources.iter().enumerate() {
                let Some(sample) = sample else { continue };
                let source = source as u8;
                let radius = (sample.one_way_delay + tolerance) as i64;
                self.tuples.push(Tuple {
                    source,
                    offset: sample.clock_offset - radius,
                    bound: Bound::Lower,
                });
                self.tuples.push(Tuple {
                    source,
                    offset: sample.clock_offset + radius,
                    bound: Bound::Upper,
                });
            }

            let interval = marzullo::smallest_interval(&mut self.tuples);
            let majority = interval.sources_true > self.window.sources.len() as u8 / 2;
            if !majority {
                // Keep whatever tighter interval held in earlier rounds.
                break;
            }
            self.window.synchronized = Some(interval);

            if terminating {
                break;
            }
            tolerance /= 2;
            if tolerance == 0 {
                terminating = true;
            }
        }

        self.window.learned = false;
        if self.window.synchronized.is_none() {
            return;
        }

        // Promote: the window becomes the epoch serving queries, and
        // the replaced epoch re-anchors to begin collecting afresh. The
        // swap happens between two calls on the host thread, so no
        // query observes a torn state.
        let previous = self.current.synchronized;
        std::mem::swap(&mut self.current, &mut self.window);
        self.window.reset(self.replica, &self.time);
        self.after_synchronization(previous);
    }

    fn after_synchronization(&self, previous: Option<marzullo::Interval>) {
        let interval = self
            .current
            .synchronized
            .expect("promoted epoch must be synchronized");

        tracing::debug!(
            replica = self.replica,
            truechimers = interval.sources_true,
            cluster = self.current.sources.len(),
            lower = %SignedDuration(interval.lower_bound),
            upper = %SignedDuration(interval.upper_bound),
            accuracy = %SignedDuration(interval.upper_bound - interval.lower_bound),
            "synchronized"
        );
        if let Some(previous) = previous {
            tracing::debug!(
                replica = self.replica,
                previous_lower = %SignedDuration(previous.lower_bound),
                previous_upper = %SignedDuration(previous.upper_bound),
                "replaced synchronized interval"
            );
        }

        let elapsed = self.current.elapsed(&self.time) as i64;
        let system = self.time.realtime();
        let lower = self.current.realtime + elapsed + interval.lower_bound;
        let upper = self.current.realtime + elapsed + interval.upper_bound;
        if system < lower {
            tracing::warn!(
                replica = self.replica,
                behind = %SignedDuration(lower - system),
                "system clock is behind cluster time"
            );
        } else if system > upper {
            tracing::warn!(
                replica = self.replica,
                ahead = %SignedDuration(system - upper),
                "system clock is ahead of cluster time"
            );
        }
    }
}
