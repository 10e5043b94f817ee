//! Deterministic cluster runner.
//!
//! Plays the synchronizer's out-of-scope collaborators — transport,
//! ping timers, the event loop — so whole clusters can be driven tick
//! by tick from a seed. Replicas advance in lockstep; packets travel
//! through a seeded latency/loss model and land as `learn` calls on
//! the destination clock.

use crate::config::{SimulationConfig, SimulationError};
use crate::network::SimulatedNetwork;
use crate::report::{ReplicaReport, SyncReport};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::time::Duration;
use tempo_clock::{Clock, DeterministicTimeSource};
use tracing::info;

/// A ping or its reply, in flight between two replicas.
#[derive(Debug, Clone, Copy)]
enum Payload {
    /// `m0` is the sender's monotonic reading when the ping left.
    Ping { m0: u64 },
    /// Echoes the ping's `m0`; `t1` is the responder's realtime reply.
    Pong { m0: u64, t1: i64 },
}

#[derive(Debug, Clone, Copy)]
struct Packet {
    from: u8,
    to: u8,
    payload: Payload,
}

/// One replica's host state.
struct Replica {
    clock: Clock<DeterministicTimeSource>,

    /// Initial wall-clock skew, in nanoseconds.
    skew: i64,

    /// Wall-clock drift rate, in parts per million.
    drift_ppm: i32,

    /// Drift applied to the wall clock each tick, in nanoseconds.
    drift_per_tick: i64,
}

/// Drives a simulated cluster of synchronizing replicas.
pub struct SimulationRunner {
    config: SimulationConfig,
    replicas: Vec<Replica>,
    network: SimulatedNetwork,

    /// In-flight packets keyed by (delivery tick, sequence number), so
    /// iteration order is deterministic.
    in_flight: BTreeMap<(u64, u64), Packet>,
    sequence: u64,

    /// Ticks simulated so far.
    now: u64,

    ticks_per_ping: u64,
}

impl SimulationRunner {
    /// Build a cluster from the configuration.
    ///
    /// Each replica draws its initial skew and drift rate from the
    /// seeded RNG; the network draws its own decisions from an
    /// independent stream of the same seed so that changing one knob
    /// does not reshuffle the other.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let network = SimulatedNetwork::new(config.network.clone(), config.seed.wrapping_add(1));
        let tick = config.tick.as_nanos() as u64;

        let mut replicas = Vec::with_capacity(config.replica_count as usize);
        for replica in 0..config.replica_count {
            let max_skew = config.max_skew.as_nanos() as i64;
            let skew = if max_skew > 0 {
                rng.gen_range(-max_skew..=max_skew)
            } else {
                0
            };
            let max_drift = config.max_drift_ppm as i32;
            let drift_ppm = if max_drift > 0 {
                rng.gen_range(-max_drift..=max_drift)
            } else {
                0
            };
            let drift_per_tick = tick as i64 * drift_ppm as i64 / 1_000_000;

            let time = DeterministicTimeSource::new(tick).with_epoch(skew);
            let clock = Clock::new(config.clock.clone(), config.replica_count, replica, time);
            replicas.push(Replica {
                clock,
                skew,
                drift_ppm,
                drift_per_tick,
            });
        }

        info!(
            replica_count = config.replica_count,
            seed = config.seed,
            "simulated cluster created"
        );

        let ticks_per_ping = config.ticks_per_ping();
        Ok(Self {
            config,
            replicas,
            network,
            in_flight: BTreeMap::new(),
            sequence: 0,
            now: 0,
            ticks_per_ping,
        })
    }

    /// Advance the whole cluster by one tick.
    pub fn step(&mut self) {
        self.now += 1;

        // Every replica's clock advances in lockstep, each dragging its
        // own wall clock by its drift rate.
        for replica in &mut self.replicas {
            if replica.drift_per_tick != 0 {
                replica.clock.time_mut().adjust_epoch(replica.drift_per_tick);
            }
            replica.clock.tick();
        }

        // Deliver everything due this tick, in deterministic order.
        while let Some((&key, _)) = self.in_flight.iter().next() {
            if key.0 > self.now {
                break;
            }
            let packet = self.in_flight.remove(&key).expect("peeked key must exist");
            self.deliver(packet);
        }

        // Ping timers fire cluster-wide on the same cadence.
        if self.now % self.ticks_per_ping == 0 {
            for from in 0..self.replicas.len() as u8 {
                let m0 = self.replicas[from as usize].clock.monotonic();
                for to in 0..self.replicas.len() as u8 {
                    if to == from {
                        continue;
                    }
                    self.send(Packet {
                        from,
                        to,
                        payload: Payload::Ping { m0 },
                    });
                }
            }
        }
    }

    /// Run for a span of simulated time.
    pub fn run_for(&mut self, duration: Duration) {
        let ticks = (duration.as_nanos() / self.config.tick.as_nanos()) as u64;
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Summarize the cluster's state at the current tick.
    pub fn report(&self) -> SyncReport {
        let tick = self.config.tick.as_nanos() as u64;
        SyncReport {
            ticks: self.now,
            reference: (self.now * tick) as i64,
            replicas: self
                .replicas
                .iter()
                .map(|replica| ReplicaReport {
                    replica: replica.clock.replica(),
                    skew: replica.skew,
                    drift_ppm: replica.drift_ppm,
                    synchronized_time: replica.clock.realtime_synchronized(),
                })
                .collect(),
            packets_dropped: self.network.dropped(),
        }
    }

    /// Ticks simulated so far.
    pub fn now_ticks(&self) -> u64 {
        self.now
    }

    /// A replica's clock, for direct inspection in tests.
    pub fn clock(&self, replica: u8) -> &Clock<DeterministicTimeSource> {
        &self.replicas[replica as usize].clock
    }

    fn deliver(&mut self, packet: Packet) {
        match packet.payload {
            Payload::Ping { m0 } => {
                // The receiver stamps its synchronized-preferred
                // realtime into the pong and echoes m0.
                let t1 = self.replicas[packet.to as usize].clock.realtime();
                self.send(Packet {
                    from: packet.to,
                    to: packet.from,
                    payload: Payload::Pong { m0, t1 },
                });
            }
            Payload::Pong { m0, t1 } => {
                let clock = &mut self.replicas[packet.to as usize].clock;
                let m2 = clock.monotonic();
                clock.learn(packet.from, m0, t1, m2);
            }
        }
    }

    fn send(&mut self, packet: Packet) {
        let Some(delay) = self.network.delay() else {
            // Dropped by the loss model.
            return;
        };
        let tick = self.config.tick.as_nanos() as u64;
        let delay = delay.as_nanos() as u64;
        let delay_ticks = ((delay + tick - 1) / tick).max(1);
        self.sequence += 1;
        self.in_flight
            .insert((self.now + delay_ticks, self.sequence), packet);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;

    #[test]
    fn test_cluster_converges() {
        let config = SimulationConfig::new(5)
            .with_seed(7)
            .with_max_skew(Duration::from_millis(50))
            .with_max_drift_ppm(100);
        let mut runner = SimulationRunner::new(config).unwrap();
        runner.run_for(Duration::from_secs(10));

        let report = runner.report();
        assert_eq!(report.synchronized_count(), 5);
        // Readings agree with each other and with reference time to
        // within the skew plus the network's uncertainty.
        assert!(report.spread().unwrap() <= 300 * 1_000_000);
        assert!(report.max_absolute_error().unwrap() <= 200 * 1_000_000);
    }

    #[test]
    fn test_same_seed_reproduces_the_run() {
        let config = SimulationConfig::new(3).with_seed(42);
        let mut a = SimulationRunner::new(config.clone()).unwrap();
        let mut b = SimulationRunner::new(config).unwrap();

        a.run_for(Duration::from_secs(5));
        b.run_for(Duration::from_secs(5));
        assert_eq!(a.report(), b.report());
    }

    #[test]
    fn test_lossy_network_still_converges() {
        let config = SimulationConfig::new(3)
            .with_seed(11)
            .with_network(NetworkConfig::default().with_packet_loss(0.2));
        let mut runner = SimulationRunner::new(config).unwrap();
        runner.run_for(Duration::from_secs(10));

        let report = runner.report();
        assert_eq!(report.synchronized_count(), 3);
        assert!(report.packets_dropped > 0);
    }

    #[test]
    fn test_single_replica_cluster_synchronizes() {
        let config = SimulationConfig::new(1).with_seed(1);
        let mut runner = SimulationRunner::new(config).unwrap();
        runner.run_for(Duration::from_secs(5));

        assert_eq!(runner.report().synchronized_count(), 1);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = SimulationConfig::new(0);
        assert!(SimulationRunner::new(config).is_err());
    }
}
