//! Configuration types for the cluster simulation.

use std::time::Duration;
use tempo_clock::ClockConfig;
use thiserror::Error;

/// Configuration for a simulated cluster run.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Number of replicas in the cluster.
    pub replica_count: u8,

    /// Random seed. The same seed reproduces the same run exactly.
    pub seed: u64,

    /// Synchronizer tunables shared by every replica.
    pub clock: ClockConfig,

    /// Logical duration of one tick.
    pub tick: Duration,

    /// How often each replica pings its peers.
    pub ping_interval: Duration,

    /// Network delivery model.
    pub network: NetworkConfig,

    /// Largest initial wall-clock skew; each replica starts with a
    /// skew drawn uniformly from `[-max_skew, +max_skew]`.
    pub max_skew: Duration,

    /// Largest wall-clock drift per replica, in parts per million of
    /// elapsed time; each replica drifts at a rate drawn uniformly from
    /// `[-max_drift_ppm, +max_drift_ppm]`.
    pub max_drift_ppm: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            replica_count: 3,
            seed: 12345,
            clock: ClockConfig::default(),
            tick: Duration::from_millis(10),
            ping_interval: Duration::from_millis(500),
            network: NetworkConfig::default(),
            max_skew: Duration::from_millis(200),
            max_drift_ppm: 100,
        }
    }
}

impl SimulationConfig {
    /// Create a configuration for `replica_count` replicas.
    pub fn new(replica_count: u8) -> Self {
        Self {
            replica_count,
            ..Self::default()
        }
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the synchronizer tunables.
    pub fn with_clock(mut self, clock: ClockConfig) -> Self {
        self.clock = clock;
        self
    }

    /// Set the tick duration.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Set the ping interval.
    pub fn with_ping_interval(mut self, ping_interval: Duration) -> Self {
        self.ping_interval = ping_interval;
        self
    }

    /// Set the network delivery model.
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    /// Set the largest initial wall-clock skew.
    pub fn with_max_skew(mut self, max_skew: Duration) -> Self {
        self.max_skew = max_skew;
        self
    }

    /// Set the largest per-replica drift rate.
    pub fn with_max_drift_ppm(mut self, max_drift_ppm: u32) -> Self {
        self.max_drift_ppm = max_drift_ppm;
        self
    }

    /// Check that the run is well-formed before building a cluster.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.replica_count == 0 {
            return Err(SimulationError::EmptyCluster);
        }
        if self.tick.is_zero() {
            return Err(SimulationError::ZeroTick);
        }
        if self.ping_interval < self.tick {
            return Err(SimulationError::PingFasterThanTick {
                ping_interval: self.ping_interval,
                tick: self.tick,
            });
        }
        if !(0.0..1.0).contains(&self.network.packet_loss) {
            return Err(SimulationError::PacketLossOutOfRange(
                self.network.packet_loss,
            ));
        }
        if self.network.latency_min > self.network.latency_max {
            return Err(SimulationError::LatencyBounds {
                latency_min: self.network.latency_min,
                latency_max: self.network.latency_max,
            });
        }
        self.clock.validate()?;
        Ok(())
    }

    /// Ticks between ping fan-outs.
    pub(crate) fn ticks_per_ping(&self) -> u64 {
        (self.ping_interval.as_nanos() / self.tick.as_nanos()).max(1) as u64
    }
}

/// One-way packet delivery model.
///
/// Latency is drawn uniformly from `[latency_min, latency_max]` per
/// packet; loss is an independent coin flip per packet.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Fastest possible one-way delivery.
    pub latency_min: Duration,

    /// Slowest possible one-way delivery.
    pub latency_max: Duration,

    /// Probability in `[0, 1)` that a packet is silently dropped.
    pub packet_loss: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            latency_min: Duration::from_millis(1),
            latency_max: Duration::from_millis(20),
            packet_loss: 0.02,
        }
    }
}

impl NetworkConfig {
    /// Set the latency bounds.
    pub fn with_latency(mut self, min: Duration, max: Duration) -> Self {
        self.latency_min = min;
        self.latency_max = max;
        self
    }

    /// Set the packet loss probability.
    pub fn with_packet_loss(mut self, packet_loss: f64) -> Self {
        self.packet_loss = packet_loss;
        self
    }
}

/// Invalid simulation configuration.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("a simulated cluster needs at least one replica")]
    EmptyCluster,

    #[error("the tick duration must be non-zero")]
    ZeroTick,

    #[error("ping_interval ({ping_interval:?}) must be at least one tick ({tick:?})")]
    PingFasterThanTick {
        ping_interval: Duration,
        tick: Duration,
    },

    #[error("packet_loss ({0}) must be within [0, 1)")]
    PacketLossOutOfRange(f64),

    #[error("latency_min ({latency_min:?}) must not exceed latency_max ({latency_max:?})")]
    LatencyBounds {
        latency_min: Duration,
        latency_max: Duration,
    },

    #[error("invalid clock configuration: {0}")]
    Clock(#[from] tempo_clock::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_cluster() {
        let config = SimulationConfig::new(0);
        assert!(matches!(
            config.validate(),
            Err(SimulationError::EmptyCluster)
        ));
    }

    #[test]
    fn test_rejects_inverted_latency() {
        let config = SimulationConfig::default().with_network(
            NetworkConfig::default()
                .with_latency(Duration::from_millis(50), Duration::from_millis(10)),
        );
        assert!(matches!(
            config.validate(),
            Err(SimulationError::LatencyBounds { .. })
        ));
    }

    #[test]
    fn test_rejects_total_packet_loss() {
        let config = SimulationConfig::default()
            .with_network(NetworkConfig::default().with_packet_loss(1.0));
        assert!(matches!(
            config.validate(),
            Err(SimulationError::PacketLossOutOfRange(_))
        ));
    }

    #[test]
    fn test_ticks_per_ping() {
        let config = SimulationConfig::default()
            .with_tick(Duration::from_millis(10))
            .with_ping_interval(Duration::from_millis(500));
        assert_eq!(config.ticks_per_ping(), 50);
    }
}
