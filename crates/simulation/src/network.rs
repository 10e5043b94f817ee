//! Simulated network: per-packet latency and loss decisions.

use crate::config::NetworkConfig;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

/// Samples per-packet delivery outcomes from a seeded RNG.
///
/// Pure decision logic: the runner owns the delivery queue and the
/// replicas; this type only answers whether a packet survives and how
/// long it takes to arrive.
#[derive(Debug)]
pub struct SimulatedNetwork {
    config: NetworkConfig,
    rng: ChaCha8Rng,
    dropped: u64,
}

impl SimulatedNetwork {
    pub fn new(config: NetworkConfig, seed: u64) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            dropped: 0,
        }
    }

    /// Decide the one-way delivery delay for a packet, or `None` if the
    /// loss model drops it.
    pub fn delay(&mut self) -> Option<Duration> {
        if self.config.packet_loss > 0.0 && self.rng.gen_bool(self.config.packet_loss) {
            self.dropped += 1;
            return None;
        }
        let min = self.config.latency_min.as_nanos() as u64;
        let max = self.config.latency_max.as_nanos() as u64;
        let latency = if max > min {
            self.rng.gen_range(min..=max)
        } else {
            min
        };
        Some(Duration::from_nanos(latency))
    }

    /// Packets dropped by the loss model so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
