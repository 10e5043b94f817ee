//! Tempo Simulator CLI
//!
//! Runs a seeded cluster of clock-synchronizing replicas and prints a
//! convergence report.
//!
//! # Example
//!
//! ```bash
//! # Three replicas, default network, 30 simulated seconds
//! tempo-sim
//!
//! # A larger, lossier cluster with badly skewed clocks
//! tempo-sim -r 7 -d 120 --packet-loss 0.1 --max-skew-ms 2000 --seed 7
//! ```

use clap::Parser;
use std::time::Duration;
use tempo_simulation::{NetworkConfig, SimulationConfig, SimulationRunner};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Tempo Simulator
///
/// Drives a simulated cluster of replicas synchronizing their clocks
/// over a lossy network. Fully deterministic: the same seed reproduces
/// the same run.
#[derive(Parser, Debug)]
#[command(name = "tempo-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of replicas
    #[arg(short = 'r', long, default_value = "3")]
    replicas: u8,

    /// Simulated duration in seconds
    #[arg(short = 'd', long, default_value = "30")]
    duration: u64,

    /// Random seed
    #[arg(long, default_value = "12345")]
    seed: u64,

    /// Minimum one-way latency in milliseconds
    #[arg(long, default_value = "1")]
    latency_min_ms: u64,

    /// Maximum one-way latency in milliseconds
    #[arg(long, default_value = "20")]
    latency_max_ms: u64,

    /// Packet loss probability (0.0-1.0)
    #[arg(long, default_value = "0.02")]
    packet_loss: f64,

    /// Largest initial wall-clock skew in milliseconds
    #[arg(long, default_value = "200")]
    max_skew_ms: u64,

    /// Largest wall-clock drift in parts per million
    #[arg(long, default_value = "100")]
    max_drift_ppm: u32,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!(
        replicas = args.replicas,
        duration_secs = args.duration,
        seed = args.seed,
        packet_loss = args.packet_loss,
        max_skew_ms = args.max_skew_ms,
        max_drift_ppm = args.max_drift_ppm,
        "starting simulation"
    );

    let network = NetworkConfig::default()
        .with_latency(
            Duration::from_millis(args.latency_min_ms),
            Duration::from_millis(args.latency_max_ms),
        )
        .with_packet_loss(args.packet_loss);

    let config = SimulationConfig::new(args.replicas)
        .with_seed(args.seed)
        .with_network(network)
        .with_max_skew(Duration::from_millis(args.max_skew_ms))
        .with_max_drift_ppm(args.max_drift_ppm);

    let mut runner = SimulationRunner::new(config).expect("failed to create simulation");

    runner.run_for(Duration::from_secs(args.duration));
    runner.report().print_summary();
}
