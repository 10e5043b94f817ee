//! Run summaries.

use tempo_clock::SignedDuration;

/// Outcome of a simulated cluster run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Ticks simulated.
    pub ticks: u64,

    /// Reference (skew-free) realtime at the end of the run, in
    /// nanoseconds.
    pub reference: i64,

    /// Per-replica outcomes, indexed by replica id.
    pub replicas: Vec<ReplicaReport>,

    /// Packets dropped by the loss model.
    pub packets_dropped: u64,
}

/// One replica's outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaReport {
    pub replica: u8,

    /// Initial wall-clock skew, in nanoseconds.
    pub skew: i64,

    /// Wall-clock drift rate, in parts per million.
    pub drift_ppm: i32,

    /// `realtime_synchronized()` at the end of the run, absent if the
    /// replica never reached (or lost) agreement.
    pub synchronized_time: Option<i64>,
}

impl SyncReport {
    /// Number of replicas holding a synchronized interval.
    pub fn synchronized_count(&self) -> usize {
        self.replicas
            .iter()
            .filter(|replica| replica.synchronized_time.is_some())
            .count()
    }

    /// Largest absolute error against reference time among synchronized
    /// replicas.
    pub fn max_absolute_error(&self) -> Option<i64> {
        self.replicas
            .iter()
            .filter_map(|replica| replica.synchronized_time)
            .map(|time| (time - self.reference).abs())
            .max()
    }

    /// Spread between the fastest and slowest synchronized readings:
    /// how far apart the cluster's replicas are from each other.
    pub fn spread(&self) -> Option<i64> {
        let times: Vec<i64> = self
            .replicas
            .iter()
            .filter_map(|replica| replica.synchronized_time)
            .collect();
        Some(times.iter().max()? - times.iter().min()?)
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Synchronization Report ===");
        println!("Ticks simulated:      {}", self.ticks);
        println!(
            "Synchronized:         {}/{}",
            self.synchronized_count(),
            self.replicas.len()
        );
        println!("Packets dropped:      {}", self.packets_dropped);
        if let Some(spread) = self.spread() {
            println!("Cluster spread:       {}", SignedDuration(spread));
        }
        if let Some(error) = self.max_absolute_error() {
            println!("Max reference error:  {}", SignedDuration(error));
        }
        println!();
        for replica in &self.replicas {
            let state = match replica.synchronized_time {
                Some(time) => format!(
                    "synchronized, error {}",
                    SignedDuration(time - self.reference)
                ),
                None => "not synchronized".to_string(),
            };
            println!(
                "replica {}: skew {}, drift {}ppm, {}",
                replica.replica,
                SignedDuration(replica.skew),
                replica.drift_ppm,
                state
            );
        }
    }
}
