//! Synchronizer configuration.

use std::time::Duration;
use thiserror::Error;

/// Clock synchronizer configuration.
///
/// The defaults suit LAN-class deployments. Deployments with long-haul
/// links should widen the tolerance and the windows together: a window
/// that closes before enough round trips complete can never agree.
#[derive(Debug, Clone)]
pub struct ClockConfig {
    /// Initial per-source slack for the interval search.
    ///
    /// The search starts this permissive so that a majority can be
    /// found at all, then repeatedly halves the slack while a majority
    /// still agrees.
    pub offset_tolerance_max: Duration,

    /// Maximum age of a synchronized epoch before it is discarded.
    ///
    /// Past this age unrefreshed clocks have drifted beyond safe
    /// bounds and the interval can no longer be trusted.
    pub epoch_max: Duration,

    /// Minimum window observation time before a synchronization attempt.
    pub window_min: Duration,

    /// Maximum window age before its samples are considered stale.
    pub window_max: Duration,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            offset_tolerance_max: Duration::from_secs(10),
            epoch_max: Duration::from_secs(60),
            window_min: Duration::from_secs(2),
            window_max: Duration::from_secs(20),
        }
    }
}

impl ClockConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial per-source tolerance.
    pub fn with_offset_tolerance_max(mut self, tolerance: Duration) -> Self {
        self.offset_tolerance_max = tolerance;
        self
    }

    /// Set the maximum synchronized epoch age.
    pub fn with_epoch_max(mut self, epoch_max: Duration) -> Self {
        self.epoch_max = epoch_max;
        self
    }

    /// Set the minimum window observation time.
    pub fn with_window_min(mut self, window_min: Duration) -> Self {
        self.window_min = window_min;
        self
    }

    /// Set the maximum window age.
    pub fn with_window_max(mut self, window_max: Duration) -> Self {
        self.window_max = window_max;
        self
    }

    /// Check that the windows and epoch bounds are mutually consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_min >= self.window_max {
            return Err(ConfigError::WindowBounds {
                window_min: self.window_min,
                window_max: self.window_max,
            });
        }
        if self.epoch_max < self.window_max {
            return Err(ConfigError::EpochBounds {
                epoch_max: self.epoch_max,
                window_max: self.window_max,
            });
        }
        Ok(())
    }

    pub(crate) fn offset_tolerance_max_ns(&self) -> u64 {
        self.offset_tolerance_max.as_nanos() as u64
    }

    pub(crate) fn epoch_max_ns(&self) -> u64 {
        self.epoch_max.as_nanos() as u64
    }

    pub(crate) fn window_min_ns(&self) -> u64 {
        self.window_min.as_nanos() as u64
    }

    pub(crate) fn window_max_ns(&self) -> u64 {
        self.window_max.as_nanos() as u64
    }
}

/// Invalid clock configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("window_min ({window_min:?}) must be shorter than window_max ({window_max:?})")]
    WindowBounds {
        window_min: Duration,
        window_max: Duration,
    },

    #[error("epoch_max ({epoch_max:?}) must be at least window_max ({window_max:?})")]
    EpochBounds {
        epoch_max: Duration,
        window_max: Duration,
    },
}
