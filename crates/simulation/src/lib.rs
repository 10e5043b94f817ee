//! Deterministic cluster simulation for the clock synchronizer.
//!
//! This crate plays the synchronizer's external collaborators — the
//! transport, the ping timers, the event loop — entirely in process,
//! so that whole clusters of synchronizing replicas can be driven from
//! a seed and inspected tick by tick.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SimulationRunner                       │
//! │               (single thread, tick-stepped)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │   ┌───────────┐    ┌───────────┐    ┌───────────┐           │
//! │   │ Replica 0 │    │ Replica 1 │    │ Replica 2 │  ...      │
//! │   │  Clock +  │    │  Clock +  │    │  Clock +  │           │
//! │   │ skew/drift│    │ skew/drift│    │ skew/drift│           │
//! │   └─────┬─────┘    └─────┬─────┘    └─────┬─────┘           │
//! │         │                │                │                 │
//! │         └──────── ping / pong packets ────┘                 │
//! │                          │                                  │
//! │                ┌─────────▼─────────┐                        │
//! │                │ SimulatedNetwork  │                        │
//! │                │ (seeded latency + │                        │
//! │                │  loss decisions)  │                        │
//! │                └───────────────────┘                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Determinism is the point: the same seed reproduces the same packet
//! delays, the same drops, the same skews and drift rates, and
//! therefore the same synchronization outcomes, which makes failures
//! replayable.

mod config;
mod network;
mod report;
mod runner;

pub use config::{NetworkConfig, SimulationConfig, SimulationError};
pub use network::SimulatedNetwork;
pub use report::{ReplicaReport, SyncReport};
pub use runner::SimulationRunner;
