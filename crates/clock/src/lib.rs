//! Fault-tolerant cluster clock synchronization.
//!
//! Each replica runs one [`Clock`] that fuses ping/pong round-trip
//! samples from its peers into a bounded interval of "cluster time"
//! using Marzullo's intersection algorithm. The replicated state
//! machine stamps operations with a wall-clock value that is provably
//! inside an interval a majority of the cluster agrees on, even while
//! individual clocks drift, jump, or lie.
//!
//! # Protocol Overview
//!
//! 1. **Sampling**: On each pong, the host hands the clock a round
//!    trip: our monotonic send and receive times plus the peer's
//!    realtime reply. Half the round trip bounds the sample's
//!    uncertainty; only the best sample per peer is kept.
//!
//! 2. **Windowing**: Samples accumulate in a `window` epoch anchored to
//!    a single (monotonic, realtime) reading. Windows that observe too
//!    briefly cannot agree; windows that observe too long are stale and
//!    are discarded.
//!
//! 3. **Agreement**: Each tick, the clock searches for the tightest
//!    offset interval that a strict majority of sources still covers,
//!    starting from a permissive tolerance and halving it until the
//!    majority breaks.
//!
//! 4. **Promotion and expiry**: An agreed window is promoted to the
//!    `current` epoch, which alone serves queries until it is either
//!    replaced by the next agreement or expires.
//!
//! # Architecture
//!
//! ```text
//! host event loop
//!    │
//!    │  learn(peer, m0, t1, m2)      ◄── pong received
//!    │  tick()                       ◄── tick timer
//!    ▼
//! Clock ──► window epoch ──(majority agreement)──► current epoch
//!                                                     │
//!    state machine ◄── realtime_synchronized() ◄── clamp
//! ```
//!
//! The synchronizer is:
//! - **Synchronous**: no async, no blocking, constant work per call
//!   outside the `O(N log N)` interval search.
//! - **Deterministic**: generic over [`TimeSource`], so tests and
//!   simulation drive it with logical time.
//! - **Allocation-free after construction**: source vectors and the
//!   solver's scratch buffer are sized once from the cluster size.
//!
//! All I/O belongs to the host: message transport, timers, and the
//! consumers of synchronized timestamps live outside this crate.

mod clock;
mod config;
mod epoch;
mod fmt;
mod marzullo;
mod time;

pub use clock::Clock;
pub use config::{ClockConfig, ConfigError};
pub use epoch::Sample;
pub use fmt::SignedDuration;
pub use marzullo::{smallest_interval, Bound, Interval, Tuple};
pub use time::{DeterministicTimeSource, SystemTimeSource, TimeSource};
