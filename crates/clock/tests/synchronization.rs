//! End-to-end synchronization scenarios driven by deterministic time.
//!
//! Each test plays the host: it delivers pong samples via `learn`,
//! advances logical time via `tick`, and observes only the public query
//! surface, exactly as a replica's event loop would.

use std::time::Duration;
use tempo_clock::{Clock, ClockConfig, DeterministicTimeSource};

const SECOND: u64 = 1_000_000_000;
const MILLISECOND: i64 = 1_000_000;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn test_config() -> ClockConfig {
    ClockConfig::default()
        .with_offset_tolerance_max(Duration::from_millis(100))
        .with_window_min(Duration::from_secs(3))
        .with_window_max(Duration::from_secs(20))
        .with_epoch_max(Duration::from_secs(60))
}

/// Replica 0 of a three-replica cluster, one simulated second per tick.
fn test_clock() -> Clock<DeterministicTimeSource> {
    Clock::new(test_config(), 3, 0, DeterministicTimeSource::new(SECOND))
}

/// A pong claiming the peer runs 500ms ahead, observed over a 100ms
/// round trip: offset = 550 + 50 - 100 = 500ms, delay = 50ms.
fn agreeing_pong(clock: &mut Clock<DeterministicTimeSource>, peer: u8) {
    clock.learn(peer, 0, 550 * MILLISECOND, 100_000_000);
}

#[test]
fn test_happy_path() {
    init_tracing();
    let mut clock = test_clock();

    agreeing_pong(&mut clock, 1);
    agreeing_pong(&mut clock, 2);
    for _ in 0..3 {
        clock.tick();
    }

    // The cluster interval sits 450..550ms ahead of our wall clock; the
    // raw reading of 3s falls below it and clamps to the lower bound.
    let raw = 3 * SECOND as i64;
    let synchronized = clock.realtime_synchronized().unwrap();
    assert_eq!(synchronized, raw + 450 * MILLISECOND);
    assert!(clock.is_synchronized());
}

#[test]
fn test_synchronized_time_stays_in_bounds() {
    init_tracing();
    let mut clock = test_clock();

    agreeing_pong(&mut clock, 1);
    agreeing_pong(&mut clock, 2);
    for _ in 0..3 {
        clock.tick();
    }

    // As time advances without new agreements, the clamp keeps every
    // reading inside the interval projected from the anchor.
    for tick in 4..20 {
        clock.tick();
        let raw = tick * SECOND as i64;
        let synchronized = clock.realtime_synchronized().unwrap();
        assert!(synchronized >= raw + 450 * MILLISECOND);
        assert!(synchronized <= raw + 550 * MILLISECOND);
    }
}

#[test]
fn test_self_loopback_is_rejected() {
    init_tracing();
    let mut clock = test_clock();

    // A routing fault delivers our own pong back to us.
    clock.learn(0, 0, 550 * MILLISECOND, 100_000_000);
    assert_eq!(clock.window_sources_sampled(), 1);

    for _ in 0..5 {
        clock.tick();
    }
    assert!(clock.realtime_synchronized().is_none());
}

#[test]
fn test_pre_window_straggler_is_dropped() {
    init_tracing();
    let mut clock = test_clock();

    // Tick past window_max so the window re-anchors at 20s.
    for _ in 0..21 {
        clock.tick();
    }

    // A pong whose round trip predates the new anchor must not count.
    clock.learn(1, 5 * SECOND, 550 * MILLISECOND, 6 * SECOND);
    assert_eq!(clock.window_sources_sampled(), 1);
}

#[test]
fn test_window_timeout_discards_samples() {
    init_tracing();
    let mut clock = test_clock();

    // One peer far outside any agreement with us: sampled, never
    // synchronized.
    clock.learn(1, 0, 5_000 * MILLISECOND, 100_000_000);
    assert_eq!(clock.window_sources_sampled(), 2);

    for _ in 0..20 {
        clock.tick();
    }

    assert_eq!(clock.window_sources_sampled(), 1);
    assert!(!clock.is_synchronized());
    assert!(clock.realtime_synchronized().is_none());
}

#[test]
fn test_epoch_expiry_loses_cluster_time() {
    init_tracing();
    let mut clock = test_clock();

    agreeing_pong(&mut clock, 1);
    agreeing_pong(&mut clock, 2);
    for _ in 0..3 {
        clock.tick();
    }
    assert!(clock.realtime_synchronized().is_some());

    // Starve the clock of samples. The synchronized epoch survives
    // until epoch_max, then expires.
    for _ in 4..60 {
        clock.tick();
        assert!(clock.realtime_synchronized().is_some());
    }
    clock.tick();
    assert!(clock.realtime_synchronized().is_none());
    assert!(!clock.is_synchronized());
}

#[test]
fn test_majority_outvotes_a_liar() {
    init_tracing();
    // Five replicas: three peers agree on +500ms, one peer claims +5s.
    let mut clock = Clock::new(test_config(), 5, 0, DeterministicTimeSource::new(SECOND));
    agreeing_pong(&mut clock, 1);
    agreeing_pong(&mut clock, 2);
    agreeing_pong(&mut clock, 3);
    clock.learn(4, 0, 5_050 * MILLISECOND, 100_000_000);

    for _ in 0..3 {
        clock.tick();
    }

    // The three truechimers are a strict majority of five; the liar's
    // interval is simply outvoted, and the agreed bounds tighten to
    // the honest samples' own uncertainty: [450ms, 550ms].
    let raw = 3 * SECOND as i64;
    assert_eq!(
        clock.realtime_synchronized(),
        Some(raw + 450 * MILLISECOND)
    );
}

#[test]
fn test_resynchronization_replaces_the_epoch() {
    init_tracing();
    let mut clock = test_clock();

    agreeing_pong(&mut clock, 1);
    agreeing_pong(&mut clock, 2);
    for _ in 0..3 {
        clock.tick();
    }
    assert!(clock.is_synchronized());

    // A second round of samples lands in the fresh window. The peers
    // now report a slightly larger offset; after the next agreement the
    // interval follows them.
    let m0 = 4 * SECOND;
    let m2 = m0 + 100_000_000;
    // Peer realtime at reply: our anchor time plus 600ms offset plus
    // the one-way delay puts the midpoint estimate at +600ms.
    let t1 = m2 as i64 + 600 * MILLISECOND - 50 * MILLISECOND;
    clock.learn(1, m0, t1, m2);
    clock.learn(2, m0, t1, m2);
    for _ in 0..4 {
        clock.tick();
    }

    // The second window (anchored at 3s) agreed at tick 6 on an
    // interval of [550ms, 650ms]; the raw reading clamps to its lower
    // bound.
    let raw = 7 * SECOND as i64;
    assert_eq!(
        clock.realtime_synchronized(),
        Some(raw + 550 * MILLISECOND)
    );
}
