//! Signed-duration rendering for log diagnostics.

use std::fmt;

/// A signed nanosecond quantity with a human-readable [`fmt::Display`].
///
/// Clock offsets and interval bounds are signed: a peer's clock may run
/// ahead of or behind ours, and log lines need to say which. Renders the
/// largest fitting unit with at most one fractional digit, e.g. `500ms`,
/// `-1.5s`, `250us`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedDuration(pub i64);

impl fmt::Display for SignedDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [(u64, &str); 3] = [(1_000_000_000, "s"), (1_000_000, "ms"), (1_000, "us")];

        if self.0 < 0 {
            write!(f, "-")?;
        }
        let ns = self.0.unsigned_abs();
        for (scale, suffix) in UNITS {
            if ns >= scale {
                let whole = ns / scale;
                let tenths = (ns % scale) * 10 / scale;
                return if tenths == 0 {
                    write!(f, "{whole}{suffix}")
                } else {
                    write!(f, "{whole}.{tenths}{suffix}")
                };
            }
        }
        write!(f, "{ns}ns")
    }
}
