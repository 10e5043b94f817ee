//! Marzullo's intersection algorithm.
//!
//! Given candidate offset intervals from several sources, computes the
//! smallest interval contained in the largest number of them. Sources
//! whose intervals are consistent with the result are "truechimers";
//! sources whose intervals fall outside are "falsetickers" and are
//! simply outvoted, which is what makes the synchronizer tolerate peers
//! with broken or lying clocks.
//!
//! The solver is pure integer arithmetic over signed nanoseconds and
//! does not allocate: the caller owns the tuple buffer and the solver
//! sorts it in place.

/// Which end of a source's candidate interval a tuple marks.
///
/// `Lower` orders before `Upper` at the same offset so that two
/// intervals touching at a single point count as overlapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Bound {
    /// The inclusive start of a candidate interval.
    Lower,
    /// The inclusive end of a candidate interval.
    Upper,
}

/// One endpoint of a source's candidate offset interval.
///
/// Each source contributes exactly two tuples: its interval's lower and
/// upper bounds.
#[derive(Debug, Clone, Copy)]
pub struct Tuple {
    /// Index of the source that contributed this endpoint.
    pub source: u8,

    /// Endpoint position in signed nanoseconds.
    pub offset: i64,

    /// Which end of the source's interval this is.
    pub bound: Bound,
}

/// The smallest interval covered by the largest number of sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    /// Inclusive lower bound, in signed nanoseconds.
    pub lower_bound: i64,

    /// Inclusive upper bound, in signed nanoseconds.
    pub upper_bound: i64,

    /// How many distinct sources' intervals contain this interval.
    pub sources_true: u8,
}

/// Compute the smallest interval consistent with the most sources.
///
/// Sorts `tuples` in place by offset (lower bounds before upper bounds
/// on ties), then sweeps left to right maintaining a cover count. Cover
/// can only increase at a lower bound, so every maximal-cover segment
/// starts at one; on equal cover the narrower segment wins.
///
/// An empty input yields the zero interval with no sources.
pub fn smallest_interval(tuples: &mut [Tuple]) -> Interval {
    let mut interval = Interval {
        lower_bound: 0,
        upper_bound: 0,
        sources_true: 0,
    };
    if tuples.is_empty() {
        return interval;
    }

    tuples.sort_unstable_by(|a, b| a.offset.cmp(&b.offset).then(a.bound.cmp(&b.bound)));

    let mut best: usize = 0;
    let mut count: usize = 0;
    for (i, tuple) in tuples.iter().enumerate() {
        match tuple.bound {
            Bound::Lower => {
                count += 1;
                // The cover just reached `count` and holds until the
                // next endpoint. A lower bound is never last: its
                // matching upper bound sorts after it.
                let upper = tuples[i + 1].offset;
                if count > best {
                    best = count;
                    interval.lower_bound = tuple.offset;
                    interval.upper_bound = upper;
                } else if count == best
                    && upper - tuple.offset < interval.upper_bound - interval.lower_bound
                {
                    interval.lower_bound = tuple.offset;
                    interval.upper_bound = upper;
                }
            }
            Bound::Upper => count -= 1,
        }
    }
    assert_eq!(count, 0, "every lower bound must have an upper bound");
    assert!(interval.lower_bound <= interval.upper_bound);

    interval.sources_true = best as u8;
    interval
}
