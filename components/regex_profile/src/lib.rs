//! Execution profiling for compiled regular expressions.
//!
//! Each compiled regex carries a [`RegexProfile`] that counts executions,
//! successful matches and capture-group accesses, and tracks how much of
//! the searched input a successful match covers on average. At periodic
//! trip points the profile is consulted to decide whether the expression
//! would be better served by eager capture-group matching.
//!
//! Counters are atomic; profiles are shared across threads without locks.
//! The numbers steer a heuristic, so relaxed ordering and small races
//! between counters are acceptable.
//!
//! # Examples
//!
//! ```
//! use regex_profile::RegexProfile;
//!
//! let profile = RegexProfile::new();
//! profile.inc_calls();
//! profile.inc_matches();
//! profile.inc_capture_group_accesses();
//! profile.add_matched_portion_of_search_space(0.8);
//! assert!(profile.should_use_eager_matching());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

/// Evaluate the eager-matching heuristic every this many executions.
const TRIP_INTERVAL: u64 = 800;

/// Minimum fraction of executions that must match.
const MATCH_RATIO_THRESHOLD: f64 = 0.5;

/// Minimum fraction of matches whose capture groups are accessed.
const CG_ACCESS_RATIO_THRESHOLD: f64 = 0.5;

/// Minimum average portion of the search space a match covers.
const MATCHED_PORTION_THRESHOLD: f64 = 0.4;

/// Runtime execution profile of one compiled regular expression.
///
/// All counters grow monotonically. The matched-portion average is an
/// incremental mean stored as `f64` bits in an atomic word and updated
/// with a compare-exchange loop.
#[derive(Debug, Default)]
pub struct RegexProfile {
    calls: AtomicU64,
    matches: AtomicU64,
    capture_group_accesses: AtomicU64,
    /// f64 bits of the running mean matched portion
    avg_matched_portion: AtomicU64,
}

impl RegexProfile {
    /// Creates an empty profile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one execution of the expression.
    pub fn inc_calls(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one successful match.
    pub fn inc_matches(&self) {
        self.matches.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one access to a match's capture groups.
    pub fn inc_capture_group_accesses(&self) {
        self.capture_group_accesses.fetch_add(1, Ordering::Relaxed);
    }

    /// Folds one sample into the running mean matched portion.
    ///
    /// Must follow at least one capture-group access; the sample weight is
    /// the current access count.
    pub fn add_matched_portion_of_search_space(&self, portion: f64) {
        let accesses = self.capture_group_accesses.load(Ordering::Relaxed);
        debug_assert!(accesses > 0, "sample recorded before any capture group access");
        if accesses == 0 {
            return;
        }
        let mut current = self.avg_matched_portion.load(Ordering::Relaxed);
        loop {
            let mean = f64::from_bits(current);
            let next = mean + (portion - mean) / accesses as f64;
            match self.avg_matched_portion.compare_exchange_weak(
                current,
                next.to_bits(),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    /// Total executions recorded so far.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Fraction of executions that produced a match.
    pub fn match_ratio(&self) -> f64 {
        let calls = self.calls.load(Ordering::Relaxed);
        if calls == 0 {
            return 0.0;
        }
        self.matches.load(Ordering::Relaxed) as f64 / calls as f64
    }

    /// Fraction of matches whose capture groups were accessed.
    pub fn capture_group_access_ratio(&self) -> f64 {
        let matches = self.matches.load(Ordering::Relaxed);
        if matches == 0 {
            return 0.0;
        }
        self.capture_group_accesses.load(Ordering::Relaxed) as f64 / matches as f64
    }

    /// Running mean of the matched portion of the search space.
    pub fn avg_matched_portion(&self) -> f64 {
        f64::from_bits(self.avg_matched_portion.load(Ordering::Relaxed))
    }

    /// Returns whether the current execution lands on a trip point.
    ///
    /// Trip points fall on every [`TRIP_INTERVAL`]th call; call zero is
    /// never a trip point.
    pub fn at_evaluation_trip_point(&self) -> bool {
        let calls = self.calls.load(Ordering::Relaxed);
        calls > 0 && calls % TRIP_INTERVAL == 0
    }

    /// The eager-matching heuristic.
    ///
    /// Eager matching pays off when the expression usually matches, the
    /// capture groups are usually consumed, and a match covers a large
    /// part of the input. All three must hold.
    pub fn should_use_eager_matching(&self) -> bool {
        let eager = self.match_ratio() > MATCH_RATIO_THRESHOLD
            && self.capture_group_access_ratio() > CG_ACCESS_RATIO_THRESHOLD
            && self.avg_matched_portion() > MATCHED_PORTION_THRESHOLD;
        debug!(
            match_ratio = self.match_ratio(),
            cg_access_ratio = self.capture_group_access_ratio(),
            avg_matched_portion = self.avg_matched_portion(),
            eager,
            "regex profile evaluated"
        );
        eager
    }
}

impl fmt::Display for RegexProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "calls: {}, matches: {}, cg accesses: {}, avg matched portion: {}",
            self.calls.load(Ordering::Relaxed),
            self.matches.load(Ordering::Relaxed),
            self.capture_group_accesses.load(Ordering::Relaxed),
            self.avg_matched_portion()
        )
    }
}
