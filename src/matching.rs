//! Graded matching between sorts.
//!
//! Relating two sorts yields a [`Match`]: a [`Level`] of correspondence, a
//! [`Grade`] of containment, additive [`MatchStats`] reduced to an exact
//! rational score, the sub-matches it was decomposed into, and an optional
//! chain of equally good alternatives.
//!
//! Match nodes are stored append-only in the registry's [`MatchTable`] and
//! addressed by [`MatchId`]. Results are memoized under the ordered pair of
//! display strings; a pair whose computation is in progress yields an
//! incongruous sentinel, cached per pair, which is how self-referential sorts
//! terminate.
//!
//! # Invariants
//! - `relate(s, s)` is identical and concordant.
//! - `relate(a, b)` and `relate(b, a)` have the same level; directional
//!   counters and grades are swapped.
//! - Incongruous loses every comparison in [`order`].

pub mod chain;
pub mod compose;
pub mod engine;
pub mod level;
pub mod report;
pub mod stats;
pub mod table;

pub use level::{Grade, Level};
pub use report::MatchReport;
pub use stats::{MatchStats, Ratio};
pub use table::{MatchMetrics, MatchTable};

pub(crate) use engine::relate;

use crate::arena::SortId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Index of a match node in a [`MatchTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchId(u32);

impl MatchId {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Result of relating `lhs` to `rhs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub(crate) lhs: SortId,
    pub(crate) rhs: SortId,
    pub(crate) level: Level,
    pub(crate) grade: Grade,
    pub(crate) stats: MatchStats,
    pub(crate) scale: u32,
    pub(crate) parts: Vec<MatchId>,
    pub(crate) tied_with: Option<MatchId>,
}

impl Match {
    pub fn lhs(&self) -> SortId {
        self.lhs
    }

    pub fn rhs(&self) -> SortId {
        self.rhs
    }

    #[inline]
    pub fn level(&self) -> Level {
        self.level
    }

    #[inline]
    pub fn grade(&self) -> Grade {
        self.grade
    }

    pub fn stats(&self) -> &MatchStats {
        &self.stats
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Sub-matches this match was decomposed into.
    pub fn parts(&self) -> &[MatchId] {
        &self.parts
    }

    /// Next equally good alternative, if any.
    pub fn tied_with(&self) -> Option<MatchId> {
        self.tied_with
    }

    pub fn score(&self) -> Ratio {
        self.stats.score(self.scale)
    }

    #[inline]
    pub fn is_incongruous(&self) -> bool {
        self.level.is_incongruous()
    }
}

/// Preference order of matches: incongruous last, then level rank, then
/// score, then grade. `Less` means `a` is the better match.
pub fn order(a: &Match, b: &Match) -> Ordering {
    a.is_incongruous()
        .cmp(&b.is_incongruous())
        .then_with(|| a.level.rank().cmp(&b.level.rank()))
        .then_with(|| a.score().cmp(&b.score()))
        .then_with(|| a.grade.rank().cmp(&b.grade.rank()))
}

/// The better of two matches; the first wins ties.
pub fn minimum<'m>(a: &'m Match, b: &'m Match) -> &'m Match {
    if order(a, b) == Ordering::Greater {
        b
    } else {
        a
    }
}
