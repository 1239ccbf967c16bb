//! Match counters and the exact tie-break score.
//!
//! Counters are additive. The score of a match is the rational
//! `(2·structural + demotions) / (2·scale)`, compared exactly by
//! cross-multiplication.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MatchStats {
    /// Components on the left with no counterpart.
    pub excess: u32,
    /// Components on the right with no counterpart.
    pub omits: u32,
    pub skipped: u32,
    pub swapped: u32,
    /// Augmentations: structure the right adds around the left.
    pub augs: u32,
    /// Diminutions: structure the left adds around the right.
    pub dims: u32,
    pub by_name: u32,
    pub by_definition: u32,
    pub by_argument: u32,
}

impl MatchStats {
    /// Sum of structural counters.
    pub fn structural(&self) -> u64 {
        [
            self.excess,
            self.omits,
            self.skipped,
            self.swapped,
            self.augs,
            self.dims,
        ]
        .iter()
        .map(|&n| u64::from(n))
        .sum()
    }

    /// Sum of demotion counters.
    pub fn demotions(&self) -> u64 {
        u64::from(self.by_name) + u64::from(self.by_definition) + u64::from(self.by_argument)
    }

    /// Score numerator: structural counters weigh twice.
    pub fn penalty(&self) -> u64 {
        2 * self.structural() + self.demotions()
    }

    pub fn score(&self, scale: u32) -> Ratio {
        Ratio::new(self.penalty(), 2 * u64::from(scale.max(1)))
    }

    /// Counters as seen from the other side.
    pub fn reversed(self) -> Self {
        MatchStats {
            excess: self.omits,
            omits: self.excess,
            augs: self.dims,
            dims: self.augs,
            ..self
        }
    }
}

impl AddAssign for MatchStats {
    fn add_assign(&mut self, rhs: Self) {
        self.excess += rhs.excess;
        self.omits += rhs.omits;
        self.skipped += rhs.skipped;
        self.swapped += rhs.swapped;
        self.augs += rhs.augs;
        self.dims += rhs.dims;
        self.by_name += rhs.by_name;
        self.by_definition += rhs.by_definition;
        self.by_argument += rhs.by_argument;
    }
}

impl Add for MatchStats {
    type Output = MatchStats;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

/// Non-negative rational with a positive denominator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Ratio {
    pub numerator: u64,
    pub denominator: u64,
}

impl Ratio {
    pub fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator: denominator.max(1),
        }
    }

    pub const ZERO: Ratio = Ratio {
        numerator: 0,
        denominator: 1,
    };
}

impl Ord for Ratio {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = u128::from(self.numerator) * u128::from(other.denominator);
        let rhs = u128::from(other.numerator) * u128::from(self.denominator);
        lhs.cmp(&rhs)
    }
}

impl PartialOrd for Ratio {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ratio {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ratio {}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}
