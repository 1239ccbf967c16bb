//! Correspondence levels and containment grades.
//!
//! # Invariants
//! - `Identical` and `Equivalent` share rank 0; only a sort related to itself
//!   is identical.
//! - `Incongruous` is absorbing under [`Level::worst`].
//! - [`Grade::reverse`] is an involution swapping `PartOf` and `Subsumptive`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse correspondence between two sorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Identical,
    Equivalent,
    StronglySimilar,
    WeaklySimilar,
    Convertible,
    Incomplete,
    Incongruous,
}

impl Level {
    /// Rank used for ordering; lower is closer.
    pub const fn rank(self) -> u8 {
        match self {
            Level::Identical | Level::Equivalent => 0,
            Level::StronglySimilar => 1,
            Level::WeaklySimilar => 2,
            Level::Convertible => 3,
            Level::Incomplete => 4,
            Level::Incongruous => 5,
        }
    }

    #[inline]
    pub fn is_incongruous(self) -> bool {
        self == Level::Incongruous
    }

    /// The worse of two levels. Identical combined with anything else at rank
    /// 0 is equivalent.
    pub fn worst(self, other: Level) -> Level {
        match self.rank().cmp(&other.rank()) {
            std::cmp::Ordering::Less => other,
            std::cmp::Ordering::Greater => self,
            std::cmp::Ordering::Equal if self != other => Level::Equivalent,
            std::cmp::Ordering::Equal => self,
        }
    }

    /// Raises the level to at least `floor`; incongruous stays incongruous.
    pub fn at_least(self, floor: Level) -> Level {
        if self.rank() < floor.rank() {
            floor
        } else {
            self
        }
    }

    /// Identity between distinct sorts reads as equivalence.
    pub fn lifted(self) -> Level {
        match self {
            Level::Identical => Level::Equivalent,
            other => other,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Level::Identical => "identical",
            Level::Equivalent => "equivalent",
            Level::StronglySimilar => "strongly similar",
            Level::WeaklySimilar => "weakly similar",
            Level::Convertible => "convertible",
            Level::Incomplete => "incomplete",
            Level::Incongruous => "incongruous",
        };
        f.write_str(label)
    }
}

/// Direction of containment between the two sides of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    /// Neither side holds more than the other.
    Concordant,
    /// The left side is part of the right.
    PartOf,
    /// The left side subsumes the right.
    Subsumptive,
    /// Both sides hold something the other lacks.
    Partial,
}

impl Grade {
    pub const fn rank(self) -> u8 {
        match self {
            Grade::Concordant => 0,
            Grade::PartOf => 1,
            Grade::Subsumptive => 2,
            Grade::Partial => 3,
        }
    }

    /// Grade of a match built from two contributions.
    pub fn combine(self, other: Grade) -> Grade {
        match (self, other) {
            (a, b) if a == b => a,
            (Grade::Concordant, b) => b,
            (a, Grade::Concordant) => a,
            _ => Grade::Partial,
        }
    }

    /// Grade seen from the other side.
    pub fn reverse(self) -> Grade {
        match self {
            Grade::PartOf => Grade::Subsumptive,
            Grade::Subsumptive => Grade::PartOf,
            other => other,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Grade::Concordant => "concordant",
            Grade::PartOf => "part of",
            Grade::Subsumptive => "subsumptive",
            Grade::Partial => "partial",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worst_is_absorbing_for_incongruous() {
        for level in [Level::Identical, Level::Convertible, Level::Incomplete] {
            assert_eq!(level.worst(Level::Incongruous), Level::Incongruous);
            assert_eq!(Level::Incongruous.worst(level), Level::Incongruous);
        }
    }

    #[test]
    fn identical_with_equivalent_is_equivalent() {
        assert_eq!(Level::Identical.worst(Level::Equivalent), Level::Equivalent);
        assert_eq!(Level::Equivalent.worst(Level::Identical), Level::Equivalent);
        assert_eq!(Level::Identical.worst(Level::Identical), Level::Identical);
    }

    #[test]
    fn floors_do_not_lower() {
        assert_eq!(Level::Identical.at_least(Level::Incomplete), Level::Incomplete);
        assert_eq!(Level::Incongruous.at_least(Level::Incomplete), Level::Incongruous);
        assert_eq!(Level::WeaklySimilar.at_least(Level::StronglySimilar), Level::WeaklySimilar);
    }

    #[test]
    fn grade_combination() {
        assert_eq!(Grade::Concordant.combine(Grade::PartOf), Grade::PartOf);
        assert_eq!(Grade::Subsumptive.combine(Grade::Subsumptive), Grade::Subsumptive);
        assert_eq!(Grade::PartOf.combine(Grade::Subsumptive), Grade::Partial);
        for grade in [Grade::Concordant, Grade::PartOf, Grade::Subsumptive, Grade::Partial] {
            assert_eq!(grade.reverse().reverse(), grade);
        }
    }
}
