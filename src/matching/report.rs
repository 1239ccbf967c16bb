//! Serializable view of a match tree.
//!
//! A report carries display strings rather than handles so it can be handed
//! to a renderer outside the registry, or stored as CBOR.

use super::{Grade, Level, MatchId, MatchStats};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Shown for a side whose sort was rolled back after the match was made.
const REMOVED: &str = "<removed>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    pub lhs: String,
    pub rhs: String,
    pub level: Level,
    pub grade: Grade,
    pub stats: MatchStats,
    /// Score numerator.
    pub numerator: u64,
    /// Score denominator.
    pub denominator: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<MatchReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<MatchReport>,
}

impl MatchReport {
    pub(crate) fn build(registry: &Registry, id: MatchId) -> Option<Self> {
        let mut active = HashSet::new();
        Self::node(registry, id, true, &mut active)
    }

    fn node(
        registry: &Registry,
        id: MatchId,
        with_alternatives: bool,
        active: &mut HashSet<MatchId>,
    ) -> Option<Self> {
        let m = registry.get_match(id)?;
        if !active.insert(id) {
            return None;
        }
        let side = |sort| {
            registry
                .sort(sort)
                .map_or_else(|| REMOVED.to_string(), |s| s.display().to_string())
        };
        let score = m.score();
        let parts = m
            .parts()
            .iter()
            .filter_map(|&part| Self::node(registry, part, false, active))
            .collect();
        let alternatives = if with_alternatives {
            registry
                .matches()
                .alternatives(id)
                .into_iter()
                .filter_map(|alt| Self::node(registry, alt, false, active))
                .collect()
        } else {
            Vec::new()
        };
        active.remove(&id);
        Some(MatchReport {
            lhs: side(m.lhs()),
            rhs: side(m.rhs()),
            level: m.level(),
            grade: m.grade(),
            stats: *m.stats(),
            numerator: score.numerator,
            denominator: score.denominator,
            parts,
            alternatives,
        })
    }

    /// Number of nodes in the report tree.
    pub fn size(&self) -> usize {
        1 + self.parts.iter().map(MatchReport::size).sum::<usize>()
            + self.alternatives.iter().map(MatchReport::size).sum::<usize>()
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(self)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, serde_cbor::Error> {
        serde_cbor::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{CategoryTable, ParamShape};

    #[test]
    fn report_survives_cbor() {
        let mut reg = Registry::new(CategoryTable::new().with_category("Label", ParamShape::Identifier));
        let s = reg.define("s: [Label] a + [Label] b").unwrap();
        let t = reg.define("t: [Label] b + [Label] c").unwrap();
        let m = reg.match_sorts(s, t).unwrap();
        let report = reg.report(m).unwrap();
        assert_eq!(report.lhs, "s");
        assert_eq!(report.rhs, "t");
        assert!(report.size() > 1);
        let decoded = MatchReport::from_cbor(&report.to_cbor().unwrap()).unwrap();
        assert_eq!(decoded, report);
    }
}
