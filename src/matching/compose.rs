//! Disjunction against disjunction.
//!
//! Every cross pair of components is related (tie alternatives included),
//! the candidates are sorted best first and accepted greedily so that no
//! component is used twice. Components left over on either side count as
//! excess or omissions.

use super::engine::{equivalent, fetch, incongruous, informative_parts, push_node};
use super::{order, Grade, Level, Match, MatchId, MatchStats};
use crate::arena::SortId;
use crate::error::SortError;
use crate::matching::relate;
use crate::registry::Registry;

struct Candidate {
    left: usize,
    right: usize,
    id: MatchId,
    node: Match,
}

fn components(reg: &Registry, id: SortId) -> Result<Vec<SortId>, SortError> {
    reg.get(id)?
        .as_disjunctive()
        .map(|d| d.components().to_vec())
        .ok_or_else(|| SortError::IllegalArgument(format!("{} is not a disjunctive sort", id)))
}

pub(crate) fn compose(reg: &mut Registry, lhs: SortId, rhs: SortId) -> Result<MatchId, SortError> {
    if reg.get(lhs)?.canonical() == reg.get(rhs)?.canonical() {
        return equivalent(reg, lhs, rhs, MatchStats::default());
    }
    let (left, right) = (components(reg, lhs)?, components(reg, rhs)?);

    let mut candidates = Vec::new();
    for (i, &l) in left.iter().enumerate() {
        for (j, &r) in right.iter().enumerate() {
            let head = relate(reg, l, r)?;
            let chain = std::iter::once(head).chain(reg.matches().alternatives(head));
            for id in chain.collect::<Vec<_>>() {
                let node = fetch(reg, id)?;
                if !node.is_incongruous() {
                    candidates.push(Candidate {
                        left: i,
                        right: j,
                        id,
                        node,
                    });
                }
            }
        }
    }
    candidates.sort_by(|a, b| {
        order(&a.node, &b.node)
            .then(a.left.cmp(&b.left))
            .then(a.right.cmp(&b.right))
    });

    let mut left_used = vec![false; left.len()];
    let mut right_used = vec![false; right.len()];
    let mut accepted: Vec<&Candidate> = Vec::new();
    for candidate in &candidates {
        if left_used[candidate.left] || right_used[candidate.right] {
            continue;
        }
        left_used[candidate.left] = true;
        right_used[candidate.right] = true;
        accepted.push(candidate);
    }
    if accepted.is_empty() {
        return incongruous(reg, lhs, rhs, Vec::new());
    }

    let mut level = Level::Identical;
    let mut stats = MatchStats::default();
    let mut contributions = Vec::with_capacity(left.len() + right.len());
    for candidate in &accepted {
        level = level.worst(candidate.node.level);
        stats += candidate.node.stats;
        contributions.push(candidate.node.grade);
    }
    let excess = left_used.iter().filter(|used| !**used).count();
    let omits = right_used.iter().filter(|used| !**used).count();
    stats.excess += excess as u32;
    stats.omits += omits as u32;
    contributions.extend(std::iter::repeat(Grade::Subsumptive).take(excess));
    contributions.extend(std::iter::repeat(Grade::PartOf).take(omits));

    let ids: Vec<MatchId> = accepted.iter().map(|c| c.id).collect();
    let parts = informative_parts(reg, &ids);
    push_node(reg, lhs, rhs, level.lifted(), overall_grade(&contributions), stats, parts)
}

/// Concordant only if every contribution is; uniform otherwise, else partial.
fn overall_grade(contributions: &[Grade]) -> Grade {
    let mut directed = contributions.iter().filter(|&&g| g != Grade::Concordant);
    match directed.next() {
        None => Grade::Concordant,
        Some(&first) if directed.all(|&g| g == first) => first,
        Some(_) => Grade::Partial,
    }
}
