//! Attribute against attribute.
//!
//! Tried in order, the first that applies wins:
//!
//! 1. equal canonical strings: equivalent;
//! 2. base against base and weight against weight, both at most weakly
//!    similar: strongly similar if both are at most strongly similar, else
//!    weakly similar;
//! 3. *rearrangement*: both chains flattened (`a^b^c` is `[a, b, c]`), of
//!    equal length, compared under every block swap that moves a prefix of
//!    length `n` behind the rest, `n = 0` being the element-wise alignment.
//!    Every element pair must be convertible or better; the swap costs
//!    `min(n, len - n)`. Splitting the left at `n` and the right at `m`
//!    aligns the same pairs as shifting the left by `n - m` alone, at no
//!    lower cost, so one offset per shift is enough;
//! 4. incomplete alternatives: the combined base and weight matches, the
//!    left against the right weight (the right augments), the left weight
//!    against the right (the left diminishes).
//!
//! When the base or the weight pair is only a cycle sentinel, the other half
//! still stands: the combination is kept as incomplete with the unresolved
//! pair counted as skipped.

use super::engine::{best_of, fetch, incongruous, informative_parts, push_node, wrap};
use super::{Grade, Level, Match, MatchId, MatchStats};
use crate::arena::SortId;
use crate::error::SortError;
use crate::matching::relate;
use crate::registry::Registry;
use crate::sort::attribute::chain;
use crate::sort::AttributeSort;

fn attribute(reg: &Registry, id: SortId) -> Result<AttributeSort, SortError> {
    reg.get(id)?
        .as_attribute()
        .copied()
        .ok_or_else(|| SortError::IllegalArgument(format!("{} is not an attribute sort", id)))
}

pub(crate) fn attribute_rule(reg: &mut Registry, lhs: SortId, rhs: SortId) -> Result<MatchId, SortError> {
    if reg.get(lhs)?.canonical() == reg.get(rhs)?.canonical() {
        return super::engine::equivalent(reg, lhs, rhs, MatchStats::default());
    }
    let (l, r) = (attribute(reg, lhs)?, attribute(reg, rhs)?);
    let base_id = relate(reg, l.base(), r.base())?;
    let weight_id = relate(reg, l.weight(), r.weight())?;
    let (base, weight) = (fetch(reg, base_id)?, fetch(reg, weight_id)?);

    let (bl, wl) = (base.level.rank(), weight.level.rank());
    if bl <= 2 && wl <= 2 {
        let level = if bl <= 1 && wl <= 1 {
            Level::StronglySimilar
        } else {
            Level::WeaklySimilar
        };
        let parts = informative_parts(reg, &[base_id, weight_id]);
        return push_node(
            reg,
            lhs,
            rhs,
            level,
            base.grade.combine(weight.grade),
            base.stats + weight.stats,
            parts,
        );
    }

    if let Some(found) = rearrange(reg, lhs, rhs)? {
        return Ok(found);
    }

    let mut candidates = Vec::with_capacity(3);
    if !base.is_incongruous() && !weight.is_incongruous() {
        let mut stats = base.stats + weight.stats;
        stats.augs += 1;
        let parts = informative_parts(reg, &[base_id, weight_id]);
        candidates.push(push_node(
            reg,
            lhs,
            rhs,
            base.level.worst(weight.level).at_least(Level::Incomplete),
            base.grade.combine(weight.grade),
            stats,
            parts,
        )?);
    } else if let Some((kept_id, kept)) =
        beside_cycle(reg, (base_id, &base), (weight_id, &weight))
    {
        let mut stats = kept.stats;
        stats.skipped += 1;
        let parts = informative_parts(reg, &[kept_id]);
        candidates.push(push_node(
            reg,
            lhs,
            rhs,
            kept.level.at_least(Level::Incomplete),
            kept.grade,
            stats,
            parts,
        )?);
    }

    let right_base_simple = reg.get(r.base())?.stats().simple;
    let augmented = relate(reg, lhs, r.weight())?;
    if !fetch(reg, augmented)?.is_incongruous() {
        candidates.push(wrap(reg, lhs, rhs, augmented, |node| {
            node.level = node.level.at_least(Level::Incomplete);
            node.grade = node.grade.combine(Grade::PartOf);
            node.stats.augs += right_base_simple;
            node.stats.skipped += 1;
        })?);
    }

    let left_base_simple = reg.get(l.base())?.stats().simple;
    let diminished = relate(reg, l.weight(), rhs)?;
    if !fetch(reg, diminished)?.is_incongruous() {
        candidates.push(wrap(reg, lhs, rhs, diminished, |node| {
            node.level = node.level.at_least(Level::Incomplete);
            node.grade = node.grade.combine(Grade::Subsumptive);
            node.stats.dims += left_base_simple;
            node.stats.skipped += 1;
        })?);
    }

    match best_of(reg, &candidates)? {
        Some(best) => Ok(best),
        None => incongruous(reg, lhs, rhs, vec![base_id, weight_id]),
    }
}

/// The half of a base/weight pair that stands when the other half is a
/// cycle sentinel.
fn beside_cycle<'m>(
    reg: &Registry,
    base: (MatchId, &'m Match),
    weight: (MatchId, &'m Match),
) -> Option<(MatchId, &'m Match)> {
    let sentinel = |id: MatchId| reg.matches().is_sentinel(id);
    match (sentinel(base.0), sentinel(weight.0)) {
        (false, true) if !base.1.is_incongruous() => Some(base),
        (true, false) if !weight.1.is_incongruous() => Some(weight),
        _ => None,
    }
}

/// Best block swap of the flattened chains, if any is acceptable.
fn rearrange(reg: &mut Registry, lhs: SortId, rhs: SortId) -> Result<Option<MatchId>, SortError> {
    let (left, right) = (chain(reg, lhs)?, chain(reg, rhs)?);
    let len = left.len();
    if len < 2 || len != right.len() {
        return Ok(None);
    }
    let mut candidates = Vec::new();
    'shift: for n in 0..len {
        let mut level = Level::Convertible;
        let mut grade = Grade::Concordant;
        let mut stats = MatchStats {
            swapped: n.min(len - n) as u32,
            ..MatchStats::default()
        };
        let mut elements = Vec::with_capacity(len);
        for (k, &r) in right.iter().enumerate() {
            let element = relate(reg, left[(n + k) % len], r)?;
            let node = fetch(reg, element)?;
            if node.level.rank() > Level::Convertible.rank() {
                continue 'shift;
            }
            level = level.worst(node.level);
            grade = grade.combine(node.grade);
            stats += node.stats;
            elements.push(element);
        }
        let parts = informative_parts(reg, &elements);
        candidates.push(push_node(reg, lhs, rhs, level, grade, stats, parts)?);
    }
    best_of(reg, &candidates)
}
