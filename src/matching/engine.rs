//! Dispatch and the per-variant matching rules.
//!
//! [`relate`] is the single entry point. It checks identity, the cycle guard
//! and the memo, then dispatches on the variant pair. Pairs that are handled
//! in the opposite direction are *mirrored*: the other direction is related
//! and its result reversed.
//!
//! Relating recurses once per level of nesting, so stack use grows with the
//! length of attribute chains: a few hundred links need more than the 2 MiB
//! of a default spawned thread in debug builds. Callers relating very deep
//! sorts should run on a thread with a larger stack.

use super::{chain, compose, order, Grade, Level, Match, MatchId, MatchStats};
use crate::arena::SortId;
use crate::error::SortError;
use crate::registry::Registry;
use crate::sort::Variant;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Computes or fetches the match of `lhs` against `rhs`.
pub(crate) fn relate(reg: &mut Registry, lhs: SortId, rhs: SortId) -> Result<MatchId, SortError> {
    reg.get(lhs)?;
    reg.get(rhs)?;
    if lhs == rhs {
        return identity(reg, lhs);
    }
    let key = reg.pair_key(lhs, rhs)?;
    if reg.matches().is_in_progress(&key) {
        reg.matches_mut().metrics_mut().record_cycle_broken();
        trace!(lhs = %lhs, rhs = %rhs, "cycle broken");
        let cached = reg.matches().sentinel(&key).filter(|&id| {
            reg.get_match(id).map_or(false, |node| (node.lhs, node.rhs) == (lhs, rhs))
        });
        if let Some(sentinel) = cached {
            return Ok(sentinel);
        }
        let sentinel = incongruous(reg, lhs, rhs, Vec::new())?;
        reg.matches_mut().set_sentinel(key, sentinel);
        return Ok(sentinel);
    }
    if let Some(hit) = reg.matches_mut().lookup(&key) {
        return Ok(hit);
    }
    reg.matches_mut().begin(key);
    let computed = dispatch(reg, lhs, rhs);
    reg.matches_mut().finish(&key);
    Ok(reg.approve_match(key, computed?))
}

fn dispatch(reg: &mut Registry, lhs: SortId, rhs: SortId) -> Result<MatchId, SortError> {
    let (lv, rv, descending) = {
        let (l, r) = (reg.get(lhs)?, reg.get(rhs)?);
        (l.variant(), r.variant(), l.display() > r.display())
    };
    match (lv, rv) {
        (Variant::Aspects, Variant::Aspects) => aspects_rule(reg, lhs, rhs),
        (Variant::Aspects, other) | (other, Variant::Aspects) => Err(SortError::IllegalArgument(
            format!(
                "cannot relate `{}` to `{}`: an aspects sort only relates to aspects sorts, not to {} sorts",
                reg.display(lhs)?,
                reg.display(rhs)?,
                other
            ),
        )),
        (Variant::Recursive, Variant::Recursive) if descending => mirror(reg, lhs, rhs),
        (Variant::Recursive, _) => recursive_rule(reg, lhs, rhs),
        (_, Variant::Recursive) => mirror(reg, lhs, rhs),
        (Variant::Disjunctive, Variant::Disjunctive) if descending => mirror(reg, lhs, rhs),
        (Variant::Disjunctive, Variant::Disjunctive) => compose::compose(reg, lhs, rhs),
        (Variant::Disjunctive, _) => disjunct_rule(reg, lhs, rhs),
        (_, Variant::Disjunctive) => mirror(reg, lhs, rhs),
        (Variant::Attribute, Variant::Attribute) if descending => mirror(reg, lhs, rhs),
        (Variant::Attribute, Variant::Attribute) => chain::attribute_rule(reg, lhs, rhs),
        (Variant::Attribute, _) => attribute_simple_rule(reg, lhs, rhs),
        (_, Variant::Attribute) => mirror(reg, lhs, rhs),
        (Variant::Primitive, Variant::Primitive) => primitive_rule(reg, lhs, rhs),
        (Variant::Aspect, Variant::Aspect) if descending => mirror(reg, lhs, rhs),
        (Variant::Aspect, Variant::Aspect) => aspect_rule(reg, lhs, rhs),
        _ => incongruous(reg, lhs, rhs, Vec::new()),
    }
}

// ----------------------------------------------------------------------------
// Node helpers
// ----------------------------------------------------------------------------

pub(crate) fn fetch(reg: &Registry, id: MatchId) -> Result<Match, SortError> {
    reg.get_match(id)
        .cloned()
        .ok_or_else(|| SortError::IllegalArgument(format!("unknown match {}", id)))
}

fn scale_of(reg: &Registry, lhs: SortId, rhs: SortId) -> Result<u32, SortError> {
    let l = reg.get(lhs)?.stats().scale();
    let r = reg.get(rhs)?.stats().scale();
    Ok(l.max(r).max(1))
}

pub(crate) fn push_node(
    reg: &mut Registry,
    lhs: SortId,
    rhs: SortId,
    level: Level,
    grade: Grade,
    stats: MatchStats,
    parts: Vec<MatchId>,
) -> Result<MatchId, SortError> {
    let scale = scale_of(reg, lhs, rhs)?;
    Ok(reg.matches_mut().push(Match {
        lhs,
        rhs,
        level,
        grade,
        stats,
        scale,
        parts,
        tied_with: None,
    }))
}

pub(crate) fn incongruous(
    reg: &mut Registry,
    lhs: SortId,
    rhs: SortId,
    parts: Vec<MatchId>,
) -> Result<MatchId, SortError> {
    push_node(reg, lhs, rhs, Level::Incongruous, Grade::Concordant, MatchStats::default(), parts)
}

pub(crate) fn equivalent(
    reg: &mut Registry,
    lhs: SortId,
    rhs: SortId,
    stats: MatchStats,
) -> Result<MatchId, SortError> {
    push_node(reg, lhs, rhs, Level::Equivalent, Grade::Concordant, stats, Vec::new())
}

fn identity(reg: &mut Registry, sort: SortId) -> Result<MatchId, SortError> {
    if let Some(id) = reg.matches().identity(sort) {
        return Ok(id);
    }
    let id = push_node(
        reg,
        sort,
        sort,
        Level::Identical,
        Grade::Concordant,
        MatchStats::default(),
        Vec::new(),
    )?;
    reg.matches_mut().set_identity(sort, id);
    Ok(id)
}

/// Parts contributed by `ids`, identical matches left out.
pub(crate) fn informative_parts(reg: &Registry, ids: &[MatchId]) -> Vec<MatchId> {
    ids.iter()
        .copied()
        .filter(|&id| reg.get_match(id).map_or(false, |m| m.level != Level::Identical))
        .collect()
}

/// New node `(lhs, rhs)` copying `inner`, then adjusted.
pub(crate) fn wrap(
    reg: &mut Registry,
    lhs: SortId,
    rhs: SortId,
    inner: MatchId,
    adjust: impl FnOnce(&mut Match),
) -> Result<MatchId, SortError> {
    let source = fetch(reg, inner)?;
    let mut node = Match {
        lhs,
        rhs,
        level: source.level.lifted(),
        grade: source.grade,
        stats: source.stats,
        scale: scale_of(reg, lhs, rhs)?,
        parts: informative_parts(reg, &[inner]),
        tied_with: None,
    };
    adjust(&mut node);
    Ok(reg.matches_mut().push(node))
}

/// Picks the best of fresh candidate nodes and chains its exact ties.
pub(crate) fn best_of(reg: &mut Registry, candidates: &[MatchId]) -> Result<Option<MatchId>, SortError> {
    let mut best: Option<(MatchId, Match)> = None;
    for &id in candidates {
        let node = fetch(reg, id)?;
        let better = match &best {
            Some((_, current)) => order(&node, current) == Ordering::Less,
            None => true,
        };
        if better {
            best = Some((id, node));
        }
    }
    let Some((best_id, best_node)) = best else {
        return Ok(None);
    };
    if !best_node.is_incongruous() {
        for &id in candidates {
            if id != best_id && order(&fetch(reg, id)?, &best_node) == Ordering::Equal {
                reg.chain_alternative(best_id, id);
            }
        }
    }
    Ok(Some(best_id))
}

/// Wraps `inner` as the single part of a match labeled `(lhs, rhs)`, demoted
/// by name when either side is a named non-primitive sort.
pub(crate) fn assign(
    reg: &mut Registry,
    lhs: SortId,
    rhs: SortId,
    inner: MatchId,
) -> Result<MatchId, SortError> {
    let named_aggregate = |id: SortId| -> Result<bool, SortError> {
        let sort = reg.get(id)?;
        Ok(sort.is_named() && sort.variant() != Variant::Primitive)
    };
    let demote = named_aggregate(lhs)? || named_aggregate(rhs)?;
    let source = fetch(reg, inner)?;
    let mut stats = source.stats;
    if demote {
        stats.by_name += 1;
    }
    push_node(
        reg,
        lhs,
        rhs,
        source.level.lifted(),
        source.grade,
        stats,
        vec![inner],
    )
}

// ----------------------------------------------------------------------------
// Mirroring
// ----------------------------------------------------------------------------

fn mirror(reg: &mut Registry, lhs: SortId, rhs: SortId) -> Result<MatchId, SortError> {
    let forward = relate(reg, rhs, lhs)?;
    reverse(reg, forward, lhs, rhs)
}

/// Copy of match `id` seen from the other side, relabeled `(lhs, rhs)`.
///
/// Parts and alternatives are reversed recursively; shared nodes are
/// reversed once.
pub(crate) fn reverse(
    reg: &mut Registry,
    id: MatchId,
    lhs: SortId,
    rhs: SortId,
) -> Result<MatchId, SortError> {
    let mut done = HashMap::new();
    let mut active = HashSet::new();
    reverse_node(reg, id, Some((lhs, rhs)), &mut done, &mut active)
}

fn reverse_node(
    reg: &mut Registry,
    id: MatchId,
    label: Option<(SortId, SortId)>,
    done: &mut HashMap<MatchId, MatchId>,
    active: &mut HashSet<MatchId>,
) -> Result<MatchId, SortError> {
    if label.is_none() {
        if let Some(&copy) = done.get(&id) {
            return Ok(copy);
        }
    }
    let source = fetch(reg, id)?;
    if source.lhs == source.rhs && label.is_none() {
        return Ok(id);
    }
    if !active.insert(id) {
        return Ok(id);
    }
    let mut parts = Vec::with_capacity(source.parts.len());
    for &part in &source.parts {
        parts.push(reverse_node(reg, part, None, done, active)?);
    }
    let tied_with = match source.tied_with {
        Some(next) => Some(reverse_node(reg, next, None, done, active)?),
        None => None,
    };
    active.remove(&id);
    let (lhs, rhs) = label.unwrap_or((source.rhs, source.lhs));
    let copy = reg.matches_mut().push(Match {
        lhs,
        rhs,
        level: source.level,
        grade: source.grade.reverse(),
        stats: source.stats.reversed(),
        scale: source.scale,
        parts,
        tied_with,
    });
    if label.is_none() {
        done.insert(id, copy);
    }
    Ok(copy)
}

// ----------------------------------------------------------------------------
// Variant rules
// ----------------------------------------------------------------------------

fn primitive_rule(reg: &mut Registry, lhs: SortId, rhs: SortId) -> Result<MatchId, SortError> {
    let (same_definition, same_category) = {
        let (l, r) = (reg.get(lhs)?, reg.get(rhs)?);
        let same_category = match (l.as_primitive(), r.as_primitive()) {
            (Some(a), Some(b)) => a.category() == b.category(),
            _ => false,
        };
        (l.canonical() == r.canonical(), same_category)
    };
    if same_definition {
        let stats = MatchStats {
            by_definition: 1,
            ..MatchStats::default()
        };
        equivalent(reg, lhs, rhs, stats)
    } else if same_category {
        let stats = MatchStats {
            by_argument: 1,
            ..MatchStats::default()
        };
        push_node(reg, lhs, rhs, Level::Convertible, Grade::Concordant, stats, Vec::new())
    } else {
        incongruous(reg, lhs, rhs, Vec::new())
    }
}

fn aspects_rule(reg: &mut Registry, lhs: SortId, rhs: SortId) -> Result<MatchId, SortError> {
    if reg.get(lhs)?.canonical() == reg.get(rhs)?.canonical() {
        equivalent(reg, lhs, rhs, MatchStats::default())
    } else {
        incongruous(reg, lhs, rhs, Vec::new())
    }
}

fn aspect_rule(reg: &mut Registry, lhs: SortId, rhs: SortId) -> Result<MatchId, SortError> {
    let view = |id: SortId| {
        reg.get(id)?
            .as_aspect()
            .copied()
            .ok_or_else(|| SortError::IllegalArgument(format!("{} is not an aspect", id)))
    };
    let (l, r) = (view(lhs)?, view(rhs)?);
    let owners = relate(reg, l.owner(), r.owner())?;
    if fetch(reg, owners)?.level.rank() > 0 {
        return incongruous(reg, lhs, rhs, vec![owners]);
    }
    if l.position() == r.position() {
        let parts = informative_parts(reg, &[owners]);
        return push_node(
            reg,
            lhs,
            rhs,
            Level::Equivalent,
            Grade::Concordant,
            MatchStats::default(),
            parts,
        );
    }
    let (la, ra) = (reg.argument(lhs)?, reg.argument(rhs)?);
    let arguments = relate(reg, la, ra)?;
    if fetch(reg, arguments)?.is_incongruous() {
        return incongruous(reg, lhs, rhs, vec![arguments]);
    }
    wrap(reg, lhs, rhs, arguments, |node| {
        node.level = node.level.at_least(Level::StronglySimilar);
        node.stats.swapped += 1;
    })
}

fn recursive_rule(reg: &mut Registry, lhs: SortId, rhs: SortId) -> Result<MatchId, SortError> {
    let (instance, same_definition) = {
        let (l, r) = (reg.get(lhs)?, reg.get(rhs)?);
        let instance = l.as_recursive().and_then(|rec| rec.instance()).ok_or_else(|| {
            SortError::IllegalArgument(format!("recursive sort `{}` is not bound", l.display()))
        })?;
        (instance, l.canonical() == r.canonical())
    };
    if same_definition {
        return equivalent(reg, lhs, rhs, MatchStats::default());
    }
    let inner = relate(reg, instance, rhs)?;
    assign(reg, lhs, rhs, inner)
}

fn disjunct_rule(reg: &mut Registry, lhs: SortId, rhs: SortId) -> Result<MatchId, SortError> {
    let components = reg
        .get(lhs)?
        .as_disjunctive()
        .map(|d| d.components().to_vec())
        .unwrap_or_default();
    let extra = (components.len() as u32).saturating_sub(1);
    let mut candidates = Vec::with_capacity(components.len());
    for component in components {
        let inner = relate(reg, component, rhs)?;
        candidates.push(wrap(reg, lhs, rhs, inner, |node| {
            node.stats.excess += extra;
            if extra > 0 {
                node.grade = node.grade.combine(Grade::Subsumptive);
            }
        })?);
    }
    match best_of(reg, &candidates)? {
        Some(best) => Ok(best),
        None => incongruous(reg, lhs, rhs, Vec::new()),
    }
}

fn attribute_simple_rule(reg: &mut Registry, lhs: SortId, rhs: SortId) -> Result<MatchId, SortError> {
    let attribute = reg
        .get(lhs)?
        .as_attribute()
        .copied()
        .ok_or_else(|| SortError::IllegalArgument(format!("{} is not an attribute sort", lhs)))?;
    let weight_simple = reg.get(attribute.weight())?.stats().simple;
    let weaken = |node: &mut Match| {
        node.level = node.level.at_least(Level::Incomplete);
        node.grade = node.grade.combine(Grade::Subsumptive);
    };
    let by_base = relate(reg, attribute.base(), rhs)?;
    let by_base = wrap(reg, lhs, rhs, by_base, |node| {
        node.stats.dims += weight_simple;
        weaken(node);
    })?;
    let by_weight = relate(reg, attribute.weight(), rhs)?;
    let by_weight = wrap(reg, lhs, rhs, by_weight, |node| {
        node.stats.dims += 1;
        weaken(node);
    })?;
    match best_of(reg, &[by_base, by_weight])? {
        Some(best) => Ok(best),
        None => incongruous(reg, lhs, rhs, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{CategoryTable, ParamShape};
    use crate::operations::{combine, primitive, sum};
    use crate::sort::Argument;

    fn registry() -> Registry {
        Registry::new(
            CategoryTable::new()
                .with_category("Label", ParamShape::Identifier)
                .with_category("Count", ParamShape::Bound),
        )
    }

    fn label(reg: &mut Registry, text: &str) -> SortId {
        primitive(reg, "Label", Some(Argument::Identifier(text.to_string()))).unwrap()
    }

    #[test]
    fn identity_is_cached_per_sort() {
        let mut reg = registry();
        let a = label(&mut reg, "a");
        let first = relate(&mut reg, a, a).unwrap();
        assert_eq!(relate(&mut reg, a, a).unwrap(), first);
        assert_eq!(reg.get_match(first).unwrap().level(), Level::Identical);
        assert_eq!(reg.matches().memo_len(), 0);
    }

    #[test]
    fn primitives_by_definition_and_category() {
        let mut reg = registry();
        let a = label(&mut reg, "a");
        let a2 = label(&mut reg, "a");
        let b = label(&mut reg, "b");
        let n = primitive(&mut reg, "Count", Some(Argument::Bound("3".into()))).unwrap();
        let same = relate(&mut reg, a, a2).unwrap();
        assert_eq!(reg.get_match(same).unwrap().level(), Level::Equivalent);
        let convertible = relate(&mut reg, a, b).unwrap();
        let node = reg.get_match(convertible).unwrap();
        assert_eq!(node.level(), Level::Convertible);
        assert_eq!(node.stats().by_argument, 1);
        let apart = relate(&mut reg, a, n).unwrap();
        assert!(reg.get_match(apart).unwrap().is_incongruous());
    }

    #[test]
    fn memo_serves_repeated_pairs() {
        let mut reg = registry();
        let a = label(&mut reg, "a");
        let b = label(&mut reg, "b");
        let first = relate(&mut reg, a, b).unwrap();
        assert_eq!(relate(&mut reg, a, b).unwrap(), first);
        assert_eq!(reg.matches().metrics().memo_hits, 1);
    }

    #[test]
    fn mirrored_pairs_swap_counters() {
        let mut reg = registry();
        let (a, b, c) = (label(&mut reg, "a"), label(&mut reg, "b"), label(&mut reg, "c"));
        let ab = sum(&mut reg, a, b).unwrap();
        let wide = sum(&mut reg, ab, c).unwrap();
        let forward = relate(&mut reg, wide, a).unwrap();
        let backward = relate(&mut reg, a, wide).unwrap();
        let (f, b) = (
            reg.get_match(forward).unwrap().clone(),
            reg.get_match(backward).unwrap().clone(),
        );
        assert_eq!(f.level(), b.level());
        assert_eq!(f.stats().excess, 2);
        assert_eq!(b.stats().omits, 2);
        assert_eq!(f.grade(), Grade::Subsumptive);
        assert_eq!(b.grade(), Grade::PartOf);
        assert_eq!((b.lhs(), b.rhs()), (a, wide));
    }

    #[test]
    fn attribute_against_its_base_is_incomplete() {
        let mut reg = registry();
        let (a, b) = (label(&mut reg, "a"), label(&mut reg, "b"));
        let ab = combine(&mut reg, a, b).unwrap();
        let m = relate(&mut reg, ab, a).unwrap();
        let node = reg.get_match(m).unwrap();
        assert_eq!(node.level(), Level::Incomplete);
        assert_eq!(node.grade(), Grade::Subsumptive);
        assert_eq!(node.stats().dims, 1);
    }

    #[test]
    fn aspects_reject_other_variants() {
        use crate::operations::declare_aspects;
        let mut reg = Registry::new(
            CategoryTable::new()
                .with_category("Label", ParamShape::Identifier)
                .with_category("Relation", ParamShape::Sorts(2)),
        );
        let (x, y) = (label(&mut reg, "x"), label(&mut reg, "y"));
        let owner = declare_aspects(
            &mut reg,
            "Relation",
            vec!["src".into(), "dst".into()],
            vec![x, y],
        )
        .unwrap();
        assert!(matches!(
            relate(&mut reg, owner, x),
            Err(SortError::IllegalArgument(_))
        ));
    }
}
