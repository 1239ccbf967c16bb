//! The sort algebra.
//!
//! Free functions building and inspecting sorts in a [`Registry`]. Every
//! operation checks that its operands belong to the registry it is given and
//! returns [`SortError`] rather than coercing an operand it cannot use.
//!
//! # Citations
//! - Hash-consing: Filliâtre & Conchon, "Type-Safe Modular Hash-Consing" (2006)
//! - Sum and product types: Pierce, "Types and Programming Languages", Chapter 11 (2002)

use crate::arena::SortId;
use crate::error::SortError;
use crate::registry::Registry;
use crate::sort::aspects::tuple_name;
use crate::sort::{
    Argument, Aspect, AspectsSort, AttributeSort, DisjunctiveSort, PrimitiveSort, Sort, SortKind,
    SortStats, Variant,
};
use std::collections::HashSet;
use tracing::trace;

/// Creates an unnamed primitive sort of `category`.
///
/// Sorts named by a [`Argument::Sorts`] payload must belong to `registry`.
pub fn primitive(
    registry: &mut Registry,
    category: &str,
    argument: Option<Argument>,
) -> Result<SortId, SortError> {
    if registry.categories().shape(category).is_none() {
        return Err(SortError::IllegalArgument(format!(
            "unknown category `{}`",
            category
        )));
    }
    if let Some(Argument::Sorts(sorts)) = &argument {
        for &sort in sorts {
            reject_aspects(registry.get(sort)?, "a primitive argument")?;
        }
    }
    let kind = PrimitiveSort::new(category, argument);
    let canonical = kind.render(registry)?;
    Ok(registry.allocate(None, canonical, SortStats::SIMPLE, SortKind::Primitive(kind)))
}

/// Declares an aspects sort over `category` with one named aspect per entry
/// of `names`, linked to `arguments` slot by slot.
///
/// The aspects and the aspects sort (named by the tuple string, e.g.
/// `(src, dst)`) are registered. Returns the aspects sort.
pub fn declare_aspects(
    registry: &mut Registry,
    category: &str,
    names: Vec<String>,
    arguments: Vec<SortId>,
) -> Result<SortId, SortError> {
    let Some(shape) = registry.categories().shape(category) else {
        return Err(SortError::IllegalArgument(format!(
            "unknown category `{}`",
            category
        )));
    };
    if names.len() < 2 || names.len() != shape.cardinality() || names.len() != arguments.len() {
        return Err(SortError::IllegalArgument(format!(
            "[{}] links {} sorts; got {} names and {} arguments",
            category,
            shape.cardinality(),
            names.len(),
            arguments.len()
        )));
    }
    let mut seen = HashSet::new();
    for name in &names {
        if !seen.insert(name.as_str()) {
            return Err(SortError::IllegalOverwrite(format!(
                "`{}` appears twice in one aspects tuple",
                name
            )));
        }
        if registry.sort_of(name).is_some() {
            return Err(SortError::IllegalOverwrite(format!(
                "`{}` is already defined",
                name
            )));
        }
    }
    for &argument in &arguments {
        reject_aspects(registry.get(argument)?, "an aspect argument")?;
    }

    let mut owner_kind = AspectsSort {
        category: category.to_string(),
        aspects: Vec::with_capacity(names.len()),
        arguments,
    };
    let canonical = owner_kind.render(registry)?;
    let stats = SortStats::SIMPLE.renamed();
    let owner = registry.allocate(
        Some(tuple_name(&names)),
        canonical.clone(),
        stats,
        SortKind::Aspects(owner_kind.clone()),
    );
    for (position, name) in names.into_iter().enumerate() {
        let aspect = registry.allocate(
            Some(name),
            Aspect::render(&canonical, position),
            stats,
            SortKind::Aspect(Aspect { owner, position }),
        );
        owner_kind.aspects.push(aspect);
    }
    let aspects = owner_kind.aspects.clone();
    registry.get_mut(owner)?.kind = SortKind::Aspects(owner_kind);
    for aspect in aspects {
        registry.register(aspect)?;
    }
    registry.register(owner)?;
    Ok(owner)
}

/// Returns `sort` under `name`.
///
/// If `sort` already carries `name` it is returned as is; otherwise a copy
/// with the same structure is created (not registered).
pub fn duplicate(registry: &mut Registry, sort: SortId, name: &str) -> Result<SortId, SortError> {
    let source = registry.get(sort)?;
    if source.name() == Some(name) {
        return Ok(sort);
    }
    match &source.kind {
        SortKind::Aspects(_) | SortKind::Aspect(_) => {
            return Err(SortError::IllegalArgument(format!(
                "{} sort `{}` cannot be duplicated",
                source.variant(),
                source.display()
            )))
        }
        SortKind::Recursive(r) if !r.is_bound() => {
            return Err(SortError::IllegalArgument(format!(
                "recursive sort `{}` is not bound",
                source.display()
            )))
        }
        _ => {}
    }
    let stats = if source.is_named() {
        source.stats
    } else {
        source.stats.renamed()
    };
    let (canonical, kind) = (source.canonical.clone(), source.kind.clone());
    Ok(registry.allocate(Some(name.to_string()), canonical, stats, kind))
}

/// Attribute composition `base ^ weight`.
///
/// An attribute base is reassociated to the right, so `(a^b)^c` and
/// `a^(b^c)` are the same interned sort.
pub fn combine(registry: &mut Registry, base: SortId, weight: SortId) -> Result<SortId, SortError> {
    let (b, w) = (registry.get(base)?, registry.get(weight)?);
    reject_aspects(b, "an attribute")?;
    reject_aspects(w, "an attribute")?;
    if let Some(inner) = b.as_attribute().copied() {
        let tail = combine(registry, inner.weight(), weight)?;
        return combine(registry, inner.base(), tail);
    }
    if !b.is_simple() {
        return Err(SortError::IllegalArgument(format!(
            "attribute base `{}` must be simple, not a {} sort",
            b.display(),
            b.variant()
        )));
    }
    let stats = SortStats::composite([&b.stats, &w.stats]);
    let kind = AttributeSort { base, weight };
    let canonical = kind.render(registry)?;
    if let Some(existing) = registry.interned(&canonical) {
        return Ok(existing);
    }
    let id = registry.allocate(None, canonical.clone(), stats, SortKind::Attribute(kind));
    trace!(canonical = %canonical, "attribute interned");
    registry.intern(canonical, id);
    Ok(id)
}

/// Disjunction `a + b`.
///
/// An unnamed disjunctive `a` is extended in place and returned.
pub fn sum(registry: &mut Registry, a: SortId, b: SortId) -> Result<SortId, SortError> {
    let (left, right) = (registry.get(a)?, registry.get(b)?);
    reject_aspects(left, "a disjunction")?;
    reject_aspects(right, "a disjunction")?;
    if left.display() == right.display() {
        return Ok(a);
    }
    let incoming = spliced(right);
    let extend_in_place = !left.is_named() && left.variant() == Variant::Disjunctive;
    let mut components = if extend_in_place {
        spliced(left)
    } else {
        vec![a]
    };
    for component in incoming {
        let display = registry.display(component)?;
        let mut present = false;
        for &existing in &components {
            if registry.display(existing)? == display {
                present = true;
                break;
            }
        }
        if !present {
            components.push(component);
        }
    }
    if components.len() == 1 {
        return Ok(components[0]);
    }

    let mut stats = Vec::with_capacity(components.len());
    for &component in &components {
        stats.push(registry.get(component)?.stats);
    }
    let stats = SortStats::composite(stats.iter());
    let kind = DisjunctiveSort { components };
    let canonical = kind.render(registry)?;
    if extend_in_place {
        let sort = registry.get_mut(a)?;
        sort.canonical = canonical;
        sort.stats = stats;
        sort.kind = SortKind::Disjunctive(kind);
        Ok(a)
    } else {
        Ok(registry.allocate(None, canonical, stats, SortKind::Disjunctive(kind)))
    }
}

/// Whether `a` contains `b`.
///
/// `a` contains `b` if they are equal, if a component of `a` contains `b`,
/// or if `b` is disjunctive and every component of `b` is contained in `a`.
/// Recursive sorts are followed through their instance; an aspects sort
/// contains its aspects.
pub fn contains(registry: &Registry, a: SortId, b: SortId) -> Result<bool, SortError> {
    if contains_one(registry, a, b, &mut HashSet::new())? {
        return Ok(true);
    }
    let parts = match registry.get(b)?.as_disjunctive() {
        Some(d) => d.components().to_vec(),
        None => return Ok(false),
    };
    for part in parts {
        if !contains_one(registry, a, part, &mut HashSet::new())? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Whether `a` is part of `b`.
pub fn part_of(registry: &Registry, a: SortId, b: SortId) -> Result<bool, SortError> {
    contains(registry, b, a)
}

fn contains_one(
    registry: &Registry,
    a: SortId,
    b: SortId,
    visited: &mut HashSet<SortId>,
) -> Result<bool, SortError> {
    let (outer, inner) = (registry.get(a)?, registry.get(b)?);
    if outer == inner {
        return Ok(true);
    }
    if !visited.insert(a) {
        return Ok(false);
    }
    let children: Vec<SortId> = match &outer.kind {
        SortKind::Disjunctive(d) => d.components().to_vec(),
        SortKind::Attribute(x) => vec![x.base(), x.weight()],
        SortKind::Recursive(r) => r.instance().into_iter().collect(),
        SortKind::Aspects(x) => x.aspects().to_vec(),
        SortKind::Primitive(_) | SortKind::Aspect(_) => Vec::new(),
    };
    for child in children {
        if contains_one(registry, child, b, visited)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Components an operand contributes to a disjunction.
fn spliced(sort: &Sort) -> Vec<SortId> {
    match sort.as_disjunctive() {
        Some(d) if !sort.is_named() => d.components().to_vec(),
        _ => vec![sort.id()],
    }
}

fn reject_aspects(sort: &Sort, context: &str) -> Result<(), SortError> {
    if sort.variant() == Variant::Aspects {
        return Err(SortError::IllegalArgument(format!(
            "aspects sort `{}` cannot be used in {}",
            sort.display(),
            context
        )));
    }
    Ok(())
}
