//! The sort model.
//!
//! A sort is a type in the compositional algebra. Every sort lives in the
//! arena of exactly one [`Registry`](crate::registry::Registry) and is
//! addressed by a [`SortId`]. The variant payload is a closed union:
//!
//! - [`PrimitiveSort`]: anchored to a characteristic category;
//! - [`AttributeSort`]: `base ^ weight`, base always simple;
//! - [`DisjunctiveSort`]: `a + b + …`, flat and duplicate-free;
//! - [`AspectsSort`] and its [`Aspect`] views: a bidirectional link;
//! - [`RecursiveSort`]: a named self-reference, bound once.
//!
//! # Strings
//! - The *canonical* string renders the structure, each component by its
//!   display string. It does not mention the sort's own name.
//! - The *display* string is the name when there is one, else the canonical
//!   string. Equality of sorts is registry identity plus display equality.

pub mod aspects;
pub mod attribute;
pub mod disjunctive;
pub mod primitive;
pub mod recursive;

pub use aspects::{Aspect, AspectsSort};
pub use attribute::AttributeSort;
pub use disjunctive::DisjunctiveSort;
pub use primitive::{Argument, PrimitiveSort};
pub use recursive::RecursiveSort;

use crate::arena::{RegistryId, SortId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Component counts of a sort: `(named, simple, total)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SortStats {
    pub named: u32,
    pub simple: u32,
    pub total: u32,
}

impl SortStats {
    /// Stats of an unnamed simple sort.
    pub const SIMPLE: SortStats = SortStats {
        named: 0,
        simple: 1,
        total: 1,
    };

    /// Stats of an unresolved self-reference.
    pub const PLACEHOLDER: SortStats = SortStats {
        named: 1,
        simple: 0,
        total: 1,
    };

    /// Stats of a composite over `parts`.
    pub fn composite<'a>(parts: impl IntoIterator<Item = &'a SortStats>) -> Self {
        let mut out = SortStats {
            named: 0,
            simple: 0,
            total: 1,
        };
        for part in parts {
            out.named += part.named;
            out.simple += part.simple;
            out.total += part.total;
        }
        out
    }

    /// Stats after giving an unnamed sort a name.
    pub fn renamed(self) -> Self {
        SortStats {
            named: self.named + 1,
            ..self
        }
    }

    /// Size used to scale match scores.
    #[inline]
    pub fn scale(&self) -> u32 {
        self.named + self.simple
    }
}

/// Variant tag of a sort, used for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Primitive,
    Attribute,
    Disjunctive,
    Aspects,
    Aspect,
    Recursive,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Variant::Primitive => "primitive",
            Variant::Attribute => "attribute",
            Variant::Disjunctive => "disjunctive",
            Variant::Aspects => "aspects",
            Variant::Aspect => "aspect",
            Variant::Recursive => "recursive",
        };
        f.write_str(label)
    }
}

/// Variant payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKind {
    Primitive(PrimitiveSort),
    Attribute(AttributeSort),
    Disjunctive(DisjunctiveSort),
    Aspects(AspectsSort),
    Aspect(Aspect),
    Recursive(RecursiveSort),
}

impl SortKind {
    pub fn variant(&self) -> Variant {
        match self {
            SortKind::Primitive(_) => Variant::Primitive,
            SortKind::Attribute(_) => Variant::Attribute,
            SortKind::Disjunctive(_) => Variant::Disjunctive,
            SortKind::Aspects(_) => Variant::Aspects,
            SortKind::Aspect(_) => Variant::Aspect,
            SortKind::Recursive(_) => Variant::Recursive,
        }
    }
}

/// A sort owned by a registry.
#[derive(Debug, Clone)]
pub struct Sort {
    pub(crate) id: SortId,
    pub(crate) name: Option<String>,
    pub(crate) canonical: String,
    pub(crate) created: u64,
    pub(crate) stats: SortStats,
    pub(crate) kind: SortKind,
}

impl Sort {
    #[inline]
    pub fn id(&self) -> SortId {
        self.id
    }

    #[inline]
    pub fn registry(&self) -> RegistryId {
        self.id.registry()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }

    /// Name if named, else the canonical string.
    pub fn display(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.canonical)
    }

    /// Structural string, components rendered by display string.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// The text this sort was defined by: `name: canonical` when named.
    pub fn definition(&self) -> String {
        match &self.name {
            Some(name) => format!("{}: {}", name, self.canonical),
            None => self.canonical.clone(),
        }
    }

    /// Registry timestamp of creation (monotonic within a registry).
    #[inline]
    pub fn created(&self) -> u64 {
        self.created
    }

    #[inline]
    pub fn stats(&self) -> SortStats {
        self.stats
    }

    #[inline]
    pub fn kind(&self) -> &SortKind {
        &self.kind
    }

    #[inline]
    pub fn variant(&self) -> Variant {
        self.kind.variant()
    }

    /// Primitive sorts and aspects are simple.
    pub fn is_simple(&self) -> bool {
        matches!(self.kind, SortKind::Primitive(_) | SortKind::Aspect(_))
    }

    pub fn as_primitive(&self) -> Option<&PrimitiveSort> {
        match &self.kind {
            SortKind::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_attribute(&self) -> Option<&AttributeSort> {
        match &self.kind {
            SortKind::Attribute(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_disjunctive(&self) -> Option<&DisjunctiveSort> {
        match &self.kind {
            SortKind::Disjunctive(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_aspects(&self) -> Option<&AspectsSort> {
        match &self.kind {
            SortKind::Aspects(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_aspect(&self) -> Option<&Aspect> {
        match &self.kind {
            SortKind::Aspect(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_recursive(&self) -> Option<&RecursiveSort> {
        match &self.kind {
            SortKind::Recursive(r) => Some(r),
            _ => None,
        }
    }
}

impl PartialEq for Sort {
    fn eq(&self, other: &Self) -> bool {
        self.registry() == other.registry() && self.display() == other.display()
    }
}

impl Eq for Sort {}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_stats_add_up() {
        let named = SortStats::SIMPLE.renamed();
        let stats = SortStats::composite([&SortStats::SIMPLE, &named]);
        assert_eq!(
            stats,
            SortStats {
                named: 1,
                simple: 2,
                total: 3
            }
        );
        assert_eq!(stats.scale(), 3);
    }
}
