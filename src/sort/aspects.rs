//! Aspects sorts and their aspect views.
//!
//! `(src, dst): [Relation] (X, Y)` declares one aspects sort anchored to the
//! `Relation` category, linked to `X` and `Y`, with two named views: `src`
//! sits in slot 0 and reaches `X`, `dst` sits in slot 1 and reaches `Y`.

use crate::arena::SortId;
use crate::error::SortError;
use crate::registry::Registry;
use crate::sort::primitive::render_sort_tuple;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AspectsSort {
    pub(crate) category: String,
    pub(crate) aspects: Vec<SortId>,
    pub(crate) arguments: Vec<SortId>,
}

impl AspectsSort {
    pub fn category(&self) -> &str {
        &self.category
    }

    /// The aspect views, by slot.
    pub fn aspects(&self) -> &[SortId] {
        &self.aspects
    }

    /// Linked argument sorts, by slot.
    pub fn arguments(&self) -> &[SortId] {
        &self.arguments
    }

    pub fn cardinality(&self) -> usize {
        self.aspects.len()
    }

    pub(crate) fn render(&self, registry: &Registry) -> Result<String, SortError> {
        Ok(format!(
            "[{}] {}",
            self.category,
            render_sort_tuple(&self.arguments, registry)?
        ))
    }
}

/// One slot of an aspects sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aspect {
    pub(crate) owner: SortId,
    pub(crate) position: usize,
}

impl Aspect {
    pub fn owner(&self) -> SortId {
        self.owner
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn render(owner_canonical: &str, position: usize) -> String {
        format!("{}@{}", owner_canonical, position)
    }
}

/// Tuple string naming an aspects sort, e.g. `(src, dst)`.
pub(crate) fn tuple_name(names: &[String]) -> String {
    format!("({})", names.join(", "))
}
