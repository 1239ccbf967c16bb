//! Disjunctive sorts: `a + b + …`.
//!
//! # Invariants
//! - No two components share a display string.
//! - No unnamed disjunctive sort is a direct component (it is spliced).
//! - The canonical string lists component display strings in sorted order,
//!   so the written order of a disjunction does not matter.

use crate::arena::SortId;
use crate::error::SortError;
use crate::registry::Registry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisjunctiveSort {
    pub(crate) components: Vec<SortId>,
}

impl DisjunctiveSort {
    /// Components in insertion order.
    pub fn components(&self) -> &[SortId] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub(crate) fn render(&self, registry: &Registry) -> Result<String, SortError> {
        let mut displays = Vec::with_capacity(self.components.len());
        for &component in &self.components {
            displays.push(registry.display(component)?);
        }
        displays.sort_unstable();
        Ok(displays.join("+"))
    }
}
