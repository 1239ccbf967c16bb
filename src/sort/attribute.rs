//! Attribute sorts: `base ^ weight`.
//!
//! The base is always simple. Chains are kept right-nested, so `(a^b)^c` and
//! `a^(b^c)` are the same sort and render as `a^b^c`.

use crate::arena::SortId;
use crate::error::SortError;
use crate::registry::Registry;
use crate::sort::Variant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSort {
    pub(crate) base: SortId,
    pub(crate) weight: SortId,
}

impl AttributeSort {
    pub fn base(&self) -> SortId {
        self.base
    }

    pub fn weight(&self) -> SortId {
        self.weight
    }

    pub(crate) fn render(&self, registry: &Registry) -> Result<String, SortError> {
        let weight = registry.get(self.weight)?;
        let weight_text = if weight.variant() == Variant::Disjunctive && !weight.is_named() {
            format!("({})", weight.display())
        } else {
            weight.display().to_string()
        };
        Ok(format!("{}^{}", registry.display(self.base)?, weight_text))
    }
}

/// Flattens an attribute chain into its elements: every base along the
/// right spine, then the final weight. Named attribute weights are
/// expanded too; recursive sorts stay opaque.
pub(crate) fn chain(registry: &Registry, sort: SortId) -> Result<Vec<SortId>, SortError> {
    let mut elements = Vec::new();
    let mut cursor = sort;
    loop {
        match registry.get(cursor)?.as_attribute() {
            Some(attribute) => {
                elements.push(attribute.base);
                cursor = attribute.weight;
            }
            None => {
                elements.push(cursor);
                return Ok(elements);
            }
        }
    }
}
