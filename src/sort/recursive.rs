//! Recursive sorts.
//!
//! A recursive sort is created unbound while its own definition is being
//! parsed, then bound exactly once to the sort its body built. Once bound,
//! canonical string, statistics and category queries are those of the
//! instance.

use crate::arena::SortId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecursiveSort {
    pub(crate) instance: Option<SortId>,
}

impl RecursiveSort {
    pub fn instance(&self) -> Option<SortId> {
        self.instance
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.instance.is_some()
    }
}
