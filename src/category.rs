//! Contract with the external category registry.
//!
//! A characteristic category is a tag such as `Label` or `Relation` naming the
//! primitive behaviour a primitive or aspects sort uses. The core only needs
//! two things from whoever owns the categories: the *shape* of the arguments a
//! tag accepts (consulted at parse time) and a factory producing an opaque
//! container for a sort. The container is forwarded, never inspected.

use crate::arena::SortId;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

/// Opaque container created for a sort by the category owner.
pub type Form = Box<dyn Any>;

/// Factory callback producing a form for a sort.
pub type FormFactory = Box<dyn Fn(SortId) -> Form>;

/// Argument shape a category accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamShape {
    /// No arguments.
    Nothing,
    /// A single identifier or string.
    Identifier,
    /// A single numeric bound.
    Bound,
    /// A `(language, region)` pair.
    Locale,
    /// A tuple of exactly `n` sorts; also the aspect cardinality.
    Sorts(usize),
}

impl ParamShape {
    /// Number of argument positions the shape declares.
    pub fn cardinality(&self) -> usize {
        match self {
            ParamShape::Nothing => 0,
            ParamShape::Identifier | ParamShape::Bound => 1,
            ParamShape::Locale => 2,
            ParamShape::Sorts(n) => *n,
        }
    }
}

/// Parameter-shape descriptor of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CategoryShape {
    pub params: ParamShape,
}

impl CategoryShape {
    pub const fn new(params: ParamShape) -> Self {
        Self { params }
    }

    #[inline]
    pub fn cardinality(&self) -> usize {
        self.params.cardinality()
    }
}

/// Source of category shapes and forms.
///
/// Implemented by the application that owns the individuals classified by
/// sorts. `tag` is `None` when the sort is a composite with no single
/// characteristic category.
pub trait CategorySource {
    /// Returns the argument shape of `tag`, or `None` if the tag is unknown.
    fn shape(&self, tag: &str) -> Option<CategoryShape>;

    /// Creates a container for an individual of `sort`.
    fn new_form(&self, tag: Option<&str>, sort: SortId) -> Option<Form>;
}

/// In-memory category table.
///
/// ```
/// use sortal::category::{CategorySource, CategoryTable, ParamShape};
///
/// let table = CategoryTable::new()
///     .with_category("Label", ParamShape::Identifier)
///     .with_category("Relation", ParamShape::Sorts(2));
/// assert_eq!(table.shape("Relation").unwrap().cardinality(), 2);
/// assert!(table.shape("Missing").is_none());
/// ```
#[derive(Default)]
pub struct CategoryTable {
    shapes: BTreeMap<String, CategoryShape>,
    factories: BTreeMap<String, FormFactory>,
}

/// Tag under which the factory for composite sorts is registered.
pub const COMPOSITE_TAG: &str = "*";

impl CategoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a category.
    pub fn with_category(mut self, tag: impl Into<String>, params: ParamShape) -> Self {
        self.shapes.insert(tag.into(), CategoryShape::new(params));
        self
    }

    /// Registers the form factory of `tag` (use [`COMPOSITE_TAG`] for
    /// composite sorts).
    pub fn with_factory(
        mut self,
        tag: impl Into<String>,
        factory: impl Fn(SortId) -> Form + 'static,
    ) -> Self {
        self.factories.insert(tag.into(), Box::new(factory));
        self
    }

    /// Tags in lexical order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.shapes.keys().map(String::as_str)
    }
}

impl CategorySource for CategoryTable {
    fn shape(&self, tag: &str) -> Option<CategoryShape> {
        self.shapes.get(tag).copied()
    }

    fn new_form(&self, tag: Option<&str>, sort: SortId) -> Option<Form> {
        let factory = self.factories.get(tag.unwrap_or(COMPOSITE_TAG))?;
        Some(factory(sort))
    }
}

impl fmt::Debug for CategoryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CategoryTable")
            .field("shapes", &self.shapes)
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
