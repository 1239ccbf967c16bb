//! Primitive sorts: a characteristic category plus an optional argument.

use crate::arena::SortId;
use crate::error::SortError;
use crate::registry::Registry;

/// Argument payload of a primitive sort.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Argument {
    Identifier(String),
    /// Numeric bound, kept as written.
    Bound(String),
    /// `(language, region)`.
    Locale(String, String),
    /// Linked argument sorts.
    Sorts(Vec<SortId>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveSort {
    pub(crate) category: String,
    pub(crate) argument: Option<Argument>,
}

impl PrimitiveSort {
    pub fn new(category: impl Into<String>, argument: Option<Argument>) -> Self {
        Self {
            category: category.into(),
            argument,
        }
    }

    /// Characteristic category tag.
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn argument(&self) -> Option<&Argument> {
        self.argument.as_ref()
    }

    pub(crate) fn render(&self, registry: &Registry) -> Result<String, SortError> {
        let mut out = format!("[{}]", self.category);
        if let Some(argument) = &self.argument {
            out.push(' ');
            out.push_str(&render_argument(argument, registry)?);
        }
        Ok(out)
    }
}

pub(crate) fn render_argument(argument: &Argument, registry: &Registry) -> Result<String, SortError> {
    Ok(match argument {
        Argument::Identifier(text) => quote_unless_identifier(text),
        Argument::Bound(lexeme) => lexeme.clone(),
        Argument::Locale(language, region) => format!(
            "({}, {})",
            quote_unless_identifier(language),
            quote_unless_identifier(region)
        ),
        Argument::Sorts(sorts) => render_sort_tuple(sorts, registry)?,
    })
}

/// Renders `(x, y, …)` from display strings.
pub(crate) fn render_sort_tuple(sorts: &[SortId], registry: &Registry) -> Result<String, SortError> {
    let mut parts = Vec::with_capacity(sorts.len());
    for &sort in sorts {
        parts.push(registry.display(sort)?.to_string());
    }
    Ok(format!("({})", parts.join(", ")))
}

fn quote_unless_identifier(text: &str) -> String {
    let mut chars = text.chars();
    let is_identifier = match chars.next() {
        Some(first) => {
            (first.is_alphabetic() || first == '_') && chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        None => false,
    };
    if is_identifier {
        text.to_string()
    } else {
        format!("{:?}", text)
    }
}
