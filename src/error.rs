//! Error types for the sort algebra and the definition parser.
//!
//! `SortError` is raised by algebra and registry operations; `Diagnostic`
//! is what `Registry::define` reports, always carrying the source position of
//! the offending token so a caret message can be rendered.

use crate::tokenizer::Position;
use std::fmt;
use thiserror::Error;

/// Failure of an algebra or registry operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SortError {
    /// A name is already registered, or a recursive sort was bound twice.
    #[error("illegal overwrite: {0}")]
    IllegalOverwrite(String),
    /// Cross-registry operation or an operand kind the operation rejects.
    #[error("illegal argument: {0}")]
    IllegalArgument(String),
    /// A sort handle that is not (or no longer) live in this registry.
    #[error("unknown sort: {0}")]
    UnknownSort(String),
}

/// Classification of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Malformed input.
    Parse,
    IllegalOverwrite,
    IllegalArgument,
    /// A definition whose body is its own placeholder with no indirection.
    CyclicDefinition,
    UndefinedSort,
    UnknownCategory,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiagnosticKind::Parse => "parse error",
            DiagnosticKind::IllegalOverwrite => "illegal overwrite",
            DiagnosticKind::IllegalArgument => "illegal argument",
            DiagnosticKind::CyclicDefinition => "cyclic definition",
            DiagnosticKind::UndefinedSort => "undefined sort",
            DiagnosticKind::UnknownCategory => "unknown category",
        };
        f.write_str(label)
    }
}

/// A positioned error produced while compiling definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at {position}: {message}")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub position: Position,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            message: message.into(),
            position,
        }
    }

    /// Attaches a source position to an algebra error.
    pub fn at(error: SortError, position: Position) -> Self {
        let (kind, message) = match error {
            SortError::IllegalOverwrite(m) => (DiagnosticKind::IllegalOverwrite, m),
            SortError::IllegalArgument(m) => (DiagnosticKind::IllegalArgument, m),
            SortError::UnknownSort(m) => (DiagnosticKind::UndefinedSort, m),
        };
        Self::new(kind, message, position)
    }

    /// Renders the offending source line with a caret under the position.
    ///
    /// ```
    /// use sortal::error::{Diagnostic, DiagnosticKind};
    /// use sortal::tokenizer::Position;
    ///
    /// let d = Diagnostic::new(DiagnosticKind::UndefinedSort, "`q` is not defined", Position::new(1, 4));
    /// assert_eq!(
    ///     d.render("a: q"),
    ///     "undefined sort at 1:4: `q` is not defined\n  a: q\n     ^"
    /// );
    /// ```
    pub fn render(&self, source: &str) -> String {
        let line = source
            .lines()
            .nth(self.position.line.saturating_sub(1) as usize)
            .unwrap_or("");
        let pad: String = line
            .chars()
            .take(self.position.column.saturating_sub(1) as usize)
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();
        format!("{}\n  {}\n  {}^", self, line, pad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algebra_errors_keep_their_kind() {
        let d = Diagnostic::at(
            SortError::IllegalOverwrite("`a` already defined".into()),
            Position::new(2, 1),
        );
        assert_eq!(d.kind, DiagnosticKind::IllegalOverwrite);
        assert_eq!(d.to_string(), "illegal overwrite at 2:1: `a` already defined");
    }

    #[test]
    fn caret_points_into_second_line() {
        let d = Diagnostic::new(DiagnosticKind::Parse, "expected `:`", Position::new(2, 3));
        let rendered = d.render("a: [Label]\nb  [Label]");
        assert!(rendered.ends_with("\n  b  [Label]\n    ^"));
    }
}
