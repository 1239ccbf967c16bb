//! Recursive-descent compiler from definition text to sorts.
//!
//! ```text
//! source      := item (';' item)* ';'?
//! item        := definition | aspects | expression
//! definition  := IDENT ':' expression
//! aspects     := '(' IDENT (',' IDENT)+ ')' ':' '[' IDENT ']' args
//! expression  := term ('+' term)*
//! term        := factor ('^' factor)*
//! factor      := '(' (definition | aspects | expression) ')' | IDENT | primitive
//! primitive   := '[' IDENT ']' args?
//! args        := IDENT | STRING | NUMBER | '(' arg (',' arg)* ')'
//! ```
//!
//! A definition pushes its name on the registry's hook stack before its body
//! is parsed. A reference to that name inside the body becomes a recursive
//! placeholder, bound to the body once it is complete. Any failure rolls back
//! every sort the call created.

use crate::arena::SortId;
use crate::category::ParamShape;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::operations::{combine, declare_aspects, duplicate, primitive, sum};
use crate::registry::Registry;
use crate::sort::Argument;
use crate::tokenizer::{Position, Token, TokenKind, Tokenizer};
use tracing::debug;

/// Compiles `text`, returning every top-level sort in order.
pub(crate) fn define_all(registry: &mut Registry, text: &str) -> Result<Vec<SortId>, Diagnostic> {
    registry.begin_session();
    let result = match Tokenizer::new(text) {
        Ok(tokens) => Parser {
            registry: &mut *registry,
            tokens,
        }
        .source(),
        Err(diagnostic) => Err(diagnostic),
    };
    match result {
        Ok(sorts) => {
            debug!(registry = %registry.config().label, count = sorts.len(), "definitions compiled");
            Ok(sorts)
        }
        Err(diagnostic) => {
            let removed = registry.undo_new_sorts();
            debug!(
                registry = %registry.config().label,
                removed,
                error = %diagnostic,
                "definition failed"
            );
            Err(diagnostic)
        }
    }
}

/// Compiles `text`, returning its last top-level sort.
pub(crate) fn define(registry: &mut Registry, text: &str) -> Result<SortId, Diagnostic> {
    let sorts = define_all(registry, text)?;
    sorts.last().copied().ok_or_else(|| {
        Diagnostic::new(DiagnosticKind::Parse, "nothing was defined", Position::new(1, 1))
    })
}

struct Parser<'r, 's> {
    registry: &'r mut Registry,
    tokens: Tokenizer<'s>,
}

impl<'r, 's> Parser<'r, 's> {
    fn source(mut self) -> Result<Vec<SortId>, Diagnostic> {
        let mut sorts = Vec::new();
        loop {
            sorts.push(self.item()?);
            if self.at(&TokenKind::Semicolon) {
                self.tokens.advance()?;
                if self.at(&TokenKind::Eof) {
                    return Ok(sorts);
                }
            } else if self.at(&TokenKind::Eof) {
                return Ok(sorts);
            } else {
                return Err(self.unexpected("`;` or end of input"));
            }
        }
    }

    fn item(&mut self) -> Result<SortId, Diagnostic> {
        if self.at(&TokenKind::Eof) {
            return Err(self.unexpected("a definition"));
        }
        if self.at(&TokenKind::LParen) {
            let open = self.tokens.advance()?;
            let tuple = self.tokens.current().ident().is_some()
                && self.tokens.preview()?.is(&TokenKind::Comma);
            self.tokens.push_back(open)?;
            return if tuple {
                self.aspects()
            } else {
                self.expression()
            };
        }
        if self.tokens.current().ident().is_some() && self.tokens.preview()?.is(&TokenKind::Colon) {
            return self.definition();
        }
        self.expression()
    }

    fn definition(&mut self) -> Result<SortId, Diagnostic> {
        let (name, position) = self.expect_ident()?;
        self.expect(TokenKind::Colon)?;
        self.registry
            .push_hook(&name)
            .map_err(|e| Diagnostic::at(e, position))?;
        let body = self.expression()?;
        let hook = self.registry.pop_hook().ok_or_else(|| {
            Diagnostic::new(DiagnosticKind::Parse, "definition hook vanished", position)
        })?;
        match hook.placeholder {
            Some(placeholder) if placeholder == body => Err(Diagnostic::new(
                DiagnosticKind::CyclicDefinition,
                format!("`{}` is defined as itself", name),
                position,
            )),
            Some(placeholder) => {
                self.registry
                    .bind(placeholder, body)
                    .and_then(|_| self.registry.register(placeholder))
                    .map_err(|e| Diagnostic::at(e, position))?;
                Ok(placeholder)
            }
            None => {
                let pending = self
                    .registry
                    .get(body)
                    .ok()
                    .filter(|sort| sort.as_recursive().map_or(false, |rec| !rec.is_bound()))
                    .map(|sort| sort.display().to_string());
                if let Some(outer) = pending {
                    return Err(Diagnostic::new(
                        DiagnosticKind::CyclicDefinition,
                        format!("`{}` is defined as `{}`, which is still being defined", name, outer),
                        position,
                    ));
                }
                let named = duplicate(self.registry, body, &name)
                    .and_then(|named| self.registry.register(named).map(|_| named))
                    .map_err(|e| Diagnostic::at(e, position))?;
                Ok(named)
            }
        }
    }

    fn aspects(&mut self) -> Result<SortId, Diagnostic> {
        let open = self.expect(TokenKind::LParen)?;
        let mut names = vec![self.expect_ident()?.0];
        while self.at(&TokenKind::Comma) {
            self.tokens.advance()?;
            names.push(self.expect_ident()?.0);
        }
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Colon)?;
        self.expect(TokenKind::LBracket)?;
        let (tag, tag_position) = self.expect_ident()?;
        self.expect(TokenKind::RBracket)?;
        let arity = match self.shape(&tag, tag_position)? {
            ParamShape::Sorts(n) => n,
            _ => {
                return Err(Diagnostic::new(
                    DiagnosticKind::IllegalArgument,
                    format!("[{}] does not link sorts", tag),
                    tag_position,
                ))
            }
        };
        if names.len() != arity {
            return Err(Diagnostic::new(
                DiagnosticKind::IllegalArgument,
                format!(
                    "tuple names {} aspects but [{}] links {} sorts",
                    names.len(),
                    tag,
                    arity
                ),
                open.position,
            ));
        }
        if !self.at(&TokenKind::LParen) {
            return Err(self.unexpected("the linked sorts"));
        }
        let arguments = self.sort_tuple(arity, &tag)?;
        declare_aspects(self.registry, &tag, names, arguments)
            .map_err(|e| Diagnostic::at(e, open.position))
    }

    fn expression(&mut self) -> Result<SortId, Diagnostic> {
        let mut acc = self.term()?;
        while self.at(&TokenKind::Plus) {
            let op = self.tokens.advance()?;
            let rhs = self.term()?;
            acc = sum(self.registry, acc, rhs).map_err(|e| Diagnostic::at(e, op.position))?;
        }
        Ok(acc)
    }

    fn term(&mut self) -> Result<SortId, Diagnostic> {
        let mut factors = vec![(self.tokens.current().position, self.factor()?)];
        while self.at(&TokenKind::Caret) {
            self.tokens.advance()?;
            factors.push((self.tokens.current().position, self.factor()?));
        }
        let mut iter = factors.into_iter().rev();
        let Some((_, mut acc)) = iter.next() else {
            return Err(self.unexpected("a sort"));
        };
        for (position, base) in iter {
            acc = combine(self.registry, base, acc).map_err(|e| Diagnostic::at(e, position))?;
        }
        Ok(acc)
    }

    fn factor(&mut self) -> Result<SortId, Diagnostic> {
        match &self.tokens.current().kind {
            TokenKind::LParen => {
                let open = self.tokens.advance()?;
                if self.tokens.current().ident().is_some() {
                    if self.tokens.preview()?.is(&TokenKind::Comma) {
                        self.tokens.push_back(open)?;
                        return self.aspects();
                    }
                    if self.tokens.preview()?.is(&TokenKind::Colon) {
                        let inner = self.definition()?;
                        self.expect(TokenKind::RParen)?;
                        return Ok(inner);
                    }
                }
                let inner = self.expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(_) => {
                let (name, position) = self.expect_ident()?;
                if let Some(placeholder) = self.registry.hook_reference(&name) {
                    return Ok(placeholder);
                }
                self.registry.sort_of(&name).ok_or_else(|| {
                    Diagnostic::new(
                        DiagnosticKind::UndefinedSort,
                        format!("`{}` is not defined", name),
                        position,
                    )
                })
            }
            TokenKind::LBracket => self.primitive(),
            _ => Err(self.unexpected("a sort")),
        }
    }

    fn primitive(&mut self) -> Result<SortId, Diagnostic> {
        let open = self.expect(TokenKind::LBracket)?;
        let (tag, tag_position) = self.expect_ident()?;
        self.expect(TokenKind::RBracket)?;
        let shape = self.shape(&tag, tag_position)?;
        let argument = if shape != ParamShape::Nothing && self.at_argument() {
            Some(self.argument(&tag, shape)?)
        } else {
            None
        };
        primitive(self.registry, &tag, argument).map_err(|e| Diagnostic::at(e, open.position))
    }

    fn argument(&mut self, tag: &str, shape: ParamShape) -> Result<Argument, Diagnostic> {
        let token = self.tokens.current().clone();
        let mismatch = |expected: &str| {
            Diagnostic::new(
                DiagnosticKind::IllegalArgument,
                format!(
                    "[{}] expects {}, found {}",
                    tag,
                    expected,
                    token.kind.describe()
                ),
                token.position,
            )
        };
        match (shape, &token.kind) {
            (ParamShape::Identifier, TokenKind::Ident(text) | TokenKind::Str(text)) => {
                self.tokens.advance()?;
                Ok(Argument::Identifier(text.clone()))
            }
            (ParamShape::Identifier, _) => Err(mismatch("an identifier")),
            (ParamShape::Bound, TokenKind::Number(lexeme)) => {
                self.tokens.advance()?;
                Ok(Argument::Bound(lexeme.clone()))
            }
            (ParamShape::Bound, _) => Err(mismatch("a number")),
            (ParamShape::Locale, TokenKind::LParen) => {
                self.tokens.advance()?;
                let language = self.word()?;
                self.expect(TokenKind::Comma)?;
                let region = self.word()?;
                self.expect(TokenKind::RParen)?;
                Ok(Argument::Locale(language, region))
            }
            (ParamShape::Locale, _) => Err(mismatch("a (language, region) pair")),
            (ParamShape::Sorts(n), TokenKind::LParen) => Ok(Argument::Sorts(self.sort_tuple(n, tag)?)),
            (ParamShape::Sorts(n), _) => Err(mismatch(&format!("a tuple of {} sorts", n))),
            (ParamShape::Nothing, _) => Err(mismatch("no argument")),
        }
    }

    /// `'(' expression (',' expression)* ')'` with exactly `arity` entries.
    fn sort_tuple(&mut self, arity: usize, tag: &str) -> Result<Vec<SortId>, Diagnostic> {
        let open = self.expect(TokenKind::LParen)?;
        let mut sorts = vec![self.expression()?];
        while self.at(&TokenKind::Comma) {
            self.tokens.advance()?;
            sorts.push(self.expression()?);
        }
        self.expect(TokenKind::RParen)?;
        if sorts.len() != arity {
            return Err(Diagnostic::new(
                DiagnosticKind::IllegalArgument,
                format!("[{}] links {} sorts, found {}", tag, arity, sorts.len()),
                open.position,
            ));
        }
        Ok(sorts)
    }

    /// An identifier or string, as text.
    fn word(&mut self) -> Result<String, Diagnostic> {
        match &self.tokens.current().kind {
            TokenKind::Ident(text) | TokenKind::Str(text) => {
                let text = text.clone();
                self.tokens.advance()?;
                Ok(text)
            }
            _ => Err(self.unexpected("an identifier or string")),
        }
    }

    fn shape(&self, tag: &str, position: Position) -> Result<ParamShape, Diagnostic> {
        self.registry
            .categories()
            .shape(tag)
            .map(|shape| shape.params)
            .ok_or_else(|| {
                Diagnostic::new(
                    DiagnosticKind::UnknownCategory,
                    format!("unknown category [{}]", tag),
                    position,
                )
            })
    }

    fn at_argument(&self) -> bool {
        matches!(
            self.tokens.current().kind,
            TokenKind::Ident(_) | TokenKind::Str(_) | TokenKind::Number(_) | TokenKind::LParen
        )
    }

    #[inline]
    fn at(&self, kind: &TokenKind) -> bool {
        self.tokens.current().is(kind)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, Diagnostic> {
        if self.at(&kind) {
            self.tokens.advance()
        } else {
            Err(self.unexpected(&kind.describe()))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Position), Diagnostic> {
        let token = self.tokens.current();
        match token.ident() {
            Some(name) => {
                let found = (name.to_string(), token.position);
                self.tokens.advance()?;
                Ok(found)
            }
            None => Err(self.unexpected("an identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> Diagnostic {
        let token = self.tokens.current();
        Diagnostic::new(
            DiagnosticKind::Parse,
            format!("expected {}, found {}", expected, token.kind.describe()),
            token.position,
        )
    }
}
