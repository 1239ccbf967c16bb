//! Lexer for sort definitions.
//!
//! Produces typed tokens with their source position. The tokenizer is a pull
//! source: `current()` is the token under the cursor, `preview()` looks one
//! token further without consuming, `advance()` moves on, and `push_back()`
//! returns a single token to the front of the stream.

use crate::error::{Diagnostic, DiagnosticKind};
use std::fmt;

/// 1-based source position of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    #[inline]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Token kinds of the definition grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    /// Numeric lexeme, kept verbatim so bounds compare exactly.
    Number(String),
    Str(String),
    Colon,
    Semicolon,
    Comma,
    Plus,
    Caret,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eof,
}

impl TokenKind {
    /// Short human name used in "expected ..." diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier `{}`", name),
            TokenKind::Number(n) => format!("number `{}`", n),
            TokenKind::Str(s) => format!("string \"{}\"", s),
            TokenKind::Colon => "`:`".to_string(),
            TokenKind::Semicolon => "`;`".to_string(),
            TokenKind::Comma => "`,`".to_string(),
            TokenKind::Plus => "`+`".to_string(),
            TokenKind::Caret => "`^`".to_string(),
            TokenKind::LParen => "`(`".to_string(),
            TokenKind::RParen => "`)`".to_string(),
            TokenKind::LBracket => "`[`".to_string(),
            TokenKind::RBracket => "`]`".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

impl Token {
    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    #[inline]
    pub fn is(&self, kind: &TokenKind) -> bool {
        &self.kind == kind
    }
}

/// Character-level scanner with one token of lookahead and one of push-back.
pub struct Tokenizer<'s> {
    chars: std::iter::Peekable<std::str::Chars<'s>>,
    line: u32,
    column: u32,
    current: Token,
    lookahead: Option<Token>,
    pushed: Option<Token>,
}

impl<'s> Tokenizer<'s> {
    /// Creates a tokenizer positioned on the first token of `source`.
    pub fn new(source: &'s str) -> Result<Self, Diagnostic> {
        let mut tokenizer = Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
            current: Token {
                kind: TokenKind::Eof,
                position: Position::new(1, 1),
            },
            lookahead: None,
            pushed: None,
        };
        tokenizer.current = tokenizer.scan()?;
        Ok(tokenizer)
    }

    /// The token under the cursor.
    #[inline]
    pub fn current(&self) -> &Token {
        &self.current
    }

    /// The token after the current one, without consuming anything.
    pub fn preview(&mut self) -> Result<&Token, Diagnostic> {
        if self.pushed.is_none() && self.lookahead.is_none() {
            self.lookahead = Some(self.scan()?);
        }
        Ok(self
            .pushed
            .as_ref()
            .or(self.lookahead.as_ref())
            .unwrap_or(&self.current))
    }

    /// Consumes the current token and returns it.
    pub fn advance(&mut self) -> Result<Token, Diagnostic> {
        let next = match self.pushed.take() {
            Some(token) => token,
            None => match self.lookahead.take() {
                Some(token) => token,
                None => self.scan()?,
            },
        };
        Ok(std::mem::replace(&mut self.current, next))
    }

    /// Makes `token` current again; the previous current token becomes the
    /// next one. Only one token can be pushed back at a time.
    pub fn push_back(&mut self, token: Token) -> Result<(), Diagnostic> {
        if self.pushed.is_some() {
            return Err(Diagnostic::new(
                DiagnosticKind::Parse,
                "tokenizer push-back buffer is full",
                token.position,
            ));
        }
        let displaced = std::mem::replace(&mut self.current, token);
        self.pushed = Some(displaced);
        Ok(())
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' {
                self.skip_line();
            } else if c == '/' {
                let mut ahead = self.chars.clone();
                ahead.next();
                if ahead.peek() == Some(&'/') {
                    self.skip_line();
                } else {
                    break;
                }
            } else {
                break;
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
    }

    fn scan(&mut self) -> Result<Token, Diagnostic> {
        self.skip_trivia();
        let position = Position::new(self.line, self.column);
        let Some(&c) = self.chars.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                position,
            });
        };
        let kind = match c {
            ':' => self.single(TokenKind::Colon),
            ';' => self.single(TokenKind::Semicolon),
            ',' => self.single(TokenKind::Comma),
            '+' => self.single(TokenKind::Plus),
            '^' => self.single(TokenKind::Caret),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            '"' => self.string(position)?,
            c if c.is_ascii_digit() || c == '-' => self.number(position)?,
            c if c.is_alphabetic() || c == '_' => self.identifier(),
            other => {
                return Err(Diagnostic::new(
                    DiagnosticKind::Parse,
                    format!("unexpected character `{}`", other),
                    position,
                ))
            }
        };
        Ok(Token { kind, position })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    fn identifier(&mut self) -> TokenKind {
        let mut name = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        TokenKind::Ident(name)
    }

    fn number(&mut self, position: Position) -> Result<TokenKind, Diagnostic> {
        let mut lexeme = String::new();
        if self.chars.peek() == Some(&'-') {
            lexeme.push('-');
            self.bump();
        }
        self.digits(&mut lexeme);
        if lexeme.is_empty() || lexeme == "-" {
            return Err(Diagnostic::new(
                DiagnosticKind::Parse,
                "expected digits after `-`",
                position,
            ));
        }
        if self.chars.peek() == Some(&'.') {
            lexeme.push('.');
            self.bump();
            let before = lexeme.len();
            self.digits(&mut lexeme);
            if lexeme.len() == before {
                return Err(Diagnostic::new(
                    DiagnosticKind::Parse,
                    "expected digits after decimal point",
                    position,
                ));
            }
        }
        Ok(TokenKind::Number(lexeme))
    }

    fn digits(&mut self, out: &mut String) {
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                out.push(c);
                self.bump();
            } else {
                break;
            }
        }
    }

    fn string(&mut self, position: Position) -> Result<TokenKind, Diagnostic> {
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(TokenKind::Str(text)),
                Some('\\') => match self.bump() {
                    Some(escaped @ ('"' | '\\')) => text.push(escaped),
                    Some('n') => text.push('\n'),
                    Some(other) => {
                        text.push('\\');
                        text.push(other);
                    }
                    None => break,
                },
                Some(c) => text.push(c),
                None => break,
            }
        }
        Err(Diagnostic::new(
            DiagnosticKind::Parse,
            "unterminated string literal",
            position,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut tokenizer = Tokenizer::new(source).unwrap();
        let mut out = Vec::new();
        loop {
            let token = tokenizer.advance().unwrap();
            let done = token.kind == TokenKind::Eof;
            out.push(token.kind);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn lexes_definition() {
        assert_eq!(
            kinds("a: [Label] x ^ (b + c);"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Colon,
                TokenKind::LBracket,
                TokenKind::Ident("Label".into()),
                TokenKind::RBracket,
                TokenKind::Ident("x".into()),
                TokenKind::Caret,
                TokenKind::LParen,
                TokenKind::Ident("b".into()),
                TokenKind::Plus,
                TokenKind::Ident("c".into()),
                TokenKind::RParen,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn numbers_strings_and_comments() {
        assert_eq!(
            kinds("// header\n-12.5 \"a \\\"q\\\"\" # tail"),
            vec![
                TokenKind::Number("-12.5".into()),
                TokenKind::Str("a \"q\"".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tracks_positions() {
        let mut tokenizer = Tokenizer::new("a:\n  [B]").unwrap();
        assert_eq!(tokenizer.advance().unwrap().position, Position::new(1, 1));
        assert_eq!(tokenizer.advance().unwrap().position, Position::new(1, 2));
        assert_eq!(tokenizer.current().position, Position::new(2, 3));
    }

    #[test]
    fn preview_and_push_back() {
        let mut tokenizer = Tokenizer::new("x , y").unwrap();
        assert_eq!(tokenizer.current().ident(), Some("x"));
        assert!(tokenizer.preview().unwrap().is(&TokenKind::Comma));
        let x = tokenizer.advance().unwrap();
        assert!(tokenizer.current().is(&TokenKind::Comma));
        tokenizer.push_back(x.clone()).unwrap();
        assert_eq!(tokenizer.current(), &x);
        assert!(tokenizer.preview().unwrap().is(&TokenKind::Comma));
        assert!(tokenizer.push_back(x).is_err());
        tokenizer.advance().unwrap();
        tokenizer.advance().unwrap();
        assert_eq!(tokenizer.current().ident(), Some("y"));
    }

    #[test]
    fn rejects_unterminated_string() {
        let err = Tokenizer::new("\"open").err().unwrap();
        assert_eq!(err.kind, DiagnosticKind::Parse);
        assert_eq!(err.position, Position::new(1, 1));
    }

    #[test]
    fn rejects_stray_character() {
        let err = Tokenizer::new("a @").and_then(|mut t| t.advance().map(|_| ()));
        let err = err.err().unwrap();
        assert_eq!(err.position, Position::new(1, 3));
    }
}
