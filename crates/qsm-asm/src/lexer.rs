//! Lexer for the assembly source dialect.
//!
//! Produces span-based tokens; text is sliced from the source only when
//! needed. Newlines are real tokens because instruction lines end at end of
//! line; `;` comments and horizontal whitespace are skipped.

use logos::Logos;
use std::ops::Range;

use crate::ast::Pos;
use crate::{AsmError, Result};

#[derive(Logos, Clone, Copy, Debug, PartialEq, Eq)]
#[logos(skip r"[ \t\r]+")]
#[logos(skip(r";[^\n]*", allow_greedy = true))]
pub enum TokenKind {
    #[token("\n")]
    Newline,

    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,

    /// Identifiers allow the original dialect's sigil characters, so
    /// block-local labels like `$loop` are single tokens.
    #[regex(r"[A-Za-z_$#%!][A-Za-z0-9_$#%!]*")]
    Ident,

    #[regex(r"-?[0-9]+")]
    Int,

    /// `\xFF`-style hex integer literal.
    #[regex(r"\\x[0-9a-fA-F]+")]
    HexInt,

    #[regex(r"-?[0-9]+\.[0-9]+")]
    Float,

    #[regex(r"'(\\.|[^'\\])'")]
    Char,

    #[regex(r#""(\\.|[^"\\])*""#)]
    Str,
}

/// Zero-copy token: kind plus span into the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: (u32, u32),
}

impl Token {
    pub fn range(&self) -> Range<usize> {
        self.span.0 as usize..self.span.1 as usize
    }
}

/// Retrieves the text slice for a token.
pub fn token_text<'s>(source: &'s str, token: &Token) -> &'s str {
    &source[token.range()]
}

/// Maps byte offsets to 1-based line/column positions.
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self { line_starts }
    }

    pub fn pos(&self, offset: u32) -> Pos {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        Pos::new(line as u32 + 1, offset - self.line_starts[line] + 1)
    }
}

/// Tokenizes the whole source. Any character the grammar does not know is a
/// syntax error at its position.
pub fn lex(source: &str) -> Result<Vec<Token>> {
    let index = LineIndex::new(source);
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(kind) => tokens.push(Token {
                kind,
                span: (span.start as u32, span.end as u32),
            }),
            Err(()) => {
                return Err(AsmError::Syntax {
                    message: format!("unexpected character {:?}", &source[span.clone()]),
                    pos: index.pos(span.start as u32),
                });
            }
        }
    }
    Ok(tokens)
}

/// Decodes the escapes the dialect supports inside char and string literals.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
