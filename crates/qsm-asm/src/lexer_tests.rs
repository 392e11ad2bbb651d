use crate::AsmError;
use crate::ast::Pos;
use crate::lexer::{LineIndex, TokenKind, lex, token_text, unescape};

fn kinds(source: &str) -> Vec<TokenKind> {
    lex(source).unwrap().iter().map(|t| t.kind).collect()
}

#[test]
fn directive_line_tokens() {
    assert_eq!(
        kinds(".func int main() export:"),
        vec![
            TokenKind::Dot,
            TokenKind::Ident,
            TokenKind::Ident,
            TokenKind::Ident,
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::Ident,
            TokenKind::Colon,
        ]
    );
}

#[test]
fn newlines_are_tokens_and_comments_are_not() {
    assert_eq!(
        kinds("nop ; does nothing\nret"),
        vec![TokenKind::Ident, TokenKind::Newline, TokenKind::Ident]
    );
}

#[test]
fn literal_kinds() {
    assert_eq!(
        kinds(r#"db 12 -3 1.5 \x1F 'a' "hi" { 1, 2 }"#),
        vec![
            TokenKind::Ident,
            TokenKind::Int,
            TokenKind::Int,
            TokenKind::Float,
            TokenKind::HexInt,
            TokenKind::Char,
            TokenKind::Str,
            TokenKind::LBrace,
            TokenKind::Int,
            TokenKind::Comma,
            TokenKind::Int,
            TokenKind::RBrace,
        ]
    );
}

#[test]
fn sigil_identifiers_are_single_tokens() {
    let tokens = lex("$loop #tmp").unwrap();
    assert_eq!(token_text("$loop #tmp", &tokens[0]), "$loop");
    assert_eq!(token_text("$loop #tmp", &tokens[1]), "#tmp");
}

#[test]
fn unknown_character_reports_position() {
    let err = lex("nop\n  @").unwrap_err();
    assert_eq!(
        err,
        AsmError::Syntax {
            message: "unexpected character \"@\"".to_string(),
            pos: Pos::new(2, 3),
        }
    );
}

#[test]
fn line_index_maps_offsets() {
    let index = LineIndex::new("ab\ncd\n");
    assert_eq!(index.pos(0), Pos::new(1, 1));
    assert_eq!(index.pos(1), Pos::new(1, 2));
    assert_eq!(index.pos(3), Pos::new(2, 1));
    assert_eq!(index.pos(6), Pos::new(3, 1));
}

#[test]
fn unescape_handles_the_supported_escapes() {
    assert_eq!(unescape(r"a\nb\tc\0\\"), "a\nb\tc\0\\");
    assert_eq!(unescape(r#"\"quoted\""#), "\"quoted\"");
    assert_eq!(unescape(r"\q"), "\\q");
}
