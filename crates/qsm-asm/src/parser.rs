//! Parser: token stream to assembly document.
//!
//! Fixed-grammar directives (`.section`, `.type`, `.func`, `.var`, `.label`,
//! `.export`) plus free-form statement lines (`opcode operand, operand`).
//! Statement lines end at the newline. The parser performs no semantic
//! checks; it only shapes the token stream.

use qsm_object::SectionKind;

use crate::ast::{
    Document, ExportDecl, FieldDecl, FuncDecl, Instr, Item, LabelDecl, Operand, OperandValue,
    ParamDecl, Pos, SectionBlock, TypeDecl,
};
use crate::lexer::{LineIndex, Token, TokenKind, lex, token_text, unescape};
use crate::{AsmError, Result};

pub fn parse(source: &str) -> Result<Document> {
    let tokens = lex(source)?;
    let mut parser = Parser {
        source,
        index: LineIndex::new(source),
        tokens,
        cursor: 0,
    };
    parser.document()
}

struct Parser<'s> {
    source: &'s str,
    index: LineIndex,
    tokens: Vec<Token>,
    cursor: usize,
}

impl<'s> Parser<'s> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.cursor).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn pos_of(&self, token: &Token) -> Pos {
        self.index.pos(token.span.0)
    }

    fn current_pos(&self) -> Pos {
        match self.peek() {
            Some(token) => self.pos_of(&token),
            None => self.index.pos(self.source.len() as u32),
        }
    }

    fn error(&self, message: impl Into<String>) -> AsmError {
        AsmError::Syntax {
            message: message.into(),
            pos: self.current_pos(),
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        match self.peek() {
            Some(token) if token.kind == kind => {
                self.cursor += 1;
                Ok(token)
            }
            Some(token) => Err(self.error(format!(
                "expected {what}, got {:?}",
                token_text(self.source, &token)
            ))),
            None => Err(self.error(format!("expected {what}, got end of input"))),
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, Pos)> {
        let token = self.expect(TokenKind::Ident, what)?;
        Ok((
            token_text(self.source, &token).to_string(),
            self.pos_of(&token),
        ))
    }

    fn skip_newlines(&mut self) {
        while self.eat(TokenKind::Newline) {}
    }

    /// Peeks the directive name after a `.`, without consuming anything.
    fn peek_directive(&self) -> Option<&'s str> {
        let dot = self.peek()?;
        if dot.kind != TokenKind::Dot {
            return None;
        }
        let name = self.tokens.get(self.cursor + 1)?;
        if name.kind != TokenKind::Ident {
            return None;
        }
        Some(token_text(self.source, name))
    }

    fn document(&mut self) -> Result<Document> {
        let mut doc = Document::default();
        let mut current: Option<usize> = None;

        loop {
            self.skip_newlines();
            let Some(token) = self.peek() else { break };

            match token.kind {
                TokenKind::Dot => {
                    self.bump();
                    let (directive, pos) = self.expect_ident("directive name")?;
                    match directive.as_str() {
                        "section" => {
                            let (name, name_pos) = self.expect_ident("section name")?;
                            let kind = SectionKind::from_name(&name).ok_or(
                                AsmError::UnknownSection {
                                    name: name.clone(),
                                    pos: name_pos,
                                },
                            )?;
                            // Re-opening a section appends to the first block.
                            current = Some(match doc.sections.iter().position(|s| s.name == name) {
                                Some(i) => i,
                                None => {
                                    doc.sections.push(SectionBlock {
                                        kind,
                                        name,
                                        items: Vec::new(),
                                        pos: name_pos,
                                    });
                                    doc.sections.len() - 1
                                }
                            });
                        }
                        "type" => {
                            let decl = self.type_decl(pos)?;
                            self.block(&mut doc, current, pos)?.items.push(Item::Type(decl));
                        }
                        "func" => {
                            let decl = self.func_decl(pos)?;
                            self.block(&mut doc, current, pos)?.items.push(Item::Func(decl));
                        }
                        "label" => {
                            let (name, _) = self.expect_ident("label name")?;
                            self.block(&mut doc, current, pos)?
                                .items
                                .push(Item::Label(LabelDecl { name, pos }));
                        }
                        "export" => {
                            let (name, _) = self.expect_ident("symbol name")?;
                            self.block(&mut doc, current, pos)?
                                .items
                                .push(Item::Export(ExportDecl { name, pos }));
                        }
                        other => {
                            return Err(AsmError::UnknownDirective {
                                name: other.to_string(),
                                pos,
                            });
                        }
                    }
                }
                TokenKind::Ident => {
                    let instr = self.statement()?;
                    let pos = instr.pos;
                    self.block(&mut doc, current, pos)?.items.push(Item::Instr(instr));
                }
                _ => {
                    return Err(self.error(format!(
                        "expected a directive or instruction, got {:?}",
                        token_text(self.source, &token)
                    )));
                }
            }
        }

        Ok(doc)
    }

    fn block<'d>(
        &self,
        doc: &'d mut Document,
        current: Option<usize>,
        pos: Pos,
    ) -> Result<&'d mut SectionBlock> {
        match current {
            Some(i) => Ok(&mut doc.sections[i]),
            None => Err(AsmError::Syntax {
                message: "declaration outside of any section".to_string(),
                pos,
            }),
        }
    }

    /// `.type Name modifiers… :` followed by `.var type name` field lines.
    fn type_decl(&mut self, pos: Pos) -> Result<TypeDecl> {
        let (name, _) = self.expect_ident("type name")?;
        let modifiers = self.modifiers_until_colon()?;

        let mut fields = Vec::new();
        loop {
            self.skip_newlines();
            if self.peek_directive() != Some("var") {
                break;
            }
            self.bump();
            self.bump();
            fields.push(self.var_decl()?);
        }

        Ok(TypeDecl {
            name,
            modifiers,
            fields,
            pos,
        })
    }

    /// `.func rettype name(type name, …) modifiers… :` followed by the body.
    fn func_decl(&mut self, pos: Pos) -> Result<FuncDecl> {
        let (return_type, _) = self.expect_ident("return type")?;
        let (name, _) = self.expect_ident("function name")?;
        self.expect(TokenKind::LParen, "`(`")?;

        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                let (type_name, param_pos) = self.expect_ident("parameter type")?;
                let param_name = if self.at(TokenKind::Ident) {
                    self.expect_ident("parameter name")?.0
                } else {
                    params.len().to_string()
                };
                params.push(ParamDecl {
                    type_name,
                    name: param_name,
                    pos: param_pos,
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "`)`")?;
        let modifiers = self.modifiers_until_colon()?;

        let mut locals = Vec::new();
        let mut body = Vec::new();
        loop {
            self.skip_newlines();
            let Some(token) = self.peek() else { break };
            match token.kind {
                TokenKind::Dot => match self.peek_directive() {
                    Some("var") => {
                        self.bump();
                        self.bump();
                        locals.push(self.var_decl()?);
                    }
                    Some("label") => {
                        self.bump();
                        let (_, label_pos) = self.expect_ident("directive name")?;
                        let (label_name, _) = self.expect_ident("label name")?;
                        body.push(Item::Label(LabelDecl {
                            name: label_name,
                            pos: label_pos,
                        }));
                    }
                    // Any other directive ends the function body.
                    _ => break,
                },
                TokenKind::Ident => body.push(Item::Instr(self.statement()?)),
                _ => {
                    return Err(self.error(format!(
                        "unexpected {:?} in function body",
                        token_text(self.source, &token)
                    )));
                }
            }
        }

        Ok(FuncDecl {
            name,
            return_type,
            params,
            modifiers,
            locals,
            body,
            pos,
        })
    }

    /// `.var type name` (directive tokens already consumed).
    fn var_decl(&mut self) -> Result<FieldDecl> {
        let (type_name, pos) = self.expect_ident("variable type")?;
        let (name, _) = self.expect_ident("variable name")?;
        Ok(FieldDecl {
            type_name,
            name,
            pos,
        })
    }

    fn modifiers_until_colon(&mut self) -> Result<Vec<String>> {
        let mut modifiers = Vec::new();
        while !self.eat(TokenKind::Colon) {
            modifiers.push(self.expect_ident("modifier or `:`")?.0);
        }
        Ok(modifiers)
    }

    /// One statement line: mnemonic plus comma-separated operands up to the
    /// end of the line.
    fn statement(&mut self) -> Result<Instr> {
        let (mnemonic, pos) = self.expect_ident("instruction")?;
        let mut args = Vec::new();

        loop {
            if self.eat(TokenKind::Comma) {
                continue;
            }
            let Some(token) = self.peek() else { break };
            if token.kind == TokenKind::Newline {
                self.bump();
                break;
            }
            args.push(self.operand()?);
        }

        Ok(Instr {
            mnemonic,
            args,
            pos,
        })
    }

    fn operand(&mut self) -> Result<Operand> {
        let token = self.peek().ok_or_else(|| self.error("expected operand"))?;
        let pos = self.pos_of(&token);

        match token.kind {
            TokenKind::LBrace => {
                let bytes = self.byte_list()?;
                Ok(Operand {
                    ty: None,
                    value: OperandValue::Bytes(bytes),
                    pos,
                })
            }
            TokenKind::Ident => {
                self.bump();
                let name = token_text(self.source, &token).to_string();

                // `Type.field` member reference.
                if self.at(TokenKind::Dot) {
                    self.bump();
                    let (field, _) = self.expect_ident("field name")?;
                    return Ok(Operand {
                        ty: None,
                        value: OperandValue::Member {
                            type_name: name,
                            field,
                        },
                        pos,
                    });
                }

                // An identifier directly followed by a value is a type
                // prefix: `push int8 3`, `pop local tmp`, `db str "hi"`.
                let prefixes_value = self.peek().is_some_and(|next| {
                    matches!(
                        next.kind,
                        TokenKind::Ident
                            | TokenKind::Int
                            | TokenKind::HexInt
                            | TokenKind::Float
                            | TokenKind::Char
                            | TokenKind::Str
                            | TokenKind::LBrace
                    )
                });
                if !prefixes_value {
                    return Ok(Operand {
                        ty: None,
                        value: OperandValue::Ident(name),
                        pos,
                    });
                }

                let mut operand = self.operand()?;
                if operand.ty.is_some() {
                    return Err(AsmError::Syntax {
                        message: "operand has more than one type prefix".to_string(),
                        pos: operand.pos,
                    });
                }
                operand.ty = Some(name);
                operand.pos = pos;
                Ok(operand)
            }
            _ => {
                let value = self.literal(&token)?;
                self.bump();
                Ok(Operand {
                    ty: None,
                    value,
                    pos,
                })
            }
        }
    }

    fn literal(&self, token: &Token) -> Result<OperandValue> {
        let text = token_text(self.source, token);
        let pos = self.pos_of(token);
        let bad = |message: String| AsmError::Syntax { message, pos };

        match token.kind {
            TokenKind::Int => text
                .parse::<i64>()
                .map(OperandValue::Int)
                .map_err(|_| bad(format!("integer literal {text} out of range"))),
            TokenKind::HexInt => i64::from_str_radix(&text[2..], 16)
                .map(OperandValue::Int)
                .map_err(|_| bad(format!("hex literal {text} out of range"))),
            TokenKind::Float => text
                .parse::<f64>()
                .map(OperandValue::Float)
                .map_err(|_| bad(format!("malformed float literal {text}"))),
            TokenKind::Char => {
                let inner = unescape(&text[1..text.len() - 1]);
                let mut chars = inner.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii() => Ok(OperandValue::Int(c as i64)),
                    _ => Err(bad(format!("invalid char literal {text}"))),
                }
            }
            TokenKind::Str => Ok(OperandValue::Str(unescape(&text[1..text.len() - 1]))),
            _ => Err(bad(format!("expected an operand, got {text:?}"))),
        }
    }

    /// `{ 1, 2, 3 }` byte list.
    fn byte_list(&mut self) -> Result<Vec<u8>> {
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut bytes = Vec::new();
        while !self.eat(TokenKind::RBrace) {
            let token = self.expect(TokenKind::Int, "byte value")?;
            let text = token_text(self.source, &token);
            let value: i64 = text.parse().map_err(|_| AsmError::Syntax {
                message: format!("invalid byte value {text}"),
                pos: self.pos_of(&token),
            })?;
            if !(0..=255).contains(&value) {
                return Err(AsmError::Syntax {
                    message: format!("byte value {value} out of range"),
                    pos: self.pos_of(&token),
                });
            }
            bytes.push(value as u8);
            self.eat(TokenKind::Comma);
        }
        Ok(bytes)
    }
}
