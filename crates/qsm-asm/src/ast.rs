//! Assembly document: the parser's output.
//!
//! Purely structural; no symbol or type checks happen at this level.

use std::fmt;

use qsm_object::SectionKind;

/// 1-based source position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
}

impl Pos {
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.col)
    }
}

/// An ordered list of section blocks. Re-opened sections are merged into
/// their first occurrence, so names are unique.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub sections: Vec<SectionBlock>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SectionBlock {
    pub kind: SectionKind,
    pub name: String,
    pub items: Vec<Item>,
    pub pos: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    Label(LabelDecl),
    Export(ExportDecl),
    Type(TypeDecl),
    Func(FuncDecl),
    /// Any statement line: instructions, `db` data items, `load`/`import`
    /// statements, config options. Which of these are legal where is the
    /// resolver's and emitter's business.
    Instr(Instr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct LabelDecl {
    pub name: String,
    pub pos: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExportDecl {
    pub name: String,
    pub pos: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeDecl {
    pub name: String,
    pub modifiers: Vec<String>,
    pub fields: Vec<FieldDecl>,
    pub pos: Pos,
}

/// A `.var type name` entry: a type field or a function local.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDecl {
    pub type_name: String,
    pub name: String,
    pub pos: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParamDecl {
    pub type_name: String,
    pub name: String,
    pub pos: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub return_type: String,
    pub params: Vec<ParamDecl>,
    pub modifiers: Vec<String>,
    pub locals: Vec<FieldDecl>,
    /// Labels and instructions, in source order.
    pub body: Vec<Item>,
    pub pos: Pos,
}

impl FuncDecl {
    pub fn is_exported(&self) -> bool {
        self.modifiers.iter().any(|m| m == "export")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Instr {
    pub mnemonic: String,
    pub args: Vec<Operand>,
    pub pos: Pos,
}

/// One instruction operand, optionally prefixed by a type keyword
/// (`push int8 3`, `pop local tmp`).
#[derive(Clone, Debug, PartialEq)]
pub struct Operand {
    pub ty: Option<String>,
    pub value: OperandValue,
    pub pos: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OperandValue {
    Int(i64),
    Float(f64),
    Str(String),
    /// `{ 1, 2, 3 }` byte list.
    Bytes(Vec<u8>),
    /// Bare name: a label, argument, local, type, or imported symbol.
    Ident(String),
    /// `Type.field` member reference.
    Member { type_name: String, field: String },
}

impl Operand {
    pub fn ident(&self) -> Option<&str> {
        match &self.value {
            OperandValue::Ident(name) => Some(name),
            _ => None,
        }
    }
}
