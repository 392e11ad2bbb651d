//! QSM assembler: source text in, object file out.
//!
//! The pipeline is strictly staged; each pass fully consumes the previous
//! pass's output:
//! - `lexer` - token stream (pass 1, with `parser`)
//! - `parser` - assembly document
//! - `resolve` - symbol and type discovery (pass 2)
//! - `emit` - byte layout and relocation recording (pass 3)
//! - `relocate` - local relocation resolution (pass 4)
//! - `assemble` - pipeline driver and object construction (pass 5)
//!
//! The symbol table is an explicit value threaded through the passes; there
//! is no ambient state, so independent units can be assembled in parallel.

pub mod assemble;
pub mod ast;
pub mod emit;
pub mod lexer;
pub mod parser;
pub mod relocate;
pub mod resolve;

#[cfg(test)]
mod assemble_tests;
#[cfg(test)]
mod emit_tests;
#[cfg(test)]
mod lexer_tests;
#[cfg(test)]
mod parser_tests;

pub use assemble::{Assembler, assemble};
pub use ast::Pos;

/// Errors produced anywhere in the assembly pipeline.
///
/// Every variant that can be traced to a source location carries its
/// position; nothing here is recoverable within the pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AsmError {
    #[error("syntax error at {pos}: {message}")]
    Syntax { message: String, pos: Pos },

    #[error("duplicate symbol `{name}` at {pos}")]
    DuplicateSymbol { name: String, pos: Pos },

    #[error("duplicate field `{field}` in type `{type_name}` at {pos}")]
    DuplicateField {
        type_name: String,
        field: String,
        pos: Pos,
    },

    #[error("unknown type `{type_name}` for field `{field}` at {pos}")]
    UnknownFieldType {
        type_name: String,
        field: String,
        pos: Pos,
    },

    #[error("undefined symbol `{name}` at {pos}")]
    UndefinedSymbol { name: String, pos: Pos },

    #[error("unknown instruction `{mnemonic}` at {pos}")]
    UnknownInstruction { mnemonic: String, pos: Pos },

    #[error("{mnemonic} takes {expected} operands but {got} were given, at {pos}")]
    OperandCount {
        mnemonic: String,
        expected: usize,
        got: usize,
        pos: Pos,
    },

    #[error("invalid operand at {pos}: {message}")]
    InvalidOperand { message: String, pos: Pos },

    #[error("unknown directive `.{name}` at {pos}")]
    UnknownDirective { name: String, pos: Pos },

    #[error("unknown section `{name}` at {pos}")]
    UnknownSection { name: String, pos: Pos },

    #[error("unknown config option `{name}` at {pos}")]
    UnknownConfigOption { name: String, pos: Pos },

    #[error("`import` before any `load` at {pos}")]
    ImportWithoutLoad { pos: Pos },

    #[error("relocation for `{symbol}` does not fit in {width} bytes")]
    RelocationOverflow { symbol: String, width: u8 },

    #[error("entry symbol `{name}` is undefined")]
    UndefinedEntry { name: String },

    #[error("entry symbol `{name}` does not resolve into a code section")]
    EntryNotInCode { name: String },
}

/// Result type for assembly operations.
pub type Result<T> = std::result::Result<T, AsmError>;
