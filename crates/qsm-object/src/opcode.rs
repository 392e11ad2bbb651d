//! Instruction opcodes and operand layouts.
//!
//! Opcode numbering is part of the object format. Numbers 5 (`unsafe_call`)
//! and 24 (`free`) are reserved: the format has no dynamic loading and never
//! reclaims allocations.

use crate::types::{NATIVE_SIZE, TypeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0,
    Dlog = 1,
    Push = 2,
    Pop = 3,
    Call = 4,
    Ret = 6,
    Jmp = 7,
    JmpTrue = 8,
    JmpFalse = 9,
    CmpGt = 10,
    CmpLt = 11,
    CmpGe = 12,
    CmpLe = 13,
    CmpEq = 14,
    CmpNe = 15,
    Add = 16,
    Sub = 17,
    Mul = 18,
    Div = 19,
    Mod = 20,
    PushMem = 21,
    PopMem = 22,
    New = 23,
    Dup = 25,
    And = 26,
    Or = 27,
    Xor = 28,
    Not = 29,
    Concat = 30,
    Exit = 255,
}

/// Fixed operand layout of one instruction, in encoding order.
///
/// - `Width`: one type-index byte naming an operand width.
/// - `TypedValue`: one type-index byte followed by a payload whose size the
///   type determines (`local`/`arg` carry a one-byte slot index, everything
///   else its own width).
/// - `Target`: a native-width code address, absolute or IP-relative per the
///   object's addressing mode. For `call` it is followed by the callee's
///   argument and local counts, one byte each.
/// - `Imm`: a native-width integer immediate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandSlot {
    Width,
    TypedValue,
    Target,
    Imm,
}

impl Opcode {
    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            0 => Self::Nop,
            1 => Self::Dlog,
            2 => Self::Push,
            3 => Self::Pop,
            4 => Self::Call,
            6 => Self::Ret,
            7 => Self::Jmp,
            8 => Self::JmpTrue,
            9 => Self::JmpFalse,
            10 => Self::CmpGt,
            11 => Self::CmpLt,
            12 => Self::CmpGe,
            13 => Self::CmpLe,
            14 => Self::CmpEq,
            15 => Self::CmpNe,
            16 => Self::Add,
            17 => Self::Sub,
            18 => Self::Mul,
            19 => Self::Div,
            20 => Self::Mod,
            21 => Self::PushMem,
            22 => Self::PopMem,
            23 => Self::New,
            25 => Self::Dup,
            26 => Self::And,
            27 => Self::Or,
            28 => Self::Xor,
            29 => Self::Not,
            30 => Self::Concat,
            255 => Self::Exit,
            _ => return None,
        })
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Nop => "nop",
            Self::Dlog => "dlog",
            Self::Push => "push",
            Self::Pop => "pop",
            Self::Call => "call",
            Self::Ret => "ret",
            Self::Jmp => "jmp",
            Self::JmpTrue => "jmp_true",
            Self::JmpFalse => "jmp_false",
            Self::CmpGt => "cmp_gt",
            Self::CmpLt => "cmp_lt",
            Self::CmpGe => "cmp_ge",
            Self::CmpLe => "cmp_le",
            Self::CmpEq => "cmp_eq",
            Self::CmpNe => "cmp_ne",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::PushMem => "push_mem",
            Self::PopMem => "pop_mem",
            Self::New => "new",
            Self::Dup => "dup",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Not => "not",
            Self::Concat => "concat",
            Self::Exit => "exit",
        }
    }

    pub fn from_mnemonic(name: &str) -> Option<Self> {
        Some(match name {
            "nop" => Self::Nop,
            "dlog" => Self::Dlog,
            "push" => Self::Push,
            "pop" => Self::Pop,
            "call" => Self::Call,
            "ret" => Self::Ret,
            "jmp" => Self::Jmp,
            "jmp_true" => Self::JmpTrue,
            "jmp_false" => Self::JmpFalse,
            "cmp_gt" => Self::CmpGt,
            "cmp_lt" => Self::CmpLt,
            "cmp_ge" => Self::CmpGe,
            "cmp_le" => Self::CmpLe,
            "cmp_eq" => Self::CmpEq,
            "cmp_ne" => Self::CmpNe,
            "add" => Self::Add,
            "sub" => Self::Sub,
            "mul" => Self::Mul,
            "div" => Self::Div,
            "mod" => Self::Mod,
            "push_mem" => Self::PushMem,
            "pop_mem" => Self::PopMem,
            "new" => Self::New,
            "dup" => Self::Dup,
            "and" => Self::And,
            "or" => Self::Or,
            "xor" => Self::Xor,
            "not" => Self::Not,
            "concat" => Self::Concat,
            "exit" => Self::Exit,
            _ => return None,
        })
    }

    /// Operand layout for this opcode, in encoding order.
    pub fn operands(self) -> &'static [OperandSlot] {
        use OperandSlot::*;
        match self {
            Self::Nop | Self::Ret | Self::Concat | Self::Exit => &[],
            Self::Dlog | Self::Dup | Self::Not | Self::PushMem | Self::PopMem => &[Width],
            Self::Push | Self::Pop => &[TypedValue],
            Self::Jmp | Self::JmpTrue | Self::JmpFalse | Self::Call => &[Target],
            Self::CmpGt
            | Self::CmpLt
            | Self::CmpGe
            | Self::CmpLe
            | Self::CmpEq
            | Self::CmpNe
            | Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Div
            | Self::Mod
            | Self::And
            | Self::Or
            | Self::Xor => &[Width, Width],
            Self::New => &[Imm, Imm],
        }
    }

    pub fn is_compare(self) -> bool {
        matches!(
            self,
            Self::CmpGt | Self::CmpLt | Self::CmpGe | Self::CmpLe | Self::CmpEq | Self::CmpNe
        )
    }

    pub fn is_jump(self) -> bool {
        matches!(self, Self::Jmp | Self::JmpTrue | Self::JmpFalse)
    }
}

/// Encoded size of one operand slot given the concrete type byte, where
/// applicable. `Target` and `Imm` are fixed-width.
pub fn slot_size(slot: OperandSlot, ty: Option<TypeId>) -> usize {
    match slot {
        OperandSlot::Width => 1,
        OperandSlot::TypedValue => {
            let ty = ty.expect("typed value slot requires a type");
            match ty {
                TypeId::Local | TypeId::Arg => 2,
                _ => 1 + ty.size(),
            }
        }
        OperandSlot::Target | OperandSlot::Imm => NATIVE_SIZE,
    }
}
