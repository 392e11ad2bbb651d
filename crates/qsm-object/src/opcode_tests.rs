//! Tests for the opcode table and operand layouts.

use crate::opcode::{Opcode, OperandSlot, slot_size};
use crate::types::TypeId;

#[test]
fn numbering_is_stable() {
    assert_eq!(Opcode::Nop as u8, 0);
    assert_eq!(Opcode::Push as u8, 2);
    assert_eq!(Opcode::Call as u8, 4);
    assert_eq!(Opcode::Ret as u8, 6);
    assert_eq!(Opcode::Add as u8, 16);
    assert_eq!(Opcode::New as u8, 23);
    assert_eq!(Opcode::Exit as u8, 255);

    // Reserved numbers decode to nothing.
    assert_eq!(Opcode::from_byte(5), None);
    assert_eq!(Opcode::from_byte(24), None);
}

#[test]
fn mnemonic_round_trip() {
    for b in 0..=u8::MAX {
        if let Some(op) = Opcode::from_byte(b) {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
        }
    }
    assert_eq!(Opcode::from_mnemonic("frobnicate"), None);
}

#[test]
fn operand_layouts() {
    assert!(Opcode::Ret.operands().is_empty());
    assert_eq!(Opcode::Dlog.operands(), &[OperandSlot::Width]);
    assert_eq!(Opcode::Push.operands(), &[OperandSlot::TypedValue]);
    assert_eq!(Opcode::Jmp.operands(), &[OperandSlot::Target]);
    assert_eq!(
        Opcode::Add.operands(),
        &[OperandSlot::Width, OperandSlot::Width]
    );
    assert_eq!(Opcode::New.operands(), &[OperandSlot::Imm, OperandSlot::Imm]);
}

#[test]
fn slot_sizes() {
    assert_eq!(slot_size(OperandSlot::Width, None), 1);
    assert_eq!(slot_size(OperandSlot::Target, None), 8);
    assert_eq!(slot_size(OperandSlot::Imm, None), 8);
    // Typed values: tag byte plus payload.
    assert_eq!(slot_size(OperandSlot::TypedValue, Some(TypeId::Int8)), 2);
    assert_eq!(slot_size(OperandSlot::TypedValue, Some(TypeId::Int)), 9);
    // Slot references carry a one-byte index.
    assert_eq!(slot_size(OperandSlot::TypedValue, Some(TypeId::Local)), 2);
    assert_eq!(slot_size(OperandSlot::TypedValue, Some(TypeId::Arg)), 2);
}

#[test]
fn classification() {
    assert!(Opcode::CmpEq.is_compare());
    assert!(!Opcode::Add.is_compare());
    assert!(Opcode::JmpTrue.is_jump());
    assert!(!Opcode::Call.is_jump());
}
