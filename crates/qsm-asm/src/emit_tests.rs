use indoc::indoc;
use qsm_object::{AddressingMode, RelocState, RelocTarget, SymbolKind};

use crate::emit::{EmittedUnit, emit};
use crate::parser::parse;
use crate::relocate::relocate;
use crate::resolve::resolve;
use crate::{AsmError, Result};

fn emitted(source: &str, mode: AddressingMode) -> (EmittedUnit, Vec<qsm_object::Relocation>) {
    let doc = parse(source).unwrap();
    let mut table = resolve(&doc).unwrap();
    let mut unit = emit(&doc, &mut table, mode).unwrap();
    let relocs = relocate(&mut unit, &table, mode).unwrap();
    (unit, relocs)
}

fn emit_error(source: &str) -> AsmError {
    let doc = parse(source).unwrap();
    let mut table = resolve(&doc).unwrap();
    let result: Result<EmittedUnit> = emit(&doc, &mut table, AddressingMode::Relative);
    result.unwrap_err()
}

#[test]
fn arithmetic_sequence_encoding() {
    let (unit, relocs) = emitted(
        indoc! {"
            .section code
            .func int main():
            push int8 2
            push int8 3
            add int8, int8
            ret
        "},
        AddressingMode::Relative,
    );
    // push=2 int8=6, add=16, ret=6.
    assert_eq!(unit.sections[0].bytes, [2, 6, 2, 2, 6, 3, 16, 6, 6, 6]);
    assert!(relocs.is_empty());
}

#[test]
fn untyped_integer_defaults_to_native_width() {
    let (unit, _) = emitted(".section code\npush 5\n", AddressingMode::Relative);
    let mut expected = vec![2u8, 5];
    expected.extend_from_slice(&5i64.to_le_bytes());
    assert_eq!(unit.sections[0].bytes, expected);
}

#[test]
fn backward_jump_is_ip_relative() {
    let (unit, relocs) = emitted(
        indoc! {"
            .section code
            .func void spin():
            .label $top
            nop
            jmp $top
        "},
        AddressingMode::Relative,
    );
    // nop at 0; jmp opcode at 1, target at 2..10. $top - (2 + 8) = -10.
    let mut expected = vec![0u8, 7];
    expected.extend_from_slice(&(-10i64).to_le_bytes());
    assert_eq!(unit.sections[0].bytes, expected);
    assert!(relocs.is_empty());
}

#[test]
fn local_call_gets_frame_counts() {
    let (unit, relocs) = emitted(
        indoc! {"
            .section code
            .func int helper(int a):
            .var int tmp
            ret
            .func int main():
            call helper
            ret
        "},
        AddressingMode::Relative,
    );
    let bytes = &unit.sections[0].bytes;
    // helper: ret at 0. main: call at 1, target 2..10, counts at 10 and 11.
    assert_eq!(bytes[0], 6);
    assert_eq!(bytes[1], 4);
    assert_eq!(bytes[2..10], (-10i64).to_le_bytes());
    assert_eq!(bytes[10], 1);
    assert_eq!(bytes[11], 1);
    assert!(relocs.is_empty());
}

#[test]
fn imported_call_stays_pending_with_zero_counts() {
    let (unit, relocs) = emitted(
        indoc! {r#"
            .section imports
            load "mathlib.qpl"
            import square
            .section code
            .func int main():
            call square
            ret
        "#},
        AddressingMode::Relative,
    );
    let code = &unit.sections[1].bytes;
    assert_eq!(code[0], 4);
    assert_eq!(code[1..9], [0; 8]);
    assert_eq!(&code[9..11], [0, 0]);

    assert_eq!(relocs.len(), 1);
    let reloc = &relocs[0];
    assert_eq!(reloc.section, 1);
    assert_eq!(reloc.site, 1);
    assert_eq!(reloc.width, 8);
    assert_eq!(reloc.kind, SymbolKind::Function);
    assert_eq!(reloc.state, RelocState::NeedsLinkCall);
    assert_eq!(reloc.target, RelocTarget::Symbol("square".to_string()));
}

#[test]
fn data_reference_crosses_sections() {
    let (unit, relocs) = emitted(
        indoc! {r#"
            .section data
            .label msg
            db str "hi"
            .section code
            .func int main():
            push msg
            ret
        "#},
        AddressingMode::Relative,
    );
    // Strings are NUL-terminated in data.
    assert_eq!(unit.sections[0].bytes, b"hi\0");

    let code = &unit.sections[1].bytes;
    // push rptr: msg sits at image offset 0, the value site at 3 + 2.
    assert_eq!(code[0], 2);
    assert_eq!(code[1], 4);
    assert_eq!(code[2..10], (-13i64).to_le_bytes());
    assert!(relocs.is_empty());
}

#[test]
fn absolute_mode_keeps_applied_relocations() {
    let (unit, relocs) = emitted(
        indoc! {r#"
            .section data
            .label msg
            db str "hi"
            .section code
            .func int main():
            push msg
            ret
        "#},
        AddressingMode::Absolute,
    );
    let code = &unit.sections[1].bytes;
    // Absolute pointer type, value is msg's unit-absolute offset.
    assert_eq!(code[1], 3);
    assert_eq!(code[2..10], 0u64.to_le_bytes());

    assert_eq!(relocs.len(), 1);
    assert_eq!(relocs[0].state, RelocState::Applied);
    assert_eq!(relocs[0].site, 2);
}

#[test]
fn member_operands_fold_to_field_offsets() {
    let (unit, _) = emitted(
        indoc! {"
            .section types
            .type Vec2:
            .var int x
            .var int y
            .section code
            push Vec2.y
            new Vec2, 2
        "},
        AddressingMode::Relative,
    );
    let code = &unit.sections[1].bytes;
    // push int 8 (offset of y), then new with size 16 and count 2.
    assert_eq!(code[0], 2);
    assert_eq!(code[1], 5);
    assert_eq!(code[2..10], 8i64.to_le_bytes());
    assert_eq!(code[10], 23);
    assert_eq!(code[11..19], 16i64.to_le_bytes());
    assert_eq!(code[19..27], 2i64.to_le_bytes());
}

#[test]
fn slot_references_resolve_to_frame_indices() {
    let (unit, _) = emitted(
        indoc! {"
            .section code
            .func int f(int a, int b):
            .var int t
            push arg b
            pop local t
            ret
        "},
        AddressingMode::Relative,
    );
    let code = &unit.sections[0].bytes;
    // push arg slot 1, pop local slot 0.
    assert_eq!(&code[..3], [2, 16, 1]);
    assert_eq!(&code[3..6], [3, 15, 0]);
    assert_eq!(code[6], 6);
}

#[test]
fn pop_with_a_bare_type_discards() {
    let (unit, _) = emitted(".section code\npop int\n", AddressingMode::Relative);
    assert_eq!(unit.sections[0].bytes, [3, 5]);
}

#[test]
fn undefined_symbols_are_emit_errors() {
    let err = emit_error(".section code\njmp nowhere\n");
    assert!(matches!(err, AsmError::UndefinedSymbol { name, .. } if name == "nowhere"));
}

#[test]
fn operand_count_is_checked() {
    let err = emit_error(".section code\nadd int\n");
    assert!(matches!(
        err,
        AsmError::OperandCount { expected: 2, got: 1, .. }
    ));
}

#[test]
fn value_width_is_checked() {
    let err = emit_error(".section code\npush int8 300\n");
    assert!(matches!(err, AsmError::InvalidOperand { .. }));
}

#[test]
fn unknown_mnemonics_are_rejected() {
    let err = emit_error(".section code\nfrobnicate\n");
    assert!(matches!(err, AsmError::UnknownInstruction { mnemonic, .. } if mnemonic == "frobnicate"));
}

#[test]
fn zero_width_literals_are_rejected() {
    let err = emit_error(".section data\ndb void 0\n");
    assert!(matches!(err, AsmError::InvalidOperand { .. }));

    let err = emit_error(".section code\npush void 0\n");
    assert!(matches!(err, AsmError::InvalidOperand { .. }));
}

#[test]
fn explicit_pointer_types_must_match_the_addressing_mode() {
    let source = indoc! {r#"
        .section data
        .label msg
        db str "hi"
        .section code
        push ptr msg
    "#};
    let err = emit_error(source);
    assert!(matches!(err, AsmError::InvalidOperand { .. }));

    let source = source.replace("push ptr", "push rptr");
    let doc = parse(&source).unwrap();
    let mut table = resolve(&doc).unwrap();
    let err = emit(&doc, &mut table, AddressingMode::Absolute).unwrap_err();
    assert!(matches!(err, AsmError::InvalidOperand { .. }));
}
