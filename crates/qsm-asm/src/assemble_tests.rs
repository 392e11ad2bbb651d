use indoc::indoc;
use qsm_object::{AddressingMode, ObjectFile, SectionKind, SymbolKind};

use crate::assemble::{Assembler, assemble};
use crate::AsmError;

const UNIT: &str = indoc! {r#"
    .section config
    entry main

    .section data
    .label msg
    db str "hi"

    .section code
    .func int add2(int a, int b) export:
    push arg a
    push arg b
    add int, int
    ret

    .func int main():
    push int8 2
    push int8 3
    call add2
    ret
"#};

#[test]
fn local_only_unit_has_no_pending_relocations() {
    let object = assemble(UNIT).unwrap();
    assert_eq!(object.mode, AddressingMode::Relative);
    assert!(object.relocs.is_empty());
}

#[test]
fn section_order_follows_the_document() {
    let object = assemble(UNIT).unwrap();
    let kinds: Vec<SectionKind> = object.sections.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        [SectionKind::Config, SectionKind::Data, SectionKind::Code]
    );
    assert!(object.section_by_kind(SectionKind::Config).unwrap().is_empty());
    assert_eq!(object.section_by_kind(SectionKind::Data).unwrap().data, b"hi\0");
}

#[test]
fn export_table_carries_frame_counts() {
    let object = assemble(UNIT).unwrap();
    assert_eq!(object.exports.len(), 2);
    let export = &object.exports[0];
    assert_eq!(export.name, "add2");
    assert_eq!(export.kind, SymbolKind::Function);
    assert_eq!(export.num_args, 2);
    assert_eq!(export.num_locals, 0);
    // add2 opens the code section; its offset is the section base.
    assert_eq!(export.offset, 3);
}

#[test]
fn entry_function_is_exported_implicitly() {
    let object = assemble(UNIT).unwrap();
    let entry = object.entry_point.unwrap();
    let export = object
        .exports
        .iter()
        .find(|e| e.offset == entry)
        .expect("entry function in the export table");
    assert_eq!(export.name, "main");
    assert_eq!(export.kind, SymbolKind::Function);
    assert_eq!(export.num_args, 0);
    assert_eq!(export.num_locals, 0);
}

#[test]
fn entry_point_is_resolved_into_code() {
    let object = assemble(UNIT).unwrap();
    let entry = object.entry_point.unwrap();
    assert!(object.offset_in_code(entry));
    // add2's body is 10 bytes; main starts right after it.
    assert_eq!(entry, 13);
}

#[test]
fn assembled_object_survives_serialization() {
    let object = assemble(UNIT).unwrap();
    let decoded = ObjectFile::from_bytes(&object.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded, object);
}

#[test]
fn imported_symbols_leave_pending_relocations() {
    let object = assemble(indoc! {r#"
        .section imports
        load "mathlib.qpl"
        import square

        .section code
        .func int main() export:
        push int8 3
        call square
        ret
    "#})
    .unwrap();
    assert_eq!(object.relocs.len(), 1);
    assert_eq!(object.relocs[0].target_name(), "square");
}

#[test]
fn absolute_mode_is_recorded_in_the_header() {
    let object = Assembler::with_mode(AddressingMode::Absolute)
        .assemble(UNIT)
        .unwrap();
    assert_eq!(object.mode, AddressingMode::Absolute);
    assert!(!object.relocs.is_empty());
    let header = object.header();
    assert!(!header.flags.has(qsm_object::Flags::RELATIVE_ADDRESSING));
}

#[test]
fn undefined_entry_is_rejected() {
    let err = assemble(".section config\nentry main\n.section code\nnop\n").unwrap_err();
    assert!(matches!(err, AsmError::UndefinedEntry { name } if name == "main"));
}

#[test]
fn data_entry_is_rejected() {
    let err = assemble(indoc! {"
        .section config
        entry msg
        .section data
        .label msg
        db 0
    "})
    .unwrap_err();
    assert!(matches!(err, AsmError::EntryNotInCode { name } if name == "msg"));
}

#[test]
fn exported_but_undefined_name_is_rejected() {
    let err = assemble(".section exports\n.export ghost\n").unwrap_err();
    assert!(matches!(err, AsmError::UndefinedSymbol { name, .. } if name == "ghost"));
}
