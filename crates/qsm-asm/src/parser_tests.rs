use indoc::indoc;
use qsm_object::SectionKind;

use crate::AsmError;
use crate::ast::{Item, OperandValue};
use crate::parser::parse;

#[test]
fn sections_and_config_options() {
    let doc = parse(indoc! {"
        .section config
        entry main
    "})
    .unwrap();
    assert_eq!(doc.sections.len(), 1);
    let block = &doc.sections[0];
    assert_eq!(block.kind, SectionKind::Config);
    let Item::Instr(instr) = &block.items[0] else {
        panic!("expected an option line");
    };
    assert_eq!(instr.mnemonic, "entry");
    assert_eq!(instr.args[0].ident(), Some("main"));
}

#[test]
fn reopened_sections_merge_into_the_first_block() {
    let doc = parse(indoc! {"
        .section data
        db 1
        .section code
        nop
        .section data
        db 2
    "})
    .unwrap();
    assert_eq!(doc.sections.len(), 2);
    assert_eq!(doc.sections[0].items.len(), 2);
    assert_eq!(doc.sections[1].items.len(), 1);
}

#[test]
fn type_declaration_collects_fields() {
    let doc = parse(indoc! {"
        .section types
        .type Vec2:
        .var int x
        .var int y
    "})
    .unwrap();
    let Item::Type(decl) = &doc.sections[0].items[0] else {
        panic!("expected a type declaration");
    };
    assert_eq!(decl.name, "Vec2");
    assert_eq!(decl.fields.len(), 2);
    assert_eq!(decl.fields[0].type_name, "int");
    assert_eq!(decl.fields[0].name, "x");
}

#[test]
fn function_declaration_shape() {
    let doc = parse(indoc! {"
        .section code
        .func int add(int a, int b) export:
        .var int tmp
        .label $top
        push arg a
        push arg b
        add int, int
        ret
    "})
    .unwrap();
    let Item::Func(func) = &doc.sections[0].items[0] else {
        panic!("expected a function");
    };
    assert_eq!(func.name, "add");
    assert_eq!(func.return_type, "int");
    assert_eq!(
        func.params.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        ["a", "b"]
    );
    assert!(func.is_exported());
    assert_eq!(func.locals.len(), 1);
    assert_eq!(func.body.len(), 5);
    assert!(matches!(&func.body[0], Item::Label(l) if l.name == "$top"));
}

#[test]
fn unnamed_parameters_get_index_names() {
    let doc = parse(".section code\n.func int f(int, int):\nret\n").unwrap();
    let Item::Func(func) = &doc.sections[0].items[0] else {
        panic!("expected a function");
    };
    assert_eq!(
        func.params.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        ["0", "1"]
    );
}

#[test]
fn operand_forms() {
    let doc = parse(indoc! {r#"
        .section code
        push int8 3
        push 1.5
        push Vec2.x
        push $loop
        dlog str
        db str "hi", { 1, 2, 3 }, \x10, 'A'
    "#})
    .unwrap();
    let items = &doc.sections[0].items;

    let Item::Instr(typed) = &items[0] else { panic!() };
    assert_eq!(typed.args[0].ty.as_deref(), Some("int8"));
    assert_eq!(typed.args[0].value, OperandValue::Int(3));

    let Item::Instr(float) = &items[1] else { panic!() };
    assert_eq!(float.args[0].value, OperandValue::Float(1.5));

    let Item::Instr(member) = &items[2] else { panic!() };
    assert_eq!(
        member.args[0].value,
        OperandValue::Member {
            type_name: "Vec2".to_string(),
            field: "x".to_string(),
        }
    );

    let Item::Instr(label) = &items[3] else { panic!() };
    assert_eq!(label.args[0].ident(), Some("$loop"));

    let Item::Instr(db) = &items[5] else { panic!() };
    assert_eq!(db.args.len(), 4);
    assert_eq!(db.args[0].ty.as_deref(), Some("str"));
    assert_eq!(db.args[0].value, OperandValue::Str("hi".to_string()));
    assert_eq!(db.args[1].value, OperandValue::Bytes(vec![1, 2, 3]));
    assert_eq!(db.args[2].value, OperandValue::Int(0x10));
    assert_eq!(db.args[3].value, OperandValue::Int(65));
}

#[test]
fn unknown_section_is_rejected() {
    let err = parse(".section bss\n").unwrap_err();
    assert!(matches!(err, AsmError::UnknownSection { name, .. } if name == "bss"));
}

#[test]
fn unknown_directive_is_rejected() {
    let err = parse(".section code\n.global main\n").unwrap_err();
    assert!(matches!(err, AsmError::UnknownDirective { name, .. } if name == "global"));
}

#[test]
fn statement_outside_a_section_is_rejected() {
    let err = parse("nop\n").unwrap_err();
    assert!(matches!(err, AsmError::Syntax { .. }));
}

#[test]
fn byte_list_range_is_checked() {
    let err = parse(".section data\ndb { 300 }\n").unwrap_err();
    assert!(matches!(err, AsmError::Syntax { .. }));
}
