//! Round-trip and format-validation tests for the object reader/writer.

use crate::object::{ObjectError, ObjectFile};
use crate::reloc::{AddressingMode, RelocState, RelocTarget, Relocation};
use crate::section::{Section, SectionKind};
use crate::symbol::{Export, SymbolKind};

fn sample_object() -> ObjectFile {
    ObjectFile {
        mode: AddressingMode::Relative,
        entry_point: Some(4),
        sections: vec![
            Section::new("data", SectionKind::Data, vec![1, 2, 3, 4]),
            Section::new("code", SectionKind::Code, vec![0, 6, 255]),
        ],
        exports: vec![
            Export::function("main", 4, 0, 1),
            Export::new("msg", SymbolKind::Label, 0),
        ],
        relocs: vec![Relocation {
            section: 1,
            site: 1,
            width: 8,
            kind: SymbolKind::Function,
            target: RelocTarget::Symbol("add2".to_string()),
            state: RelocState::NeedsLinkCall,
        }],
    }
}

#[test]
fn round_trip_preserves_everything() {
    let object = sample_object();
    let bytes = object.to_bytes().unwrap();
    let decoded = ObjectFile::from_bytes(&bytes).unwrap();
    assert_eq!(decoded, object);
}

#[test]
fn round_trip_without_optional_tables() {
    let object = ObjectFile {
        mode: AddressingMode::Absolute,
        entry_point: None,
        sections: vec![Section::new("code", SectionKind::Code, vec![255])],
        exports: Vec::new(),
        relocs: Vec::new(),
    };
    let decoded = ObjectFile::from_bytes(&object.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded, object);

    let header = decoded.header();
    assert!(!header.flags.has(crate::header::Flags::HAS_ENTRY_POINT));
    assert!(!header.flags.has(crate::header::Flags::HAS_EXPORTS));
    assert!(!header.flags.has(crate::header::Flags::HAS_RELOCATIONS));
}

#[test]
fn field_offset_target_round_trips() {
    let mut object = sample_object();
    object.relocs = vec![Relocation {
        section: 1,
        site: 2,
        width: 8,
        kind: SymbolKind::Type,
        target: RelocTarget::FieldOffset {
            type_name: "Vec2".to_string(),
            field: "y".to_string(),
        },
        state: RelocState::NeedsLink,
    }];
    let decoded = ObjectFile::from_bytes(&object.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded.relocs, object.relocs);
}

#[test]
fn bad_signature_is_fatal() {
    let mut bytes = sample_object().to_bytes().unwrap();
    bytes[0] = b'X';
    assert!(matches!(
        ObjectFile::from_bytes(&bytes),
        Err(ObjectError::InvalidSignature)
    ));
}

#[test]
fn bad_arch_is_fatal() {
    let mut bytes = sample_object().to_bytes().unwrap();
    bytes[5] = 0;
    assert!(matches!(
        ObjectFile::from_bytes(&bytes),
        Err(ObjectError::UnsupportedArch(0))
    ));
}

#[test]
fn bad_version_is_fatal() {
    let mut bytes = sample_object().to_bytes().unwrap();
    bytes[8] = 9;
    assert!(matches!(
        ObjectFile::from_bytes(&bytes),
        Err(ObjectError::UnsupportedVersion(9, 0))
    ));
}

#[test]
fn truncated_file_is_fatal() {
    let bytes = sample_object().to_bytes().unwrap();
    let cut = &bytes[..bytes.len() - 2];
    assert!(matches!(
        ObjectFile::from_bytes(cut),
        Err(ObjectError::Truncated)
    ));
}

#[test]
fn section_bases_and_image() {
    let object = sample_object();
    assert_eq!(object.section_bases(), vec![0, 4]);
    assert_eq!(object.image(), vec![1, 2, 3, 4, 0, 6, 255]);
    assert_eq!(object.image_len(), 7);
}

#[test]
fn entry_in_code_check() {
    let object = sample_object();
    assert!(object.offset_in_code(4));
    assert!(object.offset_in_code(6));
    assert!(!object.offset_in_code(0));
    assert!(!object.offset_in_code(7));
}
