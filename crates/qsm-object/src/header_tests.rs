//! Tests for header encode/decode and flag handling.

use crate::header::{ARCH_INFO, Flags, Header, SIGNATURE};
use crate::reloc::AddressingMode;

#[test]
fn header_round_trip() {
    let mut flags = Flags::default();
    flags.set(Flags::HAS_ENTRY_POINT, true);
    flags.set(Flags::RELATIVE_ADDRESSING, true);
    let header = Header {
        flags,
        arch: ARCH_INFO,
        section_count: 3,
        version: (1, 0),
    };

    let bytes = header.to_bytes();
    assert_eq!(bytes.len(), 16);
    assert_eq!(&bytes[0..4], &SIGNATURE);

    let decoded = Header::from_bytes(&bytes).unwrap();
    assert_eq!(decoded, header);
}

#[test]
fn flags_set_and_clear() {
    let mut flags = Flags::default();
    assert!(!flags.has(Flags::HAS_EXPORTS));

    flags.set(Flags::HAS_EXPORTS, true);
    assert!(flags.has(Flags::HAS_EXPORTS));

    flags.set(Flags::HAS_EXPORTS, false);
    assert!(!flags.has(Flags::HAS_EXPORTS));
}

#[test]
fn addressing_mode_from_flag_bit() {
    let mut flags = Flags::default();
    assert_eq!(flags.addressing_mode(), AddressingMode::Absolute);

    flags.set(Flags::RELATIVE_ADDRESSING, true);
    assert_eq!(flags.addressing_mode(), AddressingMode::Relative);
}

#[test]
fn arch_byte_validation() {
    let mut header = Header::default();
    assert!(header.arch_valid());

    header.arch = 0;
    assert!(!header.arch_valid());

    header.arch = 0x86;
    assert!(!header.arch_valid());
}

#[test]
fn short_buffer_rejected() {
    assert!(Header::from_bytes(&[0u8; 8]).is_none());
    assert!(!Header::signature_valid(b"ELF\x7f____________"));
}
