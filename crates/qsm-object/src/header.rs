//! Object file header (16 bytes, little-endian).
//!
//! Layout:
//! - 0-3: signature `b"QPL\0"`
//! - 4: flags (bit0 HasEntryPoint, bit1 HasExports, bit2 AddressingMode
//!   0=absolute/1=relative, bit3 HasRelocations)
//! - 5: architecture info (low 7 bits log2 of native bit width, high bit
//!   endianness, 0=little; a zero byte is invalid)
//! - 6: section count
//! - 7: padding
//! - 8-11: language version (major u16, minor u16)
//! - 12-15: padding

use crate::reloc::AddressingMode;

pub const SIGNATURE: [u8; 4] = *b"QPL\0";

/// log2(64) in the low bits, high endianness bit clear: 64-bit little-endian.
pub const ARCH_INFO: u8 = 6;

/// Format language version (major, minor).
pub const LANG_VERSION: (u16, u16) = (1, 0);

pub const HEADER_SIZE: usize = 16;

/// Header flags byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flags(pub u8);

impl Flags {
    pub const HAS_ENTRY_POINT: u8 = 1 << 0;
    pub const HAS_EXPORTS: u8 = 1 << 1;
    pub const RELATIVE_ADDRESSING: u8 = 1 << 2;
    pub const HAS_RELOCATIONS: u8 = 1 << 3;

    pub fn has(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    pub fn set(&mut self, flag: u8, value: bool) {
        if value {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }

    pub fn addressing_mode(self) -> AddressingMode {
        if self.has(Self::RELATIVE_ADDRESSING) {
            AddressingMode::Relative
        } else {
            AddressingMode::Absolute
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub flags: Flags,
    pub arch: u8,
    pub section_count: u8,
    pub version: (u16, u16),
}

impl Default for Header {
    fn default() -> Self {
        Self {
            flags: Flags::default(),
            arch: ARCH_INFO,
            section_count: 0,
            version: LANG_VERSION,
        }
    }
}

impl Header {
    /// Encode to the fixed 16-byte layout.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&SIGNATURE);
        bytes[4] = self.flags.0;
        bytes[5] = self.arch;
        bytes[6] = self.section_count;
        bytes[8..10].copy_from_slice(&self.version.0.to_le_bytes());
        bytes[10..12].copy_from_slice(&self.version.1.to_le_bytes());
        bytes
    }

    /// Decode from 16 bytes. Only checks sizes; signature and architecture
    /// validation is the reader's responsibility so it can report precise
    /// format errors.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            flags: Flags(bytes[4]),
            arch: bytes[5],
            section_count: bytes[6],
            version: (
                u16::from_le_bytes([bytes[8], bytes[9]]),
                u16::from_le_bytes([bytes[10], bytes[11]]),
            ),
        })
    }

    pub fn signature_valid(bytes: &[u8]) -> bool {
        bytes.len() >= 4 && bytes[0..4] == SIGNATURE
    }

    pub fn arch_valid(&self) -> bool {
        // Little-endian 32- or 64-bit are the two widths the format names.
        self.arch == 5 || self.arch == 6
    }
}
