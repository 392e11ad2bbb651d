//! Object file reader/writer.
//!
//! File layout, in order: header, optional entry-point sub-header, section
//! table, raw section bytes (concatenated in table order), optional export
//! table, optional relocation table. Everything is little-endian.

use std::io::{Read, Write};

use crate::header::{ARCH_INFO, Flags, HEADER_SIZE, Header, LANG_VERSION};
use crate::reloc::{AddressingMode, RelocState, RelocTarget, Relocation};
use crate::section::{MAX_SECTION_NAME, SECTION_ENTRY_SIZE, Section, SectionKind};
use crate::symbol::{Export, SymbolKind};
use crate::types::NATIVE_SIZE;

#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    #[error("invalid signature: not a QPL object file")]
    InvalidSignature,

    #[error("unsupported architecture byte 0x{0:02x}")]
    UnsupportedArch(u8),

    #[error("unsupported format version {0}.{1}")]
    UnsupportedVersion(u16, u16),

    #[error("object file truncated")]
    Truncated,

    #[error("section name {0:?} exceeds {MAX_SECTION_NAME} bytes")]
    SectionNameTooLong(String),

    #[error("unknown section kind tag {0}")]
    UnknownSectionKind(u8),

    #[error("unknown symbol kind tag {0}")]
    UnknownSymbolKind(u8),

    #[error("unknown relocation state {0}")]
    UnknownRelocState(u8),

    #[error("malformed name string in table")]
    BadName,

    #[error("too many sections: {0} (limit 255)")]
    TooManySections(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One assembly unit, or the output of linking several.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectFile {
    pub mode: AddressingMode,
    /// Unit-absolute offset of the entry symbol, when one was declared.
    pub entry_point: Option<u64>,
    pub sections: Vec<Section>,
    pub exports: Vec<Export>,
    /// Relocations still pending or needing rebase at link time.
    pub relocs: Vec<Relocation>,
}

impl ObjectFile {
    /// Header derived from the current contents.
    pub fn header(&self) -> Header {
        let mut flags = Flags::default();
        flags.set(Flags::HAS_ENTRY_POINT, self.entry_point.is_some());
        flags.set(Flags::HAS_EXPORTS, !self.exports.is_empty());
        flags.set(
            Flags::RELATIVE_ADDRESSING,
            self.mode == AddressingMode::Relative,
        );
        flags.set(Flags::HAS_RELOCATIONS, !self.relocs.is_empty());
        Header {
            flags,
            arch: ARCH_INFO,
            section_count: self.sections.len() as u8,
            version: LANG_VERSION,
        }
    }

    pub fn section_by_kind(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// Base offset of each section in the unit's flat image: sections are
    /// laid out contiguously in table order.
    pub fn section_bases(&self) -> Vec<u64> {
        let mut bases = Vec::with_capacity(self.sections.len());
        let mut cursor = 0u64;
        for section in &self.sections {
            bases.push(cursor);
            cursor += section.len() as u64;
        }
        bases
    }

    pub fn image_len(&self) -> u64 {
        self.sections.iter().map(|s| s.len() as u64).sum()
    }

    /// Flat memory image: all section bytes concatenated in table order.
    pub fn image(&self) -> Vec<u8> {
        let mut image = Vec::with_capacity(self.image_len() as usize);
        for section in &self.sections {
            image.extend_from_slice(&section.data);
        }
        image
    }

    /// True when `offset` falls inside a code section.
    pub fn offset_in_code(&self, offset: u64) -> bool {
        let bases = self.section_bases();
        self.sections.iter().zip(&bases).any(|(section, &base)| {
            section.kind == SectionKind::Code
                && offset >= base
                && offset < base + section.len() as u64
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ObjectError> {
        if self.sections.len() > u8::MAX as usize {
            return Err(ObjectError::TooManySections(self.sections.len()));
        }
        for section in &self.sections {
            if section.name.len() > MAX_SECTION_NAME {
                return Err(ObjectError::SectionNameTooLong(section.name.clone()));
            }
        }

        let mut out = Vec::new();
        out.extend_from_slice(&self.header().to_bytes());
        if let Some(entry) = self.entry_point {
            out.extend_from_slice(&entry.to_le_bytes());
        }

        // Section table; file offsets point past the table itself.
        let mut file_offset =
            out.len() + SECTION_ENTRY_SIZE * self.sections.len();
        for section in &self.sections {
            let mut name = [0u8; MAX_SECTION_NAME];
            name[..section.name.len()].copy_from_slice(section.name.as_bytes());
            out.extend_from_slice(&name);
            out.push(section.kind as u8);
            out.extend_from_slice(&[0u8; 3]);
            out.extend_from_slice(&(section.len() as u32).to_le_bytes());
            out.extend_from_slice(&(file_offset as u32).to_le_bytes());
            file_offset += section.len();
        }
        for section in &self.sections {
            out.extend_from_slice(&section.data);
        }

        if !self.exports.is_empty() {
            out.extend_from_slice(&(self.exports.len() as u32).to_le_bytes());
            for export in &self.exports {
                write_name(&mut out, &export.name);
                out.push(export.kind as u8);
                out.extend_from_slice(&export.offset.to_le_bytes());
                out.push(export.num_args);
                out.push(export.num_locals);
            }
        }

        if !self.relocs.is_empty() {
            out.extend_from_slice(&(self.relocs.len() as u32).to_le_bytes());
            for reloc in &self.relocs {
                write_name(&mut out, &reloc.target_name());
                out.push(reloc.section);
                out.extend_from_slice(&reloc.site.to_le_bytes());
                out.push(reloc.width);
                out.push(reloc.kind as u8);
                out.push(reloc.state as u8);
            }
        }

        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ObjectError> {
        if !Header::signature_valid(bytes) {
            return Err(ObjectError::InvalidSignature);
        }
        let header = Header::from_bytes(bytes).ok_or(ObjectError::Truncated)?;
        if !header.arch_valid() {
            return Err(ObjectError::UnsupportedArch(header.arch));
        }
        if header.version.0 != LANG_VERSION.0 {
            return Err(ObjectError::UnsupportedVersion(
                header.version.0,
                header.version.1,
            ));
        }

        let mut cursor = Cursor {
            bytes,
            pos: HEADER_SIZE,
        };
        let entry_point = if header.flags.has(Flags::HAS_ENTRY_POINT) {
            Some(cursor.read_u64()?)
        } else {
            None
        };

        // Section table first, then the bytes each entry points at.
        let mut entries = Vec::with_capacity(header.section_count as usize);
        for _ in 0..header.section_count {
            let name = cursor.read_fixed_name()?;
            let kind_byte = cursor.read_u8()?;
            let kind = SectionKind::from_byte(kind_byte)
                .ok_or(ObjectError::UnknownSectionKind(kind_byte))?;
            cursor.skip(3)?;
            let size = cursor.read_u32()? as usize;
            let offset = cursor.read_u32()? as usize;
            entries.push((name, kind, size, offset));
        }
        let mut sections = Vec::with_capacity(entries.len());
        let mut end = cursor.pos;
        for (name, kind, size, offset) in entries {
            let data = bytes
                .get(offset..offset + size)
                .ok_or(ObjectError::Truncated)?
                .to_vec();
            end = end.max(offset + size);
            sections.push(Section { name, kind, data });
        }
        cursor.pos = end;

        let mut exports = Vec::new();
        if header.flags.has(Flags::HAS_EXPORTS) {
            let count = cursor.read_u32()?;
            for _ in 0..count {
                let name = cursor.read_name()?;
                let kind_byte = cursor.read_u8()?;
                let kind = SymbolKind::from_byte(kind_byte)
                    .ok_or(ObjectError::UnknownSymbolKind(kind_byte))?;
                let offset = cursor.read_u64()?;
                let num_args = cursor.read_u8()?;
                let num_locals = cursor.read_u8()?;
                exports.push(Export {
                    name,
                    kind,
                    offset,
                    num_args,
                    num_locals,
                });
            }
        }

        let mut relocs = Vec::new();
        if header.flags.has(Flags::HAS_RELOCATIONS) {
            let count = cursor.read_u32()?;
            for _ in 0..count {
                let name = cursor.read_name()?;
                let section = cursor.read_u8()?;
                let site = cursor.read_u32()?;
                let width = cursor.read_u8()?;
                let kind_byte = cursor.read_u8()?;
                let kind = SymbolKind::from_byte(kind_byte)
                    .ok_or(ObjectError::UnknownSymbolKind(kind_byte))?;
                let state_byte = cursor.read_u8()?;
                let state = RelocState::from_byte(state_byte)
                    .ok_or(ObjectError::UnknownRelocState(state_byte))?;
                let target = match name.split_once('.') {
                    Some((type_name, field)) if kind == SymbolKind::Type => {
                        RelocTarget::FieldOffset {
                            type_name: type_name.to_string(),
                            field: field.to_string(),
                        }
                    }
                    _ => RelocTarget::Symbol(name),
                };
                relocs.push(Relocation {
                    section,
                    site,
                    width,
                    kind,
                    target,
                    state,
                });
            }
        }

        Ok(Self {
            mode: header.flags.addressing_mode(),
            entry_point,
            sections,
            exports,
            relocs,
        })
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), ObjectError> {
        writer.write_all(&self.to_bytes()?)?;
        Ok(())
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self, ObjectError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }
}

fn write_name(out: &mut Vec<u8>, name: &str) {
    out.extend_from_slice(name.as_bytes());
    out.push(0);
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn read_u8(&mut self) -> Result<u8, ObjectError> {
        let b = *self.bytes.get(self.pos).ok_or(ObjectError::Truncated)?;
        self.pos += 1;
        Ok(b)
    }

    fn skip(&mut self, n: usize) -> Result<(), ObjectError> {
        if self.pos + n > self.bytes.len() {
            return Err(ObjectError::Truncated);
        }
        self.pos += n;
        Ok(())
    }

    fn read_u32(&mut self) -> Result<u32, ObjectError> {
        let slice = self
            .bytes
            .get(self.pos..self.pos + 4)
            .ok_or(ObjectError::Truncated)?;
        self.pos += 4;
        Ok(u32::from_le_bytes(slice.try_into().unwrap()))
    }

    fn read_u64(&mut self) -> Result<u64, ObjectError> {
        let slice = self
            .bytes
            .get(self.pos..self.pos + NATIVE_SIZE)
            .ok_or(ObjectError::Truncated)?;
        self.pos += NATIVE_SIZE;
        Ok(u64::from_le_bytes(slice.try_into().unwrap()))
    }

    /// NUL-terminated, variable-length name.
    fn read_name(&mut self) -> Result<String, ObjectError> {
        let rest = self.bytes.get(self.pos..).ok_or(ObjectError::Truncated)?;
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(ObjectError::Truncated)?;
        let name =
            String::from_utf8(rest[..nul].to_vec()).map_err(|_| ObjectError::BadName)?;
        self.pos += nul + 1;
        Ok(name)
    }

    /// Fixed 8-byte, NUL-padded section name.
    fn read_fixed_name(&mut self) -> Result<String, ObjectError> {
        let slice = self
            .bytes
            .get(self.pos..self.pos + MAX_SECTION_NAME)
            .ok_or(ObjectError::Truncated)?;
        self.pos += MAX_SECTION_NAME;
        let len = slice.iter().position(|&b| b == 0).unwrap_or(MAX_SECTION_NAME);
        String::from_utf8(slice[..len].to_vec()).map_err(|_| ObjectError::BadName)
    }
}
