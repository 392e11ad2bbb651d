//! Relocations: deferred patches for address-dependent operands.

use crate::symbol::SymbolKind;

/// How resolved addresses are written into operands.
///
/// One mode per object file, recorded in the header; mixing modes within a
/// file is invalid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AddressingMode {
    Absolute,
    #[default]
    Relative,
}

/// What a relocation site must be patched with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelocTarget {
    /// A named symbol's resolved address.
    Symbol(String),
    /// A field's byte offset within a declared type; written as a plain
    /// constant, never subject to the addressing mode.
    FieldOffset { type_name: String, field: String },
}

/// Progress state of a relocation that survived local resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RelocState {
    /// External symbol; the linker must resolve it.
    NeedsLink = 0,
    /// External function at a `call` target; the linker also patches the
    /// argument/local count bytes that follow the address.
    NeedsLinkCall = 1,
    /// Locally resolved absolute address; the linker only adds the unit's
    /// base offset. Never produced in relative mode, where locally resolved
    /// values are position-independent already.
    Applied = 2,
}

impl RelocState {
    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            0 => Self::NeedsLink,
            1 => Self::NeedsLinkCall,
            2 => Self::Applied,
            _ => return None,
        })
    }
}

/// A deferred patch: where to write, how wide, and what value.
///
/// `site` is an offset into the owning section's bytes. The value written is
/// the target's unit-absolute offset in absolute mode, or
/// `target - (site_in_image + width)` in relative mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relocation {
    /// Index into the object's section list.
    pub section: u8,
    pub site: u32,
    pub width: u8,
    /// Symbol kind the target is expected to have.
    pub kind: SymbolKind,
    pub target: RelocTarget,
    pub state: RelocState,
}

impl Relocation {
    pub fn target_name(&self) -> String {
        match &self.target {
            RelocTarget::Symbol(name) => name.clone(),
            RelocTarget::FieldOffset { type_name, field } => format!("{type_name}.{field}"),
        }
    }
}
