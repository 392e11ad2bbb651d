//! Sections and the on-disk section table.

pub const MAX_SECTION_NAME: usize = 8;

/// One section table entry: name[8], kind, pad[3], size u32, offset u32.
pub const SECTION_ENTRY_SIZE: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SectionKind {
    Config = 0,
    Types = 1,
    Data = 2,
    Code = 3,
    Imports = 4,
    Exports = 5,
}

impl SectionKind {
    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            0 => Self::Config,
            1 => Self::Types,
            2 => Self::Data,
            3 => Self::Code,
            4 => Self::Imports,
            5 => Self::Exports,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Types => "types",
            Self::Data => "data",
            Self::Code => "code",
            Self::Imports => "imports",
            Self::Exports => "exports",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "config" => Self::Config,
            "types" => Self::Types,
            "data" => Self::Data,
            "code" => Self::Code,
            "imports" => Self::Imports,
            "exports" => Self::Exports,
            _ => return None,
        })
    }
}

/// A named byte region of an object file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub kind: SectionKind,
    pub data: Vec<u8>,
}

impl Section {
    pub fn new(name: impl Into<String>, kind: SectionKind, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            kind,
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
