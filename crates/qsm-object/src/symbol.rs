//! Symbol kinds and the export table.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SymbolKind {
    Function = 0,
    Type = 1,
    Variable = 2,
    Label = 3,
}

impl SymbolKind {
    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            0 => Self::Function,
            1 => Self::Type,
            2 => Self::Variable,
            3 => Self::Label,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Type => "type",
            Self::Variable => "variable",
            Self::Label => "label",
        }
    }
}

/// One export table entry.
///
/// `num_args`/`num_locals` describe a function's frame so that call sites in
/// importing units can be completed at link time; both are zero for
/// non-function symbols.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Export {
    pub name: String,
    pub kind: SymbolKind,
    /// Unit-absolute offset; rebased by the linker when units are merged.
    pub offset: u64,
    pub num_args: u8,
    pub num_locals: u8,
}

impl Export {
    pub fn new(name: impl Into<String>, kind: SymbolKind, offset: u64) -> Self {
        Self {
            name: name.into(),
            kind,
            offset,
            num_args: 0,
            num_locals: 0,
        }
    }

    pub fn function(name: impl Into<String>, offset: u64, num_args: u8, num_locals: u8) -> Self {
        Self {
            name: name.into(),
            kind: SymbolKind::Function,
            offset,
            num_args,
            num_locals,
        }
    }
}
