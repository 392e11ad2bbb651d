//! Primitive type table.
//!
//! Indices are 1-based and fixed by the object format; they appear verbatim
//! in instruction operands, so reordering them is a format break. The native
//! word is pinned at 8 bytes regardless of host so object files are portable.

/// Size in bytes of the native machine word (`int`, `ptr`, `float`).
pub const NATIVE_SIZE: usize = 8;

/// Primitive value types known to the whole toolchain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeId {
    Void = 1,
    Bool = 2,
    /// Absolute pointer, native width.
    Ptr = 3,
    /// IP-relative pointer, native width.
    RPtr = 4,
    /// Native-width signed integer.
    Int = 5,
    Int8 = 6,
    Int16 = 7,
    Int32 = 8,
    Int64 = 9,
    /// Native-width float (f64 in this format).
    Float = 10,
    Float32 = 11,
    Float64 = 12,
    /// NUL-terminated byte string; pointer-sized as an operand.
    Str = 13,
    /// Raw byte blob; pointer-sized as an operand.
    Raw = 14,
    /// Frame-relative local variable slot.
    Local = 15,
    /// Frame-relative argument slot.
    Arg = 16,
}

impl TypeId {
    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            1 => Self::Void,
            2 => Self::Bool,
            3 => Self::Ptr,
            4 => Self::RPtr,
            5 => Self::Int,
            6 => Self::Int8,
            7 => Self::Int16,
            8 => Self::Int32,
            9 => Self::Int64,
            10 => Self::Float,
            11 => Self::Float32,
            12 => Self::Float64,
            13 => Self::Str,
            14 => Self::Raw,
            15 => Self::Local,
            16 => Self::Arg,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool => "bool",
            Self::Ptr => "ptr",
            Self::RPtr => "rptr",
            Self::Int => "int",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float => "float",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Str => "str",
            Self::Raw => "raw",
            Self::Local => "local",
            Self::Arg => "arg",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "void" => Self::Void,
            "bool" => Self::Bool,
            "ptr" => Self::Ptr,
            "rptr" => Self::RPtr,
            "int" => Self::Int,
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "float" => Self::Float,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            "str" => Self::Str,
            "raw" => Self::Raw,
            "local" => Self::Local,
            "arg" => Self::Arg,
            _ => return None,
        })
    }

    /// Encoded byte width of a value of this type.
    ///
    /// `str`/`raw` values live in memory; as operands they are pointers.
    /// `local`/`arg` operands encode a one-byte slot index.
    pub fn size(self) -> usize {
        match self {
            Self::Void => 0,
            Self::Bool | Self::Int8 | Self::Local | Self::Arg => 1,
            Self::Int16 => 2,
            Self::Int32 | Self::Float32 => 4,
            Self::Ptr
            | Self::RPtr
            | Self::Int
            | Self::Int64
            | Self::Float
            | Self::Float64
            | Self::Str
            | Self::Raw => NATIVE_SIZE,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::Float | Self::Float32 | Self::Float64)
    }

    pub fn is_pointer(self) -> bool {
        matches!(self, Self::Ptr | Self::RPtr | Self::Str | Self::Raw)
    }
}
