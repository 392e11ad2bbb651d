//! QSM object files: the binary contract between assembler, linker and VM.
//!
//! One assembly unit produces one [`ObjectFile`]: a fixed 16-byte header,
//! a section table, the raw section bytes, an export table, and (until the
//! unit is fully linked) a relocation table. All three tools share the type
//! table in [`types`] and the instruction encoding in [`opcode`], so the
//! layout of every operand is fixed by this crate alone.

pub mod header;
pub mod object;
pub mod opcode;
pub mod reloc;
pub mod section;
pub mod symbol;
pub mod types;

#[cfg(test)]
mod header_tests;
#[cfg(test)]
mod object_tests;
#[cfg(test)]
mod opcode_tests;
#[cfg(test)]
mod types_tests;

pub use header::{ARCH_INFO, Flags, Header, LANG_VERSION, SIGNATURE};
pub use object::{ObjectError, ObjectFile};
pub use opcode::{Opcode, OperandSlot};
pub use reloc::{AddressingMode, RelocState, RelocTarget, Relocation};
pub use section::{Section, SectionKind};
pub use symbol::{Export, SymbolKind};
pub use types::{NATIVE_SIZE, TypeId};
