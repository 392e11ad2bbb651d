//! Runtime faults. Every fault raised mid-execution carries the address of
//! the faulting instruction.

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("object has unresolved relocations; link it first")]
    Unlinked,

    #[error("object has no entry point")]
    NoEntryPoint,

    #[error("entry point 0x{0:x} is not in a code section")]
    EntryOutsideCode(u64),

    #[error("invalid opcode 0x{byte:02x} at 0x{ip:x}")]
    InvalidOpcode { ip: u64, byte: u8 },

    #[error("invalid type tag {byte} at 0x{ip:x}")]
    InvalidType { ip: u64, byte: u8 },

    #[error("instruction at 0x{ip:x} runs past the end of memory")]
    TruncatedCode { ip: u64 },

    #[error("operand stack underflow at 0x{ip:x}")]
    StackUnderflow { ip: u64 },

    #[error("division by zero at 0x{ip:x}")]
    ArithmeticError { ip: u64 },

    #[error("bitwise operation on float operands at 0x{ip:x}")]
    TypeMismatch { ip: u64 },

    #[error("memory access 0x{addr:x}+{len} out of bounds at 0x{ip:x}")]
    MemoryFault { ip: u64, addr: u64, len: u64 },

    #[error("jump target 0x{target:x} is not in a code section, at 0x{ip:x}")]
    JumpOutOfCode { ip: u64, target: u64 },

    #[error("frame slot {slot} out of range at 0x{ip:x}")]
    BadSlot { ip: u64, slot: u8 },

    #[error("`ret` with no frame to return from at 0x{ip:x}")]
    NoFrame { ip: u64 },

    #[error("call depth limit {limit} exceeded at 0x{ip:x}")]
    CallDepthExceeded { ip: u64, limit: u32 },

    #[error("step limit {limit} exhausted")]
    StepLimit { limit: u64 },
}
