//! The interpreter loop.

use std::cmp::Ordering;
use std::ops::Range;

use qsm_object::{AddressingMode, NATIVE_SIZE, ObjectFile, Opcode, SectionKind, TypeId};

use super::error::RuntimeError;
use super::frame::{Frame, RETURN_SENTINEL};

type Result<T> = std::result::Result<T, RuntimeError>;

/// Runtime limits. Both default to values far above anything the test
/// programs need, so only runaway programs hit them.
#[derive(Clone, Copy, Debug)]
pub struct Limits {
    pub(crate) steps: u64,
    pub(crate) call_depth: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            steps: 1_000_000,
            call_depth: 1024,
        }
    }
}

impl Limits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(mut self, steps: u64) -> Self {
        self.steps = steps;
        self
    }

    pub fn call_depth(mut self, depth: u32) -> Self {
        self.call_depth = depth;
        self
    }
}

/// Lines produced by `dlog`, in execution order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DebugLog {
    lines: Vec<String>,
}

impl DebugLog {
    pub fn record(&mut self, line: String) {
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// Holds the last compare's predicate outcome between a `cmp_*` and the
/// conditional jump that reads it. A NaN compare is false for every
/// predicate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct FlagRegister {
    truth: bool,
}

/// The machine. Memory starts as the object's flat image; `new` grows it
/// past `heap_base` and nothing is ever freed.
#[derive(Debug)]
pub struct Vm {
    memory: Vec<u8>,
    heap_base: u64,
    mode: AddressingMode,
    code_ranges: Vec<Range<u64>>,
    stack: Vec<u8>,
    frames: Vec<Frame>,
    ip: u64,
    flags: FlagRegister,
    log: DebugLog,
    limits: Limits,
    entry: u64,
    entry_args: u8,
    entry_locals: u8,
}

impl Vm {
    /// Loads a linked object. A runnable object carries no relocations:
    /// link-pending ones hold zeroed sites, and `Applied` ones mark an
    /// absolute-mode unit that still expects a link-time rebase.
    pub fn new(object: &ObjectFile) -> Result<Self> {
        if !object.relocs.is_empty() {
            return Err(RuntimeError::Unlinked);
        }
        Self::load(object)
    }

    fn load(object: &ObjectFile) -> Result<Self> {
        let entry = object.entry_point.ok_or(RuntimeError::NoEntryPoint)?;
        if !object.offset_in_code(entry) {
            return Err(RuntimeError::EntryOutsideCode(entry));
        }

        let bases = object.section_bases();
        let code_ranges = object
            .sections
            .iter()
            .zip(&bases)
            .filter(|(s, _)| s.kind == SectionKind::Code)
            .map(|(s, &base)| base..base + s.len() as u64)
            .collect();

        let (entry_args, entry_locals) = object
            .exports
            .iter()
            .find(|e| e.offset == entry)
            .map(|e| (e.num_args, e.num_locals))
            .unwrap_or((0, 0));

        let memory = object.image();
        Ok(Self {
            heap_base: memory.len() as u64,
            memory,
            mode: object.mode,
            code_ranges,
            stack: Vec::new(),
            frames: Vec::new(),
            ip: entry,
            flags: FlagRegister::default(),
            log: DebugLog::default(),
            limits: Limits::default(),
            entry,
            entry_args,
            entry_locals,
        })
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn debug_log(&self) -> &DebugLog {
        &self.log
    }

    pub fn stack(&self) -> &[u8] {
        &self.stack
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// First address past the loaded image; all `new` allocations live at
    /// or above it.
    pub fn heap_base(&self) -> u64 {
        self.heap_base
    }

    /// Runs from the entry point until the program halts. Returns the
    /// program's exit status: the value `exit` popped, or the entry
    /// function's return value, or zero.
    pub fn run(&mut self) -> Result<i64> {
        self.ip = self.entry;
        self.frames
            .push(Frame::entry(self.entry_args, self.entry_locals));
        for _ in 0..self.limits.steps {
            if let Some(status) = self.step()? {
                return Ok(status);
            }
        }
        Err(RuntimeError::StepLimit {
            limit: self.limits.steps,
        })
    }

    /// One fetch-decode-execute cycle. `Some(status)` means the machine
    /// halted.
    fn step(&mut self) -> Result<Option<i64>> {
        let at = self.ip;
        let byte = self.fetch_u8(at)?;
        let op = Opcode::from_byte(byte).ok_or(RuntimeError::InvalidOpcode { ip: at, byte })?;

        match op {
            Opcode::Nop => {}
            Opcode::Dlog => {
                let line = self.dlog_value(at)?;
                self.log.record(line);
            }
            Opcode::Push => self.op_push(at)?,
            Opcode::Pop => self.op_pop(at)?,
            Opcode::Call => self.op_call(at)?,
            Opcode::Ret => return self.op_ret(at),
            Opcode::Jmp | Opcode::JmpTrue | Opcode::JmpFalse => self.op_jump(op, at)?,
            Opcode::CmpGt
            | Opcode::CmpLt
            | Opcode::CmpGe
            | Opcode::CmpLe
            | Opcode::CmpEq
            | Opcode::CmpNe => self.op_compare(op, at)?,
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor => self.op_alu(op, at)?,
            Opcode::Not => {
                let ty = self.fetch_type(at)?;
                if ty.is_float() {
                    return Err(RuntimeError::TypeMismatch { ip: at });
                }
                let value = self.pop_int(at, ty)?;
                self.push_int(!value, ty);
            }
            Opcode::PushMem => {
                let ty = self.fetch_type(at)?;
                let addr = self.pop_word(at)?;
                let bytes = self.read_mem(at, addr, ty.size() as u64)?.to_vec();
                self.stack.extend_from_slice(&bytes);
            }
            Opcode::PopMem => {
                let ty = self.fetch_type(at)?;
                let addr = self.pop_word(at)?;
                let bytes = self.pop_bytes(at, ty.size())?;
                self.write_mem(at, addr, &bytes)?;
            }
            Opcode::New => {
                let size = self.fetch_u64(at)?;
                let count = self.fetch_u64(at)?;
                let len = size
                    .checked_mul(count)
                    .ok_or(RuntimeError::MemoryFault {
                        ip: at,
                        addr: self.memory.len() as u64,
                        len: u64::MAX,
                    })?;
                let addr = self.alloc(len);
                self.push_word(addr);
            }
            Opcode::Dup => {
                let ty = self.fetch_type(at)?;
                let width = ty.size();
                if self.stack.len() < width {
                    return Err(RuntimeError::StackUnderflow { ip: at });
                }
                let top = self.stack[self.stack.len() - width..].to_vec();
                self.stack.extend_from_slice(&top);
            }
            Opcode::Concat => self.op_concat(at)?,
            Opcode::Exit => {
                let status = self.pop_int(at, TypeId::Int)?;
                return Ok(Some(status));
            }
        }
        Ok(None)
    }

    fn op_push(&mut self, at: u64) -> Result<()> {
        let ty = self.fetch_type(at)?;
        match ty {
            TypeId::Local | TypeId::Arg => {
                let slot = self.fetch_u8(at)?;
                let word = self.frame_get(at, ty, slot)?;
                self.push_word(word);
            }
            TypeId::RPtr => {
                let site = self.ip;
                let value = self.fetch_u64(at)? as i64;
                let abs = site as i64 + NATIVE_SIZE as i64 + value;
                self.push_word(abs as u64);
            }
            // Patched with a displacement or an absolute address per the
            // object's mode; either way the stack gets the address.
            TypeId::Str | TypeId::Raw => {
                let site = self.ip;
                let raw = self.fetch_u64(at)? as i64;
                let addr = self.resolve_target(site, raw);
                self.push_word(addr);
            }
            _ => {
                let width = ty.size();
                let start = self.ip;
                let bytes = self.read_mem(at, start, width as u64)?.to_vec();
                self.ip += width as u64;
                self.stack.extend_from_slice(&bytes);
            }
        }
        Ok(())
    }

    fn op_pop(&mut self, at: u64) -> Result<()> {
        let ty = self.fetch_type(at)?;
        match ty {
            TypeId::Local | TypeId::Arg => {
                let slot = self.fetch_u8(at)?;
                let word = self.pop_word(at)?;
                self.frame_set(at, ty, slot, word)?;
            }
            _ => {
                self.pop_bytes(at, ty.size())?;
            }
        }
        Ok(())
    }

    fn op_call(&mut self, at: u64) -> Result<()> {
        let site = self.ip;
        let raw = self.fetch_u64(at)? as i64;
        let num_args = self.fetch_u8(at)?;
        let num_locals = self.fetch_u8(at)?;
        let dest = self.resolve_target(site, raw);
        self.check_code(at, dest)?;
        if self.frames.len() as u32 >= self.limits.call_depth {
            return Err(RuntimeError::CallDepthExceeded {
                ip: at,
                limit: self.limits.call_depth,
            });
        }

        // Arguments were pushed first-to-last; pop back into slot order.
        let mut args = Vec::with_capacity(num_args as usize);
        for _ in 0..num_args {
            args.push(self.pop_word(at)?);
        }
        args.reverse();

        self.frames.push(Frame::new(self.ip, args, num_locals));
        self.ip = dest;
        Ok(())
    }

    fn op_ret(&mut self, at: u64) -> Result<Option<i64>> {
        let frame = self.frames.pop().ok_or(RuntimeError::NoFrame { ip: at })?;
        if frame.return_addr == RETURN_SENTINEL {
            // Halting through the entry frame: the entry function's return
            // value, if it left one, becomes the exit status.
            let status = if self.stack.len() >= NATIVE_SIZE {
                self.pop_word(at)? as i64
            } else {
                0
            };
            return Ok(Some(status));
        }
        self.check_code(at, frame.return_addr)?;
        self.ip = frame.return_addr;
        Ok(None)
    }

    fn op_jump(&mut self, op: Opcode, at: u64) -> Result<()> {
        let site = self.ip;
        let raw = self.fetch_u64(at)? as i64;
        let taken = match op {
            Opcode::JmpTrue => self.flags.truth,
            Opcode::JmpFalse => !self.flags.truth,
            _ => true,
        };
        if taken {
            let dest = self.resolve_target(site, raw);
            self.check_code(at, dest)?;
            self.ip = dest;
        }
        Ok(())
    }

    fn op_compare(&mut self, op: Opcode, at: u64) -> Result<()> {
        let lhs_ty = self.fetch_type(at)?;
        let rhs_ty = self.fetch_type(at)?;
        let ordering = if lhs_ty.is_float() || rhs_ty.is_float() {
            let rhs = self.pop_float(at, rhs_ty)?;
            let lhs = self.pop_float(at, lhs_ty)?;
            lhs.partial_cmp(&rhs)
        } else {
            let rhs = self.pop_int(at, rhs_ty)?;
            let lhs = self.pop_int(at, lhs_ty)?;
            Some(lhs.cmp(&rhs))
        };
        let truth = match (op, ordering) {
            (_, None) => false,
            (Opcode::CmpGt, Some(ord)) => ord == Ordering::Greater,
            (Opcode::CmpLt, Some(ord)) => ord == Ordering::Less,
            (Opcode::CmpGe, Some(ord)) => ord != Ordering::Less,
            (Opcode::CmpLe, Some(ord)) => ord != Ordering::Greater,
            (Opcode::CmpEq, Some(ord)) => ord == Ordering::Equal,
            (_, Some(ord)) => ord != Ordering::Equal,
        };
        self.flags = FlagRegister { truth };
        Ok(())
    }

    /// Binary ALU op. The result is pushed at the first operand's width;
    /// floats take over when either side is float-typed.
    fn op_alu(&mut self, op: Opcode, at: u64) -> Result<()> {
        let lhs_ty = self.fetch_type(at)?;
        let rhs_ty = self.fetch_type(at)?;

        if lhs_ty.is_float() || rhs_ty.is_float() {
            let rhs = self.pop_float(at, rhs_ty)?;
            let lhs = self.pop_float(at, lhs_ty)?;
            let result = match op {
                Opcode::Add => lhs + rhs,
                Opcode::Sub => lhs - rhs,
                Opcode::Mul => lhs * rhs,
                Opcode::Div => lhs / rhs,
                Opcode::Mod => lhs % rhs,
                _ => return Err(RuntimeError::TypeMismatch { ip: at }),
            };
            let out_ty = if lhs_ty.is_float() { lhs_ty } else { TypeId::Float };
            self.push_float(result, out_ty);
            return Ok(());
        }

        let rhs = self.pop_int(at, rhs_ty)?;
        let lhs = self.pop_int(at, lhs_ty)?;
        let result = match op {
            Opcode::Add => lhs.wrapping_add(rhs),
            Opcode::Sub => lhs.wrapping_sub(rhs),
            Opcode::Mul => lhs.wrapping_mul(rhs),
            Opcode::Div => {
                if rhs == 0 {
                    return Err(RuntimeError::ArithmeticError { ip: at });
                }
                lhs.wrapping_div(rhs)
            }
            Opcode::Mod => {
                if rhs == 0 {
                    return Err(RuntimeError::ArithmeticError { ip: at });
                }
                lhs.wrapping_rem(rhs)
            }
            Opcode::And => lhs & rhs,
            Opcode::Or => lhs | rhs,
            _ => lhs ^ rhs,
        };
        self.push_int(result, lhs_ty);
        Ok(())
    }

    fn op_concat(&mut self, at: u64) -> Result<()> {
        let second = self.pop_word(at)?;
        let first = self.pop_word(at)?;
        let mut joined = self.read_cstr(at, first)?;
        joined.extend_from_slice(&self.read_cstr(at, second)?);
        joined.push(0);
        let addr = self.alloc(joined.len() as u64);
        self.write_mem(at, addr, &joined)?;
        self.push_word(addr);
        Ok(())
    }

    fn dlog_value(&mut self, at: u64) -> Result<String> {
        let ty = self.fetch_type(at)?;
        Ok(match ty {
            TypeId::Float | TypeId::Float32 | TypeId::Float64 => {
                format!("{}", self.pop_float(at, ty)?)
            }
            TypeId::Str => {
                let addr = self.pop_word(at)?;
                let bytes = self.read_cstr(at, addr)?;
                String::from_utf8_lossy(&bytes).into_owned()
            }
            TypeId::Bool => {
                if self.pop_int(at, ty)? != 0 {
                    "true".to_string()
                } else {
                    "false".to_string()
                }
            }
            _ => format!("{}", self.pop_int(at, ty)?),
        })
    }

    // Fetching decodes operands at the instruction pointer; every fetch
    // advances it.

    fn fetch_u8(&mut self, at: u64) -> Result<u8> {
        let byte = *self
            .memory
            .get(self.ip as usize)
            .ok_or(RuntimeError::TruncatedCode { ip: at })?;
        self.ip += 1;
        Ok(byte)
    }

    fn fetch_u64(&mut self, at: u64) -> Result<u64> {
        let start = self.ip as usize;
        let bytes = self
            .memory
            .get(start..start + NATIVE_SIZE)
            .ok_or(RuntimeError::TruncatedCode { ip: at })?;
        let value = u64::from_le_bytes(bytes.try_into().unwrap());
        self.ip += NATIVE_SIZE as u64;
        Ok(value)
    }

    fn fetch_type(&mut self, at: u64) -> Result<TypeId> {
        let byte = self.fetch_u8(at)?;
        TypeId::from_byte(byte).ok_or(RuntimeError::InvalidType { ip: at, byte })
    }

    /// Code address held by a target operand that started at `site`.
    fn resolve_target(&self, site: u64, raw: i64) -> u64 {
        match self.mode {
            AddressingMode::Absolute => raw as u64,
            AddressingMode::Relative => (site as i64 + NATIVE_SIZE as i64 + raw) as u64,
        }
    }

    fn check_code(&self, at: u64, target: u64) -> Result<()> {
        if self.code_ranges.iter().any(|r| r.contains(&target)) {
            Ok(())
        } else {
            Err(RuntimeError::JumpOutOfCode { ip: at, target })
        }
    }

    // Operand stack.

    fn push_word(&mut self, value: u64) {
        self.stack.extend_from_slice(&value.to_le_bytes());
    }

    fn pop_word(&mut self, at: u64) -> Result<u64> {
        let bytes = self.pop_bytes(at, NATIVE_SIZE)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn pop_bytes(&mut self, at: u64, width: usize) -> Result<Vec<u8>> {
        if self.stack.len() < width {
            return Err(RuntimeError::StackUnderflow { ip: at });
        }
        Ok(self.stack.split_off(self.stack.len() - width))
    }

    /// Pops a `ty`-wide integer, sign-extended to a native word.
    fn pop_int(&mut self, at: u64, ty: TypeId) -> Result<i64> {
        let width = ty.size();
        let bytes = self.pop_bytes(at, width)?;
        let mut buf = [0u8; NATIVE_SIZE];
        buf[..width].copy_from_slice(&bytes);
        let raw = i64::from_le_bytes(buf);
        if width < NATIVE_SIZE {
            let shift = (NATIVE_SIZE - width) as u32 * 8;
            Ok((raw << shift) >> shift)
        } else {
            Ok(raw)
        }
    }

    fn push_int(&mut self, value: i64, ty: TypeId) {
        let bytes = value.to_le_bytes();
        self.stack.extend_from_slice(&bytes[..ty.size()]);
    }

    fn pop_float(&mut self, at: u64, ty: TypeId) -> Result<f64> {
        match ty {
            TypeId::Float32 => {
                let bytes = self.pop_bytes(at, 4)?;
                Ok(f32::from_le_bytes(bytes.try_into().unwrap()) as f64)
            }
            TypeId::Float | TypeId::Float64 => {
                let bytes = self.pop_bytes(at, NATIVE_SIZE)?;
                Ok(f64::from_le_bytes(bytes.try_into().unwrap()))
            }
            // An int-typed operand in a float context.
            _ => Ok(self.pop_int(at, ty)? as f64),
        }
    }

    fn push_float(&mut self, value: f64, ty: TypeId) {
        if ty == TypeId::Float32 {
            self.stack.extend_from_slice(&(value as f32).to_le_bytes());
        } else {
            self.stack.extend_from_slice(&value.to_le_bytes());
        }
    }

    // Frames.

    fn frame(&self, at: u64) -> Result<&Frame> {
        self.frames.last().ok_or(RuntimeError::NoFrame { ip: at })
    }

    fn frame_get(&self, at: u64, ty: TypeId, slot: u8) -> Result<u64> {
        let frame = self.frame(at)?;
        let value = match ty {
            TypeId::Arg => frame.arg(slot),
            _ => frame.local(slot),
        };
        value.ok_or(RuntimeError::BadSlot { ip: at, slot })
    }

    fn frame_set(&mut self, at: u64, ty: TypeId, slot: u8, value: u64) -> Result<()> {
        let frame = self
            .frames
            .last_mut()
            .ok_or(RuntimeError::NoFrame { ip: at })?;
        let ok = match ty {
            TypeId::Arg => frame.set_arg(slot, value),
            _ => frame.set_local(slot, value),
        };
        if ok {
            Ok(())
        } else {
            Err(RuntimeError::BadSlot { ip: at, slot })
        }
    }

    // Memory.

    fn read_mem(&self, at: u64, addr: u64, len: u64) -> Result<&[u8]> {
        let start = addr as usize;
        let end = start.checked_add(len as usize);
        end.and_then(|end| self.memory.get(start..end))
            .ok_or(RuntimeError::MemoryFault { ip: at, addr, len })
    }

    fn write_mem(&mut self, at: u64, addr: u64, bytes: &[u8]) -> Result<()> {
        let start = addr as usize;
        let end = start.checked_add(bytes.len());
        match end.and_then(|end| self.memory.get_mut(start..end)) {
            Some(slice) => {
                slice.copy_from_slice(bytes);
                Ok(())
            }
            None => Err(RuntimeError::MemoryFault {
                ip: at,
                addr,
                len: bytes.len() as u64,
            }),
        }
    }

    /// NUL-terminated string bytes at `addr`, terminator excluded.
    fn read_cstr(&self, at: u64, addr: u64) -> Result<Vec<u8>> {
        let start = addr as usize;
        let tail = self
            .memory
            .get(start..)
            .ok_or(RuntimeError::MemoryFault { ip: at, addr, len: 1 })?;
        let end = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or(RuntimeError::MemoryFault {
                ip: at,
                addr,
                len: tail.len() as u64,
            })?;
        Ok(tail[..end].to_vec())
    }

    /// Bump allocation; the region starts zeroed and is never reclaimed.
    fn alloc(&mut self, len: u64) -> u64 {
        let addr = self.memory.len() as u64;
        self.memory.resize(self.memory.len() + len as usize, 0);
        addr
    }
}
