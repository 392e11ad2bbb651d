//! Section emitter (pass 3).
//!
//! Walks each section's items in document order, encoding data items and
//! instructions into per-section byte buffers. Every symbol definition is
//! recorded into the table at its final section offset; every operand whose
//! value depends on an address emits a zero-filled placeholder and a pending
//! relocation for pass 4. Arg/local slot references resolve immediately from
//! the enclosing function's frame layout.

use qsm_object::{
    AddressingMode, NATIVE_SIZE, Opcode, OperandSlot, RelocTarget, SectionKind, SymbolKind, TypeId,
};

use crate::ast::{Document, FuncDecl, Instr, Item, Operand, OperandValue, Pos};
use crate::resolve::{Definition, SymbolKey, SymbolTable, is_block_local};
use crate::{AsmError, Result};

/// One emitted section: final bytes, addresses still unpatched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmittedSection {
    pub name: String,
    pub kind: SectionKind,
    pub bytes: Vec<u8>,
}

/// An address-dependent site awaiting pass 4.
///
/// Unlike the wire `Relocation`, this carries the function scope of the
/// reference so block-local labels resolve against the right frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingReloc {
    pub section: u8,
    pub site: u32,
    pub width: u8,
    pub kind: SymbolKind,
    pub target: RelocTarget,
    pub scope: Option<String>,
    /// `call` sites additionally need the callee's frame counts patched
    /// when the target is external.
    pub call_site: bool,
    pub pos: Pos,
}

/// Output of pass 3: section buffers plus the pending relocation list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EmittedUnit {
    pub sections: Vec<EmittedSection>,
    pub pending: Vec<PendingReloc>,
}

impl EmittedUnit {
    /// Base offset of each section in the unit's flat image.
    pub fn section_bases(&self) -> Vec<u64> {
        let mut bases = Vec::with_capacity(self.sections.len());
        let mut cursor = 0u64;
        for section in &self.sections {
            bases.push(cursor);
            cursor += section.bytes.len() as u64;
        }
        bases
    }
}

pub fn emit(doc: &Document, table: &mut SymbolTable, mode: AddressingMode) -> Result<EmittedUnit> {
    let mut emitter = Emitter {
        table,
        mode,
        unit: EmittedUnit::default(),
        current: 0,
        scope: None,
    };

    for block in &doc.sections {
        emitter.unit.sections.push(EmittedSection {
            name: block.name.clone(),
            kind: block.kind,
            bytes: Vec::new(),
        });
        emitter.current = emitter.unit.sections.len() - 1;
        match block.kind {
            // Carried in the header and the object tables, not as bytes.
            SectionKind::Config
            | SectionKind::Types
            | SectionKind::Imports
            | SectionKind::Exports => {}
            SectionKind::Data => emitter.data_items(&block.items)?,
            SectionKind::Code => emitter.code_items(&block.items)?,
        }
    }

    Ok(emitter.unit)
}

struct Emitter<'t> {
    table: &'t mut SymbolTable,
    mode: AddressingMode,
    unit: EmittedUnit,
    current: usize,
    /// Enclosing function, while emitting a body.
    scope: Option<String>,
}

impl Emitter<'_> {
    fn cursor(&self) -> u32 {
        self.unit.sections[self.current].bytes.len() as u32
    }

    fn bytes(&mut self) -> &mut Vec<u8> {
        &mut self.unit.sections[self.current].bytes
    }

    fn define_here(&mut self, name: &str, kind: SymbolKind) {
        let key = match (&self.scope, is_block_local(name)) {
            (Some(scope), true) => SymbolKey::scoped(scope.clone(), name),
            _ => SymbolKey::global(name),
        };
        let def = Definition {
            kind,
            section: self.current as u8,
            offset: self.cursor(),
        };
        self.table.define(key, def);
    }

    /// Zero placeholder plus a pending relocation at the placeholder site.
    fn placeholder(&mut self, width: u8, kind: SymbolKind, target: RelocTarget, pos: Pos) {
        self.placeholder_at_call(width, kind, target, pos, false);
    }

    fn placeholder_at_call(
        &mut self,
        width: u8,
        kind: SymbolKind,
        target: RelocTarget,
        pos: Pos,
        call_site: bool,
    ) {
        let pending = PendingReloc {
            section: self.current as u8,
            site: self.cursor(),
            width,
            kind,
            target,
            scope: self.scope.clone(),
            call_site,
            pos,
        };
        self.bytes().extend(std::iter::repeat_n(0u8, width as usize));
        self.unit.pending.push(pending);
    }

    fn data_items(&mut self, items: &[Item]) -> Result<()> {
        for item in items {
            match item {
                Item::Label(decl) => self.define_here(&decl.name, SymbolKind::Variable),
                Item::Instr(instr) if instr.mnemonic == "db" => {
                    for arg in &instr.args {
                        self.data_operand(arg)?;
                    }
                }
                Item::Instr(instr) => {
                    return Err(AsmError::Syntax {
                        message: format!(
                            "`{}` is not valid in the data section; only `db` items are",
                            instr.mnemonic
                        ),
                        pos: instr.pos,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// One `db` operand. Strings get a NUL terminator so string memory is
    /// always `str`-shaped.
    fn data_operand(&mut self, arg: &Operand) -> Result<()> {
        let ty = self.operand_type(arg)?;
        match &arg.value {
            OperandValue::Bytes(bytes) => self.bytes().extend_from_slice(bytes),
            OperandValue::Str(text) => {
                self.bytes().extend_from_slice(text.as_bytes());
                self.bytes().push(0);
            }
            OperandValue::Int(value) => self.encode_int(*value, ty, arg.pos)?,
            OperandValue::Float(value) => self.encode_float(*value, ty, arg.pos)?,
            OperandValue::Ident(name) => {
                // A symbol address stored in data, patched in pass 4.
                let kind = self.reference_kind(name, arg.pos)?;
                self.placeholder(
                    NATIVE_SIZE as u8,
                    kind,
                    RelocTarget::Symbol(name.clone()),
                    arg.pos,
                );
            }
            OperandValue::Member { type_name, field } => {
                let offset = self.field_offset(type_name, field, arg.pos)?;
                self.encode_int(offset as i64, TypeId::Int, arg.pos)?;
            }
        }
        Ok(())
    }

    fn code_items(&mut self, items: &[Item]) -> Result<()> {
        for item in items {
            match item {
                Item::Label(decl) => self.define_here(&decl.name, SymbolKind::Label),
                Item::Func(decl) => self.function(decl)?,
                Item::Instr(instr) => self.instruction(instr)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn function(&mut self, decl: &FuncDecl) -> Result<()> {
        self.define_here(&decl.name, SymbolKind::Function);
        self.scope = Some(decl.name.clone());
        for item in &decl.body {
            match item {
                Item::Label(label) => self.define_here(&label.name, SymbolKind::Label),
                Item::Instr(instr) => self.instruction(instr)?,
                _ => {}
            }
        }
        self.scope = None;
        Ok(())
    }

    fn instruction(&mut self, instr: &Instr) -> Result<()> {
        let opcode = Opcode::from_mnemonic(&instr.mnemonic).ok_or_else(|| {
            AsmError::UnknownInstruction {
                mnemonic: instr.mnemonic.clone(),
                pos: instr.pos,
            }
        })?;

        let slots = opcode.operands();
        if instr.args.len() != slots.len() {
            return Err(AsmError::OperandCount {
                mnemonic: instr.mnemonic.clone(),
                expected: slots.len(),
                got: instr.args.len(),
                pos: instr.pos,
            });
        }

        self.bytes().push(opcode as u8);
        for (slot, arg) in slots.iter().zip(&instr.args) {
            match slot {
                OperandSlot::Width => self.width_operand(arg)?,
                OperandSlot::TypedValue => self.typed_value(opcode, arg)?,
                OperandSlot::Target => self.target_operand(opcode, arg)?,
                OperandSlot::Imm => self.imm_operand(arg)?,
            }
        }
        Ok(())
    }

    /// A bare type keyword naming an operand width (`add int, int8`).
    fn width_operand(&mut self, arg: &Operand) -> Result<()> {
        let invalid = |message: String| AsmError::InvalidOperand {
            message,
            pos: arg.pos,
        };
        let name = arg
            .ident()
            .filter(|_| arg.ty.is_none())
            .ok_or_else(|| invalid("expected a type keyword".to_string()))?;
        let ty = TypeId::from_name(name)
            .ok_or_else(|| invalid(format!("unknown type `{name}`")))?;
        if matches!(ty, TypeId::Void | TypeId::Local | TypeId::Arg) {
            return Err(invalid(format!("`{name}` does not name a value width")));
        }
        self.bytes().push(ty as u8);
        Ok(())
    }

    /// `push`/`pop` operand: a type byte plus a payload. `pop <type>`
    /// discards and carries no payload; `local`/`arg` payloads are one slot
    /// byte; everything else carries its own width.
    fn typed_value(&mut self, opcode: Opcode, arg: &Operand) -> Result<()> {
        let ty = self.operand_type(arg)?;

        if matches!(ty, TypeId::Local | TypeId::Arg) {
            let slot = self.slot_index(ty, arg)?;
            self.bytes().push(ty as u8);
            self.bytes().push(slot);
            return Ok(());
        }

        match &arg.value {
            OperandValue::Int(value) => {
                self.bytes().push(ty as u8);
                if opcode == Opcode::Pop {
                    return Ok(());
                }
                self.encode_int(*value, ty, arg.pos)
            }
            OperandValue::Float(value) => {
                self.bytes().push(ty as u8);
                if opcode == Opcode::Pop {
                    return Ok(());
                }
                self.encode_float(*value, ty, arg.pos)
            }
            // `pop int` etc: a bare type keyword, discard semantics.
            OperandValue::Ident(name) if opcode == Opcode::Pop && arg.ty.is_none() => {
                let ty = TypeId::from_name(name).ok_or_else(|| AsmError::InvalidOperand {
                    message: format!("`pop` expects a type or slot, got `{name}`"),
                    pos: arg.pos,
                })?;
                self.bytes().push(ty as u8);
                Ok(())
            }
            OperandValue::Ident(name) => {
                // A symbol's address: pointer-typed, patched in pass 4.
                let ty = match arg.ty {
                    Some(_) => ty,
                    None => match self.mode {
                        AddressingMode::Relative => TypeId::RPtr,
                        AddressingMode::Absolute => TypeId::Ptr,
                    },
                };
                if !ty.is_pointer() {
                    return Err(AsmError::InvalidOperand {
                        message: format!("symbol operand `{name}` requires a pointer type"),
                        pos: arg.pos,
                    });
                }
                // Pass 4 patches a value shaped by the unit's mode; `ptr` and
                // `rptr` commit to one shape, so they must agree with it.
                let mode_ok = match ty {
                    TypeId::Ptr => self.mode == AddressingMode::Absolute,
                    TypeId::RPtr => self.mode == AddressingMode::Relative,
                    _ => true,
                };
                if !mode_ok {
                    return Err(AsmError::InvalidOperand {
                        message: format!(
                            "`{}` operand does not match the unit's addressing mode",
                            ty.name()
                        ),
                        pos: arg.pos,
                    });
                }
                let kind = self.reference_kind(name, arg.pos)?;
                self.bytes().push(ty as u8);
                self.placeholder(
                    NATIVE_SIZE as u8,
                    kind,
                    RelocTarget::Symbol(name.clone()),
                    arg.pos,
                );
                Ok(())
            }
            OperandValue::Member { type_name, field } => {
                let offset = self.field_offset(type_name, field, arg.pos)?;
                self.bytes().push(TypeId::Int as u8);
                self.encode_int(offset as i64, TypeId::Int, arg.pos)
            }
            OperandValue::Str(_) => Err(AsmError::InvalidOperand {
                message: "string literals live in the data section; push their label".to_string(),
                pos: arg.pos,
            }),
            OperandValue::Bytes(_) => Err(AsmError::InvalidOperand {
                message: "byte lists are data items, not instruction operands".to_string(),
                pos: arg.pos,
            }),
        }
    }

    /// Jump or call target. `call` sites to known functions get the
    /// callee's frame counts appended; external targets get zero counts for
    /// the linker to patch.
    fn target_operand(&mut self, opcode: Opcode, arg: &Operand) -> Result<()> {
        let name = arg.ident().ok_or_else(|| AsmError::InvalidOperand {
            message: format!("`{}` takes a symbol target", opcode.mnemonic()),
            pos: arg.pos,
        })?;
        let kind = self.reference_kind(name, arg.pos)?;
        let external = self.table.is_import(name);

        if opcode == Opcode::Call {
            if kind != SymbolKind::Function {
                return Err(AsmError::InvalidOperand {
                    message: format!("`call` target `{name}` is not a function"),
                    pos: arg.pos,
                });
            }
            self.placeholder_at_call(
                NATIVE_SIZE as u8,
                kind,
                RelocTarget::Symbol(name.to_string()),
                arg.pos,
                external,
            );
            let (num_args, num_locals) = match self.table.funcs.get(name) {
                Some(func) => (func.num_args(), func.num_locals()),
                None => (0, 0),
            };
            self.bytes().push(num_args);
            self.bytes().push(num_locals);
        } else {
            self.placeholder(
                NATIVE_SIZE as u8,
                kind,
                RelocTarget::Symbol(name.to_string()),
                arg.pos,
            );
        }
        Ok(())
    }

    /// `new` operand: a native-width integer, with a type name folding to
    /// that type's total size.
    fn imm_operand(&mut self, arg: &Operand) -> Result<()> {
        let value = match &arg.value {
            OperandValue::Int(value) => *value,
            OperandValue::Ident(name) => match self.table.types.get(name) {
                Some(info) => info.size as i64,
                None => {
                    return Err(AsmError::UndefinedSymbol {
                        name: name.clone(),
                        pos: arg.pos,
                    });
                }
            },
            _ => {
                return Err(AsmError::InvalidOperand {
                    message: "expected an integer or a type name".to_string(),
                    pos: arg.pos,
                });
            }
        };
        self.encode_int(value, TypeId::Int, arg.pos)
    }

    /// Concrete type of an operand: the explicit prefix if present, else
    /// inferred from the literal form (`int` for integers, `float` for
    /// floats, `str` for strings).
    fn operand_type(&self, arg: &Operand) -> Result<TypeId> {
        if let Some(name) = &arg.ty {
            return TypeId::from_name(name).ok_or_else(|| AsmError::InvalidOperand {
                message: format!("unknown type `{name}`"),
                pos: arg.pos,
            });
        }
        Ok(match &arg.value {
            OperandValue::Float(_) => TypeId::Float,
            OperandValue::Str(_) => TypeId::Str,
            OperandValue::Bytes(_) => TypeId::Raw,
            _ => TypeId::Int,
        })
    }

    /// Frame slot index for a `local x` / `arg y` operand.
    fn slot_index(&self, ty: TypeId, arg: &Operand) -> Result<u8> {
        let invalid = |message: String| AsmError::InvalidOperand {
            message,
            pos: arg.pos,
        };
        let func = self
            .scope
            .as_ref()
            .and_then(|name| self.table.funcs.get(name))
            .ok_or_else(|| invalid("frame slot reference outside a function".to_string()))?;
        match &arg.value {
            OperandValue::Int(index) if (0..=255).contains(index) => Ok(*index as u8),
            OperandValue::Ident(name) => {
                let slot = match ty {
                    TypeId::Local => func.local_slot(name),
                    _ => func.arg_slot(name),
                };
                slot.ok_or_else(|| AsmError::UndefinedSymbol {
                    name: name.clone(),
                    pos: arg.pos,
                })
            }
            _ => Err(invalid("expected a slot name or index".to_string())),
        }
    }

    /// Expected symbol kind of a name at a reference site.
    fn reference_kind(&self, name: &str, pos: Pos) -> Result<SymbolKind> {
        if self.table.funcs.contains_key(name) {
            return Ok(SymbolKind::Function);
        }
        if let Some(import) = self.table.imports.get(name) {
            return Ok(import.kind);
        }
        if self.table.knows(self.scope.as_deref(), name) {
            return Ok(SymbolKind::Label);
        }
        Err(AsmError::UndefinedSymbol {
            name: name.to_string(),
            pos,
        })
    }

    fn field_offset(&self, type_name: &str, field: &str, pos: Pos) -> Result<u64> {
        let info = self
            .table
            .types
            .get(type_name)
            .ok_or_else(|| AsmError::UndefinedSymbol {
                name: type_name.to_string(),
                pos,
            })?;
        info.field_offset(field)
            .ok_or_else(|| AsmError::UnknownFieldType {
                type_name: type_name.to_string(),
                field: field.to_string(),
                pos,
            })
    }

    /// Little-endian integer at the type's width, range-checked.
    fn encode_int(&mut self, value: i64, ty: TypeId, pos: Pos) -> Result<()> {
        let width = ty.size();
        if ty.is_float() {
            return self.encode_float(value as f64, ty, pos);
        }
        if width == 0 {
            return Err(AsmError::InvalidOperand {
                message: format!("`{}` literals carry no bytes", ty.name()),
                pos,
            });
        }
        if !int_fits(value, width) {
            return Err(AsmError::InvalidOperand {
                message: format!("value {value} does not fit in {width} bytes"),
                pos,
            });
        }
        let bytes = value.to_le_bytes();
        self.bytes().extend_from_slice(&bytes[..width]);
        Ok(())
    }

    fn encode_float(&mut self, value: f64, ty: TypeId, pos: Pos) -> Result<()> {
        match ty {
            TypeId::Float | TypeId::Float64 => {
                self.bytes().extend_from_slice(&value.to_le_bytes());
                Ok(())
            }
            TypeId::Float32 => {
                self.bytes().extend_from_slice(&(value as f32).to_le_bytes());
                Ok(())
            }
            _ => Err(AsmError::InvalidOperand {
                message: format!("float literal with non-float type `{}`", ty.name()),
                pos,
            }),
        }
    }
}

/// True when `value` is representable in `width` bytes, signed or unsigned.
fn int_fits(value: i64, width: usize) -> bool {
    if width >= 8 {
        return true;
    }
    let bits = width as u32 * 8;
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << bits) - 1;
    (min..=max).contains(&value)
}
