//! Symbol and type discovery (pass 2).
//!
//! Walks the document once and registers every name the later passes can
//! refer to: declared types with computed field offsets, functions with
//! their frame layouts, imported and exported names, labels, and the
//! `entry` config option. No addresses exist yet; the emitter fills in
//! definitions as it lays out bytes.

use indexmap::IndexMap;
use qsm_object::{SectionKind, SymbolKind, TypeId};

use crate::ast::{Document, FuncDecl, Instr, Item, Pos, TypeDecl};
use crate::{AsmError, Result};

/// Labels prefixed with `$` are scoped to their enclosing function and may
/// shadow global names.
pub fn is_block_local(name: &str) -> bool {
    name.starts_with('$')
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldInfo {
    pub type_name: String,
    pub offset: u64,
    pub size: u64,
}

/// A declared composite type with its computed layout. Fields are laid out
/// in declaration order with no padding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeInfo {
    pub name: String,
    pub fields: IndexMap<String, FieldInfo>,
    pub size: u64,
}

impl TypeInfo {
    pub fn field_offset(&self, field: &str) -> Option<u64> {
        self.fields.get(field).map(|f| f.offset)
    }
}

/// A function's compile-time shape: frame layout and export status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuncInfo {
    pub name: String,
    pub params: Vec<String>,
    pub locals: Vec<String>,
    pub exported: bool,
}

impl FuncInfo {
    pub fn num_args(&self) -> u8 {
        self.params.len() as u8
    }

    pub fn num_locals(&self) -> u8 {
        self.locals.len() as u8
    }

    /// Slot index of a named argument. Declaration order, first is 0.
    pub fn arg_slot(&self, name: &str) -> Option<u8> {
        self.params.iter().position(|p| p == name).map(|i| i as u8)
    }

    pub fn local_slot(&self, name: &str) -> Option<u8> {
        self.locals.iter().position(|l| l == name).map(|i| i as u8)
    }
}

/// An external symbol expected from another unit at link time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportInfo {
    /// Module path from the preceding `load`; informational only, the
    /// linker takes its inputs explicitly.
    pub module: String,
    pub kind: SymbolKind,
}

/// Scoped symbol name. `scope` is the enclosing function for block-local
/// labels, `None` for unit-global names.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SymbolKey {
    pub scope: Option<String>,
    pub name: String,
}

impl SymbolKey {
    pub fn global(name: impl Into<String>) -> Self {
        Self {
            scope: None,
            name: name.into(),
        }
    }

    pub fn scoped(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: Some(scope.into()),
            name: name.into(),
        }
    }
}

/// A symbol's resolved location: section index in emission order plus the
/// offset inside that section's bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Definition {
    pub kind: SymbolKind,
    pub section: u8,
    pub offset: u32,
}

/// Everything pass 2 learned, plus the definitions pass 3 adds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SymbolTable {
    pub types: IndexMap<String, TypeInfo>,
    pub funcs: IndexMap<String, FuncInfo>,
    pub imports: IndexMap<String, ImportInfo>,
    /// Names listed in the exports section, with their declaration site.
    pub export_decls: Vec<(String, Pos)>,
    pub entry: Option<(String, Pos)>,
    defs: IndexMap<SymbolKey, Definition>,
    /// Declared label names, for duplicate detection before addresses exist.
    declared: IndexMap<SymbolKey, Pos>,
}

impl SymbolTable {
    /// Records a definition during emission. Double definition of the same
    /// key is a bug in the caller, not user input, so this does not error.
    pub fn define(&mut self, key: SymbolKey, def: Definition) {
        self.defs.insert(key, def);
    }

    /// Looks up a name as seen from inside `scope`: block-local first, then
    /// unit-global.
    pub fn lookup(&self, scope: Option<&str>, name: &str) -> Option<Definition> {
        if let Some(scope) = scope
            && let Some(def) = self.defs.get(&SymbolKey::scoped(scope, name))
        {
            return Some(*def);
        }
        self.defs.get(&SymbolKey::global(name)).copied()
    }

    pub fn is_import(&self, name: &str) -> bool {
        self.imports.contains_key(name)
    }

    /// True when the name is known at all: defined, declared, or imported.
    pub fn knows(&self, scope: Option<&str>, name: &str) -> bool {
        if let Some(scope) = scope
            && self.declared.contains_key(&SymbolKey::scoped(scope, name))
        {
            return true;
        }
        self.declared.contains_key(&SymbolKey::global(name))
            || self.funcs.contains_key(name)
            || self.imports.contains_key(name)
    }

    fn declare(&mut self, key: SymbolKey, pos: Pos) -> Result<()> {
        if self.declared.contains_key(&key) {
            return Err(AsmError::DuplicateSymbol {
                name: key.name,
                pos,
            });
        }
        self.declared.insert(key, pos);
        Ok(())
    }
}

/// Builds the symbol table for one document.
pub fn resolve(doc: &Document) -> Result<SymbolTable> {
    let mut table = SymbolTable::default();

    for section in &doc.sections {
        match section.kind {
            SectionKind::Config => config_section(&mut table, &section.items)?,
            SectionKind::Types => {
                for item in &section.items {
                    if let Item::Type(decl) = item {
                        declare_type(&mut table, decl)?;
                    }
                }
            }
            SectionKind::Imports => imports_section(&mut table, &section.items)?,
            SectionKind::Exports => {
                for item in &section.items {
                    if let Item::Export(decl) = item {
                        table.export_decls.push((decl.name.clone(), decl.pos));
                    }
                }
            }
            SectionKind::Data | SectionKind::Code => {
                for item in &section.items {
                    match item {
                        Item::Label(decl) => {
                            table.declare(SymbolKey::global(&decl.name), decl.pos)?;
                        }
                        Item::Func(decl) => declare_func(&mut table, decl)?,
                        _ => {}
                    }
                }
            }
        }
    }

    Ok(table)
}

fn config_section(table: &mut SymbolTable, items: &[Item]) -> Result<()> {
    for item in items {
        let Item::Instr(instr) = item else { continue };
        match instr.mnemonic.as_str() {
            "entry" => {
                let name = single_ident(instr)?;
                if table.entry.is_some() {
                    return Err(AsmError::Syntax {
                        message: "entry point declared twice".to_string(),
                        pos: instr.pos,
                    });
                }
                table.entry = Some((name, instr.pos));
            }
            other => {
                return Err(AsmError::UnknownConfigOption {
                    name: other.to_string(),
                    pos: instr.pos,
                });
            }
        }
    }
    Ok(())
}

fn imports_section(table: &mut SymbolTable, items: &[Item]) -> Result<()> {
    let mut module: Option<String> = None;
    for item in items {
        let Item::Instr(instr) = item else { continue };
        match instr.mnemonic.as_str() {
            "load" => {
                let [arg] = instr.args.as_slice() else {
                    return Err(operand_count(instr, 1));
                };
                match &arg.value {
                    crate::ast::OperandValue::Str(path) => module = Some(path.clone()),
                    _ => {
                        return Err(AsmError::InvalidOperand {
                            message: "`load` takes a module path string".to_string(),
                            pos: arg.pos,
                        });
                    }
                }
            }
            "import" => {
                let name = single_ident(instr)?;
                let Some(module) = module.clone() else {
                    return Err(AsmError::ImportWithoutLoad { pos: instr.pos });
                };
                if table.imports.contains_key(&name) {
                    return Err(AsmError::DuplicateSymbol {
                        name,
                        pos: instr.pos,
                    });
                }
                table.imports.insert(
                    name,
                    ImportInfo {
                        module,
                        kind: SymbolKind::Function,
                    },
                );
            }
            other => {
                return Err(AsmError::Syntax {
                    message: format!("`{other}` is not valid in the imports section"),
                    pos: instr.pos,
                });
            }
        }
    }
    Ok(())
}

fn declare_type(table: &mut SymbolTable, decl: &TypeDecl) -> Result<()> {
    if table.types.contains_key(&decl.name) {
        return Err(AsmError::DuplicateSymbol {
            name: decl.name.clone(),
            pos: decl.pos,
        });
    }

    let mut fields = IndexMap::new();
    let mut offset = 0u64;
    for field in &decl.fields {
        if fields.contains_key(&field.name) {
            return Err(AsmError::DuplicateField {
                type_name: decl.name.clone(),
                field: field.name.clone(),
                pos: field.pos,
            });
        }
        let size = field_size(table, &field.type_name).ok_or_else(|| {
            AsmError::UnknownFieldType {
                type_name: field.type_name.clone(),
                field: field.name.clone(),
                pos: field.pos,
            }
        })?;
        fields.insert(
            field.name.clone(),
            FieldInfo {
                type_name: field.type_name.clone(),
                offset,
                size,
            },
        );
        offset += size;
    }

    table.types.insert(
        decl.name.clone(),
        TypeInfo {
            name: decl.name.clone(),
            fields,
            size: offset,
        },
    );
    Ok(())
}

/// Byte size of a field of the named type: a primitive width, or the size
/// of an already-declared type. Declaration order matters; forward type
/// references do not resolve.
fn field_size(table: &SymbolTable, type_name: &str) -> Option<u64> {
    match TypeId::from_name(type_name) {
        Some(TypeId::Void | TypeId::Local | TypeId::Arg) => None,
        Some(ty) => Some(ty.size() as u64),
        None => table.types.get(type_name).map(|t| t.size),
    }
}

fn declare_func(table: &mut SymbolTable, decl: &FuncDecl) -> Result<()> {
    if table.funcs.contains_key(&decl.name) || table.imports.contains_key(&decl.name) {
        return Err(AsmError::DuplicateSymbol {
            name: decl.name.clone(),
            pos: decl.pos,
        });
    }
    table.declare(SymbolKey::global(&decl.name), decl.pos)?;

    let mut params = Vec::new();
    for param in &decl.params {
        if params.contains(&param.name) {
            return Err(AsmError::DuplicateSymbol {
                name: param.name.clone(),
                pos: param.pos,
            });
        }
        params.push(param.name.clone());
    }
    let mut locals = Vec::new();
    for local in &decl.locals {
        if locals.contains(&local.name) || params.contains(&local.name) {
            return Err(AsmError::DuplicateSymbol {
                name: local.name.clone(),
                pos: local.pos,
            });
        }
        locals.push(local.name.clone());
    }

    // Labels in the body: `$`-prefixed ones live in the function's scope.
    for item in &decl.body {
        if let Item::Label(label) = item {
            let key = if is_block_local(&label.name) {
                SymbolKey::scoped(&decl.name, &label.name)
            } else {
                SymbolKey::global(&label.name)
            };
            table.declare(key, label.pos)?;
        }
    }

    table.funcs.insert(
        decl.name.clone(),
        FuncInfo {
            name: decl.name.clone(),
            params,
            locals,
            exported: decl.is_exported(),
        },
    );
    Ok(())
}

fn single_ident(instr: &Instr) -> Result<String> {
    let [arg] = instr.args.as_slice() else {
        return Err(operand_count(instr, 1));
    };
    arg.ident()
        .map(str::to_string)
        .ok_or_else(|| AsmError::InvalidOperand {
            message: format!("`{}` takes a symbol name", instr.mnemonic),
            pos: arg.pos,
        })
}

fn operand_count(instr: &Instr, expected: usize) -> AsmError {
    AsmError::OperandCount {
        mnemonic: instr.mnemonic.clone(),
        expected,
        got: instr.args.len(),
        pos: instr.pos,
    }
}
