//! Pipeline driver and object construction (pass 5).

use indexmap::IndexMap;
use qsm_object::{AddressingMode, Export, ObjectFile, Section};

use crate::ast::Pos;
use crate::{AsmError, Result, emit, parser, relocate, resolve};

/// Assembles one source unit with the default (relative) addressing mode.
pub fn assemble(source: &str) -> Result<ObjectFile> {
    Assembler::new().assemble(source)
}

/// One-unit assembler. The only knob is the addressing mode; everything
/// else comes from the source text.
#[derive(Clone, Copy, Debug, Default)]
pub struct Assembler {
    mode: AddressingMode,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: AddressingMode) -> Self {
        Self { mode }
    }

    pub fn assemble(&self, source: &str) -> Result<ObjectFile> {
        let doc = parser::parse(source)?;
        let mut table = resolve::resolve(&doc)?;
        let mut unit = emit::emit(&doc, &mut table, self.mode)?;
        let relocs = relocate::relocate(&mut unit, &table, self.mode)?;

        let bases = unit.section_bases();
        let sections = unit
            .sections
            .into_iter()
            .map(|s| Section::new(s.name, s.kind, s.bytes))
            .collect();

        // Exports: `.export` declarations plus `export`-modified functions,
        // each once, declaration order first.
        let mut names: IndexMap<String, Option<Pos>> = IndexMap::new();
        for (name, pos) in &table.export_decls {
            names.entry(name.clone()).or_insert(Some(*pos));
        }
        for func in table.funcs.values() {
            if func.exported {
                names.entry(func.name.clone()).or_insert(None);
            }
        }
        // The entry function is always exported: the loader sizes its frame
        // from the export whose offset matches the entry point.
        if let Some((entry_name, _)) = &table.entry
            && table.funcs.contains_key(entry_name)
        {
            names.entry(entry_name.clone()).or_insert(None);
        }
        let mut exports = Vec::with_capacity(names.len());
        for (name, pos) in names {
            let def = table.lookup(None, &name).ok_or_else(|| {
                AsmError::UndefinedSymbol {
                    name: name.clone(),
                    pos: pos.unwrap_or_default(),
                }
            })?;
            let offset = bases[def.section as usize] + u64::from(def.offset);
            let export = match table.funcs.get(&name) {
                Some(func) => Export::function(name, offset, func.num_args(), func.num_locals()),
                None => Export::new(name, def.kind, offset),
            };
            exports.push(export);
        }

        let entry_point = match &table.entry {
            Some((name, _)) => {
                let def = table.lookup(None, name).ok_or_else(|| {
                    AsmError::UndefinedEntry { name: name.clone() }
                })?;
                Some(bases[def.section as usize] + u64::from(def.offset))
            }
            None => None,
        };

        let object = ObjectFile {
            mode: self.mode,
            entry_point,
            sections,
            exports,
            relocs,
        };

        if let (Some(offset), Some((name, _))) = (entry_point, &table.entry)
            && !object.offset_in_code(offset)
        {
            return Err(AsmError::EntryNotInCode { name: name.clone() });
        }

        Ok(object)
    }
}
