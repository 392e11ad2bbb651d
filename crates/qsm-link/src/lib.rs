//! Linker: merges assembled units into one executable object.
//!
//! Units are laid out in input order; every unit's sections keep their
//! relative layout and gain the unit's base offset. Pending relocations are
//! resolved against the combined export index, so the output carries none.

use indexmap::IndexMap;
use qsm_object::{
    AddressingMode, Export, NATIVE_SIZE, ObjectFile, RelocState, RelocTarget, Relocation, Section,
};


#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("no input objects")]
    NoInputs,

    #[error("entry object index {index} out of range ({count} inputs)")]
    EntryOutOfRange { index: usize, count: usize },

    #[error("entry object declares no entry point")]
    EntryMissing,

    #[error("inputs mix absolute and relative addressing")]
    MixedAddressingMode,

    #[error("symbol `{name}` exported by more than one object")]
    DuplicateExport { name: String },

    #[error("unresolved import `{name}`")]
    UnresolvedImport { name: String },

    #[error("relocated value for `{symbol}` does not fit in {width} bytes")]
    RelocationOverflow { symbol: String, width: u8 },

    #[error("relocation for `{name}` points outside its section")]
    BadRelocation { name: String },
}

pub type Result<T> = std::result::Result<T, LinkError>;

/// Links `objects` in order; `entry` selects the object whose entry point
/// the output keeps.
pub fn link(objects: Vec<ObjectFile>, entry: usize) -> Result<ObjectFile> {
    if objects.is_empty() {
        return Err(LinkError::NoInputs);
    }
    if entry >= objects.len() {
        return Err(LinkError::EntryOutOfRange {
            index: entry,
            count: objects.len(),
        });
    }
    let mode = objects[0].mode;
    if objects.iter().any(|o| o.mode != mode) {
        return Err(LinkError::MixedAddressingMode);
    }

    // Base offset of each unit in the merged image.
    let mut unit_bases = Vec::with_capacity(objects.len());
    let mut cursor = 0u64;
    for object in &objects {
        unit_bases.push(cursor);
        cursor += object.image_len();
    }

    let exports = export_index(&objects, &unit_bases)?;

    // Merge non-empty sections in (unit, section) order. Empty sections
    // carry no image bytes and exist only for unit-local bookkeeping.
    let mut sections: Vec<Section> = Vec::new();
    let mut used_names: IndexMap<String, u32> = IndexMap::new();
    // Per unit: original section index to merged index.
    let mut section_map: Vec<Vec<Option<usize>>> = Vec::with_capacity(objects.len());
    for object in &objects {
        let mut map = Vec::with_capacity(object.sections.len());
        for section in &object.sections {
            if section.is_empty() {
                map.push(None);
                continue;
            }
            let name = match used_names.get_mut(&section.name) {
                Some(n) => {
                    *n += 1;
                    format!("{}.{}", section.name, n)
                }
                None => {
                    used_names.insert(section.name.clone(), 0);
                    section.name.clone()
                }
            };
            map.push(Some(sections.len()));
            sections.push(Section::new(name, section.kind, section.data.clone()));
        }
        section_map.push(map);
    }

    for (index, object) in objects.iter().enumerate() {
        let section_bases = object.section_bases();
        for reloc in &object.relocs {
            apply(
                &mut sections,
                &section_map[index],
                &section_bases,
                unit_bases[index],
                &exports,
                mode,
                reloc,
            )?;
        }
    }

    let entry_point = objects[entry]
        .entry_point
        .map(|offset| offset + unit_bases[entry])
        .ok_or(LinkError::EntryMissing)
        .map(Some)?;

    let exports = exports.into_values().collect();
    Ok(ObjectFile {
        mode,
        entry_point,
        sections,
        exports,
        relocs: Vec::new(),
    })
}

/// Combined export table with merged-image offsets, name collisions
/// rejected.
fn export_index(
    objects: &[ObjectFile],
    unit_bases: &[u64],
) -> Result<IndexMap<String, Export>> {
    let mut index = IndexMap::new();
    for (object, &base) in objects.iter().zip(unit_bases) {
        for export in &object.exports {
            if index.contains_key(&export.name) {
                return Err(LinkError::DuplicateExport {
                    name: export.name.clone(),
                });
            }
            let mut rebased = export.clone();
            rebased.offset += base;
            index.insert(export.name.clone(), rebased);
        }
    }
    Ok(index)
}

fn apply(
    sections: &mut [Section],
    section_map: &[Option<usize>],
    section_bases: &[u64],
    unit_base: u64,
    exports: &IndexMap<String, Export>,
    mode: AddressingMode,
    reloc: &Relocation,
) -> Result<()> {
    let merged = section_map
        .get(reloc.section as usize)
        .copied()
        .flatten()
        .ok_or_else(|| LinkError::BadRelocation {
            name: reloc.target_name(),
        })?;
    let site = reloc.site as usize;
    let width = reloc.width as usize;
    if site + width > sections[merged].data.len() {
        return Err(LinkError::BadRelocation {
            name: reloc.target_name(),
        });
    }
    let image_site = unit_base + section_bases[reloc.section as usize] + reloc.site as u64;

    let value = match reloc.state {
        // Unit-absolute value written in pass 4; shift by the unit's base.
        RelocState::Applied => {
            let old = read_value(&sections[merged].data[site..site + width], width);
            old + unit_base as i64
        }
        RelocState::NeedsLink | RelocState::NeedsLinkCall => {
            let name = reloc.target_name();
            let export = match &reloc.target {
                RelocTarget::Symbol(symbol) => exports.get(symbol),
                // Types are never exported, so a field offset cannot cross
                // a unit boundary.
                RelocTarget::FieldOffset { .. } => None,
            }
            .ok_or(LinkError::UnresolvedImport { name })?;

            if reloc.state == RelocState::NeedsLinkCall {
                if site + width + 2 > sections[merged].data.len() {
                    return Err(LinkError::BadRelocation {
                        name: reloc.target_name(),
                    });
                }
                // Complete the call site's frame counts.
                sections[merged].data[site + width] = export.num_args;
                sections[merged].data[site + width + 1] = export.num_locals;
            }
            match mode {
                AddressingMode::Absolute => export.offset as i64,
                AddressingMode::Relative => {
                    export.offset as i64 - (image_site as i64 + width as i64)
                }
            }
        }
    };

    if !value_fits(value, width) {
        return Err(LinkError::RelocationOverflow {
            symbol: reloc.target_name(),
            width: reloc.width,
        });
    }
    let bytes = value.to_le_bytes();
    sections[merged].data[site..site + width].copy_from_slice(&bytes[..width]);
    Ok(())
}

/// Sign-extending little-endian read at `width` bytes.
fn read_value(bytes: &[u8], width: usize) -> i64 {
    let mut buf = [0u8; NATIVE_SIZE];
    buf[..width].copy_from_slice(&bytes[..width]);
    let raw = i64::from_le_bytes(buf);
    if width < NATIVE_SIZE {
        let shift = (NATIVE_SIZE - width) as u32 * 8;
        (raw << shift) >> shift
    } else {
        raw
    }
}

fn value_fits(value: i64, width: usize) -> bool {
    if width >= NATIVE_SIZE {
        return true;
    }
    let bits = width as u32 * 8;
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << bits) - 1;
    (min..=max).contains(&value)
}
