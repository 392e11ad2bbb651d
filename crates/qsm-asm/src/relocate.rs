//! Relocation resolution (pass 4).
//!
//! Runs once every section's final length is fixed, so unit-absolute
//! section bases exist. Locally defined targets are written into the
//! section buffers; in absolute mode the written sites are kept as
//! `Applied` relocations so the linker can rebase them. External targets
//! stay pending for the linker with zeroed sites.

use qsm_object::{AddressingMode, RelocState, RelocTarget, Relocation};

use crate::emit::{EmittedUnit, PendingReloc};
use crate::resolve::SymbolTable;
use crate::{AsmError, Result};

/// Resolves all pending relocations in place. Returns the relocations that
/// must travel with the object file.
pub fn relocate(
    unit: &mut EmittedUnit,
    table: &SymbolTable,
    mode: AddressingMode,
) -> Result<Vec<Relocation>> {
    let bases = unit.section_bases();
    let mut kept = Vec::new();

    for pending in std::mem::take(&mut unit.pending) {
        let name = match &pending.target {
            RelocTarget::Symbol(name) => name.clone(),
            // Field offsets fold at emission; nothing to do here.
            RelocTarget::FieldOffset { .. } => continue,
        };

        let Some(def) = table.lookup(pending.scope.as_deref(), &name) else {
            // External symbol; zeros stay at the site for the linker.
            kept.push(wire_reloc(
                &pending,
                if pending.call_site {
                    RelocState::NeedsLinkCall
                } else {
                    RelocState::NeedsLink
                },
            ));
            continue;
        };

        let target = bases[def.section as usize] + u64::from(def.offset);
        let site = bases[pending.section as usize] + u64::from(pending.site);
        let value = match mode {
            AddressingMode::Absolute => target as i64,
            AddressingMode::Relative => {
                target as i64 - (site as i64 + i64::from(pending.width))
            }
        };
        patch(unit, &pending, value)?;

        // Absolute sites hold unit-absolute values that shift when the
        // linker assigns this unit a base; relative sites are final.
        if mode == AddressingMode::Absolute {
            kept.push(wire_reloc(&pending, RelocState::Applied));
        }
    }

    Ok(kept)
}

fn wire_reloc(pending: &PendingReloc, state: RelocState) -> Relocation {
    Relocation {
        section: pending.section,
        site: pending.site,
        width: pending.width,
        kind: pending.kind,
        target: pending.target.clone(),
        state,
    }
}

/// Writes a resolved value at a pending site, little-endian, truncated to
/// the site's width after a range check.
fn patch(unit: &mut EmittedUnit, pending: &PendingReloc, value: i64) -> Result<()> {
    let width = pending.width as usize;
    if !value_fits(value, width) {
        return Err(AsmError::RelocationOverflow {
            symbol: match &pending.target {
                RelocTarget::Symbol(name) => name.clone(),
                RelocTarget::FieldOffset { type_name, field } => format!("{type_name}.{field}"),
            },
            width: pending.width,
        });
    }
    let site = pending.site as usize;
    let bytes = value.to_le_bytes();
    unit.sections[pending.section as usize].bytes[site..site + width]
        .copy_from_slice(&bytes[..width]);
    Ok(())
}

fn value_fits(value: i64, width: usize) -> bool {
    if width >= 8 {
        return true;
    }
    let bits = width as u32 * 8;
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << bits) - 1;
    (min..=max).contains(&value)
}
