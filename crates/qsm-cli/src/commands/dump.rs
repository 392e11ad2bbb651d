use std::path::PathBuf;

use qsm_object::AddressingMode;

use super::load_object;

pub struct DumpArgs {
    pub object: PathBuf,
}

pub fn run(args: DumpArgs) {
    let object = load_object(&args.object);
    let header = object.header();

    println!("{}", args.object.display());
    println!(
        "  version {}.{}, arch 0x{:02x}, {} addressing",
        header.version.0,
        header.version.1,
        header.arch,
        match object.mode {
            AddressingMode::Absolute => "absolute",
            AddressingMode::Relative => "relative",
        }
    );
    match object.entry_point {
        Some(entry) => println!("  entry point 0x{entry:x}"),
        None => println!("  no entry point"),
    }

    println!("sections:");
    let bases = object.section_bases();
    for (section, base) in object.sections.iter().zip(&bases) {
        println!(
            "  {:<8} {:<8} base 0x{:<6x} {} bytes",
            section.name,
            section.kind.name(),
            base,
            section.len()
        );
    }

    if !object.exports.is_empty() {
        println!("exports:");
        for export in &object.exports {
            print!(
                "  {:<16} {:<8} 0x{:x}",
                export.name,
                export.kind.name(),
                export.offset
            );
            if export.num_args != 0 || export.num_locals != 0 {
                print!("  ({} args, {} locals)", export.num_args, export.num_locals);
            }
            println!();
        }
    }

    if !object.relocs.is_empty() {
        println!("relocations:");
        for reloc in &object.relocs {
            println!(
                "  {:<16} {:<8} section {} site 0x{:x} width {} ({:?})",
                reloc.target_name(),
                reloc.kind.name(),
                reloc.section,
                reloc.site,
                reloc.width,
                reloc.state
            );
        }
    }
}
