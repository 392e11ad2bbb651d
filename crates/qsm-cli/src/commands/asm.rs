use std::path::PathBuf;

use qsm_asm::Assembler;
use qsm_object::AddressingMode;

use super::save_object;

pub struct AsmArgs {
    pub source: PathBuf,
    pub output: Option<PathBuf>,
    pub absolute: bool,
}

pub fn run(args: AsmArgs) {
    let source = match std::fs::read_to_string(&args.source) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: cannot read {}: {}", args.source.display(), e);
            std::process::exit(1);
        }
    };

    let mode = if args.absolute {
        AddressingMode::Absolute
    } else {
        AddressingMode::Relative
    };
    let object = match Assembler::with_mode(mode).assemble(&source) {
        Ok(object) => object,
        Err(e) => {
            eprintln!("error: {}: {}", args.source.display(), e);
            std::process::exit(1);
        }
    };

    let output = args
        .output
        .unwrap_or_else(|| args.source.with_extension("qpl"));
    save_object(&output, &object);
}
