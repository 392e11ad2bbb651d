pub mod asm;
pub mod dump;
pub mod link;
pub mod run;

use std::fs::File;
use std::path::Path;

use qsm_object::ObjectFile;

/// Loads an object file or exits with a diagnostic.
pub fn load_object(path: &Path) -> ObjectFile {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("error: cannot read {}: {}", path.display(), e);
            std::process::exit(1);
        }
    };
    match ObjectFile::read_from(file) {
        Ok(object) => object,
        Err(e) => {
            eprintln!("error: {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

/// Writes an object file or exits with a diagnostic.
pub fn save_object(path: &Path, object: &ObjectFile) {
    let file = match File::create(path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("error: cannot write {}: {}", path.display(), e);
            std::process::exit(1);
        }
    };
    if let Err(e) = object.write_to(file) {
        eprintln!("error: {}: {}", path.display(), e);
        std::process::exit(1);
    }
}
