use std::path::PathBuf;

use super::{load_object, save_object};

pub struct LinkArgs {
    pub objects: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub entry: usize,
}

pub fn run(args: LinkArgs) {
    let objects = args.objects.iter().map(|p| load_object(p)).collect();

    let linked = match qsm_link::link(objects, args.entry) {
        Ok(linked) => linked,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    let output = args.output.unwrap_or_else(|| PathBuf::from("out.qpl"));
    save_object(&output, &linked);
}
