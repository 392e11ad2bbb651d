use std::path::PathBuf;

use qsm_vm::{Limits, Vm};

use super::load_object;

pub struct RunArgs {
    pub object: PathBuf,
    pub steps: Option<u64>,
}

pub fn run(args: RunArgs) {
    let object = load_object(&args.object);

    let mut vm = match Vm::new(&object) {
        Ok(vm) => vm,
        Err(e) => {
            eprintln!("error: {}: {}", args.object.display(), e);
            std::process::exit(1);
        }
    };
    if let Some(steps) = args.steps {
        vm = vm.with_limits(Limits::new().steps(steps));
    }

    let result = vm.run();
    for line in vm.debug_log().lines() {
        println!("{line}");
    }
    match result {
        Ok(status) => std::process::exit(status as i32),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}
