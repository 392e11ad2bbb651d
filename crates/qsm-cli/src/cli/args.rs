//! Shared argument builders for CLI commands.

use std::path::PathBuf;

use clap::{Arg, ArgAction, value_parser};

/// Assembly source file (positional).
pub fn source_arg() -> Arg {
    Arg::new("source")
        .value_name("SOURCE")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Assembly source file")
}

/// Single object file (positional).
pub fn object_arg() -> Arg {
    Arg::new("object")
        .value_name("OBJECT")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Object file")
}

/// One or more object files (positional).
pub fn objects_arg() -> Arg {
    Arg::new("objects")
        .value_name("OBJECT")
        .required(true)
        .num_args(1..)
        .value_parser(value_parser!(PathBuf))
        .help("Object files, in link order")
}

/// Output path (-o/--output).
pub fn output_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("PATH")
        .value_parser(value_parser!(PathBuf))
        .help("Output file path")
}

/// Emit absolute addresses instead of IP-relative ones (--absolute).
pub fn absolute_arg() -> Arg {
    Arg::new("absolute")
        .long("absolute")
        .action(ArgAction::SetTrue)
        .help("Use absolute addressing instead of IP-relative")
}

/// Index of the object providing the entry point (--entry).
pub fn entry_arg() -> Arg {
    Arg::new("entry")
        .long("entry")
        .value_name("N")
        .default_value("0")
        .value_parser(value_parser!(usize))
        .help("Index of the input object whose entry point to keep")
}

/// Execution step limit (--steps).
pub fn steps_arg() -> Arg {
    Arg::new("steps")
        .long("steps")
        .value_name("N")
        .value_parser(value_parser!(u64))
        .help("Abort execution after N instructions")
}
