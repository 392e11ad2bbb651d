//! Command builders for the CLI.

use clap::Command;

use super::args::*;

/// Build the complete CLI with all subcommands.
pub fn build_cli() -> Command {
    Command::new("qsm")
        .about("Assembler, linker, and VM for the QSM stack machine")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(asm_command())
        .subcommand(link_command())
        .subcommand(run_command())
        .subcommand(dump_command())
}

/// Assemble one source unit into an object file.
pub fn asm_command() -> Command {
    Command::new("asm")
        .about("Assemble a source file into an object file")
        .override_usage("qsm asm <SOURCE> [-o <PATH>] [--absolute]")
        .arg(source_arg())
        .arg(output_arg())
        .arg(absolute_arg())
}

/// Link object files into one executable object.
pub fn link_command() -> Command {
    Command::new("link")
        .about("Link object files into one executable object")
        .override_usage("qsm link <OBJECT>... [-o <PATH>] [--entry <N>]")
        .arg(objects_arg())
        .arg(output_arg())
        .arg(entry_arg())
}

/// Execute a linked object.
pub fn run_command() -> Command {
    Command::new("run")
        .about("Execute a linked object file")
        .override_usage("qsm run <OBJECT> [--steps <N>]")
        .arg(object_arg())
        .arg(steps_arg())
}

/// Print an object file's structure.
pub fn dump_command() -> Command {
    Command::new("dump")
        .about("Print an object file's header, sections, and tables")
        .override_usage("qsm dump <OBJECT>")
        .arg(object_arg())
}
