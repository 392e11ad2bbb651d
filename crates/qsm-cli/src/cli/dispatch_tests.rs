use std::path::PathBuf;

use super::commands::build_cli;
use super::dispatch::{AsmParams, DumpParams, LinkParams, RunParams};

fn matches_for(args: &[&str]) -> clap::ArgMatches {
    build_cli().try_get_matches_from(args).unwrap()
}

#[test]
fn asm_params_extract() {
    let m = matches_for(&["qsm", "asm", "prog.qsm", "-o", "prog.qpl", "--absolute"]);
    let (_, sub) = m.subcommand().unwrap();
    let params = AsmParams::from_matches(sub);
    assert_eq!(params.source, PathBuf::from("prog.qsm"));
    assert_eq!(params.output, Some(PathBuf::from("prog.qpl")));
    assert!(params.absolute);
}

#[test]
fn asm_defaults_to_relative_and_no_output() {
    let m = matches_for(&["qsm", "asm", "prog.qsm"]);
    let (_, sub) = m.subcommand().unwrap();
    let params = AsmParams::from_matches(sub);
    assert!(!params.absolute);
    assert_eq!(params.output, None);
}

#[test]
fn link_params_collect_objects_in_order() {
    let m = matches_for(&["qsm", "link", "a.qpl", "b.qpl", "--entry", "1"]);
    let (_, sub) = m.subcommand().unwrap();
    let params = LinkParams::from_matches(sub);
    assert_eq!(
        params.objects,
        [PathBuf::from("a.qpl"), PathBuf::from("b.qpl")]
    );
    assert_eq!(params.entry, 1);
}

#[test]
fn link_entry_defaults_to_the_first_object() {
    let m = matches_for(&["qsm", "link", "a.qpl"]);
    let (_, sub) = m.subcommand().unwrap();
    assert_eq!(LinkParams::from_matches(sub).entry, 0);
}

#[test]
fn run_params_extract() {
    let m = matches_for(&["qsm", "run", "prog.qpl", "--steps", "500"]);
    let (_, sub) = m.subcommand().unwrap();
    let params = RunParams::from_matches(sub);
    assert_eq!(params.object, PathBuf::from("prog.qpl"));
    assert_eq!(params.steps, Some(500));
}

#[test]
fn dump_requires_an_object() {
    assert!(build_cli().try_get_matches_from(["qsm", "dump"]).is_err());
    let m = matches_for(&["qsm", "dump", "prog.qpl"]);
    let (_, sub) = m.subcommand().unwrap();
    assert_eq!(DumpParams::from_matches(sub).object, PathBuf::from("prog.qpl"));
}
