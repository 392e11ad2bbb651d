//! Dispatch logic: extract params from ArgMatches and convert to command
//! args.

use std::path::PathBuf;

use clap::ArgMatches;

use crate::commands::asm::AsmArgs;
use crate::commands::dump::DumpArgs;
use crate::commands::link::LinkArgs;
use crate::commands::run::RunArgs;

pub struct AsmParams {
    pub source: PathBuf,
    pub output: Option<PathBuf>,
    pub absolute: bool,
}

impl AsmParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            source: m.get_one::<PathBuf>("source").cloned().expect("required"),
            output: m.get_one::<PathBuf>("output").cloned(),
            absolute: m.get_flag("absolute"),
        }
    }
}

impl From<AsmParams> for AsmArgs {
    fn from(p: AsmParams) -> Self {
        Self {
            source: p.source,
            output: p.output,
            absolute: p.absolute,
        }
    }
}

pub struct LinkParams {
    pub objects: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub entry: usize,
}

impl LinkParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            objects: m
                .get_many::<PathBuf>("objects")
                .expect("required")
                .cloned()
                .collect(),
            output: m.get_one::<PathBuf>("output").cloned(),
            entry: *m.get_one::<usize>("entry").expect("defaulted"),
        }
    }
}

impl From<LinkParams> for LinkArgs {
    fn from(p: LinkParams) -> Self {
        Self {
            objects: p.objects,
            output: p.output,
            entry: p.entry,
        }
    }
}

pub struct RunParams {
    pub object: PathBuf,
    pub steps: Option<u64>,
}

impl RunParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            object: m.get_one::<PathBuf>("object").cloned().expect("required"),
            steps: m.get_one::<u64>("steps").copied(),
        }
    }
}

impl From<RunParams> for RunArgs {
    fn from(p: RunParams) -> Self {
        Self {
            object: p.object,
            steps: p.steps,
        }
    }
}

pub struct DumpParams {
    pub object: PathBuf,
}

impl DumpParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            object: m.get_one::<PathBuf>("object").cloned().expect("required"),
        }
    }
}

impl From<DumpParams> for DumpArgs {
    fn from(p: DumpParams) -> Self {
        Self { object: p.object }
    }
}
