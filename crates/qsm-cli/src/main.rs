mod cli;
mod commands;

use cli::{AsmParams, DumpParams, LinkParams, RunParams, build_cli};

fn main() {
    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("asm", m)) => {
            let params = AsmParams::from_matches(m);
            commands::asm::run(params.into());
        }
        Some(("link", m)) => {
            let params = LinkParams::from_matches(m);
            commands::link::run(params.into());
        }
        Some(("run", m)) => {
            let params = RunParams::from_matches(m);
            commands::run::run(params.into());
        }
        Some(("dump", m)) => {
            let params = DumpParams::from_matches(m);
            commands::dump::run(params.into());
        }
        _ => unreachable!("clap should have caught this"),
    }
}
