//! Command implementations.

mod check;

use tracecheck::Conformance;

use crate::cli::{Cli, Commands};

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::Compare {
            rom,
            log,
            emulator,
            compare,
        } => check::cmd_check(rom, log, emulator, compare, cli.silent),
        Commands::Nestest {
            rom,
            log,
            emulator,
            compare,
        } => {
            let nestest = Conformance::nestest().with_overrides(rom.clone(), log.clone());
            check::cmd_conformance(&nestest, emulator, compare, cli.silent)
        }
        Commands::Diff {
            log,
            capture,
            compare,
        } => check::cmd_diff(log, capture, compare),
    }
}
