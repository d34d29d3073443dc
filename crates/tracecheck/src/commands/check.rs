//! `compare`, `nestest` and `diff` commands.

use std::io;
use std::path::Path;

use tracecheck::{CommandRunner, Comparison, Conformance, Oracle, Reporter, source};
use tracing::{error, info};

use crate::cli::{CompareArgs, EXIT_FAILURE, EXIT_SUCCESS, EmulatorArgs};
use crate::terminal::{self, Spinner};

/// Run the emulator on `rom` and check its trace against `log`.
pub fn cmd_check(
    rom: &Path,
    log: &Path,
    emulator: &EmulatorArgs,
    compare: &CompareArgs,
    silent: bool,
) -> i32 {
    run_oracle(rom, emulator, compare, silent, |oracle| oracle.check(rom, log))
}

/// Run a fixed conformance ROM/log pair.
pub fn cmd_conformance(
    conformance: &Conformance,
    emulator: &EmulatorArgs,
    compare: &CompareArgs,
    silent: bool,
) -> i32 {
    run_oracle(&conformance.rom, emulator, compare, silent, |oracle| {
        conformance.run(oracle)
    })
}

fn run_oracle<F>(
    rom: &Path,
    emulator: &EmulatorArgs,
    compare: &CompareArgs,
    silent: bool,
    check: F,
) -> i32
where
    F: FnOnce(&Oracle<CommandRunner>) -> tracecheck::Result<Comparison>,
{
    let oracle = Oracle::new(emulator.runner())
        .with_policy(compare.policy())
        .with_marker(compare.marker.clone());

    let spinner = if silent {
        Spinner::hidden()
    } else {
        Spinner::new(format!("Running {} on {}", emulator.emulator, rom.display()))
    };
    let result = check(&oracle);
    spinner.finish_and_clear();

    match result {
        Ok(result) => finish(&result, compare.plain),
        Err(e) => {
            tracecheck::metrics::record_error();
            error!(error = %e, "trace check failed");
            terminal::error(&e.to_string());
            EXIT_FAILURE
        }
    }
}

/// Check a saved emulator capture against `log` without running anything.
pub fn cmd_diff(log: &Path, capture: &Path, compare: &CompareArgs) -> i32 {
    let traces = source::read_expected(log)
        .and_then(|expected| Ok((expected, source::read_actual(capture, &compare.marker)?)));
    let (expected, actual) = match traces {
        Ok(traces) => traces,
        Err(e) => {
            tracecheck::metrics::record_error();
            error!(error = %e, "trace check failed");
            terminal::error(&e.to_string());
            return EXIT_FAILURE;
        }
    };
    info!(path = %capture.display(), "comparing captured output");

    let result = tracecheck::compare(&expected, &actual, compare.policy());
    tracecheck::metrics::record_comparison(&result);
    finish(&result, compare.plain)
}

/// Print the report to stdout and turn the outcome into an exit code.
fn finish(result: &Comparison, plain: bool) -> i32 {
    let stdout = io::stdout().lock();
    let mut reporter = if plain {
        Reporter::plain(stdout)
    } else {
        Reporter::new(stdout)
    };
    if let Err(e) = reporter.report(result) {
        error!(error = %e, "failed to write report");
        return EXIT_FAILURE;
    }

    if result.is_match() {
        terminal::success(&result.to_string());
        if result.actual_len > result.expected_len {
            terminal::dim(&format!(
                "{} trailing actual lines not compared",
                result.actual_len - result.expected_len
            ));
        }
        EXIT_SUCCESS
    } else {
        terminal::error(&result.to_string());
        EXIT_FAILURE
    }
}
