//! CLI definitions and argument types.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracecheck::runner::{DEFAULT_ARGS, DEFAULT_PROGRAM, DEFAULT_TRACE_FLAG};
use tracecheck::{CommandRunner, TRACE_MARKER, WILDCARD, WildcardPolicy};

/// Exit code when every expected line matched.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code on divergence or error.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "tracecheck")]
#[command(about = "Compare emulator CPU traces against a golden reference log")]
#[command(version)]
pub struct Cli {
    /// Show metrics summary after execution
    #[arg(long, global = true)]
    pub metrics: bool,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the emulator on a ROM and compare its trace to a reference log
    Compare {
        /// ROM to run
        #[arg(value_name = "ROM")]
        rom: PathBuf,

        /// Golden reference log (plain text or .zst)
        #[arg(value_name = "LOG")]
        log: PathBuf,

        #[command(flatten)]
        emulator: EmulatorArgs,

        #[command(flatten)]
        compare: CompareArgs,
    },
    /// Run the nestest CPU conformance ROM
    Nestest {
        /// Override the conformance ROM path
        #[arg(long)]
        rom: Option<PathBuf>,

        /// Override the conformance log path
        #[arg(long)]
        log: Option<PathBuf>,

        #[command(flatten)]
        emulator: EmulatorArgs,

        #[command(flatten)]
        compare: CompareArgs,
    },
    /// Compare a reference log against previously captured emulator output
    Diff {
        /// Golden reference log (plain text or .zst)
        #[arg(value_name = "LOG")]
        log: PathBuf,

        /// Captured emulator stdout
        #[arg(value_name = "CAPTURE")]
        capture: PathBuf,

        #[command(flatten)]
        compare: CompareArgs,
    },
}

/// How to launch the emulator.
#[derive(clap::Args, Clone, Debug)]
pub struct EmulatorArgs {
    /// Emulator program to execute
    #[arg(long, default_value = DEFAULT_PROGRAM)]
    pub emulator: String,

    /// Argument passed before the ROM path (repeatable)
    #[arg(
        long = "emulator-arg",
        value_name = "ARG",
        action = clap::ArgAction::Append,
        allow_hyphen_values = true
    )]
    pub emulator_args: Vec<String>,

    /// Flag appended after the ROM path to enable tracing
    #[arg(long, default_value = DEFAULT_TRACE_FLAG, allow_hyphen_values = true)]
    pub trace_flag: String,

    /// Do not pass a trace flag
    #[arg(long, conflicts_with = "trace_flag")]
    pub no_trace_flag: bool,

    /// Kill the emulator after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl EmulatorArgs {
    /// Build the emulator runner.
    ///
    /// With no `--emulator-arg`, the default arguments apply only to the
    /// default program.
    pub fn runner(&self) -> CommandRunner {
        let args: Vec<String> = if !self.emulator_args.is_empty() {
            self.emulator_args.clone()
        } else if self.emulator == DEFAULT_PROGRAM {
            DEFAULT_ARGS.iter().map(ToString::to_string).collect()
        } else {
            Vec::new()
        };
        let trace_flag = (!self.no_trace_flag).then(|| self.trace_flag.clone());

        CommandRunner::new(self.emulator.clone())
            .with_args(args)
            .with_trace_flag(trace_flag)
            .with_timeout(self.timeout.map(Duration::from_secs))
    }
}

/// Comparison options.
#[derive(clap::Args, Clone, Debug)]
pub struct CompareArgs {
    /// Wildcard character in the reference log
    #[arg(long, default_value_t = WILDCARD)]
    pub wildcard: char,

    /// Substring that marks trace lines in emulator output
    #[arg(long, default_value = TRACE_MARKER)]
    pub marker: String,

    /// Print only the length summary and the two diverging lines
    #[arg(long)]
    pub plain: bool,
}

impl CompareArgs {
    pub const fn policy(&self) -> WildcardPolicy {
        WildcardPolicy::new(self.wildcard)
    }
}
