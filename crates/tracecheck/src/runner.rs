//! Emulator invocation.
//!
//! The oracle only needs one capability from the emulator: run it on a ROM and
//! hand back everything it wrote to stdout once it exits. [`RomRunner`] is that
//! seam. [`CommandRunner`] spawns a real process; [`CapturedRunner`] replays
//! output captured earlier.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::{Error, Result};

/// Default emulator launcher.
pub const DEFAULT_PROGRAM: &str = "cargo";
/// Default arguments placed before the ROM path.
pub const DEFAULT_ARGS: &[&str] = &["run"];
/// Flag that makes the emulator print one trace line per instruction.
pub const DEFAULT_TRACE_FLAG: &str = "--cpu-log";

/// Runs an emulator against a ROM and returns its standard output.
pub trait RomRunner {
    /// Run to completion and return the full stdout text.
    ///
    /// # Errors
    ///
    /// Fails if the emulator cannot be started or its output cannot be
    /// collected. A non-zero exit status is not an error.
    fn run(&self, rom: &Path) -> Result<String>;
}

/// Runs the emulator as a child process.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    /// Program to execute.
    pub program: String,
    /// Arguments placed before the ROM path.
    pub args: Vec<String>,
    /// Flag appended after the ROM path, if any.
    pub trace_flag: Option<String>,
    /// Kill the emulator after this long. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            args: DEFAULT_ARGS.iter().map(ToString::to_string).collect(),
            trace_flag: Some(DEFAULT_TRACE_FLAG.to_string()),
            timeout: None,
        }
    }
}

impl CommandRunner {
    /// Create a runner for `program` with no extra arguments and no trace flag.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            trace_flag: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_trace_flag(mut self, flag: Option<String>) -> Self {
        self.trace_flag = flag;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, rom: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(rom);
        if let Some(flag) = &self.trace_flag {
            cmd.arg(flag);
        }
        cmd
    }

    fn spawn_err(&self, source: std::io::Error) -> Error {
        Error::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

impl RomRunner for CommandRunner {
    fn run(&self, rom: &Path) -> Result<String> {
        // Output goes to temp files rather than pipes so a chatty emulator
        // cannot block on a full pipe while we poll for the timeout.
        let mut stdout = tempfile::tempfile()?;
        let mut stderr = tempfile::tempfile()?;

        let mut cmd = self.command(rom);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(stdout.try_clone()?))
            .stderr(Stdio::from(stderr.try_clone()?));

        debug!(program = %self.program, rom = %rom.display(), "starting emulator");
        let start = Instant::now();
        let child = cmd.spawn().map_err(|e| self.spawn_err(e))?;

        let status = match self.timeout {
            Some(timeout) => wait_with_timeout(child, timeout).map_err(|e| {
                if e.kind() == std::io::ErrorKind::TimedOut {
                    Error::Timeout {
                        program: self.program.clone(),
                        timeout,
                    }
                } else {
                    self.spawn_err(e)
                }
            })?,
            None => wait(child).map_err(|e| self.spawn_err(e))?,
        };
        let elapsed = start.elapsed();
        metrics::histogram!("tracecheck_emulator_seconds").record(elapsed.as_secs_f64());

        let output = read_back(&mut stdout)?;
        let errors = read_back(&mut stderr)?;
        if !status.success() {
            warn!(code = ?status.code(), "emulator exited with failure status");
            if !errors.is_empty() {
                debug!(stderr = %errors.trim_end(), "emulator stderr");
            }
        }
        debug!(
            bytes = output.len(),
            elapsed_ms = elapsed.as_millis(),
            "emulator finished"
        );
        Ok(output)
    }
}

/// Replays previously captured emulator output.
#[derive(Debug, Clone, Default)]
pub struct CapturedRunner {
    output: String,
}

impl CapturedRunner {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }
}

impl RomRunner for CapturedRunner {
    fn run(&self, rom: &Path) -> Result<String> {
        debug!(rom = %rom.display(), "replaying captured output");
        Ok(self.output.clone())
    }
}

fn wait(mut child: Child) -> std::io::Result<ExitStatus> {
    child.wait()
}

/// Poll the child until it exits, killing it once `timeout` has passed.
fn wait_with_timeout(mut child: Child, timeout: Duration) -> std::io::Result<ExitStatus> {
    let start = Instant::now();

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "command timed out",
            ));
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

fn read_back(file: &mut File) -> Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
