use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Trace oracle errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read reference log {}: {source}", path.display())]
    ReadLog {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read captured output {}: {source}", path.display())]
    ReadCapture {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to run emulator `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("emulator `{program}` timed out after {}s", timeout.as_secs())]
    Timeout { program: String, timeout: Duration },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
