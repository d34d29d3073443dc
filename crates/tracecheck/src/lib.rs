//! tracecheck - differential trace oracle for CPU emulators
//!
//! Runs an emulator on a ROM with instruction tracing enabled, pulls the trace
//! lines out of its output and compares them line by line against a golden
//! reference log. Reference lines may use `_` as a per-character wildcard.
//!
//! # Example
//!
//! ```ignore
//! use tracecheck::{CommandRunner, Conformance, Oracle};
//!
//! let oracle = Oracle::new(CommandRunner::default());
//! let result = Conformance::nestest().run(&oracle)?;
//! if let Some(div) = &result.divergence {
//!     eprintln!("diverged at line {}", div.index + 1);
//! }
//! ```

mod error;
pub mod metrics;
mod oracle;
pub mod report;
pub mod runner;
pub mod source;

pub use error::{Error, Result};
pub use oracle::{Conformance, Oracle};
pub use report::Reporter;
pub use runner::{CapturedRunner, CommandRunner, RomRunner};
pub use source::TRACE_MARKER;

// Re-export the comparator
pub use tracecheck_mask::{
    Comparison, Divergence, WILDCARD, WildcardPolicy, compare, line_matches, mismatch_columns,
};
