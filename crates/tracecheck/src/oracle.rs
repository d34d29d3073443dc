use std::path::{Path, PathBuf};

use tracecheck_mask::{Comparison, WildcardPolicy, compare};
use tracing::{debug, info};

use crate::Result;
use crate::runner::RomRunner;
use crate::source::{TRACE_MARKER, extract_actual, read_expected};

/// Runs an emulator on a ROM and checks its trace against a reference log.
pub struct Oracle<R> {
    runner: R,
    policy: WildcardPolicy,
    marker: String,
}

impl<R: RomRunner> Oracle<R> {
    /// Oracle with the default wildcard and trace marker.
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            policy: WildcardPolicy::default(),
            marker: TRACE_MARKER.to_string(),
        }
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: WildcardPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Run `rom` and compare its trace against the log at `log`.
    ///
    /// The reference log is read before the emulator starts, so a bad log path
    /// fails fast.
    ///
    /// # Errors
    ///
    /// Fails if the log cannot be read or the emulator cannot be run. A
    /// divergence is not an error; inspect the returned [`Comparison`].
    pub fn check(&self, rom: &Path, log: &Path) -> Result<Comparison> {
        let expected = read_expected(log)?;
        info!(rom = %rom.display(), "running emulator");
        let output = self.runner.run(rom)?;
        let actual = extract_actual(&output, &self.marker);
        debug!(
            expected = expected.len(),
            actual = actual.len(),
            "extracted traces"
        );

        let result = compare(&expected, &actual, self.policy);
        crate::metrics::record_comparison(&result);
        Ok(result)
    }
}

/// A fixed ROM and reference log used as a standard regression check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conformance {
    pub rom: PathBuf,
    pub log: PathBuf,
}

impl Conformance {
    /// The nestest CPU conformance ROM and its golden log.
    #[must_use]
    pub fn nestest() -> Self {
        Self {
            rom: PathBuf::from("roms/test/nestest.nes"),
            log: PathBuf::from("roms/test/nestest.log"),
        }
    }

    /// Replace the ROM and/or log path, keeping the rest.
    #[must_use]
    pub fn with_overrides(mut self, rom: Option<PathBuf>, log: Option<PathBuf>) -> Self {
        if let Some(rom) = rom {
            self.rom = rom;
        }
        if let Some(log) = log {
            self.log = log;
        }
        self
    }

    /// Run this conformance pair through `oracle`.
    ///
    /// # Errors
    ///
    /// See [`Oracle::check`].
    pub fn run<R: RomRunner>(&self, oracle: &Oracle<R>) -> Result<Comparison> {
        oracle.check(&self.rom, &self.log)
    }
}

impl Default for Conformance {
    fn default() -> Self {
        Self::nestest()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::Error;
    use crate::runner::CapturedRunner;

    fn golden(lines: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(lines.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_check_matches_with_noise_in_output() {
        let log = golden("C000 __________ A:00\nC5F5 __________ A:01\n");
        let output = "[main] Loading rom\nC000 __________ A:00\nnoise\nC5F5 __________ A:01\n";
        let oracle = Oracle::new(CapturedRunner::new(output));

        let result = oracle.check(Path::new("rom.nes"), log.path()).unwrap();
        assert!(result.is_match());
        assert_eq!(result.expected_len, 2);
        assert_eq!(result.actual_len, 2);
    }

    #[test]
    fn test_check_reports_divergence() {
        let log = golden("C000 __________ A:00\nC5F5 __________ A:01\n");
        let output = "C000 __________ A:00\nC5F5 __________ A:02\n";
        let oracle = Oracle::new(CapturedRunner::new(output));

        let result = oracle.check(Path::new("rom.nes"), log.path()).unwrap();
        let div = result.divergence.unwrap();
        assert_eq!(div.index, 1);
        assert_eq!(div.actual, "C5F5 __________ A:02");
    }

    #[test]
    fn test_empty_output_diverges_on_padding() {
        let log = golden("C000 __________ A:00\n");
        let oracle = Oracle::new(CapturedRunner::default());

        let result = oracle.check(Path::new("rom.nes"), log.path()).unwrap();
        assert_eq!(result.actual_len, 0);
        assert!(result.divergence.unwrap().padded);
    }

    #[test]
    fn test_missing_log_fails_before_running() {
        let oracle = Oracle::new(CapturedRunner::default());
        let err = oracle
            .check(Path::new("rom.nes"), Path::new("/nonexistent/golden.log"))
            .unwrap_err();
        assert!(matches!(err, Error::ReadLog { .. }));
    }

    #[test]
    fn test_custom_marker_and_wildcard() {
        let log = golden("PC=**** OK\n");
        let output = "boot\n>> PC=C000 OK\n";
        let oracle = Oracle::new(CapturedRunner::new(output))
            .with_marker(">>")
            .with_policy(WildcardPolicy::new('*'));

        // Extracted line keeps the marker, so the golden line must too.
        let result = oracle.check(Path::new("rom.nes"), log.path()).unwrap();
        assert!(!result.is_match());

        let log = golden(">> PC=**** OK\n");
        let result = oracle.check(Path::new("rom.nes"), log.path()).unwrap();
        assert!(result.is_match());
    }

    #[test]
    fn test_conformance_overrides() {
        let nestest = Conformance::nestest().with_overrides(None, Some("golden.log".into()));
        assert_eq!(nestest.rom, PathBuf::from("roms/test/nestest.nes"));
        assert_eq!(nestest.log, PathBuf::from("golden.log"));
    }

    #[test]
    fn test_conformance_run_uses_its_paths() {
        let log = golden("C000 __________ A:00\n");
        let nestest =
            Conformance::nestest().with_overrides(None, Some(log.path().to_path_buf()));
        let oracle = Oracle::new(CapturedRunner::new("C000 __________ A:00\n"));

        let result = nestest.run(&oracle).unwrap();
        assert!(result.is_match());
        assert_eq!(result.expected_len, 1);
    }

    #[test]
    fn test_nestest_defaults() {
        let nestest = Conformance::default();
        assert_eq!(nestest.rom, PathBuf::from("roms/test/nestest.nes"));
        assert_eq!(nestest.log, PathBuf::from("roms/test/nestest.log"));
    }
}
