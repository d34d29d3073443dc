//! Trace sources.
//!
//! The expected trace comes verbatim from a reference log. The actual trace is
//! picked out of the emulator's standard output: only lines carrying the trace
//! marker are instruction records, everything else (banners, debug prints) is
//! dropped.

use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::{Error, Result};

/// Substring identifying instruction trace lines in emulator output.
///
/// The emulator masks its disassembly and PPU columns with underscores, so a
/// real trace line always carries a run of at least ten of them.
pub const TRACE_MARKER: &str = "__________";

/// Read a reference log, one trimmed line per physical line.
///
/// Blank lines are kept. Paths ending in `.zst` are decompressed first.
///
/// # Errors
///
/// Returns [`Error::ReadLog`] if the file cannot be opened, decompressed or
/// decoded.
pub fn read_expected(path: &Path) -> Result<Vec<String>> {
    let read_err = |source| Error::ReadLog {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(read_err)?;
    let mut reader: Box<dyn Read> = if is_zstd(path) {
        Box::new(zstd::Decoder::new(file).map_err(read_err)?)
    } else {
        Box::new(file)
    };

    let mut text = String::new();
    reader.read_to_string(&mut text).map_err(read_err)?;
    let lines: Vec<String> = normalize_newlines(&text)
        .lines()
        .map(|line| line.trim().to_string())
        .collect();

    debug!(path = %path.display(), lines = lines.len(), "read reference log");
    Ok(lines)
}

/// Extract trace lines from captured emulator output.
#[must_use]
pub fn extract_actual(output: &str, marker: &str) -> Vec<String> {
    normalize_newlines(output)
        .split('\n')
        .filter(|line| line.contains(marker))
        .map(|line| line.trim().to_string())
        .collect()
}

/// Extract trace lines from a saved emulator output file.
///
/// # Errors
///
/// Returns [`Error::ReadCapture`] if the file cannot be read.
pub fn read_actual(path: &Path, marker: &str) -> Result<Vec<String>> {
    let bytes = std::fs::read(path).map_err(|source| Error::ReadCapture {
        path: path.to_path_buf(),
        source,
    })?;
    let output = String::from_utf8_lossy(&bytes);
    Ok(extract_actual(&output, marker))
}

/// Turn `\r\n` and lone `\r` into `\n`.
///
/// Emulators redraw progress text with a bare carriage return; without this it
/// would be glued onto the next trace line.
fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

fn is_zstd(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "zst")
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_extract_keeps_only_marked_lines() {
        let output = "\
[main] Loading rom at path: roms/test/nestest.nes
[nes] Reset to pc = 0xC000
C000  4C __________ A:00
  C5F5  A2 __________ A:00
done
";
        let lines = extract_actual(output, TRACE_MARKER);
        assert_eq!(
            lines,
            vec!["C000  4C __________ A:00", "C5F5  A2 __________ A:00"]
        );
    }

    #[test]
    fn test_extract_requires_full_marker() {
        let output = "PPU:___,___ CYC:7\nA _________ B\n";
        assert!(extract_actual(output, TRACE_MARKER).is_empty());
    }

    #[test]
    fn test_extract_handles_crlf_and_empty() {
        assert!(extract_actual("", TRACE_MARKER).is_empty());
        let lines = extract_actual("X __________ Y\r\nnoise\r\n", TRACE_MARKER);
        assert_eq!(lines, vec!["X __________ Y"]);
    }

    #[test]
    fn test_read_expected_trims_and_keeps_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "  AB12  \n\nCD__\t\n").unwrap();

        let lines = read_expected(file.path()).unwrap();
        assert_eq!(lines, vec!["AB12", "", "CD__"]);
    }

    #[test]
    fn test_extract_splits_on_lone_carriage_return() {
        let output = "progress 50%\rC000 __________ A:00\nprogress 100%\r\n";
        let lines = extract_actual(output, TRACE_MARKER);
        assert_eq!(lines, vec!["C000 __________ A:00"]);
    }

    #[test]
    fn test_read_expected_splits_on_lone_carriage_return() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "AB12\rCD34\r\nEF__\r").unwrap();

        let lines = read_expected(file.path()).unwrap();
        assert_eq!(lines, vec!["AB12", "CD34", "EF__"]);
    }

    #[test]
    fn test_read_expected_zstd() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("golden.log.zst");
        let compressed = zstd::encode_all(&b"AB12\nCD34\n"[..], 0).unwrap();
        std::fs::write(&path, compressed).unwrap();

        let lines = read_expected(&path).unwrap();
        assert_eq!(lines, vec!["AB12", "CD34"]);
    }

    #[test]
    fn test_read_expected_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.log");
        let err = read_expected(&missing).unwrap_err();
        assert!(matches!(err, Error::ReadLog { ref path, .. } if path == &missing));
    }

    #[test]
    fn test_read_actual_from_capture() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "banner\nC000 __________ A:00\n").unwrap();

        let lines = read_actual(file.path(), TRACE_MARKER).unwrap();
        assert_eq!(lines, vec!["C000 __________ A:00"]);
    }
}
