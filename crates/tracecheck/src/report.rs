//! Human-readable divergence report.

use std::io::{self, Write};

use tracecheck_mask::{Comparison, Divergence};

/// Writes the comparison outcome for a human to read.
///
/// Output is plain text so scripts can still scrape it.
pub struct Reporter<W: Write> {
    out: W,
    detail: bool,
}

impl<W: Write> Reporter<W> {
    /// Reporter that also marks the failing columns.
    pub const fn new(out: W) -> Self {
        Self { out, detail: true }
    }

    /// Reporter that prints only the length summary and the two lines.
    pub const fn plain(out: W) -> Self {
        Self { out, detail: false }
    }

    /// Print the length summary.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn lengths(&mut self, expected: usize, actual: usize) -> io::Result<()> {
        writeln!(
            self.out,
            "expected: {expected} lines, actual: {actual} lines"
        )
    }

    /// Print a divergence.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn divergence(&mut self, div: &Divergence) -> io::Result<()> {
        writeln!(self.out, "EXPECTED: {}", div.expected)?;
        writeln!(self.out, "  ACTUAL: {}", div.actual)?;
        if self.detail {
            writeln!(self.out, "          {}", caret_line(&div.expected, &div.columns))?;
            if div.padded {
                writeln!(
                    self.out,
                    "divergence at line {} (actual trace ended)",
                    div.index + 1
                )?;
            } else {
                writeln!(self.out, "divergence at line {}", div.index + 1)?;
            }
        }
        Ok(())
    }

    /// Print the full report: lengths, then the first divergence if any.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn report(&mut self, result: &Comparison) -> io::Result<()> {
        self.lengths(result.expected_len, result.actual_len)?;
        if let Some(div) = &result.divergence {
            self.divergence(div)?;
        }
        self.out.flush()
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Build a marker line with `^` under each failing column of `expected`.
///
/// Tabs in `expected` are copied so the carets land on the same tab stops.
/// Columns count characters, so wide (CJK, emoji) characters shift the
/// carets left of where a terminal draws them.
fn caret_line(expected: &str, columns: &[usize]) -> String {
    let Some(&last) = columns.last() else {
        return String::new();
    };
    let mut line: Vec<char> = expected
        .chars()
        .chain(std::iter::repeat(' '))
        .take(last + 1)
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect();
    for &col in columns {
        line[col] = '^';
    }
    line.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use tracecheck_mask::{WildcardPolicy, compare};

    use super::*;

    fn render(result: &Comparison, detail: bool) -> String {
        let mut reporter = if detail {
            Reporter::new(Vec::new())
        } else {
            Reporter::plain(Vec::new())
        };
        reporter.report(result).unwrap();
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn test_match_prints_only_lengths() {
        let result = compare(&["AB12"], &["AB12"], WildcardPolicy::default());
        assert_eq!(render(&result, true), "expected: 1 lines, actual: 1 lines\n");
    }

    #[test]
    fn test_plain_divergence() {
        let result = compare(&["AB12"], &["AB13"], WildcardPolicy::default());
        assert_eq!(
            render(&result, false),
            "expected: 1 lines, actual: 1 lines\nEXPECTED: AB12\n  ACTUAL: AB13\n"
        );
    }

    #[test]
    fn test_detailed_divergence_marks_columns() {
        let result = compare(&["AB12"], &["XB13"], WildcardPolicy::default());
        assert_eq!(
            render(&result, true),
            "expected: 1 lines, actual: 1 lines\n\
             EXPECTED: AB12\n  \
             ACTUAL: XB13\n          \
             ^  ^\n\
             divergence at line 1\n"
        );
    }

    #[test]
    fn test_padded_divergence() {
        let result = compare(&["AB12", "CD34"], &["AB12"], WildcardPolicy::default());
        let text = render(&result, true);
        assert!(text.starts_with("expected: 2 lines, actual: 1 lines\n"));
        assert!(text.contains("EXPECTED: CD34\n  ACTUAL: \n"));
        assert!(text.ends_with("divergence at line 2 (actual trace ended)\n"));
    }

    #[test]
    fn test_caret_line() {
        assert_eq!(caret_line("AB12", &[]), "");
        assert_eq!(caret_line("AB12", &[0]), "^");
        assert_eq!(caret_line("AB12", &[1, 3]), " ^ ^");
        assert_eq!(caret_line("AB", &[3]), "   ^");
    }

    #[test]
    fn test_caret_line_keeps_tabs() {
        assert_eq!(caret_line("A\tB\tC", &[4]), " \t \t^");
        assert_eq!(caret_line("\tAB", &[0, 2]), "^ ^");
    }

    #[test]
    fn test_detailed_divergence_after_tab() {
        let result = compare(&["LDA\t#$01"], &["LDA\t#$02"], WildcardPolicy::default());
        let text = render(&result, true);
        assert!(text.contains("EXPECTED: LDA\t#$01\n  ACTUAL: LDA\t#$02\n"));
        let carets = format!("\n{}\t   ^\n", " ".repeat(13));
        assert!(text.contains(&carets));
    }
}
