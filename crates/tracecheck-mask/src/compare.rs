use std::iter;

use tracing::debug;

use super::{Comparison, Divergence, PAD, WildcardPolicy};

/// Walk a line pair offset by offset, padding the shorter side with spaces.
fn padded_pairs<'a>(expected: &'a str, actual: &'a str) -> impl Iterator<Item = (char, char)> + 'a {
    let width = expected.chars().count().max(actual.chars().count());
    expected
        .chars()
        .chain(iter::repeat(PAD))
        .zip(actual.chars().chain(iter::repeat(PAD)))
        .take(width)
}

/// Check whether one actual line satisfies one expected line.
#[must_use]
pub fn line_matches(expected: &str, actual: &str, policy: WildcardPolicy) -> bool {
    padded_pairs(expected, actual).all(|(e, a)| policy.accepts(e, a))
}

/// Offsets (in chars) at which the pair fails, scanning the whole line.
#[must_use]
pub fn mismatch_columns(expected: &str, actual: &str, policy: WildcardPolicy) -> Vec<usize> {
    padded_pairs(expected, actual)
        .enumerate()
        .filter(|&(_, (e, a))| !policy.accepts(e, a))
        .map(|(col, _)| col)
        .collect()
}

/// Compare two traces positionally and find the first mismatching line.
///
/// Only the first `expected.len()` lines are visited. When `actual` is
/// shorter, the missing lines compare as empty strings. Extra lines at the
/// end of `actual` are never looked at.
#[must_use]
pub fn compare<E, A>(expected: &[E], actual: &[A], policy: WildcardPolicy) -> Comparison
where
    E: AsRef<str>,
    A: AsRef<str>,
{
    debug!(
        expected = expected.len(),
        actual = actual.len(),
        wildcard = %policy.wildcard,
        "comparing traces"
    );

    for (index, exp) in expected.iter().enumerate() {
        let exp = exp.as_ref();
        let act = actual.get(index).map(AsRef::as_ref);
        let act_line = act.unwrap_or("");

        let columns = mismatch_columns(exp, act_line, policy);
        if columns.is_empty() {
            continue;
        }

        debug!(index, columns = columns.len(), "first divergence");
        return Comparison {
            expected_len: expected.len(),
            actual_len: actual.len(),
            matched: index,
            divergence: Some(Divergence {
                index,
                expected: exp.to_string(),
                actual: act_line.to_string(),
                padded: act.is_none(),
                columns,
            }),
        };
    }

    Comparison {
        expected_len: expected.len(),
        actual_len: actual.len(),
        matched: expected.len(),
        divergence: None,
    }
}
