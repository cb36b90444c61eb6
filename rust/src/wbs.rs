//! Helpers for dot-delimited WBS codes.
//!
//! Codes are compared segment by segment, numerically where both segments
//! parse as integers, so `1.1.2` sorts before `1.1.10`.

use std::cmp::Ordering;

/// Separator between hierarchy levels.
pub const SEPARATOR: char = '.';

/// Compare two WBS codes by their segments.
pub fn compare(a: &str, b: &str) -> Ordering {
    let mut left = a.split(SEPARATOR);
    let mut right = b.split(SEPARATOR);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(ln), Ok(rn)) => ln.cmp(&rn),
                    _ => l.cmp(r),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Sort a list of codes in place using [`compare`].
pub fn sort_codes<S: AsRef<str>>(codes: &mut [S]) {
    codes.sort_by(|a, b| compare(a.as_ref(), b.as_ref()));
}

/// Top-level section segment (`"2"` for `"2.1.3.1"`).
pub fn section(code: &str) -> &str {
    code.split(SEPARATOR).next().unwrap_or(code)
}

/// Trailing segment (`"1"` for `"2.1.3.1"`).
pub fn last_segment(code: &str) -> &str {
    code.rsplit(SEPARATOR).next().unwrap_or(code)
}

/// Code without its trailing segment, or `None` for a top-level code.
pub fn parent(code: &str) -> Option<&str> {
    code.rfind(SEPARATOR).map(|idx| &code[..idx])
}

/// Join 1-based indices into a code.
pub fn join(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_segment_ordering() {
        assert_eq!(compare("1.1.2", "1.1.10"), Ordering::Less);
        assert_eq!(compare("2", "10"), Ordering::Less);
        assert_eq!(compare("1.1", "1.1.1"), Ordering::Less);
        assert_eq!(compare("1.2.1", "1.2.1"), Ordering::Equal);
    }

    #[test]
    fn test_sort_codes() {
        let mut codes = vec!["1.10.1", "1.2.1", "1.1.3", "1.1.1"];
        sort_codes(&mut codes);
        assert_eq!(codes, vec!["1.1.1", "1.1.3", "1.2.1", "1.10.1"]);
    }

    #[test]
    fn test_segments() {
        assert_eq!(section("3.1.2.4"), "3");
        assert_eq!(last_segment("3.1.2.4"), "4");
        assert_eq!(parent("3.1.2.4"), Some("3.1.2"));
        assert_eq!(parent("3"), None);
        assert_eq!(join(&[1, 2, 3, 1]), "1.2.3.1");
    }
}
