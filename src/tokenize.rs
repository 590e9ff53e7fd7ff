//! Tokenizer: lowercase alphanumeric runs.
//!
//! Every character outside `[a-z0-9]` (after lowercasing) is a separator, so a
//! token is never empty. Tokenization is pure; the same input always yields
//! the same sequence.

use regex::Regex;
use std::sync::OnceLock;

static TOKEN_RE: OnceLock<Regex> = OnceLock::new();

fn token_re() -> &'static Regex {
    TOKEN_RE.get_or_init(|| Regex::new(r"[a-z0-9]+").expect("valid regex"))
}

/// Split `text` into lowercase alphanumeric tokens.
///
/// `None` and `""` both yield an empty vector.
pub fn tokenize(text: Option<&str>) -> Vec<String> {
    match text {
        Some(t) if !t.is_empty() => {
            let lowered = t.to_lowercase();
            token_re()
                .find_iter(&lowered)
                .map(|m| m.as_str().to_string())
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Tokenize a string slice directly.
#[inline]
pub fn tokenize_str(text: &str) -> Vec<String> {
    tokenize(Some(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_line() {
        assert_eq!(
            tokenize_str("daiin qokedy daiin"),
            vec!["daiin", "qokedy", "daiin"]
        );
    }

    #[test]
    fn test_empty_and_none() {
        assert!(tokenize(None).is_empty());
        assert!(tokenize(Some("")).is_empty());
        assert!(tokenize_str("  .,;-- ").is_empty());
    }

    #[test]
    fn test_lowercase_and_separators() {
        assert_eq!(
            tokenize_str("Qokeey.DAIIN-chol,,ol 42x"),
            vec!["qokeey", "daiin", "chol", "ol", "42x"]
        );
    }

    #[test]
    fn test_deterministic() {
        let line = "otedy qokain! shedy? 8am";
        assert_eq!(tokenize_str(line), tokenize_str(line));
    }
}
