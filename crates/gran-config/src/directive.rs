//! Override directive parsing.
//!
//! A directive is a raw token such as `"page"`, `"cache_line"`,
//! `"CaCHe_Line"` or `"CACHELINE"`. Tokens are compared case-insensitively
//! after separator characters are stripped, against a single table of
//! accepted spellings.

use crate::error::ConfigError;
use gran_common::Granularity;

/// Characters removed before lookup.
const SEPARATORS: &[char] = &['_'];

/// Accepted spellings, keyed by normalized form.
const ACCEPTED: &[(&str, Granularity)] = &[
    ("byte", Granularity::Byte),
    ("cacheline", Granularity::CacheLine),
    ("page", Granularity::Page),
];

/// Lowercase a token and strip separators.
pub fn normalize_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| !SEPARATORS.contains(c))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Parse a required granularity token.
pub fn parse_granularity(token: &str) -> Result<Granularity, ConfigError> {
    let normalized = normalize_token(token);
    ACCEPTED
        .iter()
        .find(|(spelling, _)| *spelling == normalized)
        .map(|(_, granularity)| *granularity)
        .ok_or_else(|| ConfigError::UnrecognizedGranularity {
            token: token.to_string(),
        })
}

/// Parse an optional override directive.
///
/// An absent or empty token means "no override". Anything else must name a
/// granularity.
pub fn parse_directive(token: Option<&str>) -> Result<Option<Granularity>, ConfigError> {
    match token {
        None | Some("") => Ok(None),
        Some(token) => parse_granularity(token).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_spellings() {
        assert_eq!(parse_granularity("byte").unwrap(), Granularity::Byte);
        assert_eq!(parse_granularity("cache_line").unwrap(), Granularity::CacheLine);
        assert_eq!(parse_granularity("cacheline").unwrap(), Granularity::CacheLine);
        assert_eq!(parse_granularity("page").unwrap(), Granularity::Page);
    }

    #[test]
    fn test_mixed_case() {
        assert_eq!(parse_granularity("CaCHe_Line").unwrap(), Granularity::CacheLine);
        assert_eq!(parse_granularity("CACHELINE").unwrap(), Granularity::CacheLine);
        assert_eq!(parse_granularity("PAGE").unwrap(), Granularity::Page);
        assert_eq!(parse_granularity("Byte").unwrap(), Granularity::Byte);
    }

    #[test]
    fn test_absent_and_empty_are_no_override() {
        assert_eq!(parse_directive(None).unwrap(), None);
        assert_eq!(parse_directive(Some("")).unwrap(), None);
    }

    #[test]
    fn test_unrecognized_carries_raw_token() {
        let err = parse_directive(Some("Cache-Line")).unwrap_err();
        match err {
            ConfigError::UnrecognizedGranularity { token } => assert_eq!(token, "Cache-Line"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_near_misses() {
        for token in ["bytes", "line", "cache", "pages", " page", "page ", "4k", "_"] {
            assert!(
                parse_granularity(token).is_err(),
                "{token:?} should not be accepted"
            );
        }
    }

    #[test]
    fn test_normalize_token() {
        assert_eq!(normalize_token("CaCHe_Line"), "cacheline");
        assert_eq!(normalize_token("__PAGE__"), "page");
        assert_eq!(normalize_token(""), "");
    }
}
