//! Store granularity classes.
//!
//! The granularity of a mapping is the smallest unit of data for which a
//! durability operation has to be issued after a store:
//! - `Byte`: stores are durable once globally visible (eADR platforms)
//! - `CacheLine`: each dirty cache line has to be flushed
//! - `Page`: the whole page has to be written back with an msync-like call
//!
//! Variants are ordered finest to coarsest, so `Byte < CacheLine < Page`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum durable flush unit of a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Byte-addressable persistence.
    Byte,
    /// Cache-line flushes required.
    CacheLine,
    /// Page write-back required.
    Page,
}

impl Granularity {
    /// All granularities, finest first.
    pub const ALL: [Granularity; 3] = [Granularity::Byte, Granularity::CacheLine, Granularity::Page];

    /// Canonical lowercase spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Byte => "byte",
            Granularity::CacheLine => "cache_line",
            Granularity::Page => "page",
        }
    }

    /// Short expectation flag used by `gran_detecto` (`-b`, `-c`, `-p`).
    pub fn flag(self) -> char {
        match self {
            Granularity::Byte => 'b',
            Granularity::CacheLine => 'c',
            Granularity::Page => 'p',
        }
    }

    /// Whether a mapping with this granularity can serve a caller that
    /// requires `required`.
    ///
    /// A finer granularity satisfies every coarser requirement: a
    /// byte-granular mapping may still be flushed line by line or page by
    /// page, but not the other way around.
    pub fn satisfies(self, required: Granularity) -> bool {
        self <= required
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a granularity was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Taken from an override directive; the medium was not inspected.
    Forced,
    /// Derived from probing the medium.
    Detected,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Forced => write!(f, "forced"),
            Provenance::Detected => write!(f, "detected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_finest_to_coarsest() {
        assert!(Granularity::Byte < Granularity::CacheLine);
        assert!(Granularity::CacheLine < Granularity::Page);
        assert_eq!(Granularity::ALL.iter().max(), Some(&Granularity::Page));
    }

    #[test]
    fn test_satisfies() {
        assert!(Granularity::Byte.satisfies(Granularity::Page));
        assert!(Granularity::CacheLine.satisfies(Granularity::CacheLine));
        assert!(!Granularity::Page.satisfies(Granularity::CacheLine));
        assert!(!Granularity::CacheLine.satisfies(Granularity::Byte));
    }

    #[test]
    fn test_display_and_flags() {
        assert_eq!(Granularity::CacheLine.to_string(), "cache_line");
        assert_eq!(Granularity::Page.flag(), 'p');
        assert_eq!(Provenance::Forced.to_string(), "forced");
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&Granularity::CacheLine).unwrap();
        assert_eq!(json, "\"cache_line\"");
        let back: Granularity = serde_json::from_str("\"byte\"").unwrap();
        assert_eq!(back, Granularity::Byte);
        let prov = serde_json::to_string(&Provenance::Detected).unwrap();
        assert_eq!(prov, "\"detected\"");
    }
}
