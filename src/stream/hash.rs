//! BitTorrent info-hash newtype.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of a hex-encoded v1 info hash.
pub const INFO_HASH_LEN: usize = 40;

/// Rejected info-hash input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid info hash {0:?}: expected 40 hex characters")]
pub struct InvalidInfoHash(pub String);

/// A 40-character hex info hash, always stored lowercase.
///
/// Mixed-case input is accepted and canonicalized, so two hashes that differ
/// only in case compare equal and hash identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InfoHash(String);

impl InfoHash {
    /// Parse and canonicalize a hash. Surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Result<Self, InvalidInfoHash> {
        let trimmed = input.trim();
        if trimmed.len() == INFO_HASH_LEN && trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(trimmed.to_ascii_lowercase()))
        } else {
            Err(InvalidInfoHash(input.to_string()))
        }
    }

    /// Lenient variant used by normalizers: `None` for absent or malformed input.
    pub fn parse_opt(input: Option<&str>) -> Option<Self> {
        input.and_then(|s| Self::parse(s).ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `magnet:` URI carrying only the exact-topic parameter.
    pub fn magnet(&self) -> String {
        format!("magnet:?xt=urn:btih:{}", self.0)
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InfoHash {
    type Err = InvalidInfoHash;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for InfoHash {
    type Error = InvalidInfoHash;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<InfoHash> for String {
    fn from(hash: InfoHash) -> Self {
        hash.0
    }
}

impl AsRef<str> for InfoHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPPER: &str = "0123456789ABCDEF0123456789ABCDEF01234567";
    const LOWER: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn mixed_case_hashes_are_identical() {
        let a = InfoHash::parse(UPPER).unwrap();
        let b = InfoHash::parse(LOWER).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), LOWER);
    }

    #[test]
    fn rejects_wrong_length_and_non_hex() {
        assert!(InfoHash::parse("abc").is_err());
        assert!(InfoHash::parse(&"g".repeat(40)).is_err());
        assert!(InfoHash::parse(&"a".repeat(41)).is_err());
    }

    #[test]
    fn trims_whitespace() {
        let hash = InfoHash::parse(&format!("  {UPPER}\n")).unwrap();
        assert_eq!(hash.as_str(), LOWER);
    }

    #[test]
    fn deserialize_canonicalizes() {
        let hash: InfoHash = serde_json::from_str(&format!("\"{UPPER}\"")).unwrap();
        assert_eq!(hash.to_string(), LOWER);
        assert!(serde_json::from_str::<InfoHash>("\"nope\"").is_err());
    }

    #[test]
    fn magnet_uri() {
        let hash = InfoHash::parse(LOWER).unwrap();
        assert_eq!(hash.magnet(), format!("magnet:?xt=urn:btih:{LOWER}"));
    }
}
