//! Four-part dotted versions packed into a 64-bit integer.
//!
//! Provider and dependent registrations store versions as text
//! (`major.minor.build.revision`). Comparisons are always numeric on the
//! packed value, never lexical: `"10.0.0.0"` is newer than `"9.0.0.0"`.
//!
//! # Examples
//!
//! ```rust
//! use dutil::version::FourPartVersion;
//!
//! # fn example() -> dutil::core::Result<()> {
//! let installed: FourPartVersion = "2.5".parse()?;
//! let required = FourPartVersion::parse("2.0.0.0")?;
//! assert!(installed > required);
//! assert_eq!(installed.to_string(), "2.5.0.0");
//! assert_eq!(installed.packed(), 0x0002_0005_0000_0000);
//! # Ok(())
//! # }
//! ```

use crate::core::{DutilError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A `major.minor.build.revision` version, each part 16 bits wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FourPartVersion(u64);

impl FourPartVersion {
    /// Build a version from its four parts.
    #[must_use]
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self(
            (major as u64) << 48 | (minor as u64) << 32 | (build as u64) << 16 | revision as u64,
        )
    }

    /// Wrap an already packed value.
    #[must_use]
    pub const fn from_packed(packed: u64) -> Self {
        Self(packed)
    }

    /// The packed 64-bit representation.
    #[must_use]
    pub const fn packed(self) -> u64 {
        self.0
    }

    /// The four parts, most significant first.
    #[must_use]
    pub const fn parts(self) -> [u16; 4] {
        [(self.0 >> 48) as u16, (self.0 >> 32) as u16, (self.0 >> 16) as u16, self.0 as u16]
    }

    /// Parse `major[.minor[.build[.revision]]]`.
    ///
    /// An optional leading `v` or `V` is accepted. Missing trailing parts are
    /// zero. Empty parts, non-digits, more than four parts or a part above
    /// 65535 are rejected with [`DutilError::InvalidVersion`].
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || DutilError::InvalidVersion {
            version: text.to_string(),
        };

        let trimmed = text.trim();
        let body = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);
        if body.is_empty() {
            return Err(invalid());
        }

        let mut parts = [0u16; 4];
        for (i, part) in body.split('.').enumerate() {
            if i >= parts.len() || part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            parts[i] = part.parse::<u16>().map_err(|_| invalid())?;
        }

        Ok(Self::new(parts[0], parts[1], parts[2], parts[3]))
    }
}

impl FromStr for FourPartVersion {
    type Err = DutilError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FourPartVersion {
    type Error = DutilError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<FourPartVersion> for String {
    fn from(value: FourPartVersion) -> Self {
        value.to_string()
    }
}

impl fmt::Display for FourPartVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [major, minor, build, revision] = self.parts();
        write!(f, "{major}.{minor}.{build}.{revision}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_version() {
        let v = FourPartVersion::parse("1.2.3.4").unwrap();
        assert_eq!(v.parts(), [1, 2, 3, 4]);
        assert_eq!(v.packed(), 0x0001_0002_0003_0004);
    }

    #[test]
    fn test_parse_pads_missing_parts() {
        assert_eq!(FourPartVersion::parse("3").unwrap(), FourPartVersion::new(3, 0, 0, 0));
        assert_eq!(FourPartVersion::parse("v3.1").unwrap(), FourPartVersion::new(3, 1, 0, 0));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "v", "1..2", "1.2.3.4.5", "1.a", "65536", "-1", "1.2.", " . "] {
            assert!(
                matches!(FourPartVersion::parse(bad), Err(DutilError::InvalidVersion { .. })),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn test_numeric_not_lexical_ordering() {
        let nine: FourPartVersion = "9.0.0.0".parse().unwrap();
        let ten: FourPartVersion = "10.0.0.0".parse().unwrap();
        assert!(ten > nine);

        let low_major_high_minor: FourPartVersion = "1.65535".parse().unwrap();
        assert!(FourPartVersion::new(2, 0, 0, 0) > low_major_high_minor);
    }

    #[test]
    fn test_display_and_serde() {
        let v = FourPartVersion::new(2, 5, 0, 0);
        assert_eq!(v.to_string(), "2.5.0.0");

        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"2.5.0.0\"");
        let back: FourPartVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
