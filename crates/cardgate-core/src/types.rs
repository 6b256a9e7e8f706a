use crate::{Result, constants::UID_DELIMITER, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical form of a card UID, used as the registry key.
///
/// The raw bytes returned by anti-collision are rendered as decimal byte
/// values joined by [`UID_DELIMITER`], so `[4, 171, 205, 239]` becomes
/// `"4-171-205-239"`. Two reads of the same card always produce equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalUid(String);

impl CanonicalUid {
    /// Canonicalize raw UID bytes.
    ///
    /// # Errors
    /// Returns `Error::InvalidUid` if `raw` is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use cardgate_core::CanonicalUid;
    ///
    /// let uid = CanonicalUid::from_bytes(&[4, 171, 205, 239]).unwrap();
    /// assert_eq!(uid.as_str(), "4-171-205-239");
    /// ```
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::InvalidUid("UID cannot be empty".to_string()));
        }

        let key = raw
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(UID_DELIMITER);

        Ok(CanonicalUid(key))
    }

    /// Get the canonical key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the raw UID bytes from the canonical key.
    ///
    /// # Errors
    /// Returns `Error::InvalidUid` if a component is not a decimal byte.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.0
            .split(UID_DELIMITER)
            .map(|part| {
                part.parse::<u8>()
                    .map_err(|_| Error::InvalidUid(format!("Invalid UID component: {part}")))
            })
            .collect()
    }
}

impl fmt::Display for CanonicalUid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CanonicalUid {
    type Err = Error;

    /// Parse a canonical key such as `"4-171-205-239"`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidUid("UID cannot be empty".to_string()));
        }

        let bytes = trimmed
            .split(UID_DELIMITER)
            .map(|part| {
                part.trim()
                    .parse::<u8>()
                    .map_err(|_| Error::InvalidUid(format!("Invalid UID component: {part}")))
            })
            .collect::<Result<Vec<u8>>>()?;

        CanonicalUid::from_bytes(&bytes)
    }
}

impl AsRef<str> for CanonicalUid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Operating mode of the gate.
///
/// Exactly one mode is active at any instant. The scanner reads it on every
/// new presentation; only the operator command task changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// Check presented cards against the registry (allow/deny).
    #[default]
    ReadCheck,

    /// Enroll unknown cards: write the marker and record them.
    Enroll,
}

impl OperatingMode {
    /// Short lowercase name used in logs and on the command line.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadCheck => "read",
            Self::Enroll => "enroll",
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Self::ReadCheck => 0,
            Self::Enroll => 1,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Enroll,
            _ => Self::ReadCheck,
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OperatingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "read" | "readcheck" | "admode" => Ok(Self::ReadCheck),
            "write" | "enroll" | "enrollmode" => Ok(Self::Enroll),
            other => Err(Error::InvalidMode(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_canonical_uid_from_bytes() {
        let uid = CanonicalUid::from_bytes(&[4, 171, 205, 239]).unwrap();
        assert_eq!(uid.as_str(), "4-171-205-239");
        assert_eq!(uid.to_string(), "4-171-205-239");
    }

    #[test]
    fn test_canonical_uid_empty_rejected() {
        assert!(CanonicalUid::from_bytes(&[]).is_err());
        assert!("".parse::<CanonicalUid>().is_err());
    }

    #[test]
    fn test_canonical_uid_is_stable() {
        let a = CanonicalUid::from_bytes(&[1, 2, 3, 4]).unwrap();
        let b = CanonicalUid::from_bytes(&[1, 2, 3, 4]).unwrap();
        let c = CanonicalUid::from_bytes(&[1, 2, 3, 5]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_canonical_uid_parse() {
        let uid: CanonicalUid = " 136-4-23-254-101 ".parse().unwrap();
        assert_eq!(uid.as_str(), "136-4-23-254-101");
        assert_eq!(uid.to_bytes().unwrap(), vec![136, 4, 23, 254, 101]);
    }

    #[rstest]
    #[case("1-2-x")]
    #[case("1--2")]
    #[case("256-1")]
    fn test_canonical_uid_parse_invalid(#[case] input: &str) {
        assert!(input.parse::<CanonicalUid>().is_err());
    }

    #[test]
    fn test_canonical_uid_serializes_as_string() {
        let uid = CanonicalUid::from_bytes(&[9, 8]).unwrap();
        assert_eq!(serde_json::to_string(&uid).unwrap(), "\"9-8\"");
    }

    #[test]
    fn test_operating_mode_default() {
        assert_eq!(OperatingMode::default(), OperatingMode::ReadCheck);
    }

    #[rstest]
    #[case("read", OperatingMode::ReadCheck)]
    #[case("ENROLL", OperatingMode::Enroll)]
    #[case(" write ", OperatingMode::Enroll)]
    #[case("admode", OperatingMode::ReadCheck)]
    fn test_operating_mode_from_str(#[case] input: &str, #[case] expected: OperatingMode) {
        assert_eq!(input.parse::<OperatingMode>().unwrap(), expected);
    }

    #[test]
    fn test_operating_mode_u8_roundtrip() {
        for mode in [OperatingMode::ReadCheck, OperatingMode::Enroll] {
            assert_eq!(OperatingMode::from_u8(mode.to_u8()), mode);
        }
    }
}
