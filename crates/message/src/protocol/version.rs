use std::fmt;
use std::str::FromStr;

use http::Version;

use crate::ensure;
use crate::protocol::InvalidArgument;

/// HTTP protocol version in its numeric form, e.g. `1.1` or `2`.
///
/// The string is kept verbatim once validated, so `2.0` stays `2.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProtocolVersion(String);

impl ProtocolVersion {
    /// Parses `major[.minor]`, an optional `HTTP/` prefix is stripped.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::ProtocolVersion`] for anything that is not numeric.
    pub fn parse(version: &str) -> Result<Self, InvalidArgument> {
        let trimmed = version.trim();
        let numeric = trimmed.strip_prefix("HTTP/").unwrap_or(trimmed);

        let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        let valid = match numeric.split_once('.') {
            Some((major, minor)) => is_digits(major) && is_digits(minor),
            None => is_digits(numeric),
        };

        ensure!(valid, InvalidArgument::protocol_version(version));
        Ok(Self(numeric.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self("1.1".to_owned())
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProtocolVersion {
    type Err = InvalidArgument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Version> for ProtocolVersion {
    fn from(version: Version) -> Self {
        let numeric = match version {
            Version::HTTP_09 => "0.9",
            Version::HTTP_10 => "1.0",
            Version::HTTP_2 => "2",
            Version::HTTP_3 => "3",
            // http 1.1 and any future version http does not model yet
            _ => "1.1",
        };
        Self(numeric.to_owned())
    }
}

impl PartialEq<str> for ProtocolVersion {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ProtocolVersion {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
