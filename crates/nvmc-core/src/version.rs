use std::fmt;

use crate::error::{Error, Result};

pub const VERSION_PREFIX: char = 'v';

/// Canonical version identifier: lowercase and `v`-prefixed.
///
/// This is the only key used for version directories, so construction goes
/// through [`VersionId::normalize`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionId(String);

impl VersionId {
    pub fn normalize(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Err(invalid(input, "version is required"));
        }
        if let Some(bad) = input
            .chars()
            .find(|ch| ch.is_whitespace() || ch.is_control() || matches!(ch, '/' | '\\'))
        {
            return Err(invalid(
                input,
                &format!("unexpected character {bad:?} in version"),
            ));
        }

        let lowered = input.to_lowercase();
        let canonical = if lowered.starts_with(VERSION_PREFIX) {
            lowered
        } else {
            format!("{VERSION_PREFIX}{lowered}")
        };
        Ok(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VersionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub fn normalize_version(input: &str) -> Result<VersionId> {
    VersionId::normalize(input)
}

/// Parses a version directory name such as `v18.2.0` as a semantic version.
pub fn parse_semver(name: &str) -> Option<semver::Version> {
    let trimmed = name.strip_prefix(VERSION_PREFIX).unwrap_or(name);
    semver::Version::parse(trimmed).ok()
}

fn invalid(input: &str, reason: &str) -> Error {
    Error::InvalidVersion {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}
