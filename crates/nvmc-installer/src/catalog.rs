use std::fmt;
use std::fs;
use std::io;

use nvmc_core::{parse_semver, IoResultExt, Result, VersionId, VERSION_PREFIX};

use crate::activate::ActivationLink;
use crate::HomeLayout;

/// One installed version directory as reported by [`list_versions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListedVersion {
    Parsed {
        name: String,
        version: semver::Version,
    },
    Unparsable {
        name: String,
    },
}

impl ListedVersion {
    /// Directory name under the versions root.
    pub fn name(&self) -> &str {
        match self {
            Self::Parsed { name, .. } | Self::Unparsable { name } => name,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed { .. })
    }
}

impl fmt::Display for ListedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed { name, .. } => f.write_str(name),
            Self::Unparsable { name } => write!(f, "Unable to parse {name}"),
        }
    }
}

/// Installed versions in ascending semantic-version order, followed by
/// directories whose names do not parse, in discovery order.
pub fn list_versions(layout: &HomeLayout) -> Result<Vec<ListedVersion>> {
    let mut parsed = Vec::new();
    let mut unparsable = Vec::new();
    for name in installed_version_names(layout)? {
        match parse_semver(&name) {
            Some(version) => parsed.push(ListedVersion::Parsed { name, version }),
            None => unparsable.push(ListedVersion::Unparsable { name }),
        }
    }

    parsed.sort_by(|left, right| match (left, right) {
        (
            ListedVersion::Parsed {
                name: left_name,
                version: left_version,
            },
            ListedVersion::Parsed {
                name: right_name,
                version: right_version,
            },
        ) => left_version
            .cmp(right_version)
            .then_with(|| left_name.cmp(right_name)),
        _ => std::cmp::Ordering::Equal,
    });
    parsed.extend(unparsable);
    Ok(parsed)
}

/// Names of version directories in directory-enumeration order.
pub fn installed_version_names(layout: &HomeLayout) -> Result<Vec<String>> {
    let versions_dir = layout.versions_dir();
    let entries = match fs::read_dir(&versions_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err).fs_context("failed to read versions dir", &versions_dir),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.fs_context("failed to read versions dir", &versions_dir)?;
        let file_type = entry
            .file_type()
            .fs_context("failed to stat version entry", &entry.path())?;
        if !file_type.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.starts_with(VERSION_PREFIX) {
            names.push(name);
        }
    }
    Ok(names)
}

/// The active version, or `None` when no activation link exists.
pub fn current_version(layout: &HomeLayout) -> Result<Option<VersionId>> {
    ActivationLink::new(layout).read()
}
