use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    #[error(
        "requested installation {version} already exists at {}; run with --override-existing-install to overwrite the existing version",
        path.display()
    )]
    AlreadyInstalled { version: String, path: PathBuf },

    #[error("version {version} is not installed (expected {})", path.display())]
    NotInstalled { version: String, path: PathBuf },

    #[error("download of {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("checksum does not match for {file_name}: expected {expected}, computed {actual}")]
    ChecksumMismatch {
        file_name: String,
        expected: String,
        actual: String,
    },

    #[error("unable to verify checksum for {file_name}: {reason}")]
    ChecksumFormat { file_name: String, reason: String },

    #[error("unsupported tar entry type {entry_type} for {}", path.display())]
    UnsupportedEntryType { entry_type: String, path: PathBuf },

    #[error("invalid archive {}: {message}", path.display())]
    Archive { path: PathBuf, message: String },

    #[error("invalid configuration in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("{message}: {}", path.display())]
    Filesystem {
        message: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn filesystem(message: impl Into<String>, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            message: message.into(),
            path: path.into(),
            source,
        }
    }

    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn archive(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Archive {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Short machine-friendly name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidVersion { .. } => "invalid-version",
            Self::AlreadyInstalled { .. } => "already-installed",
            Self::NotInstalled { .. } => "not-installed",
            Self::Network { .. } => "network",
            Self::ChecksumMismatch { .. } => "checksum-mismatch",
            Self::ChecksumFormat { .. } => "checksum-format",
            Self::UnsupportedEntryType { .. } => "unsupported-entry-type",
            Self::Archive { .. } => "archive",
            Self::Config { .. } => "config",
            Self::Filesystem { .. } => "filesystem",
        }
    }
}

/// Attaches a message and path to raw I/O failures.
pub trait IoResultExt<T> {
    fn fs_context(self, message: &str, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn fs_context(self, message: &str, path: &Path) -> Result<T> {
        self.map_err(|source| Error::filesystem(message, path, source))
    }
}
