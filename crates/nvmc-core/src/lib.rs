mod archive;
mod descriptor;
mod error;
mod settings;
mod version;

pub use archive::ArchiveKind;
pub use descriptor::{InstallationDescriptor, Platform, RUNTIME_NAME};
pub use error::{Error, IoResultExt, Result};
pub use settings::{
    InstallOptions, Settings, DEFAULT_DOWNLOAD_URL, DOWNLOAD_URL_ENV, SETTINGS_FILE_NAME,
};
pub use version::{normalize_version, parse_semver, VersionId, VERSION_PREFIX};

#[cfg(test)]
mod tests;
