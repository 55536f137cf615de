use std::path::PathBuf;

use nvmc_core::{Error, VersionId};

/// Outcome of the optional activation step that follows a commit.
#[derive(Debug)]
pub enum ActivationStatus {
    /// Another version is active and activation was not requested.
    Skipped,
    /// `implicit` is set when no version was active before the install.
    Activated { implicit: bool },
    /// The version is installed but the activation link was not updated.
    Failed(Error),
}

impl ActivationStatus {
    pub fn is_activated(&self) -> bool {
        matches!(self, Self::Activated { .. })
    }
}

/// A committed installation. Returned only after the version directory is in
/// place; activation problems are reported through `activation`.
#[derive(Debug)]
pub struct InstallReport {
    pub version: VersionId,
    pub version_dir: PathBuf,
    pub replaced_existing: bool,
    pub checksum_verified: bool,
    pub activation: ActivationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallReport {
    pub version: VersionId,
    pub version_dir: PathBuf,
    /// The activation link pointed at this version and now dangles.
    pub was_active: bool,
}
