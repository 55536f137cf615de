use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use nvmc_core::{
    Error, InstallOptions, InstallationDescriptor, IoResultExt, Result, VersionId,
};
use nvmc_security::{verify_manifest_entry, CHECKSUM_MANIFEST_NAME};
use tracing::{debug, info, warn};

use crate::activate::activate_version;
use crate::archive::ArchiveSource;
use crate::catalog::current_version;
use crate::fetch::Fetch;
use crate::fs_utils::path_exists;
use crate::staging::StagingDir;
use crate::{ActivationStatus, HomeLayout, InstallReport};

const PREVIOUS_INSTALL_DIR: &str = "previous";

/// Download, verify, extract and commit pipeline for one version.
pub struct Installer<'a, F: Fetch> {
    layout: &'a HomeLayout,
    fetcher: &'a F,
    download_url: String,
}

impl<'a, F: Fetch> Installer<'a, F> {
    pub fn new(layout: &'a HomeLayout, fetcher: &'a F, download_url: impl Into<String>) -> Self {
        Self {
            layout,
            fetcher,
            download_url: download_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn archive_url(&self, version: &VersionId, descriptor: &InstallationDescriptor) -> String {
        format!(
            "{}/{}/{}",
            self.download_url, version, descriptor.file_name_with_extension
        )
    }

    pub fn checksum_url(&self, version: &VersionId) -> String {
        format!("{}/{}/{}", self.download_url, version, CHECKSUM_MANIFEST_NAME)
    }

    /// Installs `version`.
    ///
    /// An `Err` means nothing was committed under the versions root. Once the
    /// version directory is in place the call returns `Ok`, with any
    /// activation failure carried in [`InstallReport::activation`].
    pub fn install(&self, version: &str, options: InstallOptions) -> Result<InstallReport> {
        let version = VersionId::normalize(version)?;
        let descriptor = self.layout.descriptor(&version);
        let version_dir = self.layout.version_dir(&version);

        let replace_existing =
            path_exists(&version_dir).fs_context("failed to inspect version dir", &version_dir)?;
        if replace_existing && !options.force {
            return Err(Error::AlreadyInstalled {
                version: version.to_string(),
                path: version_dir,
            });
        }

        let staging = StagingDir::create(self.layout, &version)?;

        let archive_path = staging.path().join(&descriptor.file_name_with_extension);
        let mut archive = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&archive_path)
            .fs_context("failed to create archive file", &archive_path)?;
        let archive_url = self.archive_url(&version, &descriptor);
        info!(%version, url = %archive_url, "downloading");
        self.fetcher.fetch(&archive_url, &mut archive)?;

        if !options.skip_checksum {
            self.verify_archive(&version, &descriptor, staging.path(), &mut archive, &archive_path)?;
        }
        drop(archive);

        let extracted =
            ArchiveSource::new(descriptor.archive_kind(), &archive_path).extract(staging.path())?;
        let installed_root =
            select_installed_root(staging.path(), &descriptor, &extracted, &archive_path)?;

        self.commit(staging.path(), &installed_root, &version_dir, replace_existing)?;
        info!(%version, path = %version_dir.display(), "installed");
        drop(staging);

        let activation = self.activate_after_commit(&version, options.activate);
        Ok(InstallReport {
            version,
            version_dir,
            replaced_existing: replace_existing,
            checksum_verified: !options.skip_checksum,
            activation,
        })
    }

    fn verify_archive(
        &self,
        version: &VersionId,
        descriptor: &InstallationDescriptor,
        staging: &Path,
        archive: &mut File,
        archive_path: &Path,
    ) -> Result<()> {
        let manifest_path = staging.join(CHECKSUM_MANIFEST_NAME);
        let manifest = {
            let mut manifest_file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(&manifest_path)
                .fs_context("failed to create checksum manifest", &manifest_path)?;
            self.fetcher
                .fetch(&self.checksum_url(version), &mut manifest_file)?;
            manifest_file
                .seek(SeekFrom::Start(0))
                .fs_context("failed to rewind checksum manifest", &manifest_path)?;
            let mut manifest = String::new();
            manifest_file
                .read_to_string(&mut manifest)
                .fs_context("failed to read checksum manifest", &manifest_path)?;
            manifest
        };

        archive
            .flush()
            .fs_context("failed to flush archive", archive_path)?;
        archive
            .seek(SeekFrom::Start(0))
            .fs_context("failed to rewind archive", archive_path)?;
        verify_manifest_entry(
            &manifest,
            &descriptor.file_name_with_extension,
            &mut BufReader::new(&mut *archive),
        )?;
        archive
            .seek(SeekFrom::Start(0))
            .fs_context("failed to rewind archive", archive_path)?;
        info!(%version, "checksum verified");
        Ok(())
    }

    fn commit(
        &self,
        staging: &Path,
        installed_root: &Path,
        version_dir: &Path,
        replace_existing: bool,
    ) -> Result<()> {
        let versions_dir = self.layout.versions_dir();
        fs::create_dir_all(&versions_dir).fs_context("failed to create versions dir", &versions_dir)?;

        let backup = replace_existing.then(|| staging.join(PREVIOUS_INSTALL_DIR));
        swap_into_place(installed_root, version_dir, backup.as_deref())
    }

    fn activate_after_commit(&self, version: &VersionId, requested: bool) -> ActivationStatus {
        let implicit = if requested {
            false
        } else {
            match current_version(self.layout) {
                Ok(Some(_)) => return ActivationStatus::Skipped,
                Ok(None) => {
                    info!(%version, "no active version; activating");
                    true
                }
                Err(err) => {
                    warn!(
                        %version,
                        kind = err.kind(),
                        error = %err,
                        "could not read activation link"
                    );
                    return ActivationStatus::Failed(err);
                }
            }
        };

        match activate_version(self.layout, version) {
            Ok(()) => ActivationStatus::Activated { implicit },
            Err(err) => {
                warn!(
                    %version,
                    kind = err.kind(),
                    error = %err,
                    "installed but activation failed"
                );
                ActivationStatus::Failed(err)
            }
        }
    }
}

/// Renames `installed_root` to `version_dir`.
///
/// With a `backup` path the existing `version_dir` is moved there first and
/// moved back when the final rename fails, so the versions root only ever
/// holds the old tree or the new one.
pub(crate) fn swap_into_place(
    installed_root: &Path,
    version_dir: &Path,
    backup: Option<&Path>,
) -> Result<()> {
    if let Some(backup) = backup {
        debug!(path = %version_dir.display(), "moving existing installation aside");
        fs::rename(version_dir, backup)
            .fs_context("failed to move existing installation aside", version_dir)?;
    }

    let moved = fs::rename(installed_root, version_dir)
        .fs_context("failed to move installation into place", version_dir);
    if moved.is_err() {
        if let Some(backup) = backup {
            if let Err(err) = fs::rename(backup, version_dir) {
                warn!(
                    path = %version_dir.display(),
                    backup = %backup.display(),
                    error = %err,
                    "failed to restore previous installation"
                );
            }
        }
    }
    moved
}

/// Picks the extracted directory to commit: the conventional
/// `<file name without extension>` directory, else the first archive entry.
fn select_installed_root(
    staging: &Path,
    descriptor: &InstallationDescriptor,
    first_entry: &Path,
    archive_path: &Path,
) -> Result<PathBuf> {
    let expected = staging.join(&descriptor.file_name_without_extension);
    if expected.is_dir() {
        return Ok(expected);
    }

    if first_entry != archive_path && first_entry.is_dir() {
        warn!(
            expected = %expected.display(),
            found = %first_entry.display(),
            "archive top-level directory does not follow the naming convention"
        );
        return Ok(first_entry.to_path_buf());
    }

    Err(Error::archive(
        archive_path,
        format!(
            "archive does not contain the top-level directory '{}'",
            descriptor.file_name_without_extension
        ),
    ))
}
