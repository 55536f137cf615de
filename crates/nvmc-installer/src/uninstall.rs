use std::fs;
use std::io;

use nvmc_core::{Error, IoResultExt, Result, VersionId};
use tracing::{info, warn};

use crate::catalog::current_version;
use crate::{HomeLayout, UninstallReport};

/// Removes an installed version's directory tree.
///
/// The activation link is left alone even when it points into the removed
/// tree; `UninstallReport::was_active` tells the caller it now dangles.
pub fn uninstall(layout: &HomeLayout, version: &str) -> Result<UninstallReport> {
    let version = VersionId::normalize(version)?;
    let version_dir = layout.version_dir(&version);

    let metadata = match fs::symlink_metadata(&version_dir) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(Error::NotInstalled {
                version: version.to_string(),
                path: version_dir,
            })
        }
        Err(err) => return Err(err).fs_context("failed to inspect version dir", &version_dir),
    };
    if !metadata.is_dir() {
        return Err(Error::filesystem(
            "version path exists and is not a directory",
            &version_dir,
            io::Error::new(io::ErrorKind::AlreadyExists, "not a directory"),
        ));
    }

    let was_active = match current_version(layout) {
        Ok(current) => current.as_ref() == Some(&version),
        Err(err) => {
            warn!(error = %err, "could not read activation link");
            false
        }
    };

    fs::remove_dir_all(&version_dir).fs_context("failed to remove version dir", &version_dir)?;
    info!(%version, was_active, "uninstalled");

    Ok(UninstallReport {
        version,
        version_dir,
        was_active,
    })
}
