use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use nvmc_core::{Error, IoResultExt, Result, VersionId};
use tracing::info;

use crate::fs_utils::{create_dir_symlink, remove_symlink_if_exists};
use crate::HomeLayout;

/// The single link that designates the active version.
///
/// Replacement removes the old link before creating the new one, so a
/// concurrent reader can briefly observe no active version.
#[derive(Debug, Clone)]
pub struct ActivationLink<'a> {
    layout: &'a HomeLayout,
}

impl<'a> ActivationLink<'a> {
    pub fn new(layout: &'a HomeLayout) -> Self {
        Self { layout }
    }

    pub fn path(&self) -> PathBuf {
        self.layout.activation_link()
    }

    /// Version the link currently points at, or `None` when there is no link.
    /// A link whose target has since been removed still reports its version.
    pub fn read(&self) -> Result<Option<VersionId>> {
        let link = self.path();
        let target = match fs::read_link(&link) {
            Ok(target) => target,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err).fs_context("failed to read activation link", &link),
        };

        let name = self.version_component(&target).ok_or_else(|| {
            Error::filesystem(
                "activation link target does not name a version",
                &target,
                io::Error::new(io::ErrorKind::InvalidData, "unexpected link target"),
            )
        })?;
        VersionId::normalize(&name).map(Some)
    }

    pub fn replace(&self, version: &VersionId) -> Result<()> {
        let link = self.path();
        remove_symlink_if_exists(&link).fs_context("failed to remove activation link", &link)?;
        let target = self.layout.executable_dir(version);
        create_dir_symlink(&target, &link).fs_context("failed to create activation link", &link)
    }

    fn version_component(&self, target: &Path) -> Option<String> {
        if let Ok(relative) = target.strip_prefix(self.layout.versions_dir()) {
            if let Some(Component::Normal(name)) = relative.components().next() {
                return Some(name.to_string_lossy().into_owned());
            }
        }

        // Targets outside the versions root: the version is the directory
        // holding the executable dir (or the executable dir itself on Windows).
        let version_dir = if self.layout.platform().is_windows() {
            target
        } else {
            target.parent()?
        };
        version_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

/// Points the activation link at an installed version.
pub fn activate(layout: &HomeLayout, version: &str) -> Result<VersionId> {
    let version = VersionId::normalize(version)?;
    activate_version(layout, &version)?;
    Ok(version)
}

pub fn activate_version(layout: &HomeLayout, version: &VersionId) -> Result<()> {
    let version_dir = layout.version_dir(version);
    let metadata = match fs::metadata(&version_dir) {
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

    ActivationLink::new(layout).replace(version)?;
    info!(%version, "activated");
    Ok(())
}
