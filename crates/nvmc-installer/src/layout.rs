use std::path::{Component, Path, PathBuf};

use nvmc_core::{Error, InstallationDescriptor, Platform, Result, VersionId, SETTINGS_FILE_NAME};

pub const HOME_ENV: &str = "NVMC_HOME";
pub const ACTIVATION_LINK_NAME: &str = "nodejs";

/// On-disk layout under the nvmc home directory.
///
/// Every component receives this value explicitly; nothing reads the home
/// directory from ambient state after it has been resolved once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeLayout {
    root: PathBuf,
    platform: Platform,
}

impl HomeLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_platform(root, Platform::host())
    }

    pub fn with_platform(root: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            root: root.into(),
            platform,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn version_dir(&self, version: &VersionId) -> PathBuf {
        self.versions_dir().join(version.as_str())
    }

    /// Directory the activation link points at. Windows distributions ship
    /// the executable at the top of the archive instead of under `bin`.
    pub fn executable_dir(&self, version: &VersionId) -> PathBuf {
        let version_dir = self.version_dir(version);
        if self.platform.is_windows() {
            version_dir
        } else {
            version_dir.join("bin")
        }
    }

    pub fn activation_link(&self) -> PathBuf {
        self.root.join(ACTIVATION_LINK_NAME)
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE_NAME)
    }

    pub fn descriptor(&self, version: &VersionId) -> InstallationDescriptor {
        InstallationDescriptor::for_platform(version, &self.platform)
    }
}

pub fn default_user_root() -> Result<PathBuf> {
    resolve_user_root(|key| std::env::var(key).ok())
}

/// `NVMC_HOME` when set, otherwise `.nvmc` under the user's home directory.
pub fn resolve_user_root<F>(lookup: F) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(home) = lookup(HOME_ENV).filter(|value| !value.is_empty()) {
        return Ok(clean_path(Path::new(&home)));
    }

    let home_var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
    let home = lookup(home_var)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::Config {
            path: PathBuf::from(home_var),
            message: format!("{home_var} is not set; cannot resolve nvmc home (set {HOME_ENV})"),
        })?;
    Ok(PathBuf::from(home).join(".nvmc"))
}

fn clean_path(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}
