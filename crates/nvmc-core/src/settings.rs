use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, IoResultExt, Result};

pub const DEFAULT_DOWNLOAD_URL: &str = "https://nodejs.org/dist";
pub const DOWNLOAD_URL_ENV: &str = "NVMC_DOWNLOAD_URL";
pub const SETTINGS_FILE_NAME: &str = "config.toml";

/// Persistent user settings read from `<root>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_download_url")]
    pub download_url: String,
    #[serde(default)]
    pub skip_checksum: bool,
    pub user_agent: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_url: default_download_url(),
            skip_checksum: false,
            user_agent: None,
        }
    }
}

fn default_download_url() -> String {
    DEFAULT_DOWNLOAD_URL.to_string()
}

impl Settings {
    pub fn from_toml_str(input: &str) -> std::result::Result<Self, String> {
        let mut settings: Self = toml::from_str(input).map_err(|err| err.to_string())?;
        if settings.download_url.trim().is_empty() {
            return Err("download_url must not be empty".to_string());
        }
        settings.download_url = trim_base_url(&settings.download_url);
        Ok(settings)
    }

    /// Loads settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(err).fs_context("failed to read settings", path),
        };
        Self::from_toml_str(&raw).map_err(|message| Error::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(DOWNLOAD_URL_ENV).filter(|value| !value.trim().is_empty()) {
            self.download_url = trim_base_url(&url);
        }
        self
    }
}

fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Knobs for one install run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Skip downloading and checking `SHASUMS256.txt`.
    pub skip_checksum: bool,
    /// Activate the version after committing it.
    pub activate: bool,
    /// Remove an existing installation of the same version first.
    pub force: bool,
}
