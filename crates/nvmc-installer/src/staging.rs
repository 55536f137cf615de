use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use nvmc_core::{IoResultExt, Result, VersionId};
use tracing::{debug, warn};

use crate::HomeLayout;

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Process-unique scratch directory for one install. Removed on drop, so
/// every exit path (including `?` and panics) cleans it up.
#[derive(Debug)]
pub(crate) struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    pub(crate) fn create(layout: &HomeLayout, version: &VersionId) -> Result<Self> {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        let path = layout.tmp_dir().join(format!(
            "install-{}-{}-{}-{}",
            version,
            std::process::id(),
            nanos,
            STAGING_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::create_dir_all(&path).fs_context("failed creating staging dir", &path)?;
        debug!(path = %path.display(), "created staging dir");
        Ok(Self { path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }
        if let Err(err) = fs::remove_dir_all(&self.path) {
            warn!(path = %self.path.display(), error = %err, "failed to clean up staging dir");
        }
    }
}
