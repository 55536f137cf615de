mod activate;
mod archive;
mod catalog;
mod fetch;
mod fs_utils;
mod install;
mod layout;
mod staging;
mod types;
mod uninstall;

pub use activate::{activate, activate_version, ActivationLink};
pub use archive::{extract_archive, ArchiveSource};
pub use catalog::{current_version, installed_version_names, list_versions, ListedVersion};
pub use fetch::{default_user_agent, download, Fetch, HttpFetcher, ProgressFn, MAX_REDIRECTS};
pub use install::Installer;
pub use layout::{
    default_user_root, resolve_user_root, HomeLayout, ACTIVATION_LINK_NAME, HOME_ENV,
};
pub use types::{ActivationStatus, InstallReport, UninstallReport};
pub use uninstall::uninstall;
