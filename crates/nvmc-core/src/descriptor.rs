use crate::archive::ArchiveKind;
use crate::version::VersionId;

pub const RUNTIME_NAME: &str = "node";

/// Host platform expressed in the distribution's naming scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    os: String,
    arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    pub fn host() -> Self {
        Self::new(
            dist_os(std::env::consts::OS),
            dist_arch(std::env::consts::ARCH),
        )
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn is_windows(&self) -> bool {
        self.os == "win"
    }

    pub fn archive_kind(&self) -> ArchiveKind {
        if self.is_windows() {
            ArchiveKind::Zip
        } else {
            ArchiveKind::TarGz
        }
    }
}

fn dist_os(os: &str) -> &str {
    match os {
        "windows" => "win",
        "macos" => "darwin",
        other => other,
    }
}

fn dist_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "x64",
        "x86" => "x86",
        "aarch64" => "arm64",
        "arm" => "armv7l",
        "powerpc64" => "ppc64le",
        other => other,
    }
}

/// File naming for one version on one platform. Derived on demand, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationDescriptor {
    pub file_name_with_extension: String,
    pub file_name_without_extension: String,
    pub file_extension: String,
}

impl InstallationDescriptor {
    pub fn for_platform(version: &VersionId, platform: &Platform) -> Self {
        let file_extension = platform.archive_kind().extension().to_string();
        let file_name_without_extension = format!(
            "{RUNTIME_NAME}-{version}-{}-{}",
            platform.os(),
            platform.arch()
        );
        let file_name_with_extension = format!("{file_name_without_extension}{file_extension}");
        Self {
            file_name_with_extension,
            file_name_without_extension,
            file_extension,
        }
    }

    pub fn archive_kind(&self) -> ArchiveKind {
        ArchiveKind::from_file_name(&self.file_name_with_extension)
    }
}
