use std::path::PathBuf;

use super::*;

#[test]
fn normalize_prepends_v() {
    let version = normalize_version("18.12.0").expect("must normalize");
    assert_eq!(version.as_str(), "v18.12.0");
}

#[test]
fn normalize_lowercases_prefix_and_prerelease() {
    let version = normalize_version("V20.0.0-RC.1").expect("must normalize");
    assert_eq!(version.as_str(), "v20.0.0-rc.1");
}

#[test]
fn normalize_rejects_empty_input() {
    let err = normalize_version("").expect_err("empty version must fail");
    assert!(matches!(err, Error::InvalidVersion { .. }));
    assert!(err.to_string().contains("version is required"));
}

#[test]
fn normalize_rejects_path_separators() {
    for input in ["../etc", "18.2.0/bin", "..\\x", "18 2"] {
        let err = normalize_version(input).expect_err("malformed version must fail");
        assert_eq!(err.kind(), "invalid-version", "input: {input}");
    }
}

#[test]
fn normalize_is_idempotent() {
    for input in ["18.2.0", "v18.2.0", "V18.2.0", "lts", "VBAD", "v", "x1.0"] {
        let once = normalize_version(input).expect("must normalize");
        let twice = normalize_version(once.as_str()).expect("must normalize again");
        assert_eq!(once, twice, "input: {input}");
    }
}

#[test]
fn descriptor_for_linux_uses_tarball() {
    let version = normalize_version("18.2.0").expect("must normalize");
    let descriptor = InstallationDescriptor::for_platform(&version, &Platform::new("linux", "x64"));
    assert_eq!(
        descriptor.file_name_without_extension,
        "node-v18.2.0-linux-x64"
    );
    assert_eq!(
        descriptor.file_name_with_extension,
        "node-v18.2.0-linux-x64.tar.gz"
    );
    assert_eq!(descriptor.file_extension, ".tar.gz");
    assert_eq!(descriptor.archive_kind(), ArchiveKind::TarGz);
}

#[test]
fn descriptor_for_windows_uses_zip() {
    let version = normalize_version("20.1.0").expect("must normalize");
    let descriptor = InstallationDescriptor::for_platform(&version, &Platform::new("win", "x86"));
    assert_eq!(descriptor.file_name_with_extension, "node-v20.1.0-win-x86.zip");
    assert_eq!(descriptor.archive_kind(), ArchiveKind::Zip);
}

#[test]
fn host_platform_uses_distribution_names() {
    let platform = Platform::host();
    assert_ne!(platform.os(), "windows");
    assert_ne!(platform.os(), "macos");
    assert_ne!(platform.arch(), "x86_64");
    assert_ne!(platform.arch(), "aarch64");
    assert_eq!(platform.is_windows(), cfg!(windows));
}

#[test]
fn archive_kind_from_file_name() {
    assert_eq!(ArchiveKind::from_file_name("node.zip"), ArchiveKind::Zip);
    assert_eq!(ArchiveKind::from_file_name("NODE.ZIP"), ArchiveKind::Zip);
    assert_eq!(ArchiveKind::from_file_name("node.tar.gz"), ArchiveKind::TarGz);
    assert_eq!(ArchiveKind::from_file_name("node.tgz"), ArchiveKind::TarGz);
    assert_eq!(ArchiveKind::from_file_name("node"), ArchiveKind::TarGz);
}

#[test]
fn settings_defaults_when_fields_missing() {
    let settings = Settings::from_toml_str("").expect("empty settings must parse");
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.download_url, DEFAULT_DOWNLOAD_URL);
}

#[test]
fn settings_trim_trailing_slash() {
    let settings = Settings::from_toml_str(
        "download_url = \"https://mirror.example.test/node/\"\nskip_checksum = true\n",
    )
    .expect("settings must parse");
    assert_eq!(settings.download_url, "https://mirror.example.test/node");
    assert!(settings.skip_checksum);
}

#[test]
fn settings_reject_unknown_keys() {
    let err = Settings::from_toml_str("download_uri = \"x\"\n").expect_err("unknown key must fail");
    assert!(err.contains("download_uri"), "unexpected error: {err}");
}

#[test]
fn settings_reject_empty_download_url() {
    let err = Settings::from_toml_str("download_url = \"  \"\n").expect_err("empty url must fail");
    assert!(err.contains("must not be empty"));
}

#[test]
fn settings_env_override_wins() {
    let settings = Settings::default().with_env_overrides(|key| {
        (key == DOWNLOAD_URL_ENV).then(|| "http://127.0.0.1:8080/dist/".to_string())
    });
    assert_eq!(settings.download_url, "http://127.0.0.1:8080/dist");
}

#[test]
fn settings_ignore_blank_env_override() {
    let settings = Settings::default().with_env_overrides(|_| Some(" ".to_string()));
    assert_eq!(settings.download_url, DEFAULT_DOWNLOAD_URL);
}

#[test]
fn settings_load_missing_file_is_default() {
    let path = std::env::temp_dir().join(format!(
        "nvmc-core-missing-settings-{}.toml",
        std::process::id()
    ));
    let settings = Settings::load(&path).expect("missing file must load defaults");
    assert_eq!(settings, Settings::default());
}

#[test]
fn settings_load_reports_config_error_with_path() {
    let path = std::env::temp_dir().join(format!(
        "nvmc-core-bad-settings-{}.toml",
        std::process::id()
    ));
    std::fs::write(&path, "skip_checksum = \"yes\"\n").expect("must write fixture");

    let err = Settings::load(&path).expect_err("bad settings must fail");
    match &err {
        Error::Config { path: reported, .. } => assert_eq!(reported, &path),
        other => panic!("unexpected error: {other}"),
    }

    let _ = std::fs::remove_file(&path);
}

#[test]
fn fs_context_wraps_io_errors() {
    let path = PathBuf::from("/nonexistent/nvmc");
    let result: std::io::Result<()> = Err(std::io::Error::from(std::io::ErrorKind::NotFound));
    let err = result
        .fs_context("failed to read", &path)
        .expect_err("must map error");
    assert_eq!(err.kind(), "filesystem");
    assert_eq!(err.to_string(), "failed to read: /nonexistent/nvmc");
}
