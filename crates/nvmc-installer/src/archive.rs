//! Archive extraction for the two distribution container formats.
//!
//! Entries are written one at a time: each output file is closed before the
//! next entry is read, and nothing but the archive's own read buffers is held
//! in memory.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use nvmc_core::{ArchiveKind, Error, IoResultExt, Result};
use tracing::debug;

use crate::fs_utils::{apply_mode, create_file_symlink};

/// A downloaded archive, tagged with its container format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveSource {
    TarGz(PathBuf),
    Zip(PathBuf),
}

impl ArchiveSource {
    /// Selects the variant from the file name: `.zip` is a zip archive and
    /// everything else is treated as a gzip-compressed tarball.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(ArchiveKind::from_file_name(&file_name), path)
    }

    pub fn new(kind: ArchiveKind, path: impl Into<PathBuf>) -> Self {
        match kind {
            ArchiveKind::Zip => Self::Zip(path.into()),
            ArchiveKind::TarGz => Self::TarGz(path.into()),
        }
    }

    pub fn kind(&self) -> ArchiveKind {
        match self {
            Self::TarGz(_) => ArchiveKind::TarGz,
            Self::Zip(_) => ArchiveKind::Zip,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::TarGz(path) | Self::Zip(path) => path,
        }
    }

    /// Unpacks every entry under `destination` and returns the destination
    /// joined with the top-level component of the first entry.
    pub fn extract(&self, destination: &Path) -> Result<PathBuf> {
        let mut sink = EntrySink::new(self.path(), destination);
        match self {
            Self::TarGz(path) => extract_tar_gz(path, &mut sink)?,
            Self::Zip(path) => extract_zip(path, &mut sink)?,
        }
        debug!(
            archive = %self.path().display(),
            kind = self.kind().as_str(),
            entries = sink.entries,
            "extracted archive"
        );
        sink.first_entry_root()
    }
}

pub fn extract_archive(archive_path: &Path, destination: &Path) -> Result<PathBuf> {
    ArchiveSource::from_path(archive_path).extract(destination)
}

/// Materializes entries under a destination root.
struct EntrySink<'a> {
    archive: &'a Path,
    destination: &'a Path,
    first_entry: Option<PathBuf>,
    entries: usize,
}

impl<'a> EntrySink<'a> {
    fn new(archive: &'a Path, destination: &'a Path) -> Self {
        Self {
            archive,
            destination,
            first_entry: None,
            entries: 0,
        }
    }

    /// Validates an archive-relative path and returns its destination path.
    /// Entries that name only the archive root (`./`) yield `None`.
    fn target(&mut self, raw: &Path) -> Result<Option<PathBuf>> {
        let mut relative = PathBuf::new();
        for component in raw.components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(Error::archive(
                        self.archive,
                        format!("entry '{}' escapes the extraction root", raw.display()),
                    ));
                }
            }
        }
        if relative.as_os_str().is_empty() {
            return Ok(None);
        }

        if self.first_entry.is_none() {
            self.first_entry = relative
                .components()
                .next()
                .map(|component| PathBuf::from(component.as_os_str()));
        }
        self.entries += 1;
        Ok(Some(self.destination.join(relative)))
    }

    fn directory(&self, path: &Path) -> Result<()> {
        self.reject_symlinked_ancestors(path)?;
        fs::create_dir_all(path).fs_context("failed to create directory", path)
    }

    fn file<R: Read>(&self, path: &Path, reader: &mut R, mode: Option<u32>) -> Result<()> {
        self.ensure_parent(path)?;
        // A later entry replaces an earlier symlink instead of writing through it.
        if fs::symlink_metadata(path).is_ok_and(|metadata| metadata.file_type().is_symlink()) {
            fs::remove_file(path).fs_context("failed to replace symlink", path)?;
        }
        {
            let mut file = File::create(path).fs_context("failed to create file", path)?;
            copy_entry(self.archive, path, reader, &mut file)?;
        }
        if let Some(mode) = mode {
            apply_mode(path, mode).fs_context("failed to set file mode", path)?;
        }
        Ok(())
    }

    fn symlink(&self, path: &Path, link_target: &Path) -> Result<()> {
        self.ensure_parent(path)?;
        create_file_symlink(link_target, path).fs_context("failed to create symlink", path)
    }

    fn ensure_parent(&self, path: &Path) -> Result<()> {
        match path.parent() {
            Some(parent) => self.directory(parent),
            None => Ok(()),
        }
    }

    /// Fails when `path` or any existing directory between the destination
    /// and `path` is a symlink, so no write can land outside the destination.
    fn reject_symlinked_ancestors(&self, path: &Path) -> Result<()> {
        let Ok(relative) = path.strip_prefix(self.destination) else {
            return Err(Error::archive(
                self.archive,
                format!("'{}' is outside the extraction root", path.display()),
            ));
        };

        let mut current = self.destination.to_path_buf();
        for component in relative.components() {
            current.push(component);
            match fs::symlink_metadata(&current) {
                Ok(metadata) if metadata.file_type().is_symlink() => {
                    return Err(Error::archive(
                        self.archive,
                        format!(
                            "entry '{}' passes through symlink '{}'",
                            relative.display(),
                            current.display()
                        ),
                    ));
                }
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => break,
                Err(err) => return Err(err).fs_context("failed to inspect path", &current),
            }
        }
        Ok(())
    }

    fn first_entry_root(&self) -> Result<PathBuf> {
        self.first_entry
            .as_ref()
            .map(|first| self.destination.join(first))
            .ok_or_else(|| Error::archive(self.archive, "archive contains no entries"))
    }
}

fn extract_tar_gz(archive_path: &Path, sink: &mut EntrySink<'_>) -> Result<()> {
    let file = File::open(archive_path).fs_context("failed to open archive", archive_path)?;
    let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    let entries = archive
        .entries()
        .map_err(|err| corrupt(archive_path, &err))?;

    for entry in entries {
        let mut entry = entry.map_err(|err| corrupt(archive_path, &err))?;
        let entry_type = entry.header().entry_type();
        if entry_type.is_pax_global_extensions() {
            continue;
        }

        let raw_path = entry
            .path()
            .map_err(|err| corrupt(archive_path, &err))?
            .into_owned();
        let Some(target) = sink.target(&raw_path)? else {
            continue;
        };

        if entry_type.is_dir() {
            sink.directory(&target)?;
        } else if entry_type.is_file() {
            let mode = entry.header().mode().ok();
            sink.file(&target, &mut entry, mode)?;
        } else if entry_type.is_symlink() {
            let link_target = entry
                .link_name()
                .map_err(|err| corrupt(archive_path, &err))?
                .ok_or_else(|| {
                    Error::archive(
                        archive_path,
                        format!("symlink entry '{}' has no target", raw_path.display()),
                    )
                })?
                .into_owned();
            sink.symlink(&target, &link_target)?;
        } else {
            return Err(Error::UnsupportedEntryType {
                entry_type: format!("{entry_type:?}"),
                path: raw_path,
            });
        }
    }
    Ok(())
}

fn extract_zip(archive_path: &Path, sink: &mut EntrySink<'_>) -> Result<()> {
    let file = File::open(archive_path).fs_context("failed to open archive", archive_path)?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .map_err(|err| Error::archive(archive_path, err.to_string()))?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|err| Error::archive(archive_path, err.to_string()))?;
        let raw_path = PathBuf::from(entry.name());
        let Some(target) = sink.target(&raw_path)? else {
            continue;
        };

        if entry.is_dir() {
            sink.directory(&target)?;
        } else {
            let mode = entry.unix_mode();
            sink.file(&target, &mut entry, mode)?;
        }
    }
    Ok(())
}

fn copy_entry<R: Read, W: Write>(
    archive: &Path,
    target: &Path,
    reader: &mut R,
    writer: &mut W,
) -> Result<()> {
    let mut buffer = [0_u8; 32 * 1024];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(corrupt(archive, &err)),
        };
        writer
            .write_all(&buffer[..read])
            .fs_context("failed to write extracted file", target)?;
    }
    writer.flush().fs_context("failed to write extracted file", target)
}

fn corrupt(archive: &Path, err: &io::Error) -> Error {
    Error::archive(archive, err.to_string())
}
