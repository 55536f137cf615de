use std::io::{self, Read};

use nvmc_core::{Error, Result};
use sha2::{Digest, Sha256};
use tracing::debug;

pub const CHECKSUM_MANIFEST_NAME: &str = "SHASUMS256.txt";

const SHA256_HEX_LEN: usize = 64;

pub fn sha256_reader<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 64 * 1024];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Finds the digest recorded for `file_name` in a `SHASUMS256.txt` style
/// manifest (`<hex>  <file>` per line, optional `*` binary marker).
pub fn find_manifest_digest(manifest: &str, file_name: &str) -> Result<String> {
    let mut malformed = None;
    for line in manifest
        .lines()
        .map(str::trim)
        .filter(|line| line.ends_with(file_name))
    {
        let mut fields = line.split_whitespace();
        let digest = fields.next().unwrap_or_default();
        let listed_name = fields.next().map(|name| name.trim_start_matches('*'));
        if listed_name != Some(file_name) || fields.next().is_some() {
            malformed.get_or_insert(line);
            continue;
        }
        if digest.len() != SHA256_HEX_LEN || !digest.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(format_error(
                file_name,
                &format!("manifest digest '{digest}' is not a sha256 hex string"),
            ));
        }
        return Ok(digest.to_ascii_lowercase());
    }

    match malformed {
        Some(line) => Err(format_error(
            file_name,
            &format!("malformed manifest line '{line}'"),
        )),
        None => Err(format_error(file_name, "no manifest entry for file")),
    }
}

/// Hashes `archive` and compares it against the manifest entry for
/// `file_name`.
pub fn verify_manifest_entry<R: Read>(manifest: &str, file_name: &str, archive: &mut R) -> Result<()> {
    let expected = find_manifest_digest(manifest, file_name)?;
    let actual = sha256_reader(archive).map_err(|source| Error::Filesystem {
        message: "failed to hash downloaded archive".to_string(),
        path: file_name.into(),
        source,
    })?;

    if !digests_match(&expected, &actual) {
        return Err(Error::ChecksumMismatch {
            file_name: file_name.to_string(),
            expected,
            actual,
        });
    }

    debug!(file_name, digest = %actual, "checksum verified");
    Ok(())
}

fn digests_match(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}

fn format_error(file_name: &str, reason: &str) -> Error {
    Error::ChecksumFormat {
        file_name: file_name.to_string(),
        reason: reason.to_string(),
    }
}
