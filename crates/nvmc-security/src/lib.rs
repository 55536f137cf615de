mod checksum;

pub use checksum::{
    find_manifest_digest, sha256_reader, verify_manifest_entry, CHECKSUM_MANIFEST_NAME,
};
