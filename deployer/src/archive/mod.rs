//! Code archives
//!
//! Packing a directory into a zip, extracting one back under path and size
//! limits, and moving archives to and from presigned URLs.

pub mod pack;
pub mod transfer;
pub mod unpack;

use std::path::Path;

use tempfile::NamedTempFile;

pub use pack::{create_code_archive, pack_directory};
pub use transfer::TransferClient;
pub use unpack::{unpack_archive, DEFAULT_MAX_UNPACK_BYTES};

/// Name of the hash algorithm prefixed to every digest
pub const DIGEST_ALGORITHM: &str = "sha256";

/// A sealed archive of a function's source directory
///
/// The backing temporary file is removed when the value is dropped.
#[derive(Debug)]
pub struct CodeArchive {
    file: NamedTempFile,
    size: u64,
    digest: String,
}

impl CodeArchive {
    pub(crate) fn new(file: NamedTempFile, size: u64, digest: String) -> Self {
        Self { file, size, digest }
    }

    /// Location of the archive on disk
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Size of the archive in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Content digest, e.g. `sha256:4a5c…`
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Whether a previously recorded digest matches this archive
    pub fn compare_digest(&self, other: &str) -> bool {
        self.digest == other
    }
}
