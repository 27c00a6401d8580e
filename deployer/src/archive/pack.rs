//! Directory packing

use std::fs;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::archive::{CodeArchive, DIGEST_ALGORITHM};
use crate::errors::DeployError;
use crate::utils::hex;

/// Pack a directory on the blocking thread pool
pub async fn create_code_archive(dir: impl Into<PathBuf>) -> Result<CodeArchive, DeployError> {
    let dir = dir.into();
    tokio::task::spawn_blocking(move || pack_directory(&dir)).await?
}

/// Pack every regular file below `root` into a temporary zip archive
///
/// Entries are stored under their root-relative path in sorted order with a
/// fixed timestamp, so the same tree always produces the same bytes.
pub fn pack_directory(root: &Path) -> Result<CodeArchive, DeployError> {
    let is_dir = fs::metadata(root).map(|m| m.is_dir()).unwrap_or(false);
    if !is_dir {
        return Err(DeployError::DirectoryNotFound(root.display().to_string()));
    }

    let root = root.canonicalize()?;
    let mut entries = Vec::new();
    collect_entries(&root, &root, &mut entries)?;

    let mut file = tempfile::Builder::new()
        .prefix("function-archive-")
        .suffix(".zip")
        .tempfile()?;

    {
        let mut writer = ZipWriter::new(file.as_file_mut());
        let options = entry_options();

        for entry in &entries {
            debug!("Adding {} to code archive", entry.name);
            writer.start_file(entry.name.as_str(), options)?;
            let mut source = fs::File::open(&entry.source)?;
            io::copy(&mut source, &mut writer)?;
        }

        writer.finish()?;
    }

    let handle = file.as_file_mut();
    handle.flush()?;
    let size = handle.metadata()?.len();

    handle.seek(SeekFrom::Start(0))?;
    let mut hasher = Sha256::new();
    io::copy(handle, &mut hasher)?;
    let digest = format!("{}:{}", DIGEST_ALGORITHM, hex::encode(hasher.finalize()));

    debug!(
        "Packed {} files from {} ({} bytes, {})",
        entries.len(),
        root.display(),
        size,
        digest
    );

    Ok(CodeArchive::new(file, size, digest))
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644)
}

struct Entry {
    /// Root-relative name with `/` separators
    name: String,
    /// Where to read the content from
    source: PathBuf,
}

fn collect_entries(root: &Path, dir: &Path, out: &mut Vec<Entry>) -> Result<(), DeployError> {
    let mut children = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    children.sort_by_key(|child| child.file_name());

    for child in children {
        let path = child.path();
        let file_type = child.file_type()?;

        if file_type.is_dir() {
            collect_entries(root, &path, out)?;
        } else if file_type.is_file() {
            out.push(Entry {
                name: entry_name(root, &path)?,
                source: path,
            });
        } else if file_type.is_symlink() {
            let target = path.canonicalize()?;
            if !target.starts_with(root) {
                return Err(DeployError::PathTraversalRejected(format!(
                    "{} points outside of {}",
                    path.display(),
                    root.display()
                )));
            }
            if target.is_dir() {
                debug!("Skipping directory symlink {}", path.display());
                continue;
            }
            out.push(Entry {
                name: entry_name(root, &path)?,
                source: target,
            });
        }
    }

    Ok(())
}

fn entry_name(root: &Path, path: &Path) -> Result<String, DeployError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| DeployError::PathTraversalRejected(path.display().to_string()))?;

    let parts = relative
        .components()
        .map(|c| {
            c.as_os_str().to_str().ok_or_else(|| {
                DeployError::Validation(format!("non UTF-8 file name: {}", path.display()))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(parts.join("/"))
}
