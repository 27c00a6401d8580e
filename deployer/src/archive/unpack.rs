//! Archive extraction under path and size limits

use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::errors::DeployError;

/// Ceiling on the total decompressed size of an archive (100 MiB)
pub const DEFAULT_MAX_UNPACK_BYTES: u64 = 100 * 1024 * 1024;

/// Extract `archive_path` into the existing directory `dest`
///
/// Entries that would land outside `dest` are rejected, and extraction fails
/// once the decompressed total exceeds `max_total_bytes`. Extraction stops at
/// the first failing entry; files written before it are left in place.
pub fn unpack_archive(
    archive_path: &Path,
    dest: &Path,
    max_total_bytes: u64,
) -> Result<(), DeployError> {
    let is_dir = fs::metadata(dest).map(|m| m.is_dir()).unwrap_or(false);
    if !is_dir {
        return Err(DeployError::DirectoryNotFound(dest.display().to_string()));
    }
    let dest = dest.canonicalize()?;

    let mut archive = ZipArchive::new(fs::File::open(archive_path)?)?;
    let mut total: u64 = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();

        let relative = entry
            .enclosed_name()
            .filter(|p| p.components().all(|c| matches!(c, Component::Normal(_))))
            .ok_or_else(|| DeployError::PathTraversalRejected(name.clone()))?;

        if entry.is_dir() {
            ensure_dir_within(&dest, &relative)?;
            continue;
        }

        let Some(file_name) = relative.file_name() else {
            return Err(DeployError::PathTraversalRejected(name));
        };
        let parent = match relative.parent() {
            Some(parent) => ensure_dir_within(&dest, parent)?,
            None => dest.clone(),
        };
        let target = parent.join(file_name);

        if let Ok(meta) = fs::symlink_metadata(&target) {
            if meta.file_type().is_symlink() {
                return Err(DeployError::PathTraversalRejected(format!(
                    "{} would overwrite a symlink",
                    name
                )));
            }
        }

        // The declared size is only a hint, the copy below enforces the limit.
        if total.saturating_add(entry.size()) > max_total_bytes {
            warn!("Archive entry {} exceeds the extraction limit", name);
            return Err(DeployError::ArchiveTooLarge {
                limit: max_total_bytes,
            });
        }

        let remaining = max_total_bytes - total;
        let mut out = fs::File::create(&target)?;
        let written = io::copy(&mut (&mut entry).take(remaining.saturating_add(1)), &mut out)?;
        total += written;

        if total > max_total_bytes {
            warn!("Archive expanded past the extraction limit at {}", name);
            return Err(DeployError::ArchiveTooLarge {
                limit: max_total_bytes,
            });
        }

        debug!("Extracted {} ({} bytes)", name, written);
    }

    Ok(())
}

/// Create `relative` below `root` one component at a time, refusing to walk
/// through symlinks or non-directories.
fn ensure_dir_within(root: &Path, relative: &Path) -> Result<PathBuf, DeployError> {
    let mut current = root.to_path_buf();

    for component in relative.components() {
        let Component::Normal(part) = component else {
            return Err(DeployError::PathTraversalRejected(
                relative.display().to_string(),
            ));
        };
        current.push(part);

        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(DeployError::PathTraversalRejected(format!(
                    "{} is a symlink",
                    current.display()
                )));
            }
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(DeployError::Io(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} exists and is not a directory", current.display()),
                )));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => fs::create_dir(&current)?,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(current)
}
