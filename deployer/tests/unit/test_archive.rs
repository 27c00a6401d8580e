//! Code archive tests

use std::io::Write;
use std::path::Path;

use tokio_test::assert_err;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use fndeploy::archive::{create_code_archive, pack_directory, unpack_archive, DEFAULT_MAX_UNPACK_BYTES};
use fndeploy::errors::DeployError;

use crate::support::{python_project, write_file};

/// Write a zip holding `entries` as is, without any name checks
fn handwritten_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let mut writer = ZipWriter::new(std::fs::File::create(path).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, contents) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap();
}

#[test]
fn test_default_limit_is_100_mib() {
    assert_eq!(DEFAULT_MAX_UNPACK_BYTES, 104_857_600);
}

#[tokio::test]
async fn test_pack_then_unpack_restores_the_tree() {
    let project = python_project();
    let archive = create_code_archive(project.path()).await.unwrap();
    assert!(archive.digest().starts_with("sha256:"));
    assert_eq!(
        archive.size(),
        std::fs::metadata(archive.path()).unwrap().len()
    );

    let out = tempfile::tempdir().unwrap();
    unpack_archive(archive.path(), out.path(), DEFAULT_MAX_UNPACK_BYTES).unwrap();

    for name in ["handler.py", "lib/greet.py", "static/payload.txt"] {
        assert_eq!(
            std::fs::read(out.path().join(name)).unwrap(),
            std::fs::read(project.path().join(name)).unwrap(),
            "{name}"
        );
    }
}

#[test]
fn test_digest_is_stable_and_content_sensitive() {
    let project = python_project();
    let first = pack_directory(project.path()).unwrap();
    let second = pack_directory(project.path()).unwrap();
    assert_eq!(first.digest(), second.digest());
    assert!(first.compare_digest(second.digest()));

    write_file(project.path(), "handler.py", b"def handle(event, context):\n    return {}\n");
    let changed = pack_directory(project.path()).unwrap();
    assert_ne!(first.digest(), changed.digest());
}

#[test]
fn test_digest_ignores_file_times() {
    let project = python_project();
    let first = pack_directory(project.path()).unwrap();

    std::thread::sleep(std::time::Duration::from_millis(1100));
    let contents = std::fs::read(project.path().join("lib/greet.py")).unwrap();
    write_file(project.path(), "lib/greet.py", &contents);

    let second = pack_directory(project.path()).unwrap();
    assert_eq!(first.digest(), second.digest());
}

#[test]
fn test_parent_traversal_is_rejected() {
    let work = tempfile::tempdir().unwrap();
    let zip_path = work.path().join("evil.zip");
    handwritten_zip(&zip_path, &[("../../etc/passwd", &b"root:x:0:0"[..])]);

    let dest = work.path().join("out");
    std::fs::create_dir(&dest).unwrap();

    let err = unpack_archive(&zip_path, &dest, DEFAULT_MAX_UNPACK_BYTES).unwrap_err();
    assert!(matches!(err, DeployError::PathTraversalRejected(ref name) if name == "../../etc/passwd"));
    assert!(!work.path().join("etc").exists());
}

#[test]
fn test_absolute_entry_is_rejected() {
    let work = tempfile::tempdir().unwrap();
    let zip_path = work.path().join("evil.zip");
    handwritten_zip(&zip_path, &[("/tmp/evil.sh", &b"#!/bin/sh"[..])]);

    let dest = work.path().join("out");
    std::fs::create_dir(&dest).unwrap();

    let result = unpack_archive(&zip_path, &dest, DEFAULT_MAX_UNPACK_BYTES);
    let err = assert_err!(result);
    assert!(matches!(err, DeployError::PathTraversalRejected(_)));
}

#[test]
fn test_extraction_stops_at_first_bad_entry() {
    let work = tempfile::tempdir().unwrap();
    let zip_path = work.path().join("mixed.zip");
    handwritten_zip(
        &zip_path,
        &[
            ("first.txt", &b"kept"[..]),
            ("../escape.txt", &b"nope"[..]),
            ("last.txt", &b"never written"[..]),
        ],
    );

    let dest = work.path().join("out");
    std::fs::create_dir(&dest).unwrap();

    let err = unpack_archive(&zip_path, &dest, DEFAULT_MAX_UNPACK_BYTES).unwrap_err();
    assert!(matches!(err, DeployError::PathTraversalRejected(_)));
    assert_eq!(std::fs::read(dest.join("first.txt")).unwrap(), b"kept");
    assert!(!dest.join("last.txt").exists());
    assert!(!work.path().join("escape.txt").exists());
}

#[test]
fn test_highly_compressed_archive_is_capped() {
    let work = tempfile::tempdir().unwrap();
    let zip_path = work.path().join("bomb.zip");
    let zeros = vec![0u8; 2 * 1024 * 1024];
    handwritten_zip(&zip_path, &[("zeros.bin", &zeros[..])]);
    assert!(std::fs::metadata(&zip_path).unwrap().len() < 64 * 1024);

    let dest = work.path().join("out");
    std::fs::create_dir(&dest).unwrap();

    let result = unpack_archive(&zip_path, &dest, 1024 * 1024);
    let err = assert_err!(result);
    assert!(matches!(err, DeployError::ArchiveTooLarge { limit: 1_048_576 }));
}

#[test]
fn test_limit_counts_all_entries() {
    let work = tempfile::tempdir().unwrap();
    let zip_path = work.path().join("many.zip");
    let chunk = vec![b'x'; 600];
    handwritten_zip(&zip_path, &[("a.txt", &chunk[..]), ("b.txt", &chunk[..])]);

    let dest = work.path().join("out");
    std::fs::create_dir(&dest).unwrap();

    let err = unpack_archive(&zip_path, &dest, 1000).unwrap_err();
    assert!(matches!(err, DeployError::ArchiveTooLarge { limit: 1000 }));
    assert!(dest.join("a.txt").exists());
}

#[test]
fn test_missing_destination() {
    let project = python_project();
    let archive = pack_directory(project.path()).unwrap();
    let work = tempfile::tempdir().unwrap();

    let err = unpack_archive(archive.path(), &work.path().join("absent"), DEFAULT_MAX_UNPACK_BYTES)
        .unwrap_err();
    assert!(matches!(err, DeployError::DirectoryNotFound(_)));
}
