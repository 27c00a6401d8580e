//! Presigned URL transfer tests

use std::time::Duration;

use axum::http::StatusCode;

use fndeploy::archive::{pack_directory, TransferClient, DEFAULT_MAX_UNPACK_BYTES};
use fndeploy::cancel::{CancelHandle, Cancellation};
use fndeploy::errors::DeployError;

use crate::support::{python_project, write_file, TransferServer};

fn client() -> TransferClient {
    TransferClient::new(Duration::from_secs(5)).unwrap()
}

/// Address that accepts connections and never answers
async fn silent_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_upload_sends_exact_bytes_and_length() {
    let server = TransferServer::start().await;
    let project = python_project();
    let archive = pack_directory(project.path()).unwrap();

    client()
        .upload(
            &archive,
            &format!("{}/upload/fn-1", server.base_url),
            &Cancellation::never(),
        )
        .await
        .unwrap();

    let stored = server.blobs.get("fn-1").unwrap();
    assert_eq!(stored, std::fs::read(archive.path()).unwrap());
    assert_eq!(server.blobs.content_lengths(), vec![Some(archive.size())]);
}

#[tokio::test]
async fn test_upload_streams_archive_larger_than_one_chunk() {
    let server = TransferServer::start().await;
    let project = python_project();
    // Incompressible bytes keep the archive well above a single read buffer.
    let mut seed = 0x2545_f491_u32;
    let noise: Vec<u8> = (0..1_500_000)
        .map(|_| {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            seed as u8
        })
        .collect();
    write_file(project.path(), "static/noise.bin", &noise);
    let archive = pack_directory(project.path()).unwrap();
    assert!(archive.size() > 1_000_000);

    client()
        .upload(
            &archive,
            &format!("{}/upload/fn-1", server.base_url),
            &Cancellation::never(),
        )
        .await
        .unwrap();

    assert_eq!(
        server.blobs.get("fn-1").unwrap(),
        std::fs::read(archive.path()).unwrap()
    );
    assert_eq!(server.blobs.content_lengths(), vec![Some(archive.size())]);
}

#[tokio::test]
async fn test_upload_rejected() {
    let server = TransferServer::start().await;
    server.blobs.fail_uploads_with(StatusCode::FORBIDDEN);
    let project = python_project();
    let archive = pack_directory(project.path()).unwrap();

    let err = client()
        .upload(
            &archive,
            &format!("{}/upload/fn-1", server.base_url),
            &Cancellation::never(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::UploadFailed { status: 403 }));
    assert!(server.blobs.get("fn-1").is_none());
}

#[tokio::test]
async fn test_download_extracts_into_directory() {
    let server = TransferServer::start().await;
    let project = python_project();
    let archive = pack_directory(project.path()).unwrap();
    server
        .blobs
        .put("fn-1", std::fs::read(archive.path()).unwrap());
    let out = tempfile::tempdir().unwrap();

    client()
        .download_and_extract(
            &format!("{}/download/fn-1", server.base_url),
            out.path(),
            DEFAULT_MAX_UNPACK_BYTES,
            &Cancellation::never(),
        )
        .await
        .unwrap();

    assert!(out.path().join("handler.py").is_file());
    assert!(out.path().join("lib/greet.py").is_file());
}

#[tokio::test]
async fn test_download_larger_than_limit_is_refused() {
    let server = TransferServer::start().await;
    server.blobs.put("fn-1", vec![0u8; 4096]);
    let out = tempfile::tempdir().unwrap();

    let err = client()
        .download_and_extract(
            &format!("{}/download/fn-1", server.base_url),
            out.path(),
            1024,
            &Cancellation::never(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::ArchiveTooLarge { limit: 1024 }));
}

#[tokio::test]
async fn test_download_checks_directory_before_requesting() {
    let out = tempfile::tempdir().unwrap();

    let err = client()
        .download_and_extract(
            "http://127.0.0.1:9/never-requested",
            &out.path().join("absent"),
            DEFAULT_MAX_UNPACK_BYTES,
            &Cancellation::never(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::DirectoryNotFound(_)));
}

#[tokio::test]
async fn test_cancel_pending_download() {
    let base_url = silent_server().await;
    let out = tempfile::tempdir().unwrap();
    let (handle, cancel) = CancelHandle::new();
    let client = client();
    let url = format!("{}/download/fn-1", base_url);

    let download = client.download_and_extract(
        &url,
        out.path(),
        DEFAULT_MAX_UNPACK_BYTES,
        &cancel,
    );
    let canceller = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    };

    let (result, ()) = tokio::join!(
        tokio::time::timeout(Duration::from_secs(5), download),
        canceller
    );
    let err = result.expect("cancellation should end the download").unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_cancelled_token_skips_upload() {
    let server = TransferServer::start().await;
    let project = python_project();
    let archive = pack_directory(project.path()).unwrap();
    let (handle, cancel) = CancelHandle::new();
    handle.cancel();

    let err = client()
        .upload(&archive, &format!("{}/upload/fn-1", server.base_url), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Cancelled));
    assert_eq!(server.blobs.upload_count(), 0);
}
