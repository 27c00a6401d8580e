//! Archive upload and download through presigned URLs

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{header, Body, Client, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::archive::{unpack_archive, CodeArchive};
use crate::cancel::Cancellation;
use crate::errors::DeployError;
use crate::utils::user_agent;

/// HTTP client for presigned archive URLs
///
/// Kept apart from the API client: presigned URLs carry their own
/// credentials and must not receive the API auth header.
#[derive(Debug, Clone)]
pub struct TransferClient {
    client: Client,
}

impl TransferClient {
    /// Create a new transfer client
    pub fn new(connect_timeout: Duration) -> Result<Self, DeployError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(user_agent())
            .build()?;

        Ok(Self { client })
    }

    /// PUT the archive to a presigned URL
    ///
    /// The file is streamed from disk. Content-Length is always set
    /// explicitly since upload endpoints reject chunked transfers.
    pub async fn upload(
        &self,
        archive: &CodeArchive,
        url: &str,
        cancel: &Cancellation,
    ) -> Result<(), DeployError> {
        debug!("PUT code archive ({} bytes)", archive.size());

        let file = cancel
            .run(async { Ok::<_, DeployError>(tokio::fs::File::open(archive.path()).await?) })
            .await?;

        let response = cancel
            .run(async {
                Ok::<_, DeployError>(self
                    .client
                    .put(url)
                    .header(header::CONTENT_TYPE, "application/octet-stream")
                    .header(header::CONTENT_LENGTH, archive.size())
                    .body(Body::from(file))
                    .send()
                    .await?)
            })
            .await?;

        if response.status() != StatusCode::OK {
            let status = response.status();
            error!("Code archive upload failed: {}", status);
            return Err(DeployError::UploadFailed {
                status: status.as_u16(),
            });
        }

        info!("Uploaded code archive ({} bytes)", archive.size());
        Ok(())
    }

    /// GET an archive from a presigned URL and extract it into `to_dir`
    ///
    /// The download is spooled to a temporary file first; more than
    /// `max_bytes` of compressed data is refused outright.
    pub async fn download_and_extract(
        &self,
        url: &str,
        to_dir: &Path,
        max_bytes: u64,
        cancel: &Cancellation,
    ) -> Result<(), DeployError> {
        let is_dir = tokio::fs::metadata(to_dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(DeployError::DirectoryNotFound(to_dir.display().to_string()));
        }

        debug!("GET code archive");
        let mut response = cancel
            .run(async { Ok::<_, DeployError>(self.client.get(url).send().await?) })
            .await?;

        if response.status() != StatusCode::OK {
            let status = response.status();
            error!("Code archive download failed: {}", status);
            return Err(DeployError::DownloadFailed {
                status: status.as_u16(),
            });
        }

        let spool = tempfile::Builder::new()
            .prefix("function-download-")
            .suffix(".zip")
            .tempfile()?;
        let mut out = tokio::fs::File::from_std(spool.reopen()?);
        let mut received: u64 = 0;

        while let Some(chunk) = cancel
            .run(async { Ok::<_, DeployError>(response.chunk().await?) })
            .await?
        {
            received += chunk.len() as u64;
            if received > max_bytes {
                return Err(DeployError::ArchiveTooLarge { limit: max_bytes });
            }
            out.write_all(&chunk).await?;
        }
        out.flush().await?;
        drop(out);

        info!("Downloaded code archive ({} bytes)", received);

        let to_dir: PathBuf = to_dir.to_path_buf();
        tokio::task::spawn_blocking(move || unpack_archive(spool.path(), &to_dir, max_bytes))
            .await?
    }
}
