use crate::error::{ArchiveError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Suffix of in-flight downloads
pub const PARTIAL_SUFFIX: &str = ".part";

/// Fetches a media payload into a local file
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download `url` into `destination`, returning the number of bytes written.
    ///
    /// On failure `destination` is left untouched.
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64>;
}

/// Paced HTTP downloader writing through a temporary `.part` file
#[derive(Clone)]
pub struct Downloader {
    client: Client,
    delay: Duration,
}

impl Downloader {
    pub fn new(client: Client, delay: Duration) -> Self {
        Self { client, delay }
    }

    async fn stream_to(&self, url: &str, partial: &Path) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ArchiveError::download(url, e))?;

        if !response.status().is_success() {
            return Err(ArchiveError::download(url, format!("HTTP {}", response.status())));
        }

        let mut file = File::create(partial).await?;
        let mut stream = response.bytes_stream();
        let mut total_bytes = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ArchiveError::download(url, e))?;
            file.write_all(&chunk).await?;
            total_bytes += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;

        Ok(total_bytes)
    }
}

#[async_trait]
impl MediaFetcher for Downloader {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let partial = partial_path(destination);

        match self.stream_to(url, &partial).await {
            Ok(total_bytes) => {
                if let Err(e) = fs::rename(&partial, destination).await {
                    fs::remove_file(&partial).await.ok();
                    return Err(e.into());
                }
                debug!("Stored {} bytes at {}", total_bytes, destination.display());
                Ok(total_bytes)
            }
            Err(e) => {
                fs::remove_file(&partial).await.ok();
                Err(e)
            }
        }
    }
}

/// Sibling path used while a download is in flight
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    destination.with_file_name(name)
}
