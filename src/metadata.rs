use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// A committed sound: downloaded in this run or already present on disk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchiveRecord {
    /// Run-wide position of the descriptor this record came from
    pub index: u64,
    pub title: String,
    pub filename: String,
    /// Source URL of the media
    pub url: String,
    /// Size on disk in bytes
    pub size: u64,
    /// Playback length in seconds, when the probe could measure it
    pub duration: Option<f64>,
}

/// JSON sidecar holding every record of the run.
///
/// Each save rewrites the whole document through a temporary file, so the
/// file on disk is always a complete array.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the metadata file with `records`
    pub async fn save(&self, records: &[ArchiveRecord]) -> Result<()> {
        let json_content = serde_json::to_string_pretty(records)?;

        let temp_path = self.temp_path();
        if let Err(e) = write_synced(&temp_path, json_content.as_bytes()).await {
            fs::remove_file(&temp_path).await.ok();
            return Err(e);
        }
        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            fs::remove_file(&temp_path).await.ok();
            return Err(e.into());
        }

        debug!("💾 Saved {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    /// Read the records back; a missing file holds no records
    pub async fn load(&self) -> Result<Vec<ArchiveRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        let records = serde_json::from_str(&content)?;
        Ok(records)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

async fn write_synced(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(content).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}
