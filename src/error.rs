//! Error types for archive operations

/// Result type for archive operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Error types for archive operations.
///
/// None of these end a run: the driver decides at which level each one is
/// absorbed (element, page or descriptor).
#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    #[error("Cannot decode audio source '{src}': {reason}")]
    Decode { src: String, reason: String },

    #[error("Failed to fetch page {page} ({url}): {reason}")]
    PageFetch { page: u32, url: String, reason: String },

    #[error("Failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ArchiveError {
    pub fn decode(src: &str, reason: impl ToString) -> Self {
        Self::Decode {
            src: src.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn download(url: &str, reason: impl ToString) -> Self {
        Self::Download {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
