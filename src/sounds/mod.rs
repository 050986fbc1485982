/// Sound discovery module
///
/// Fetches listing pages and turns their markup into sound descriptors.

pub mod extractor;
pub mod pages;

// Re-export main types
pub use extractor::{extract_sounds, SoundExtractor};
pub use pages::{build_client, PageFetcher, PageSource};

use serde::{Deserialize, Serialize};

/// A sound found on a listing page, not yet archived
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SoundDescriptor {
    /// 1-based position of the audio element within its page
    pub sequence_index: usize,
    /// Human-readable title
    pub title: String,
    /// Absolute download URL
    pub source_url: String,
    /// On-disk name, last segment of the decoded media path
    pub filename: String,
}
