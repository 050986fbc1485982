/// Sound Archiver
///
/// Crawls a paginated listing of audio clips, decodes their obfuscated
/// download paths, downloads every clip once and keeps a JSON sidecar of
/// what has been archived.

pub mod archive;
pub mod config;
pub mod download;
pub mod error;
pub mod metadata;
pub mod probe;
pub mod sounds;

// Re-export main types for easy access
pub use crate::archive::{ArchiveDriver, ArchiveState, ArchiveSummary, DescriptorOutcome};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::download::{Downloader, MediaFetcher};
pub use crate::error::{ArchiveError, Result};
pub use crate::metadata::{ArchiveRecord, MetadataStore};
pub use crate::probe::{DurationProbe, FfprobeDuration, NoProbe};
pub use crate::sounds::{extract_sounds, PageFetcher, PageSource, SoundDescriptor, SoundExtractor};
