/// Page-by-page archive driver
///
/// Visits listing pages in increasing order, extracts their sounds and
/// archives each one, rewriting the metadata file after every sound.
use crate::config::Config;
use crate::download::{Downloader, MediaFetcher, PARTIAL_SUFFIX};
use crate::error::Result;
use crate::metadata::{ArchiveRecord, MetadataStore};
use crate::probe::{DurationProbe, FfprobeDuration, NoProbe};
use crate::sounds::{build_client, PageFetcher, PageSource, SoundDescriptor, SoundExtractor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

/// Records committed so far and the next global index.
///
/// The index advances once per processed descriptor, whether or not that
/// descriptor produced a record, so failed downloads leave gaps.
#[derive(Debug, Clone)]
pub struct ArchiveState {
    records: Vec<ArchiveRecord>,
    next_index: u64,
}

impl ArchiveState {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            next_index: 1,
        }
    }

    pub fn records(&self) -> &[ArchiveRecord] {
        &self.records
    }

    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Hand out the next global index
    pub fn assign_index(&mut self) -> u64 {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    pub fn commit(&mut self, record: ArchiveRecord) {
        self.records.push(record);
    }

    pub fn into_records(self) -> Vec<ArchiveRecord> {
        self.records
    }
}

impl Default for ArchiveState {
    fn default() -> Self {
        Self::new()
    }
}

/// What happened to one descriptor
#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorOutcome {
    Downloaded(ArchiveRecord),
    Skipped(ArchiveRecord),
    Failed,
}

/// End-of-run statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub records: usize,
    pub total_size: u64,
    /// Sum of known durations; unknown ones are left out
    pub total_duration: f64,
    pub pages_visited: u32,
    pub pages_failed: u32,
    pub pages_empty: u32,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ArchiveSummary {
    /// Summary of an existing record set, without run counters
    pub fn from_records(records: &[ArchiveRecord]) -> Self {
        let now = Utc::now();
        Self {
            records: records.len(),
            total_size: records.iter().map(|r| r.size).sum(),
            total_duration: records.iter().filter_map(|r| r.duration).sum(),
            pages_visited: 0,
            pages_failed: 0,
            pages_empty: 0,
            downloaded: 0,
            skipped: 0,
            failed: 0,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn total_size_mb(&self) -> f64 {
        self.total_size as f64 / (1024.0 * 1024.0)
    }

    /// Total duration as `Xm Ys`
    pub fn duration_display(&self) -> String {
        let seconds = self.total_duration.max(0.0) as u64;
        format!("{}m {}s", seconds / 60, seconds % 60)
    }

    /// Lines describing the archived records alone, with no run counters
    pub fn stats_lines(&self, metadata_path: &Path) -> Vec<String> {
        vec![
            format!("📁 Archive: {}", metadata_path.display()),
            format!("📊 Total sounds: {}", self.records),
            format!("📊 Total size: {:.2} MB", self.total_size_mb()),
            format!("📊 Total duration: {}", self.duration_display()),
        ]
    }

    pub fn log_stats(&self, metadata_path: &Path) {
        for line in self.stats_lines(metadata_path) {
            info!("{}", line);
        }
    }

    pub fn log_report(&self, sounds_dir: &Path) {
        info!("{}", "=".repeat(60));
        info!("✅ Archive complete: {} sounds in {}/", self.records, sounds_dir.display());
        info!(
            "📄 Pages: {} visited, {} failed, {} without sounds",
            self.pages_visited, self.pages_failed, self.pages_empty
        );
        info!(
            "⬇️  Downloaded: {} | ⏭️  Already present: {} | ❌ Failed: {}",
            self.downloaded, self.skipped, self.failed
        );
        info!("📊 Total sounds: {}", self.records);
        info!("📊 Total size: {:.2} MB", self.total_size_mb());
        info!("📊 Total duration: {}", self.duration_display());
        info!(
            "⏱️  Elapsed: {}s",
            (self.finished_at - self.started_at).num_seconds()
        );
    }
}

#[derive(Debug, Default)]
struct RunCounters {
    pages_visited: u32,
    pages_failed: u32,
    pages_empty: u32,
    downloaded: usize,
    skipped: usize,
    failed: usize,
}

/// Sequential archive driver
pub struct ArchiveDriver {
    pages: Box<dyn PageSource>,
    extractor: SoundExtractor,
    fetcher: Box<dyn MediaFetcher>,
    probe: Box<dyn DurationProbe>,
    store: MetadataStore,
    sounds_dir: PathBuf,
    metadata_file: String,
    start_page: u32,
    total_pages: u32,
    page_delay: Duration,
}

impl ArchiveDriver {
    /// Driver wired to the live site, as described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = build_client(&config.http)?;
        let pages = PageFetcher::new(client.clone(), &config.site);
        let fetcher = Downloader::new(client, config.pacing.download_delay());
        let probe: Box<dyn DurationProbe> = if config.probe.enabled {
            Box::new(FfprobeDuration::new(config.probe.program.clone(), config.probe.timeout()))
        } else {
            Box::new(NoProbe)
        };

        Self::new(config, Box::new(pages), Box::new(fetcher), probe)
    }

    /// Driver with caller-supplied page source, fetcher and probe
    pub fn new(
        config: &Config,
        pages: Box<dyn PageSource>,
        fetcher: Box<dyn MediaFetcher>,
        probe: Box<dyn DurationProbe>,
    ) -> Result<Self> {
        Ok(Self {
            pages,
            extractor: SoundExtractor::new(&config.site.base_url)?,
            fetcher,
            probe,
            store: MetadataStore::new(config.output.metadata_path()),
            sounds_dir: config.output.sounds_dir.clone(),
            metadata_file: config.output.metadata_file.clone(),
            start_page: config.site.start_page,
            total_pages: config.site.total_pages,
            page_delay: config.pacing.page_delay(),
        })
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    /// Create the output directory
    pub async fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.sounds_dir).await?;
        Ok(())
    }

    /// Archive every configured page. Per-item failures are logged and
    /// counted, never returned.
    pub async fn run(&self) -> ArchiveSummary {
        let started_at = Utc::now();
        let mut state = ArchiveState::new();
        let mut counters = RunCounters::default();

        let page_count = (self.start_page..=self.total_pages).count();
        info!("🚀 Starting download of {} pages...", page_count);
        info!("{}", "=".repeat(60));

        for page in self.start_page..=self.total_pages {
            if page > self.start_page && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            self.process_page(page, &mut state, &mut counters).await;
        }

        let records = state.into_records();
        ArchiveSummary {
            pages_visited: counters.pages_visited,
            pages_failed: counters.pages_failed,
            pages_empty: counters.pages_empty,
            downloaded: counters.downloaded,
            skipped: counters.skipped,
            failed: counters.failed,
            started_at,
            ..ArchiveSummary::from_records(&records)
        }
    }

    async fn process_page(&self, page: u32, state: &mut ArchiveState, counters: &mut RunCounters) {
        info!(
            "[Page {}/{}] Fetching {}...",
            page,
            self.total_pages,
            self.pages.page_url(page)
        );
        counters.pages_visited += 1;

        let markup = match self.pages.fetch_page(page).await {
            Ok(markup) => markup,
            Err(e) => {
                warn!("  ✗ Error processing page {}: {}", page, e);
                counters.pages_failed += 1;
                return;
            }
        };

        let sounds = self.extractor.extract(&markup);
        if sounds.is_empty() {
            warn!("  ⚠️  No sounds found on page {}", page);
            counters.pages_empty += 1;
            return;
        }

        info!("  Found {} sounds on page {}", sounds.len(), page);

        for descriptor in &sounds {
            match self.process_descriptor(descriptor, state).await {
                DescriptorOutcome::Downloaded(_) => counters.downloaded += 1,
                DescriptorOutcome::Skipped(_) => counters.skipped += 1,
                DescriptorOutcome::Failed => counters.failed += 1,
            }

            if let Err(e) = self.store.save(state.records()).await {
                warn!("Failed to save metadata to {}: {}", self.store.path().display(), e);
            }
        }
    }

    /// Skip or download one descriptor, committing a record on success
    pub async fn process_descriptor(
        &self,
        descriptor: &SoundDescriptor,
        state: &mut ArchiveState,
    ) -> DescriptorOutcome {
        let index = state.assign_index();
        info!("  [{}] Downloading: {}...", index, short_title(&descriptor.title, 60));

        if self.is_reserved_name(&descriptor.filename) {
            warn!(
                "    ✗ '{}' collides with the archive's own files, not downloading",
                descriptor.filename
            );
            return DescriptorOutcome::Failed;
        }

        let destination = self.sounds_dir.join(&descriptor.filename);

        if let Ok(existing) = fs::metadata(&destination).await {
            info!("    ⏭️  File already exists, skipping");
            let record = self.build_record(index, descriptor, existing.len(), &destination).await;
            state.commit(record.clone());
            return DescriptorOutcome::Skipped(record);
        }

        match self.fetcher.fetch(&descriptor.source_url, &destination).await {
            Ok(written) => {
                let size = match fs::metadata(&destination).await {
                    Ok(metadata) => metadata.len(),
                    Err(e) => {
                        debug!("Cannot stat {}: {}", destination.display(), e);
                        written
                    }
                };
                let record = self.build_record(index, descriptor, size, &destination).await;
                match record.duration {
                    Some(duration) => info!("    ✓ Downloaded ({} bytes, {:.1}s)", size, duration),
                    None => info!("    ✓ Downloaded ({} bytes, duration unknown)", size),
                }
                state.commit(record.clone());
                DescriptorOutcome::Downloaded(record)
            }
            Err(e) => {
                warn!("    ✗ Failed to download: {}", e);
                DescriptorOutcome::Failed
            }
        }
    }

    /// Names used by the metadata file, its temporary copy and partial downloads
    fn is_reserved_name(&self, filename: &str) -> bool {
        filename == self.metadata_file
            || filename == format!("{}.tmp", self.metadata_file)
            || filename.ends_with(PARTIAL_SUFFIX)
    }

    async fn build_record(
        &self,
        index: u64,
        descriptor: &SoundDescriptor,
        size: u64,
        path: &Path,
    ) -> ArchiveRecord {
        ArchiveRecord {
            index,
            title: descriptor.title.clone(),
            filename: descriptor.filename.clone(),
            url: descriptor.source_url.clone(),
            size,
            duration: self.probe.probe(path).await,
        }
    }
}

/// First `max_chars` characters of a title
fn short_title(title: &str, max_chars: usize) -> &str {
    match title.char_indices().nth(max_chars) {
        Some((end, _)) => &title[..end],
        None => title,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: u64, size: u64, duration: Option<f64>) -> ArchiveRecord {
        ArchiveRecord {
            index,
            title: format!("Sound {}", index),
            filename: format!("{}.mp3", index),
            url: format!("https://example.test/{}.mp3", index),
            size,
            duration,
        }
    }

    #[test]
    fn test_state_indices_never_reused() {
        let mut state = ArchiveState::new();
        assert_eq!(state.assign_index(), 1);
        assert_eq!(state.assign_index(), 2);
        state.commit(record(2, 10, None));
        assert_eq!(state.assign_index(), 3);
        assert_eq!(state.next_index(), 4);
        assert_eq!(state.records().len(), 1);
    }

    #[test]
    fn test_summary_skips_unknown_durations() {
        let records = vec![
            record(1, 1024 * 1024, Some(61.5)),
            record(2, 1024 * 1024, None),
            record(4, 512 * 1024, Some(60.0)),
        ];

        let summary = ArchiveSummary::from_records(&records);
        assert_eq!(summary.records, 3);
        assert_eq!(summary.total_size, 2_621_440);
        assert!((summary.total_size_mb() - 2.5).abs() < f64::EPSILON);
        assert!((summary.total_duration - 121.5).abs() < f64::EPSILON);
        assert_eq!(summary.duration_display(), "2m 1s");
    }

    #[test]
    fn test_empty_summary() {
        let summary = ArchiveSummary::from_records(&[]);
        assert_eq!(summary.records, 0);
        assert_eq!(summary.duration_display(), "0m 0s");
    }

    #[test]
    fn test_stats_lines_omit_run_counters() {
        let summary = ArchiveSummary::from_records(&[record(1, 1024 * 1024, Some(90.0))]);
        let lines = summary.stats_lines(Path::new("sounds/metadata.json"));

        assert_eq!(lines[0], "📁 Archive: sounds/metadata.json");
        assert!(lines.iter().any(|l| l == "📊 Total sounds: 1"));
        assert!(lines.iter().any(|l| l == "📊 Total size: 1.00 MB"));
        assert!(lines.iter().any(|l| l == "📊 Total duration: 1m 30s"));
        assert!(!lines
            .iter()
            .any(|l| l.contains("Pages") || l.contains("Elapsed") || l.contains("complete")));
    }

    #[test]
    fn test_short_title_respects_char_boundaries() {
        assert_eq!(short_title("Ça va", 2), "Ça");
        assert_eq!(short_title("court", 60), "court");
    }
}
