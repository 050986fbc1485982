use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the sound archiver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site layout and page range
    pub site: SiteConfig,

    /// HTTP session settings
    pub http: HttpConfig,

    /// Politeness delays
    pub pacing: PacingConfig,

    /// Output and storage settings
    pub output: OutputConfig,

    /// Duration probe settings
    pub probe: ProbeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Base URL that decoded media paths are resolved against
    pub base_url: String,

    /// Canonical listing URL (page 1)
    pub listing_url: String,

    /// Last page index to visit
    pub total_pages: u32,

    /// First page index to visit
    pub start_page: u32,

    /// Anchor appended to every page URL after the first
    pub nav_anchor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,

    /// Per-request timeout (seconds)
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Delay before every page fetch after the first (milliseconds)
    pub page_delay_ms: u64,

    /// Delay before every media download (milliseconds)
    pub download_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving media files and the metadata file
    pub sounds_dir: PathBuf,

    /// Metadata file name inside `sounds_dir`
    pub metadata_file: String,

    /// Log level used when RUST_LOG is not set
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub enabled: bool,

    /// Program invoked to measure playback length
    pub program: String,

    pub timeout_seconds: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://zonesons.com".to_string(),
            listing_url: "https://zonesons.com/repliques-cultes-de-films-d-espionnage/phrases-cultes-de-oss-117-le-caire-nid-d-espions/".to_string(),
            total_pages: 96,
            start_page: 1,
            nav_anchor: "navtop".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8".to_string(),
            accept_language: "fr-FR,fr;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: 3000,
            download_delay_ms: 2000,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sounds_dir: PathBuf::from("sounds"),
            metadata_file: "metadata.json".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "ffprobe".to_string(),
            timeout_seconds: 5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            http: HttpConfig::default(),
            pacing: PacingConfig::default(),
            output: OutputConfig::default(),
            probe: ProbeConfig::default(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl PacingConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn download_delay(&self) -> Duration {
        Duration::from_millis(self.download_delay_ms)
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl OutputConfig {
    pub fn metadata_path(&self) -> PathBuf {
        self.sounds_dir.join(&self.metadata_file)
    }
}

impl Config {
    /// Load configuration from the first config file found, then from the environment
    pub fn load() -> Result<Self> {
        let config_paths = ["sound-archiver.toml", "config/sound-archiver.toml"];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file {}", path.display()))?;
        let config = toml::from_str(&config_str)
            .with_context(|| format!("Cannot parse config file {}", path.display()))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(output_dir) = std::env::var("SOUND_ARCHIVER_OUTPUT_DIR") {
            config.output.sounds_dir = PathBuf::from(output_dir);
        }

        if let Ok(pages) = std::env::var("SOUND_ARCHIVER_PAGES") {
            config.site.total_pages = pages
                .parse()
                .with_context(|| format!("SOUND_ARCHIVER_PAGES is not a number: {}", pages))?;
        }

        if let Ok(log_level) = std::env::var("SOUND_ARCHIVER_LOG_LEVEL") {
            config.output.log_level = log_level;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.site.total_pages == 0 {
            return Err(anyhow!("total_pages must be greater than 0"));
        }

        if self.site.start_page == 0 || self.site.start_page > self.site.total_pages {
            return Err(anyhow!(
                "start_page must be between 1 and {} (got {})",
                self.site.total_pages,
                self.site.start_page
            ));
        }

        for (name, value) in [("base_url", &self.site.base_url), ("listing_url", &self.site.listing_url)] {
            let parsed = url::Url::parse(value).map_err(|e| anyhow!("{} is not a valid URL: {}", name, e))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(anyhow!("{} must use http or https: {}", name, value));
            }
        }

        if self.http.timeout_seconds == 0 {
            return Err(anyhow!("http timeout must be greater than 0"));
        }

        if self.probe.enabled && self.probe.timeout_seconds == 0 {
            return Err(anyhow!("probe timeout must be greater than 0"));
        }

        if self.output.metadata_file.trim().is_empty() {
            return Err(anyhow!("metadata_file must not be empty"));
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Sound Archiver Configuration:\n\
            - Listing: {}\n\
            - Pages: {}..={}\n\
            - Output Directory: {}\n\
            - Page Delay: {}ms\n\
            - Download Delay: {}ms\n\
            - Duration Probe: {}",
            self.site.listing_url,
            self.site.start_page,
            self.site.total_pages,
            self.output.sounds_dir.display(),
            self.pacing.page_delay_ms,
            self.pacing.download_delay_ms,
            if self.probe.enabled { self.probe.program.as_str() } else { "disabled" }
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.site.base_url = base_url.into();
        self
    }

    pub fn with_listing_url(mut self, listing_url: impl Into<String>) -> Self {
        self.config.site.listing_url = listing_url.into();
        self
    }

    pub fn with_pages(mut self, total_pages: u32) -> Self {
        self.config.site.total_pages = total_pages;
        self
    }

    pub fn with_start_page(mut self, start_page: u32) -> Self {
        self.config.site.start_page = start_page;
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.sounds_dir = dir;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.config.http.timeout_seconds = seconds;
        self
    }

    /// Zero delays, for tests and local mirrors
    pub fn without_pacing(mut self) -> Self {
        self.config.pacing.page_delay_ms = 0;
        self.config.pacing.download_delay_ms = 0;
        self
    }

    pub fn enable_probe(mut self, enable: bool) -> Self {
        self.config.probe.enabled = enable;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.site.total_pages, 96);
        assert_eq!(config.site.start_page, 1);
        assert_eq!(config.http.timeout_seconds, 30);
        assert_eq!(config.probe.timeout_seconds, 5);
        assert_eq!(config.pacing.page_delay(), Duration::from_secs(3));
        assert_eq!(config.pacing.download_delay(), Duration::from_secs(2));
        assert_eq!(config.output.metadata_path(), PathBuf::from("sounds/metadata.json"));
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_pages(3)
            .with_start_page(2)
            .without_pacing()
            .enable_probe(false)
            .build();

        assert_eq!(config.site.total_pages, 3);
        assert_eq!(config.site.start_page, 2);
        assert_eq!(config.pacing.page_delay_ms, 0);
        assert!(!config.probe.enabled);
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());

        let config = ConfigBuilder::new().with_pages(0).build();
        assert!(config.validate().is_err());

        let config = ConfigBuilder::new().with_pages(5).with_start_page(6).build();
        assert!(config.validate().is_err());

        let config = ConfigBuilder::new().with_base_url("ftp://example.test").build();
        assert!(config.validate().is_err());

        let config = ConfigBuilder::new().with_timeout(0).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            "[site]\ntotal_pages = 4\n\n[pacing]\npage_delay_ms = 10\n",
        )
        .unwrap();

        assert_eq!(config.site.total_pages, 4);
        assert_eq!(config.site.nav_anchor, "navtop");
        assert_eq!(config.pacing.page_delay_ms, 10);
        assert_eq!(config.pacing.download_delay_ms, 2000);
        assert_eq!(config.probe.program, "ffprobe");
    }

    #[test]
    fn test_save_and_load_from() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("sound-archiver.toml");

        let config = ConfigBuilder::new().with_pages(12).build();
        config.save(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.site.total_pages, 12);
        assert_eq!(loaded.site.listing_url, config.site.listing_url);
    }

    #[test]
    fn test_load_from_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(Config::load_from(&temp_dir.path().join("absent.toml")).is_err());
    }
}
