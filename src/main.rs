use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use sound_archiver::{ArchiveDriver, ArchiveSummary, Config, MetadataStore};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("Sound Archiver")
        .version("0.1.0")
        .author("TigreRoll")
        .about("Downloads every clip of a paginated sound listing, resumably")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (defaults to sound-archiver.toml if present)")
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Directory receiving sounds and metadata.json")
        )
        .arg(
            Arg::new("pages")
                .short('p')
                .long("pages")
                .value_name("NUM")
                .help("Last page to visit")
                .value_parser(clap::value_parser!(u32))
        )
        .arg(
            Arg::new("start-page")
                .long("start-page")
                .value_name("NUM")
                .help("First page to visit")
                .value_parser(clap::value_parser!(u32))
        )
        .arg(
            Arg::new("no-probe")
                .long("no-probe")
                .help("Do not measure clip durations")
                .action(ArgAction::SetTrue)
        )
        .arg(
            Arg::new("stats")
                .long("stats")
                .help("Print statistics of the existing metadata file and exit")
                .action(ArgAction::SetTrue)
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue)
        )
        .get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from(&PathBuf::from(path))?,
        None => Config::load().unwrap_or_else(|e| {
            eprintln!("Failed to load config, using defaults: {}", e);
            Config::default()
        }),
    };

    // Initialize logging
    let default_filter = if matches.get_flag("verbose") {
        "sound_archiver=debug,info".to_string()
    } else {
        format!("sound_archiver={},warn", config.output.log_level)
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    if let Some(dir) = matches.get_one::<String>("output-dir") {
        config.output.sounds_dir = PathBuf::from(dir);
    }
    if let Some(pages) = matches.get_one::<u32>("pages") {
        config.site.total_pages = *pages;
    }
    if let Some(start_page) = matches.get_one::<u32>("start-page") {
        config.site.start_page = *start_page;
    }
    if matches.get_flag("no-probe") {
        config.probe.enabled = false;
    }

    if matches.get_flag("stats") {
        let store = MetadataStore::new(config.output.metadata_path());
        let records = store.load().await?;
        ArchiveSummary::from_records(&records).log_stats(store.path());
        return Ok(());
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e);
    }

    info!("🎵 Sound Archiver starting...");
    for line in config.summary().lines() {
        info!("{}", line);
    }

    let driver = ArchiveDriver::from_config(&config)?;
    if let Err(e) = driver.prepare().await {
        error!("Cannot create {}: {}", config.output.sounds_dir.display(), e);
        return Err(e.into());
    }

    let summary = driver.run().await;
    summary.log_report(&config.output.sounds_dir);
    info!("📝 Metadata saved to {}", driver.store().path().display());

    if summary.failed > 0 {
        warn!("{} sounds could not be downloaded; run again to retry them", summary.failed);
    }

    Ok(())
}
