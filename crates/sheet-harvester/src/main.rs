//! Sheet harvester CLI application.

use anyhow::{Context, Result};
use catalog::{CatalogEnum, Catalog, Config, Section};
use clap::{Parser, Subcommand};
use sheet_harvester::{HttpFetcher, SheetHarvester};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index every sheet of a section listing
    Index {
        /// Section name (anime, manga, drama, novel)
        section: String,
    },
    /// Store the genres and themes of a section
    Categories { section: String },
    /// Harvest one sheet page
    Sheet {
        url: String,
        /// Return the stored sheet instead of fetching it again
        #[arg(long)]
        reload: bool,
    },
    /// Harvest one contact page
    Contact { url: String },
    /// Print the most awaited sheets of a section
    Awaited { section: String },
    /// Harvest indexed sheets that are not stored yet
    Crawl {
        section: String,
        /// Stop after this many sheets
        #[arg(short, long)]
        limit: Option<u32>,
    },
}

fn parse_section(name: &str) -> Result<Section> {
    match Section::from_label(name) {
        Section::Unknown => anyhow::bail!("Unknown section {:?}", name),
        section => Ok(section),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Initialize logging
    let mut log_config = catalog::LogConfig::from_config(&config, "sheet-harvester");
    if args.verbose {
        log_config.default_level = tracing::Level::DEBUG;
    }
    catalog::logging::init(log_config)?;

    info!("Sheet harvester starting");
    info!(config_file = %args.config.display(), "Loaded configuration");

    let catalog = Catalog::open(&config)?;
    let fetcher = HttpFetcher::from_config(&config.site).context("Failed to create HTTP fetcher")?;
    let harvester = SheetHarvester::new(fetcher, &config.site);

    // Ctrl-C stops the harvest between two pages
    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current page");
            ctrl_c_token.cancel();
        }
    });

    match args.command {
        Command::Index { section } => {
            let section = parse_section(&section)?;
            let report = harvester
                .harvest_index(&catalog, section, &cancel)
                .await
                .context("Index harvest failed")?;
            info!("=== Index Complete ===");
            info!("{}", report);
        }
        Command::Categories { section } => {
            let section = parse_section(&section)?;
            let report = harvester
                .harvest_categories(&catalog, section, &cancel)
                .await
                .context("Category harvest failed")?;
            info!("=== Categories Complete ===");
            info!("{}", report);
        }
        Command::Sheet { url, reload } => {
            let sheet = harvester
                .harvest_sheet(&catalog, &url, reload, &cancel)
                .await
                .with_context(|| format!("Failed to harvest {}", url))?;
            println!("{}", serde_json::to_string_pretty(&sheet)?);
        }
        Command::Contact { url } => {
            let contact = harvester
                .harvest_contact(&catalog, &url, &cancel)
                .await
                .with_context(|| format!("Failed to harvest {}", url))?;
            println!("{}", serde_json::to_string_pretty(&contact)?);
        }
        Command::Awaited { section } => {
            let section = parse_section(&section)?;
            let rows = harvester
                .harvest_most_awaited(section, &cancel)
                .await
                .context("Most awaited harvest failed")?;
            for (rank, row) in rows.iter().enumerate() {
                println!("{:>4}. {} <{}>", rank + 1, row.name, row.url);
            }
        }
        Command::Crawl { section, limit } => {
            let section = parse_section(&section)?;
            let stats = harvester
                .harvest_indexed_sheets(&catalog, section, limit, &cancel)
                .await
                .context("Crawl failed")?;
            info!("=== Crawl Complete ===");
            info!("Candidates: {}", stats.candidates);
            info!("Sheets harvested: {}", stats.harvested);
            info!("Errors: {}", stats.errors);
        }
    }

    info!("Sheet harvester finished successfully");

    Ok(())
}
