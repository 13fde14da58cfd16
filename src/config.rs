use crate::error::{CrawlError, Result};
use crate::scrapers::browser::BrowserOptions;
use crate::scrapers::types::{SiteLayout, StopPolicy};
use crate::storage::StorageMode;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Crawler for processing category pages
#[derive(Parser, Debug, Clone)]
#[command(name = "aqar-crawler", about = "Crawl sa.aqar.fm category pages and the ads they list")]
pub struct Cli {
    /// Save data to SQLite database
    #[arg(long)]
    pub sqlite: bool,

    /// Save data to JSON file
    #[arg(long)]
    pub json: bool,

    /// Starting page number
    #[arg(long = "st", default_value_t = 1)]
    pub start_page: u64,

    /// SQLite database file
    #[arg(long, env = "AQAR_DB", default_value = "aqar.db")]
    pub db: PathBuf,

    /// JSON document file, appended to
    #[arg(long, env = "AQAR_JSON", default_value = "aqar.json")]
    pub json_path: PathBuf,

    /// Stop after this many category pages
    #[arg(long)]
    pub max_pages: Option<u64>,

    /// Stop after this many consecutive category pages without ads
    #[arg(long)]
    pub max_empty_pages: Option<u32>,

    /// Idle browser tabs kept for reuse (0 opens a fresh tab for every page)
    #[arg(long, default_value_t = 1)]
    pub pool_size: usize,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Skip user-agent and fingerprint masking
    #[arg(long)]
    pub no_stealth: bool,

    /// Navigation timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// JSON file overriding site selectors and constants
    #[arg(long, env = "AQAR_LAYOUT")]
    pub layout: Option<PathBuf>,
}

/// Validated settings for one run
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub start_page: u64,
    pub storage: Option<StorageMode>,
    pub policy: StopPolicy,
    pub pool_size: usize,
    pub browser: BrowserOptions,
    pub layout: SiteLayout,
}

impl Cli {
    pub fn into_config(self) -> Result<CrawlConfig> {
        let storage = match (self.sqlite, self.json) {
            (true, true) => {
                return Err(CrawlError::Config(
                    "--sqlite and --json are mutually exclusive".to_string(),
                ))
            }
            (true, false) => Some(StorageMode::Sqlite(self.db)),
            (false, true) => Some(StorageMode::Json(self.json_path)),
            (false, false) => None,
        };

        if self.start_page == 0 {
            return Err(CrawlError::Config("--st must be at least 1".to_string()));
        }
        if self.max_pages == Some(0) {
            return Err(CrawlError::Config("--max-pages must be at least 1".to_string()));
        }
        if self.max_empty_pages == Some(0) {
            return Err(CrawlError::Config(
                "--max-empty-pages must be at least 1".to_string(),
            ));
        }

        let layout = match &self.layout {
            Some(path) => SiteLayout::load(path)?,
            None => SiteLayout::default(),
        };

        Ok(CrawlConfig {
            start_page: self.start_page,
            storage,
            policy: StopPolicy {
                max_pages: self.max_pages,
                max_consecutive_empty: self.max_empty_pages,
            },
            pool_size: self.pool_size,
            browser: BrowserOptions {
                headless: !self.headed,
                stealth: !self.no_stealth,
                timeout: Duration::from_secs(self.timeout_secs),
            },
            layout,
        })
    }
}
