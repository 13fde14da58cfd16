mod config;
mod error;
mod models;
mod scrapers;
mod stats;
mod storage;

use clap::Parser;
use config::Cli;
use scrapers::{ChromeSessionFactory, Crawler, PagePool};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Cli::parse().into_config()?;

    info!("🏠 Aqar crawler");
    info!("Starting from category page {}", config.start_page);

    let sink = config.storage.as_ref().map(|mode| mode.open()).transpose()?;
    if sink.is_none() {
        info!("No storage selected, ads are only logged");
    }

    let factory = ChromeSessionFactory::launch(config.browser.clone())?;
    let pool = PagePool::new(Box::new(factory), config.pool_size);
    let mut crawler = Crawler::new(pool, config.layout, sink, config.policy);

    let result = tokio::select! {
        result = crawler.run(config.start_page) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping crawl");
            Ok(())
        }
    };

    crawler.stats().log_summary();
    let sessions = crawler.pool_stats();
    info!(
        "Browser sessions: {} opened, {} reused, {} closed",
        sessions.opened, sessions.reused, sessions.closed
    );
    result?;

    Ok(())
}
