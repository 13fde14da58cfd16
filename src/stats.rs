use crate::models::SaveOutcome;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use tracing::info;

/// Counters for one crawl run
#[derive(Debug, Clone)]
pub struct RunStats {
    pub pages: u64,
    pub ads: u64,
    pub failed_ads: u64,
    pub insertions: u64,
    pub updates: u64,
    pub appends: u64,
    pub consecutive_empty: u32,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            pages: 0,
            ads: 0,
            failed_ads: 0,
            insertions: 0,
            updates: 0,
            appends: 0,
            consecutive_empty: 0,
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn record_page(&mut self, ads_found: usize) {
        self.pages += 1;
        if ads_found == 0 {
            self.consecutive_empty += 1;
        } else {
            self.consecutive_empty = 0;
        }
    }

    pub fn record_saved(&mut self, outcome: SaveOutcome) {
        match outcome {
            SaveOutcome::Inserted => self.insertions += 1,
            SaveOutcome::Updated => self.updates += 1,
            SaveOutcome::Appended => self.appends += 1,
        }
    }

    pub fn log_summary(&self) {
        info!(
            started_at = %self.started_at.to_rfc3339(),
            elapsed = %format!("{:.2}s", self.elapsed().as_secs_f64()),
            "Crawl finished: {} pages, {} ads ({} failed), {} inserted, {} updated, {} appended",
            self.pages,
            self.ads,
            self.failed_ads,
            self.insertions,
            self.updates,
            self.appends,
        );
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}
