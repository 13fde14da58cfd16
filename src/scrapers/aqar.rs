use crate::error::{CrawlError, Result};
use crate::models::AdRecord;
use crate::scrapers::extract::{ad_links, extract_ad, extract_map_url, HtmlPage};
use crate::scrapers::pool::{PageLease, PagePool, PoolStats};
use crate::scrapers::types::{SiteLayout, StopPolicy};
use crate::stats::RunStats;
use crate::storage::{persist, AdSink};
use std::time::Instant;
use tracing::{debug, error, info};

fn navigation(url: &str) -> impl FnOnce(anyhow::Error) -> CrawlError + '_ {
    move |source| CrawlError::Navigation {
        url: url.to_string(),
        source,
    }
}

/// Navigate, scroll for lazy content, and snapshot the page.
/// On any failure the session is discarded, its page state being unknown.
async fn load(page: &mut PageLease<'_>, url: &str) -> Result<String> {
    let loaded: anyhow::Result<String> = async {
        page.goto(url).await?;
        page.scroll_to_bottom().await?;
        page.html().await
    }
    .await;

    loaded.map_err(|e| {
        page.discard();
        navigation(url)(e)
    })
}

/// Walks numbered category pages and scrapes every ad they link to
pub struct Crawler {
    pool: PagePool,
    layout: SiteLayout,
    sink: Option<Box<dyn AdSink>>,
    policy: StopPolicy,
    stats: RunStats,
}

impl Crawler {
    pub fn new(
        pool: PagePool,
        layout: SiteLayout,
        sink: Option<Box<dyn AdSink>>,
        policy: StopPolicy,
    ) -> Self {
        Self {
            pool,
            layout,
            sink,
            policy,
            stats: RunStats::new(),
        }
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Crawl from `start_page` until the stop policy is met.
    /// With the default policy this only returns on an invalid URL or when
    /// the browser can no longer open pages.
    pub async fn run(&mut self, start_page: u64) -> Result<()> {
        let mut url = self.layout.listing_url(start_page)?;

        loop {
            let found = self.process_category_page(url.as_str()).await?;
            let next = self.layout.next_page_url(&url)?;

            self.stats.record_page(found);
            info!(
                "Processed {} category pages in {:.2} seconds",
                self.stats.pages,
                self.stats.elapsed().as_secs_f64()
            );

            if self
                .policy
                .should_stop(self.stats.pages, self.stats.consecutive_empty)
            {
                info!(
                    pages = self.stats.pages,
                    empty_streak = self.stats.consecutive_empty,
                    "Stop policy reached"
                );
                return Ok(());
            }

            info!(url = %next, "Next category page");
            url = next;
        }
    }

    /// Scrape every ad linked from one category page.
    /// Returns how many ads the page listed; a page that fails to load lists none.
    /// Only a browser fault is returned, since no later page could load either.
    pub async fn process_category_page(&mut self, url: &str) -> Result<usize> {
        info!(url, "Processing category page");

        let ads = match self.discover_ads(url).await {
            Ok(ads) => ads,
            Err(e @ CrawlError::Browser(_)) => return Err(e),
            Err(e) => {
                error!(url, "Error while processing category page: {:#}", e);
                return Ok(0);
            }
        };
        debug!(url, count = ads.len(), "Discovered ads");

        for ad_url in &ads {
            let started = Instant::now();
            self.process_ad(ad_url).await?;
            info!(
                "Processed ad in {:.2} seconds",
                started.elapsed().as_secs_f64()
            );
        }

        Ok(ads.len())
    }

    async fn discover_ads(&self, url: &str) -> Result<Vec<String>> {
        let mut page = self.pool.acquire().map_err(CrawlError::Browser)?;
        let html = load(&mut page, url).await?;
        Ok(ad_links(&HtmlPage::parse(&html), &self.layout))
    }

    /// Scrape one ad and hand it to the sink.
    /// Failures are logged; only a browser fault is returned.
    pub async fn process_ad(&mut self, url: &str) -> Result<()> {
        info!(url, "Processing ad");
        self.stats.ads += 1;

        let record = match self.scrape_ad(url).await {
            Ok(record) => record,
            Err(e) => {
                self.stats.failed_ads += 1;
                if matches!(e, CrawlError::Browser(_)) {
                    return Err(e);
                }
                error!(url, "Error while processing ad: {:#}", e);
                return Ok(());
            }
        };

        if record.has_summary() {
            log_summary(&record);
        }
        self.save(&record).await;

        info!(
            ad_id = %record.ad_id,
            "Processed ad {} at {:.2} seconds",
            record.ad_id,
            self.stats.elapsed().as_secs_f64()
        );
        Ok(())
    }

    async fn scrape_ad(&self, url: &str) -> Result<AdRecord> {
        let mut page = self.pool.acquire().map_err(CrawlError::Browser)?;
        let html = load(&mut page, url).await?;

        let mut record = extract_ad(url, &HtmlPage::parse(&html), &self.layout)?;
        record.map_url = self.reveal_map(&mut page, url).await?;
        Ok(record)
    }

    /// The map link only renders after the gallery's map thumbnail is clicked
    async fn reveal_map(&self, page: &mut PageLease<'_>, url: &str) -> Result<Option<String>> {
        let clicked = page
            .click(&self.layout.selectors.map_thumbnail)
            .await
            .map_err(navigation(url))?;
        if !clicked {
            debug!(url, "No map thumbnail on page");
            return Ok(None);
        }

        let html = page.html().await.map_err(navigation(url))?;
        Ok(extract_map_url(&HtmlPage::parse(&html), &self.layout))
    }

    async fn save(&mut self, record: &AdRecord) {
        let Some(sink) = self.sink.as_deref_mut() else {
            return;
        };

        match persist(sink, record).await {
            Ok(outcome) => {
                self.stats.record_saved(outcome);
                info!(
                    ad_id = %record.ad_id,
                    ?outcome,
                    "Inserted: {} | Updated: {} | Appended: {}",
                    self.stats.insertions,
                    self.stats.updates,
                    self.stats.appends
                );
            }
            Err(e) => error!(
                ad_id = %record.ad_id,
                "Error while saving to {}: {}",
                sink.name(),
                e
            ),
        }
    }
}

fn log_summary(record: &AdRecord) {
    info!("ID#: {}", record.ad_id);
    info!("Title: {}", record.title);
    info!("Author Name: {:?}", record.author_name);
    info!("Price: {:?}", record.price);
    info!("Map URL: {:?}", record.map_url);
    info!("Category: {}", record.category);
    info!("City: {}", record.city);
    info!("City Part: {}", record.city_district_parent);
    info!("District: {}", record.district);
    info!("Filters: {:?}", record.filters);
    info!("Values: {:?}", record.values);
}
