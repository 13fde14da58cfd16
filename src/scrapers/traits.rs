use crate::models::FilterCell;
use anyhow::Result;
use async_trait::async_trait;

/// A single browser page the crawler can drive.
/// Implemented over headless Chrome for real runs and over canned HTML in tests.
#[async_trait]
pub trait PageSession: Send {
    /// Load `url` and wait for navigation to settle
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Scroll to the bottom so lazily loaded content renders
    async fn scroll_to_bottom(&mut self) -> Result<()>;

    /// Click the first element matching `selector`. Returns `false` when
    /// nothing matches.
    async fn click(&mut self, selector: &str) -> Result<bool>;

    /// Snapshot of the current DOM as HTML
    async fn html(&mut self) -> Result<String>;

    /// Tear the page down. Called by the pool, never by pipeline code.
    fn close(self: Box<Self>);
}

/// Opens fresh page sessions for the pool
pub trait SessionFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn PageSession>>;
}

/// Field lookup over a rendered page, independent of how selectors are expressed
pub trait PageExtractor {
    /// Trimmed text of the first element matching `selector`
    fn text(&self, selector: &str) -> Option<String>;

    /// Attribute of the first element matching `selector`
    fn attr(&self, selector: &str, name: &str) -> Option<String>;

    /// Attribute of every matching element, in document order
    fn all_attrs(&self, selector: &str, name: &str) -> Vec<String>;

    /// Trimmed text of every matching element, in document order
    fn all_texts(&self, selector: &str) -> Vec<String>;

    /// Every matching element classified as icon or text
    fn cells(&self, selector: &str) -> Vec<FilterCell>;
}
