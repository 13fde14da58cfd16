use thiserror::Error;

/// Faults raised while crawling a page or persisting an ad
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("navigation to {url} failed: {source:#}")]
    Navigation {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    /// The browser could not hand out a page at all; no page can be crawled
    #[error("browser unavailable: {0:#}")]
    Browser(#[source] anyhow::Error),

    #[error("required field `{field}` missing on {url}")]
    Extraction { field: &'static str, url: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// I/O faults from either persistence sink
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = CrawlError> = std::result::Result<T, E>;
