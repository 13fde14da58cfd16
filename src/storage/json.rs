use crate::error::StoreError;
use crate::models::AdRecord;
use crate::storage::AdSink;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Append-only file of pretty-printed JSON documents, one after another.
/// Re-crawled ads are appended again; readers see every visit.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AdSink for JsonFileStore {
    async fn contains(&mut self, _ad_id: &str) -> Result<Option<bool>, StoreError> {
        Ok(None)
    }

    async fn write(&mut self, record: &AdRecord) -> Result<(), StoreError> {
        let mut document = serde_json::to_string_pretty(record)?;
        document.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(document.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
