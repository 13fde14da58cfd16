pub mod json;
pub mod sqlite;

pub use json::JsonFileStore;
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::models::{AdRecord, SaveOutcome};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, warn};

/// Which sink a run writes to, chosen once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    Sqlite(PathBuf),
    Json(PathBuf),
}

impl StorageMode {
    pub fn open(&self) -> Result<Box<dyn AdSink>, StoreError> {
        match self {
            StorageMode::Sqlite(path) => {
                info!("Saving ads to SQLite database {}", path.display());
                Ok(Box::new(SqliteStore::open(path)?))
            }
            StorageMode::Json(path) => {
                info!("Appending ads to JSON file {}", path.display());
                Ok(Box::new(JsonFileStore::new(path.clone())))
            }
        }
    }
}

/// Destination for scraped ads
#[async_trait]
pub trait AdSink: Send {
    /// Whether `ad_id` is already stored. `None` for sinks that keep no index.
    async fn contains(&mut self, ad_id: &str) -> Result<Option<bool>, StoreError>;

    async fn write(&mut self, record: &AdRecord) -> Result<(), StoreError>;

    fn name(&self) -> &'static str;
}

/// Save `record`, classifying the write as insert, update or append.
///
/// A failed existence check counts as "not stored" so the write still happens.
pub async fn persist(sink: &mut dyn AdSink, record: &AdRecord) -> Result<SaveOutcome, StoreError> {
    let existed = match sink.contains(&record.ad_id).await {
        Ok(existed) => existed,
        Err(e) => {
            warn!(ad_id = %record.ad_id, sink = sink.name(), "Existence check failed, treating as new: {}", e);
            Some(false)
        }
    };

    sink.write(record).await?;

    Ok(match existed {
        Some(true) => SaveOutcome::Updated,
        Some(false) => SaveOutcome::Inserted,
        None => SaveOutcome::Appended,
    })
}

#[cfg(test)]
pub(crate) fn sample_record(ad_id: &str) -> AdRecord {
    AdRecord {
        ad_id: ad_id.to_string(),
        title: "شقة للإيجار".to_string(),
        description: "شقة عوائل قريبة من الخدمات".to_string(),
        author_name: Some("مالك".to_string()),
        price: Some("35000".to_string()),
        filters: vec!["غرف النوم".to_string(), "مكيف".to_string()],
        values: vec!["3".to_string(), "1".to_string()],
        category: "شقق للإيجار".to_string(),
        author_url: Some("https://sa.aqar.fm/user/77".to_string()),
        city: "جدة".to_string(),
        city_district_parent: "حي الروضة".to_string(),
        district: "حي الروضة".to_string(),
        images: vec!["https://images.aqar.fm/a.jpg".to_string()],
        map_url: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_save_is_insert_then_update() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("aqar.db")).unwrap();
        let record = sample_record("6070123");

        let first = persist(&mut store, &record).await.unwrap();
        let second = persist(&mut store, &record).await.unwrap();

        assert_eq!(first, SaveOutcome::Inserted);
        assert_eq!(second, SaveOutcome::Updated);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn new_id_in_existing_table_is_insert() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("aqar.db")).unwrap();

        persist(&mut store, &sample_record("1")).await.unwrap();
        let outcome = persist(&mut store, &sample_record("2")).await.unwrap();

        assert_eq!(outcome, SaveOutcome::Inserted);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn json_sink_always_appends() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("aqar.json"));
        let record = sample_record("42");

        assert_eq!(persist(&mut store, &record).await.unwrap(), SaveOutcome::Appended);
        assert_eq!(persist(&mut store, &record).await.unwrap(), SaveOutcome::Appended);
    }

    #[tokio::test]
    async fn storage_mode_opens_matching_sink() {
        let dir = tempfile::tempdir().unwrap();

        let sqlite = StorageMode::Sqlite(dir.path().join("aqar.db")).open().unwrap();
        assert_eq!(sqlite.name(), "sqlite");

        let mut json = StorageMode::Json(dir.path().join("aqar.json")).open().unwrap();
        assert_eq!(json.name(), "json");
        assert_eq!(json.contains("1").await.unwrap(), None);
    }

    struct FailingCheck {
        writes: usize,
    }

    #[async_trait]
    impl AdSink for FailingCheck {
        async fn contains(&mut self, _ad_id: &str) -> Result<Option<bool>, StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk unplugged")))
        }

        async fn write(&mut self, _record: &AdRecord) -> Result<(), StoreError> {
            self.writes += 1;
            Ok(())
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn check_fault_is_classified_as_insert() {
        let mut sink = FailingCheck { writes: 0 };
        let outcome = persist(&mut sink, &sample_record("9")).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Inserted);
        assert_eq!(sink.writes, 1);
    }
}
