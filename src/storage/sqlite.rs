use crate::error::StoreError;
use crate::models::AdRecord;
use crate::storage::AdSink;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::debug;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS Aqarat (
    adid TEXT PRIMARY KEY,
    title TEXT,
    description TEXT,
    author_name TEXT,
    price TEXT,
    filters TEXT,
    generic_values TEXT,
    cat TEXT,
    author_url TEXT,
    city TEXT,
    citydir TEXT,
    dist TEXT,
    imgs TEXT,
    map_url TEXT
)";

const UPSERT: &str = "INSERT OR REPLACE INTO Aqarat
    (adid, title, description, author_name, price, filters, generic_values, cat,
     author_url, city, citydir, dist, imgs, map_url)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)";

/// Ads keyed by id in a single SQLite table, replaced wholesale on re-crawl
pub struct SqliteStore {
    conn: Connection,
    schema_ready: bool,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn,
            schema_ready: false,
        })
    }

    fn ensure_schema(&mut self) -> Result<(), StoreError> {
        if !self.schema_ready {
            self.conn.execute(CREATE_TABLE, [])?;
            self.schema_ready = true;
            debug!("Aqarat table ready");
        }
        Ok(())
    }

    fn exists(&self, ad_id: &str) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM Aqarat WHERE adid = ?1", [ad_id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn upsert(&mut self, record: &AdRecord) -> Result<(), StoreError> {
        self.ensure_schema()?;

        let tx = self.conn.transaction()?;
        tx.execute(
            UPSERT,
            params![
                record.ad_id,
                record.title,
                record.description,
                record.author_name,
                record.price,
                list_literal(&record.filters),
                list_literal(&record.values),
                record.category,
                record.author_url,
                record.city,
                record.city_district_parent,
                record.district,
                list_literal(&record.images),
                record.map_url,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    #[cfg(test)]
    pub fn count(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM Aqarat", [], |row| row.get(0))?)
    }

    #[cfg(test)]
    pub fn column(&self, ad_id: &str, column: &str) -> Result<Option<String>, StoreError> {
        let sql = format!("SELECT {column} FROM Aqarat WHERE adid = ?1");
        Ok(self.conn.query_row(&sql, [ad_id], |row| row.get(0))?)
    }
}

#[async_trait]
impl AdSink for SqliteStore {
    async fn contains(&mut self, ad_id: &str) -> Result<Option<bool>, StoreError> {
        self.ensure_schema()?;
        self.exists(ad_id).map(Some)
    }

    async fn write(&mut self, record: &AdRecord) -> Result<(), StoreError> {
        self.upsert(record)
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

/// List fields are stored in list-literal form: `['a', 'b']`
pub fn list_literal(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| quote(item)).collect();
    format!("[{}]", quoted.join(", "))
}

fn quote(item: &str) -> String {
    let delim = if item.contains('\'') && !item.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(item.len() + 2);
    out.push(delim);
    for c in item.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}
