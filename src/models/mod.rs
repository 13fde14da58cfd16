use serde::{Deserialize, Serialize};

/// One listing scraped from an ad page.
///
/// Serialized field names match the `Aqarat` table columns so the JSON
/// document sink and the SQLite sink stay interchangeable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdRecord {
    #[serde(rename = "adid")]
    pub ad_id: String,
    pub title: String,
    pub description: String,
    pub author_name: Option<String>,
    pub price: Option<String>,
    pub filters: Vec<String>,
    #[serde(rename = "generic_values")]
    pub values: Vec<String>,
    #[serde(rename = "cat")]
    pub category: String,
    pub author_url: Option<String>,
    pub city: String,
    #[serde(rename = "citydir")]
    pub city_district_parent: String,
    #[serde(rename = "dist")]
    pub district: String,
    #[serde(rename = "imgs")]
    pub images: Vec<String>,
    pub map_url: Option<String>,
}

impl AdRecord {
    /// Pages without a description are treated as failed renders: the record
    /// is still saved but not echoed to the console.
    pub fn has_summary(&self) -> bool {
        !self.description.trim().is_empty()
    }
}

/// Value cell of the filter table as rendered on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterCell {
    Text(String),
    Icon { src: Option<String> },
}

/// What a persistence call did with a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted,
    Updated,
    Appended,
}
