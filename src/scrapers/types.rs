use crate::error::{CrawlError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Container every ad-page field hangs off
const AD_ROOT: &str = "body > div:nth-of-type(1) > main > div > div:nth-of-type(2) > div > div > div:nth-of-type(2) > div:nth-of-type(2)";

/// Structural selectors for the listing site.
///
/// The site renders without stable ids, so most of these are positional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub ad_links: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub city: String,
    pub city_district_parent: String,
    pub district: String,
    pub price: String,
    pub author_name: String,
    pub author_link: String,
    pub gallery_images: String,
    pub filter_labels: String,
    pub filter_values: String,
    pub map_thumbnail: String,
    pub map_link: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            ad_links: "div:nth-of-type(2) > div:nth-of-type(2) > div:nth-of-type(2) > div > a"
                .to_string(),
            title: format!("{AD_ROOT} > div:nth-of-type(1) > h1"),
            description: format!("{AD_ROOT} > div:nth-of-type(4) > p"),
            category: format!("{AD_ROOT} > ul > li:nth-of-type(2) > a"),
            city: format!("{AD_ROOT} > ul > li:nth-of-type(3) > a"),
            city_district_parent: format!("{AD_ROOT} > ul > li:nth-of-type(4) > a"),
            district: format!("{AD_ROOT} > ul > li:nth-of-type(5) > a"),
            price: format!("{AD_ROOT} > div:nth-of-type(3) > h2"),
            author_name: "div > a > h2._name__Xc3Tb".to_string(),
            author_link: "div > a._userName__vwCcT".to_string(),
            gallery_images: "div:nth-of-type(2) > div > div > div > img".to_string(),
            filter_labels: format!("{AD_ROOT} > div:nth-of-type(5) > div > :nth-child(1) > p"),
            filter_values: format!("{AD_ROOT} > div:nth-of-type(5) > div > :nth-child(2)"),
            map_thumbnail: format!(
                "{AD_ROOT} > div:nth-of-type(6) > div > div:nth-of-type(1) > div:nth-of-type(4) > img"
            ),
            map_link: format!(
                "{AD_ROOT} > div:nth-of-type(6) > div > div:nth-of-type(1) > div:nth-of-type(6) > div > div:nth-of-type(1) > div > a"
            ),
        }
    }
}

/// Site constants: where listings live and how the markup encodes things
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteLayout {
    /// Origin relative hrefs are resolved against
    pub origin: String,
    /// Numbered category pages are `<listing_base><n>`
    pub listing_base: String,
    /// Icon that marks a feature as present in the filter table
    pub available_icon: String,
    /// Breadcrumb tokens meaning the city part is already a neighborhood
    pub district_markers: Vec<String>,
    pub selectors: Selectors,
}

impl Default for SiteLayout {
    fn default() -> Self {
        Self {
            origin: "https://sa.aqar.fm".to_string(),
            listing_base: "https://sa.aqar.fm/%D8%B9%D9%82%D8%A7%D8%B1%D8%A7%D8%AA/".to_string(),
            available_icon: "https://assets.aqar.fm/icons/Available-colored.svg".to_string(),
            district_markers: vec!["حي".to_string()],
            selectors: Selectors::default(),
        }
    }
}

impl SiteLayout {
    /// Load a layout override from a JSON file; absent keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CrawlError::Config(format!("reading {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| CrawlError::Config(format!("parsing {}: {e}", path.display())))
    }

    fn base(&self) -> Result<Url> {
        Url::parse(&self.listing_base)
            .map_err(|e| CrawlError::InvalidUrl(format!("{}: {e}", self.listing_base)))
    }

    /// URL of category page `page`
    pub fn listing_url(&self, page: u64) -> Result<Url> {
        self.base()?
            .join(&page.to_string())
            .map_err(|e| CrawlError::InvalidUrl(format!("page {page}: {e}")))
    }

    /// Category page following `current`, whose last path segment is its number
    pub fn next_page_url(&self, current: &Url) -> Result<Url> {
        let page = page_number(current)?;
        self.listing_url(page + 1)
    }

    /// Resolve an href found on the site to an absolute URL
    pub fn resolve(&self, href: &str) -> Option<String> {
        let origin = Url::parse(&self.origin).ok()?;
        origin.join(href.trim()).ok().map(String::from)
    }

    /// Whether a breadcrumb already names the neighborhood
    pub fn is_district(&self, text: &str) -> bool {
        self.district_markers
            .iter()
            .any(|marker| !marker.is_empty() && text.contains(marker.as_str()))
    }
}

/// Trailing path segment of a category page URL, parsed as its page number
pub fn page_number(url: &Url) -> Result<u64> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|last| last.parse().ok())
        .ok_or_else(|| CrawlError::InvalidUrl(format!("no page number in {url}")))
}

/// When to stop walking category pages. The default never stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopPolicy {
    pub max_pages: Option<u64>,
    pub max_consecutive_empty: Option<u32>,
}

impl StopPolicy {
    pub fn should_stop(&self, pages_processed: u64, consecutive_empty: u32) -> bool {
        self.max_pages.is_some_and(|max| pages_processed >= max)
            || self
                .max_consecutive_empty
                .is_some_and(|max| consecutive_empty >= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_url_appends_page_number() {
        let layout = SiteLayout::default();
        let url = layout.listing_url(1).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sa.aqar.fm/%D8%B9%D9%82%D8%A7%D8%B1%D8%A7%D8%AA/1"
        );
    }

    #[test]
    fn next_page_increments_trailing_segment() {
        let layout = SiteLayout::default();
        let current = layout.listing_url(41).unwrap();
        let next = layout.next_page_url(&current).unwrap();
        assert_eq!(next, layout.listing_url(42).unwrap());
    }

    #[test]
    fn next_page_resolves_against_listing_base() {
        let layout = SiteLayout::default();
        let elsewhere = Url::parse("https://sa.aqar.fm/somewhere/else/7").unwrap();
        let next = layout.next_page_url(&elsewhere).unwrap();
        assert_eq!(next, layout.listing_url(8).unwrap());
    }

    #[test]
    fn next_page_rejects_non_numeric_segment() {
        let layout = SiteLayout::default();
        let url = Url::parse("https://sa.aqar.fm/listing/abc").unwrap();
        assert!(matches!(
            layout.next_page_url(&url),
            Err(CrawlError::InvalidUrl(_))
        ));
    }

    #[test]
    fn resolve_makes_relative_hrefs_absolute() {
        let layout = SiteLayout::default();
        assert_eq!(
            layout.resolve("/ad/villa-123").as_deref(),
            Some("https://sa.aqar.fm/ad/villa-123")
        );
        assert_eq!(
            layout.resolve("https://cdn.example.com/a.jpg").as_deref(),
            Some("https://cdn.example.com/a.jpg")
        );
    }

    #[test]
    fn district_markers_are_configurable() {
        let mut layout = SiteLayout::default();
        assert!(layout.is_district("حي النرجس"));
        assert!(!layout.is_district("شمال الرياض"));

        layout.district_markers = vec!["District".to_string()];
        assert!(layout.is_district("Olaya District"));
        assert!(!layout.is_district("حي النرجس"));
    }

    #[test]
    fn partial_layout_override_keeps_defaults() {
        let layout: SiteLayout =
            serde_json::from_str(r#"{"selectors": {"title": "h1.title"}}"#).unwrap();
        assert_eq!(layout.selectors.title, "h1.title");
        assert_eq!(layout.origin, SiteLayout::default().origin);
        assert_eq!(
            layout.selectors.price,
            Selectors::default().price
        );
    }

    #[test]
    fn stop_policy_defaults_to_never() {
        let policy = StopPolicy::default();
        assert!(!policy.should_stop(u64::MAX - 1, u32::MAX - 1));
    }

    #[test]
    fn stop_policy_honours_both_limits() {
        let policy = StopPolicy {
            max_pages: Some(3),
            max_consecutive_empty: Some(2),
        };
        assert!(!policy.should_stop(2, 1));
        assert!(policy.should_stop(3, 0));
        assert!(policy.should_stop(1, 2));
    }
}
