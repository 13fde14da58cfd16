use crate::error::{CrawlError, Result};
use crate::models::{AdRecord, FilterCell};
use crate::scrapers::traits::PageExtractor;
use crate::scrapers::types::SiteLayout;
use percent_encoding::percent_decode_str;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Parsed DOM snapshot of a rendered page
pub struct HtmlPage {
    document: Html,
}

impl HtmlPage {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    fn select(&self, selector: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(selector) {
            Ok(selector) => self.document.select(&selector).collect(),
            Err(e) => {
                debug!("Invalid selector {:?}: {:?}", selector, e);
                Vec::new()
            }
        }
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

impl PageExtractor for HtmlPage {
    fn text(&self, selector: &str) -> Option<String> {
        self.select(selector).into_iter().next().map(element_text)
    }

    fn attr(&self, selector: &str, name: &str) -> Option<String> {
        self.select(selector)
            .into_iter()
            .next()
            .and_then(|el| el.value().attr(name))
            .map(str::to_string)
    }

    fn all_attrs(&self, selector: &str, name: &str) -> Vec<String> {
        self.select(selector)
            .into_iter()
            .filter_map(|el| el.value().attr(name))
            .map(str::to_string)
            .collect()
    }

    fn all_texts(&self, selector: &str) -> Vec<String> {
        self.select(selector).into_iter().map(element_text).collect()
    }

    fn cells(&self, selector: &str) -> Vec<FilterCell> {
        let img = Selector::parse("img").ok();
        self.select(selector)
            .into_iter()
            .map(|cell| {
                match img.as_ref().and_then(|img| cell.select(img).next()) {
                    Some(icon) => FilterCell::Icon {
                        src: icon.value().attr("src").map(str::to_string),
                    },
                    None => FilterCell::Text(element_text(cell)),
                }
            })
            .collect()
    }
}

/// Listing id: every digit of the last hyphen-delimited token of the URL path.
/// The path is percent-decoded first so escaped Arabic slugs don't leak hex digits.
pub fn ad_id_from_url(url: &str) -> String {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    let path = percent_decode_str(&path).decode_utf8_lossy();

    digits(path.rsplit('-').next().unwrap_or_default())
}

/// Map a filter-table cell to its stored value.
/// Only the "available" icon counts; any other icon drops the row.
pub fn normalize_cell(cell: FilterCell, available_icon: &str) -> Option<String> {
    match cell {
        FilterCell::Text(text) => Some(text),
        FilterCell::Icon { src } if src.as_deref() == Some(available_icon) => Some("1".to_string()),
        FilterCell::Icon { .. } => None,
    }
}

/// Labels and values of the filter table, paired by position
pub fn filter_table(page: &dyn PageExtractor, layout: &SiteLayout) -> (Vec<String>, Vec<String>) {
    let labels = page.all_texts(&layout.selectors.filter_labels);
    let cells = page.cells(&layout.selectors.filter_values);

    labels
        .into_iter()
        .zip(cells)
        .filter_map(|(label, cell)| {
            normalize_cell(cell, &layout.available_icon).map(|value| (label, value))
        })
        .unzip()
}

fn digits(text: &str) -> String {
    text.chars().filter(|c| c.is_numeric()).collect()
}

/// Build an `AdRecord` from the page as first rendered.
/// `map_url` is left empty; it needs a second snapshot after the map click.
pub fn extract_ad(url: &str, page: &dyn PageExtractor, layout: &SiteLayout) -> Result<AdRecord> {
    let selectors = &layout.selectors;
    let required = |selector: &str, field: &'static str| {
        page.text(selector).ok_or_else(|| CrawlError::Extraction {
            field,
            url: url.to_string(),
        })
    };

    let ad_id = ad_id_from_url(url);
    if ad_id.is_empty() {
        return Err(CrawlError::Extraction {
            field: "adid",
            url: url.to_string(),
        });
    }

    let title = required(&selectors.title, "title")?;
    let description = page.text(&selectors.description).unwrap_or_default();

    let category = required(&selectors.category, "category")?;
    let city = required(&selectors.city, "city")?;
    let city_district_parent = required(&selectors.city_district_parent, "city_district_parent")?;
    let district = if layout.is_district(&city_district_parent) {
        city_district_parent.clone()
    } else {
        required(&selectors.district, "district")?
    };

    let images = page
        .all_attrs(&selectors.gallery_images, "src")
        .iter()
        .filter_map(|src| layout.resolve(src))
        .collect();

    let author_name = page.text(&selectors.author_name);
    let author_url = page
        .attr(&selectors.author_link, "href")
        .and_then(|href| layout.resolve(&href));

    let price = page
        .text(&selectors.price)
        .map(|text| digits(&text))
        .filter(|price| !price.is_empty());

    let (filters, values) = filter_table(page, layout);

    Ok(AdRecord {
        ad_id,
        title,
        description,
        author_name,
        price,
        filters,
        values,
        category,
        author_url,
        city,
        city_district_parent,
        district,
        images,
        map_url: None,
    })
}

/// Map link, only rendered once the gallery's map thumbnail has been clicked
pub fn extract_map_url(page: &dyn PageExtractor, layout: &SiteLayout) -> Option<String> {
    page.attr(&layout.selectors.map_link, "href")
        .and_then(|href| layout.resolve(&href))
}

/// Absolute ad URLs linked from a category page, in page order
pub fn ad_links(page: &dyn PageExtractor, layout: &SiteLayout) -> Vec<String> {
    page.all_attrs(&layout.selectors.ad_links, "href")
        .iter()
        .filter_map(|href| layout.resolve(href))
        .collect()
}
