//! Competition list extraction from a rendered listing page.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::types::listing::ListingEntry;

/// Class value carried by the competition list `<ul>` on listing pages.
pub const DEFAULT_LIST_MARKER: &str = "jpEqsK";

/// Locates the competition list by its class marker and reads its items.
#[derive(Debug, Clone)]
pub struct ListingExtractor {
    marker: String,
}

impl Default for ListingExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_LIST_MARKER)
    }
}

impl ListingExtractor {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Extract entries, or `None` when no list carries the marker.
    pub fn try_extract(&self, html: &str) -> Option<Vec<ListingEntry>> {
        let document = Html::parse_document(html);
        let ul = Selector::parse("ul").ok()?;
        let anchor = Selector::parse("a").ok()?;

        let container = document
            .select(&ul)
            .find(|el| el.value().classes().any(|c| c == self.marker))?;

        let entries = container
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|li| li.value().name() == "li")
            .filter_map(|li| {
                let title = li.value().attr("aria-label")?.trim();
                let href = li.select(&anchor).next()?.value().attr("href")?.trim();
                if title.is_empty() || href.is_empty() {
                    debug!(title, href, "Skipping incomplete list item");
                    return None;
                }
                Some(ListingEntry::new(title, href))
            })
            .collect();

        Some(entries)
    }

    /// Extract entries; a missing container yields an empty list.
    pub fn extract(&self, html: &str) -> Vec<ListingEntry> {
        self.try_extract(html).unwrap_or_default()
    }
}

/// Extract `(title, href)` pairs using the default list marker.
pub fn extract_listing(html: &str) -> Vec<ListingEntry> {
    ListingExtractor::default().extract(html)
}
