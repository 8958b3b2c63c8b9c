//! Competition listing types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One `(title, href)` pair read from a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub title: String,
    pub href: String,
}

impl ListingEntry {
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
        }
    }

    /// Competition handle: the path segment after `/competitions/`.
    ///
    /// Returns `None` for links that do not point at a competition.
    pub fn competition_handle(&self) -> Option<&str> {
        let (_, rest) = self.href.split_once("/competitions/")?;
        let handle = rest.split(['/', '?', '#']).next().unwrap_or("");
        (!handle.is_empty()).then_some(handle)
    }
}

/// One rendered page of the paginated competition index.
#[derive(Debug, Clone)]
pub struct ListingPage {
    /// 1-based page index
    pub index: u32,

    /// Raw HTML snapshot after scrolling converged
    pub html: String,

    /// Entries extracted from `html`
    pub entries: Vec<ListingEntry>,

    pub fetched_at: DateTime<Utc>,
}

impl ListingPage {
    pub fn new(index: u32, html: impl Into<String>, entries: Vec<ListingEntry>) -> Self {
        Self {
            index,
            html: html.into(),
            entries,
            fetched_at: Utc::now(),
        }
    }

    /// Snapshot file name for this page index.
    pub fn file_name(index: u32) -> String {
        format!("page_{}.html", index)
    }

    /// Parse the page index back out of a snapshot file name.
    pub fn index_from_file_name(name: &str) -> Option<u32> {
        name.strip_prefix("page_")?.strip_suffix(".html")?.parse().ok()
    }
}

/// Persisted listing: parallel, index-aligned title and href sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub titles: Vec<String>,
    pub hrefs: Vec<String>,
}

impl Listing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = ListingEntry>) {
        for entry in entries {
            self.titles.push(entry.title);
            self.hrefs.push(entry.href);
        }
    }

    pub fn len(&self) -> usize {
        self.titles.len().min(self.hrefs.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> impl Iterator<Item = ListingEntry> + '_ {
        self.titles
            .iter()
            .zip(&self.hrefs)
            .map(|(t, h)| ListingEntry::new(t.clone(), h.clone()))
    }

    /// Competition handles in listing order, duplicates removed.
    pub fn competition_handles(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.entries()
            .filter_map(|e| e.competition_handle().map(str::to_string))
            .filter(|h| seen.insert(h.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_competition_handle() {
        let entry = ListingEntry::new("Titanic", "/competitions/titanic");
        assert_eq!(entry.competition_handle(), Some("titanic"));

        let entry = ListingEntry::new("Titanic", "https://www.kaggle.com/competitions/titanic/overview");
        assert_eq!(entry.competition_handle(), Some("titanic"));

        let entry = ListingEntry::new("Datasets", "/datasets/foo");
        assert_eq!(entry.competition_handle(), None);
    }

    #[test]
    fn test_file_name_round_trip() {
        assert_eq!(ListingPage::file_name(7), "page_7.html");
        assert_eq!(ListingPage::index_from_file_name("page_12.html"), Some(12));
        assert_eq!(ListingPage::index_from_file_name("notes.html"), None);
    }

    #[test]
    fn test_listing_json_shape() {
        let mut listing = Listing::new();
        listing.extend(vec![
            ListingEntry::new("A", "/competitions/a"),
            ListingEntry::new("B", "/competitions/b"),
        ]);
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["titles"], serde_json::json!(["A", "B"]));
        assert_eq!(json["hrefs"], serde_json::json!(["/competitions/a", "/competitions/b"]));
    }

    #[test]
    fn test_competition_handles_dedup() {
        let mut listing = Listing::new();
        listing.extend(vec![
            ListingEntry::new("A", "/competitions/a"),
            ListingEntry::new("A again", "/competitions/a"),
            ListingEntry::new("Other", "/learn/x"),
            ListingEntry::new("B", "/competitions/b"),
        ]);
        assert_eq!(listing.competition_handles(), vec!["a", "b"]);
    }
}
