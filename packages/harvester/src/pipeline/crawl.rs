//! Listing crawl and snapshot parsing stages.

use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::browser::PageLoader;
use crate::error::Result;
use crate::extract::ListingExtractor;
use crate::traits::browser::SessionLauncher;
use crate::types::listing::{Listing, ListingPage};

/// Default page range of the competition index.
pub const DEFAULT_PAGES: RangeInclusive<u32> = 1..=34;

/// Default pause between two page loads.
pub const DEFAULT_PAGE_PAUSE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub saved: Vec<u32>,
    pub failed: Vec<u32>,
}

/// Load each page in order and write its snapshot to `out_dir/page_{n}.html`.
///
/// A page that fails to load is logged and skipped. Failing to create
/// `out_dir` is the only error returned.
pub async fn crawl_listing_pages<L: SessionLauncher>(
    loader: &PageLoader<L>,
    pages: RangeInclusive<u32>,
    out_dir: &Path,
    pause: Duration,
) -> Result<CrawlSummary> {
    fs::create_dir_all(out_dir)?;
    let extractor = ListingExtractor::default();
    let mut summary = CrawlSummary::default();
    let last = *pages.end();

    for index in pages {
        match loader.load(index).await {
            Ok(html) => {
                let entries = extractor.extract(&html);
                let page = ListingPage::new(index, html, entries);
                let path = out_dir.join(ListingPage::file_name(page.index));
                match fs::write(&path, &page.html) {
                    Ok(()) => {
                        let found = page.entries.len();
                        if found == 0 {
                            warn!(page = index, "Snapshot has no listing entries");
                        }
                        info!(page = index, entries = found, path = %path.display(), "Snapshot saved");
                        summary.saved.push(index);
                    }
                    Err(e) => {
                        error!(page = index, error = %e, "Failed to write snapshot");
                        summary.failed.push(index);
                    }
                }
            }
            Err(e) => {
                error!(page = index, error = %e, "Failed to load page");
                summary.failed.push(index);
            }
        }

        if index != last {
            tokio::time::sleep(pause).await;
        }
    }

    info!(
        saved = summary.saved.len(),
        failed = summary.failed.len(),
        "Crawl finished"
    );
    Ok(summary)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseSummary {
    pub listing: Listing,

    /// Snapshots in which no entries were found
    pub empty: Vec<PathBuf>,

    /// Snapshots that could not be read
    pub unreadable: Vec<PathBuf>,
}

/// Snapshot files in `dir`, ordered by page index.
pub fn snapshot_files(dir: &Path) -> Result<Vec<(u32, PathBuf)>> {
    let mut files: Vec<(u32, PathBuf)> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter_map(|path| {
            let index = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(ListingPage::index_from_file_name)?;
            Some((index, path))
        })
        .collect();
    files.sort_by_key(|(index, _)| *index);
    Ok(files)
}

/// Extract entries from every snapshot in `dir`, in page order.
pub fn parse_snapshots(dir: &Path, extractor: &ListingExtractor) -> Result<ParseSummary> {
    let mut summary = ParseSummary::default();

    for (index, path) in snapshot_files(dir)? {
        let html = match fs::read_to_string(&path) {
            Ok(html) => html,
            Err(e) => {
                error!(page = index, error = %e, "Failed to read snapshot");
                summary.unreadable.push(path);
                continue;
            }
        };

        let entries = extractor.extract(&html);
        if entries.is_empty() {
            warn!(path = %path.display(), "No competition found in snapshot");
            summary.empty.push(path);
            continue;
        }
        summary.listing.extend(entries);
    }

    info!(
        entries = summary.listing.len(),
        empty = summary.empty.len(),
        unreadable = summary.unreadable.len(),
        "Snapshots parsed"
    );
    Ok(summary)
}
