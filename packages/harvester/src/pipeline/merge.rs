//! Multi-query merger: a bounded top-K kernel sample per competition.

use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::traits::listing::KernelListing;
use crate::types::candidate::{Candidate, CandidateSet, KernelRow, SortBy};

/// Default rows requested per ranked query.
pub const DEFAULT_PAGE_SIZE: usize = 5;

const FORBIDDEN: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if FORBIDDEN.contains(&c) { '_' } else { c })
        .collect()
}

/// Local notebook filename for a kernel reference.
///
/// `alice/titanic-eda` becomes `alice__titanic-eda.ipynb`. Returns `None` unless
/// the reference has exactly two parts.
pub fn derive_filename(reference: &str) -> Option<String> {
    let mut parts = reference.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(author), Some(slug), None) => {
            Some(format!("{}__{}.ipynb", sanitize(author), sanitize(slug)))
        }
        _ => None,
    }
}

/// Output of merging several competitions.
#[derive(Debug, Clone, Default)]
pub struct MergeSummary {
    /// Globally deduplicated rows, competition order then query order
    pub rows: Vec<KernelRow>,

    /// Competitions for which no query returned anything
    pub failed_competitions: Vec<String>,
}

/// Runs a fixed plan of ranked queries against a [`KernelListing`].
pub struct Merger<L: KernelListing> {
    listing: L,
    plan: Vec<SortBy>,
    page_size: usize,
}

impl<L: KernelListing> Merger<L> {
    pub fn new(listing: L) -> Self {
        Self {
            listing,
            plan: SortBy::default_plan(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_plan(mut self, plan: Vec<SortBy>) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn listing(&self) -> &L {
        &self.listing
    }

    /// Union of every query in the plan, first-seen wins.
    ///
    /// A query that fails or returns nothing contributes nothing.
    pub async fn top_k(&self, competition: &str) -> CandidateSet {
        let mut set = CandidateSet::new();

        for &sort_by in &self.plan {
            let candidates = match self.listing.list(competition, sort_by, self.page_size).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(competition, sort_by = %sort_by, error = %e, "Listing query failed");
                    continue;
                }
            };
            if candidates.is_empty() {
                debug!(competition, sort_by = %sort_by, "Listing query returned nothing");
                continue;
            }

            let added = set.merge(candidates.into_iter().map(|c| c.found_by(sort_by)));
            debug!(competition, sort_by = %sort_by, added, total = set.len(), "Merged query");
        }

        set
    }

    /// Run [`Self::top_k`] for each competition and flatten into kernel rows.
    pub async fn merge_competitions(&self, competitions: &[String]) -> MergeSummary {
        let mut summary = MergeSummary::default();
        let mut seen: HashSet<String> = HashSet::new();

        for competition in competitions {
            let set = self.top_k(competition).await;
            if set.is_empty() {
                warn!(competition = %competition, "No kernels found");
                summary.failed_competitions.push(competition.clone());
                continue;
            }

            let before = summary.rows.len();
            for candidate in set.into_vec() {
                if seen.insert(candidate.reference.clone()) {
                    summary.rows.push(kernel_row(candidate, competition));
                }
            }
            info!(
                competition = %competition,
                kernels = summary.rows.len() - before,
                "Competition merged"
            );
        }

        info!(
            rows = summary.rows.len(),
            failed = summary.failed_competitions.len(),
            "Kernel merge finished"
        );
        summary
    }
}

fn kernel_row(candidate: Candidate, competition: &str) -> KernelRow {
    let local_filename = derive_filename(&candidate.reference);
    if local_filename.is_none() {
        warn!(reference = %candidate.reference, "Malformed kernel reference");
    }
    KernelRow {
        kernel_handle: candidate.reference,
        title: candidate.title,
        author: candidate.author,
        last_run_time: candidate.last_run_time,
        total_votes: candidate.total_votes,
        competition_handle: competition.to_string(),
        local_filename,
    }
}
