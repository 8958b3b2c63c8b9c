//! Ranked kernel candidates and their deduplicated union.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ranking dimension of a kernel listing query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    VoteCount,
    Hotness,
    ScoreDescending,
    ViewCount,
}

impl SortBy {
    /// Value passed to the listing source.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::VoteCount => "voteCount",
            SortBy::Hotness => "hotness",
            SortBy::ScoreDescending => "scoreDescending",
            SortBy::ViewCount => "viewCount",
        }
    }

    /// Default query plan. Vote count runs twice; the repeat is a tie-favoring pass.
    pub fn default_plan() -> Vec<SortBy> {
        vec![
            SortBy::VoteCount,
            SortBy::Hotness,
            SortBy::ScoreDescending,
            SortBy::ViewCount,
            SortBy::VoteCount,
        ]
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row returned by a ranked listing query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Two-part `account/slug` reference, the dedup key
    #[serde(rename = "ref")]
    pub reference: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default, rename = "lastRunTime")]
    pub last_run_time: Option<String>,

    #[serde(default, rename = "totalVotes")]
    pub total_votes: Option<i64>,

    /// Query that first produced this candidate
    #[serde(skip)]
    pub found_by: Option<SortBy>,
}

impl Candidate {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            title: None,
            author: None,
            last_run_time: None,
            total_votes: None,
            found_by: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_votes(mut self, votes: i64) -> Self {
        self.total_votes = Some(votes);
        self
    }

    pub fn found_by(mut self, sort_by: SortBy) -> Self {
        self.found_by = Some(sort_by);
        self
    }
}

/// Union of ranked query results for one competition, keyed by reference.
///
/// At most one entry per reference; the first-seen entry is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSet {
    entries: IndexMap<String, Candidate>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the reference is already present. Returns whether it was added.
    pub fn insert(&mut self, candidate: Candidate) -> bool {
        if self.entries.contains_key(&candidate.reference) {
            return false;
        }
        self.entries.insert(candidate.reference.clone(), candidate);
        true
    }

    /// Union another batch of results, keeping first-seen entries. Returns the number added.
    pub fn merge(&mut self, candidates: impl IntoIterator<Item = Candidate>) -> usize {
        candidates.into_iter().filter(|c| self.insert(c.clone())).count()
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.entries.contains_key(reference)
    }

    pub fn get(&self, reference: &str) -> Option<&Candidate> {
        self.entries.get(reference)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.entries.values()
    }

    pub fn into_vec(self) -> Vec<Candidate> {
        self.entries.into_values().collect()
    }
}

impl FromIterator<Candidate> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        let mut set = Self::new();
        set.merge(iter);
        set
    }
}

/// One row of the merged kernel table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelRow {
    #[serde(rename = "kernel-handle")]
    pub kernel_handle: String,

    pub title: Option<String>,

    pub author: Option<String>,

    #[serde(rename = "lastRunTime")]
    pub last_run_time: Option<String>,

    #[serde(rename = "totalVotes")]
    pub total_votes: Option<i64>,

    #[serde(rename = "competition-handle")]
    pub competition_handle: String,

    /// Empty when the reference could not be turned into a filename
    #[serde(rename = "local-filename")]
    pub local_filename: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_wins() {
        let mut set = CandidateSet::new();
        assert!(set.insert(Candidate::new("a/x").found_by(SortBy::VoteCount)));
        assert!(!set.insert(Candidate::new("a/x").found_by(SortBy::Hotness)));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("a/x").unwrap().found_by, Some(SortBy::VoteCount));
    }

    #[test]
    fn test_merge_preserves_order() {
        let mut set = CandidateSet::new();
        set.merge(vec![Candidate::new("a/1"), Candidate::new("a/2")]);
        let added = set.merge(vec![Candidate::new("a/2"), Candidate::new("a/3")]);
        assert_eq!(added, 1);
        assert_eq!(set.references().collect::<Vec<_>>(), vec!["a/1", "a/2", "a/3"]);
    }

    #[test]
    fn test_default_plan() {
        let plan = SortBy::default_plan();
        assert_eq!(plan.len(), 5);
        assert_eq!(plan.first(), Some(&SortBy::VoteCount));
        assert_eq!(plan.last(), Some(&SortBy::VoteCount));
    }
}
