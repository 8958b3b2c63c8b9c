//! Work items driving the metadata batch and their enriched results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column holding the two-part kernel reference in every kernel table.
pub const KERNEL_HANDLE_COLUMN: &str = "kernel-handle";

/// Column holding the derived local filename.
pub const LOCAL_FILENAME_COLUMN: &str = "local-filename";

/// Column holding the competition handle in merged kernel tables.
pub const COMPETITION_HANDLE_COLUMN: &str = "competition-handle";

/// Appended column: compact JSON of the fetched metadata, empty when exhausted.
pub const METADATA_COLUMN: &str = "kernel-metadata";

/// Appended column: best public score read from the metadata.
pub const SCORE_COLUMN: &str = "public-score";

/// A validated `account/slug` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KernelRef {
    author: String,
    slug: String,
}

/// Returned when a reference does not split into exactly two non-empty parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidKernelRef(pub String);

impl fmt::Display for InvalidKernelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid kernel reference {:?} (expected account/slug)", self.0)
    }
}

impl std::error::Error for InvalidKernelRef {}

impl KernelRef {
    pub fn new(author: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            slug: slug.into(),
        }
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }
}

impl FromStr for KernelRef {
    type Err = InvalidKernelRef;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut parts = trimmed.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(author), Some(slug), None) if !author.is_empty() && !slug.is_empty() => {
                Ok(Self::new(author, slug))
            }
            _ => Err(InvalidKernelRef(s.to_string())),
        }
    }
}

impl TryFrom<String> for KernelRef {
    type Error = InvalidKernelRef;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KernelRef> for String {
    fn from(value: KernelRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for KernelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.author, self.slug)
    }
}

/// One row of the driving table.
///
/// Keeps the full source record so the output table preserves the input schema.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub key: KernelRef,
    pub fields: Vec<String>,
}

impl WorkItem {
    pub fn new(key: KernelRef, fields: Vec<String>) -> Self {
        Self { key, fields }
    }
}

/// Header row plus the ordered work items of a kernel table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkTable {
    pub headers: Vec<String>,
    pub items: Vec<WorkItem>,
}

impl WorkTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            items: Vec::new(),
        }
    }

    /// Build a table with only the kernel-handle column.
    pub fn from_keys(keys: impl IntoIterator<Item = KernelRef>) -> Self {
        let mut table = Self::new(vec![KERNEL_HANDLE_COLUMN.to_string()]);
        for key in keys {
            let fields = vec![key.to_string()];
            table.items.push(WorkItem::new(key, fields));
        }
        table
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Value of `column` for `item`, if both exist.
    pub fn field<'a>(&self, item: &'a WorkItem, column: &str) -> Option<&'a str> {
        self.column(column)
            .and_then(|i| item.fields.get(i))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A work item plus the outcome of its metadata fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub item: WorkItem,

    /// Fetched metadata; `None` when retries were exhausted
    pub metadata: Option<serde_json::Value>,

    /// Best public score read from `metadata`
    pub public_score: Option<f64>,
}

impl EnrichedRecord {
    pub fn resolved(item: WorkItem, metadata: serde_json::Value, public_score: Option<f64>) -> Self {
        Self {
            item,
            metadata: Some(metadata),
            public_score,
        }
    }

    pub fn unresolved(item: WorkItem) -> Self {
        Self {
            item,
            metadata: None,
            public_score: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.metadata.is_some()
    }
}
