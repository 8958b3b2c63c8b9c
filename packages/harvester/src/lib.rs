//! Competition and Kernel Harvester
//!
//! Collects competition listings, descriptions and kernel metadata from
//! Kaggle into flat files (HTML snapshots, JSON, CSV).
//!
//! # Stages
//!
//! 1. Crawl the infinite-scroll competition index with a headless browser
//! 2. Parse snapshots into `(title, href)` pairs
//! 3. Merge several ranked kernel queries per competition into a top-K table
//! 4. Enrich the kernel table with metadata, checkpointing as it goes
//!
//! # Usage
//!
//! ```rust,ignore
//! use harvester::{BatchRunner, CsvCheckpointStore, MetadataClient, RetryPolicy};
//! use harvester::testing::MockMetadataSource;
//!
//! let client = MetadataClient::new(MockMetadataSource::new(), RetryPolicy::default());
//! let store = CsvCheckpointStore::new("kernels_enriched.csv");
//! let resume = store.load().await?;
//! let report = BatchRunner::new(client, store)
//!     .with_interval(250)
//!     .run(&table, resume)
//!     .await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Seams to the browser, metadata API, listing CLI and checkpoint file
//! - [`types`] - Listing, kernel and checkpoint data types
//! - [`extract`] - HTML field extraction
//! - [`browser`] - Dynamic page loader and the Chromium session
//! - [`metadata`] - Retrying metadata client
//! - [`pipeline`] - Stage drivers
//! - [`testing`] - Mock implementations for testing

pub mod browser;
pub mod config;
pub mod error;
pub mod extract;
pub mod files;
pub mod metadata;
pub mod pipeline;
pub mod retry;
pub mod security;
pub mod sources;
pub mod table;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use config::{HarvestConfig, MetadataConfig, ScrollConfig};
pub use error::{FetchError, HarvestError, ListingError, LoadError};
pub use metadata::{FetchOutcome, HttpMetadataSource, MetadataClient};
pub use pipeline::{BatchRunner, CsvCheckpointStore, Merger, RunReport};
pub use retry::{retry, RetryOutcome, RetryPolicy};
pub use traits::{
    browser::{BrowserSession, SessionLauncher},
    checkpoint::CheckpointStore,
    listing::{KernelListing, KernelPuller},
    metadata::MetadataSource,
};
pub use types::{
    candidate::{Candidate, CandidateSet, KernelRow, SortBy},
    checkpoint::Checkpoint,
    description::CompetitionDescription,
    listing::{Listing, ListingEntry, ListingPage},
    work::{EnrichedRecord, KernelRef, WorkItem, WorkTable},
};
