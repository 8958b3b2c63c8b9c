//! Harvest stages.
//!
//! Each stage runs its units of work one after another and finishes
//! best-effort:
//! - Crawl (listing pages → snapshots) and parse (snapshots → listing)
//! - Describe (overview and data pages → descriptions)
//! - Merge (ranked listing queries → deduplicated kernel table)
//! - Enrich (kernel table → metadata, checkpointed)
//! - Download and code export

pub mod checkpoint;
pub mod crawl;
pub mod describe;
pub mod download;
pub mod merge;
pub mod notebook;
pub mod orchestrator;

pub use checkpoint::CsvCheckpointStore;
pub use crawl::{crawl_listing_pages, parse_snapshots, CrawlSummary, ParseSummary};
pub use describe::describe_competitions;
pub use download::{download_kernels, DownloadSummary};
pub use merge::{derive_filename, MergeSummary, Merger};
pub use notebook::{export_code, notebook_to_text, ExportSummary};
pub use orchestrator::{BatchRunner, RunReport};
