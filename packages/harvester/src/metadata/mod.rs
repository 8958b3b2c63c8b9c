//! Kernel metadata fetching.

pub mod client;
pub mod http;

pub use client::{best_public_score, FetchOutcome, MetadataClient};
pub use http::{HttpMetadataSource, KernelViewRequest};
