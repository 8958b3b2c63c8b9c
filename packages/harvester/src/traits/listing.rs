//! Ranked kernel listings and kernel source pulls.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::ListingResult;
use crate::types::candidate::{Candidate, SortBy};
use crate::types::work::KernelRef;

/// Lists kernels of one competition ranked by a single dimension.
#[async_trait]
pub trait KernelListing: Send + Sync {
    async fn list(
        &self,
        competition: &str,
        sort_by: SortBy,
        page_size: usize,
    ) -> ListingResult<Vec<Candidate>>;
}

/// Downloads a kernel's source file.
#[async_trait]
pub trait KernelPuller: Send + Sync {
    /// Pull `key` into `dir` and return the path of the pulled file.
    async fn pull(&self, key: &KernelRef, dir: &Path) -> ListingResult<PathBuf>;
}
