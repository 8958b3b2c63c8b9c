//! Remote metadata source.

use async_trait::async_trait;

use crate::error::FetchResult;
use crate::types::work::KernelRef;

/// Issues a single metadata request. Retrying is the caller's job.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch_once(&self, key: &KernelRef) -> FetchResult<serde_json::Value>;
}
