//! Checkpoint persistence.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::checkpoint::Checkpoint;

/// Durable storage for batch checkpoints.
///
/// `save` replaces the previous checkpoint all-or-nothing: a reader sees
/// either the old snapshot or the new one, never a partial write.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<()>;

    async fn load(&self) -> Result<Option<Checkpoint>>;
}
