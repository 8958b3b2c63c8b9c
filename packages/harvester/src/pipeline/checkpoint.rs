//! CSV checkpoint store.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{HarvestError, Result};
use crate::files::atomic_write;
use crate::table::{decode_enriched, encode_enriched};
use crate::traits::checkpoint::CheckpointStore;
use crate::types::checkpoint::Checkpoint;

/// Keeps the checkpoint as the enriched output table itself.
///
/// Each save rewrites the whole file through a temp file and rename.
#[derive(Debug, Clone)]
pub struct CsvCheckpointStore {
    path: PathBuf,
}

impl CsvCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CheckpointStore for CsvCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        atomic_write(&self.path, |w| encode_enriched(w, checkpoint))
            .map_err(|e| HarvestError::Checkpoint(Box::new(e)))?;
        info!(
            path = %self.path.display(),
            rows = checkpoint.processed(),
            "Checkpoint saved"
        );
        Ok(())
    }

    async fn load(&self) -> Result<Option<Checkpoint>> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(HarvestError::input_table(&self.path, e)),
        };
        decode_enriched(file, &self.path).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::work::{EnrichedRecord, KernelRef, WorkItem};

    fn sample() -> Checkpoint {
        let item = WorkItem::new(KernelRef::new("a", "b"), vec!["a/b".into()]);
        Checkpoint::new(
            vec!["kernel-handle".into()],
            vec![EnrichedRecord::resolved(
                item,
                serde_json::json!({"kernel": {"bestPublicScore": 1.5}}),
                Some(1.5),
            )],
        )
    }

    #[tokio::test]
    async fn test_missing_checkpoint_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvCheckpointStore::new(dir.path().join("out.csv"));
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvCheckpointStore::new(dir.path().join("out.csv"));

        store.save(&sample()).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(sample()));
    }
}
