//! Batch orchestrator: ordered metadata enrichment with periodic checkpoints.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::error::{HarvestError, Result};
use crate::metadata::{best_public_score, FetchOutcome, MetadataClient};
use crate::traits::checkpoint::CheckpointStore;
use crate::traits::metadata::MetadataSource;
use crate::types::checkpoint::Checkpoint;
use crate::types::work::{EnrichedRecord, KernelRef, WorkTable};

/// Default number of processed items between checkpoint writes.
pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 250;

/// Summary of one orchestrator run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// All records in input order, including ones restored from a checkpoint
    pub records: Vec<EnrichedRecord>,

    /// Keys whose fetch was exhausted during this run
    pub failed: Vec<KernelRef>,

    /// Keys restored from the checkpoint without metadata
    pub previously_failed: Vec<KernelRef>,

    /// Items skipped because the checkpoint already covered them
    pub resumed: usize,

    pub checkpoints_written: usize,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn resolved(&self) -> usize {
        self.records.iter().filter(|r| r.is_resolved()).count()
    }

    pub fn log_summary(&self) {
        info!(
            rows = self.records.len(),
            resolved = self.resolved(),
            failed = self.failed.len(),
            previously_failed = self.previously_failed.len(),
            resumed = self.resumed,
            checkpoints = self.checkpoints_written,
            elapsed_secs = (self.finished_at - self.started_at).num_seconds(),
            "Metadata run finished"
        );
        if !self.failed.is_empty() {
            let keys: Vec<String> = self.failed.iter().map(ToString::to_string).collect();
            warn!(count = keys.len(), keys = ?keys, "Keys without metadata");
        }
    }
}

/// Fetches metadata for every work item in order and checkpoints progress.
pub struct BatchRunner<S: MetadataSource, C: CheckpointStore> {
    client: MetadataClient<S>,
    store: C,
    interval: usize,
}

/// Check that `checkpoint` has the columns of `table` and covers a prefix of
/// it, key by key. Row 0 is the header row.
fn verify_prefix(table: &WorkTable, checkpoint: &Checkpoint) -> Result<()> {
    if checkpoint.processed() > 0 && checkpoint.headers != table.headers {
        return Err(HarvestError::CheckpointMismatch {
            row: 0,
            expected: table.headers.join(","),
            found: checkpoint.headers.join(","),
        });
    }
    if checkpoint.processed() > table.len() {
        return Err(HarvestError::CheckpointMismatch {
            row: table.len() + 1,
            expected: "end of input".into(),
            found: format!("{} checkpointed rows", checkpoint.processed()),
        });
    }
    for (row, (record, item)) in checkpoint.records.iter().zip(&table.items).enumerate() {
        if record.item.key != item.key {
            return Err(HarvestError::CheckpointMismatch {
                row: row + 1,
                expected: item.key.to_string(),
                found: record.item.key.to_string(),
            });
        }
    }
    Ok(())
}

impl<S: MetadataSource, C: CheckpointStore> BatchRunner<S, C> {
    pub fn new(client: MetadataClient<S>, store: C) -> Self {
        Self {
            client,
            store,
            interval: DEFAULT_CHECKPOINT_INTERVAL,
        }
    }

    /// Checkpoint every `interval` processed items (minimum 1).
    pub fn with_interval(mut self, interval: usize) -> Self {
        self.interval = interval.max(1);
        self
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    /// Process `table`, skipping the items covered by `resume`.
    ///
    /// Only a mismatched checkpoint or a failed checkpoint write ends the run
    /// early; exhausted fetches are recorded and the run continues.
    pub async fn run(&self, table: &WorkTable, resume: Option<Checkpoint>) -> Result<RunReport> {
        let started_at = Utc::now();

        let (mut records, previously_failed) = match resume {
            Some(checkpoint) => {
                verify_prefix(table, &checkpoint)?;
                let unresolved = checkpoint.unresolved_keys();
                (checkpoint.records, unresolved)
            }
            None => (Vec::with_capacity(table.len()), Vec::new()),
        };
        let resumed = records.len();

        if resumed > 0 {
            info!(resumed, total = table.len(), "Resuming from checkpoint");
        }

        let mut failed = Vec::new();
        let mut checkpoints_written = 0;
        let total = table.len();

        for (index, item) in table.items.iter().enumerate().skip(resumed) {
            let record = match self.client.fetch(&item.key).await {
                FetchOutcome::Resolved { payload, .. } => {
                    let score = best_public_score(&payload);
                    EnrichedRecord::resolved(item.clone(), payload, score)
                }
                FetchOutcome::Exhausted {
                    key,
                    attempts,
                    last_error,
                } => {
                    error!(key = %key, attempts, error = %last_error, "No metadata for key");
                    failed.push(key);
                    EnrichedRecord::unresolved(item.clone())
                }
            };
            records.push(record);

            let processed = index + 1;
            if processed % self.interval == 0 || processed == total {
                let checkpoint = Checkpoint::new(table.headers.clone(), records);
                self.store.save(&checkpoint).await?;
                records = checkpoint.records;
                checkpoints_written += 1;
                info!(processed, total, "Progress saved");
            }
        }

        let report = RunReport {
            records,
            failed,
            previously_failed,
            resumed,
            checkpoints_written,
            started_at,
            finished_at: Utc::now(),
        };
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use crate::testing::{MemoryCheckpointStore, MockMetadataSource};
    use serde_json::json;

    fn keys(n: usize) -> Vec<KernelRef> {
        (0..n).map(|i| KernelRef::new("author", format!("k{}", i))).collect()
    }

    fn source_for(keys: &[KernelRef]) -> MockMetadataSource {
        keys.iter().enumerate().fold(MockMetadataSource::new(), |s, (i, k)| {
            s.with_payload(k, json!({"kernel": {"bestPublicScore": i as f64}}))
        })
    }

    fn runner(
        source: MockMetadataSource,
        store: MemoryCheckpointStore,
        interval: usize,
    ) -> BatchRunner<MockMetadataSource, MemoryCheckpointStore> {
        BatchRunner::new(MetadataClient::new(source, RetryPolicy::default()), store)
            .with_interval(interval)
    }

    #[tokio::test]
    async fn test_checkpoints_every_interval_and_at_end() {
        let keys = keys(5);
        let table = WorkTable::from_keys(keys.clone());
        let store = MemoryCheckpointStore::new();

        let report = runner(source_for(&keys), store.clone(), 2)
            .run(&table, None)
            .await
            .unwrap();

        assert_eq!(report.checkpoints_written, 3);
        assert_eq!(store.saved_sizes(), vec![2, 4, 5]);
        assert_eq!(report.records.len(), 5);
        assert_eq!(report.records[3].public_score, Some(3.0));
    }

    #[tokio::test]
    async fn test_preserves_input_order() {
        let keys = keys(4);
        let table = WorkTable::from_keys(keys.clone());
        let source = source_for(&keys);

        let report = runner(source.clone(), MemoryCheckpointStore::new(), 10)
            .run(&table, None)
            .await
            .unwrap();

        let order: Vec<KernelRef> = report.records.iter().map(|r| r.item.key.clone()).collect();
        assert_eq!(order, keys);
        assert_eq!(source.call_order(), keys);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_matches_uninterrupted_run() {
        let keys = keys(6);
        let table = WorkTable::from_keys(keys.clone());
        let failing = keys[1].clone();

        let full = runner(
            source_for(&keys).always_failing(&failing),
            MemoryCheckpointStore::new(),
            3,
        )
        .run(&table, None)
        .await
        .unwrap();

        // First checkpoint of an identical run, as if the process died right after it.
        let interrupted_store = MemoryCheckpointStore::new();
        runner(
            source_for(&keys).always_failing(&failing),
            interrupted_store.clone(),
            3,
        )
        .run(&table, None)
        .await
        .unwrap();
        let checkpoint = interrupted_store.saved().remove(0);
        assert_eq!(checkpoint.processed(), 3);

        let resumed_source = source_for(&keys);
        let resumed = runner(resumed_source.clone(), MemoryCheckpointStore::new(), 3)
            .run(&table, Some(checkpoint))
            .await
            .unwrap();

        assert_eq!(resumed.records, full.records);
        assert_eq!(resumed.resumed, 3);
        assert_eq!(resumed.previously_failed, vec![failing]);
        // Nothing covered by the checkpoint was fetched again.
        assert_eq!(resumed_source.call_order(), keys[3..].to_vec());
    }

    #[tokio::test]
    async fn test_rejects_mismatched_checkpoint() {
        let keys = keys(3);
        let table = WorkTable::from_keys(keys.clone());
        let other = WorkTable::from_keys(vec![KernelRef::new("someone", "else")]);
        let checkpoint = Checkpoint::new(
            other.headers.clone(),
            vec![EnrichedRecord::unresolved(other.items[0].clone())],
        );

        let err = runner(source_for(&keys), MemoryCheckpointStore::new(), 2)
            .run(&table, Some(checkpoint))
            .await
            .unwrap_err();

        assert!(matches!(err, HarvestError::CheckpointMismatch { row: 1, .. }));
    }

    #[tokio::test]
    async fn test_rejects_checkpoint_with_different_columns() {
        let keys = keys(2);
        let mut table = WorkTable::new(vec!["kernel-handle".into(), "local-filename".into()]);
        for key in &keys {
            let fields = vec![key.to_string(), format!("{}.ipynb", key.slug())];
            table.items.push(crate::types::work::WorkItem::new(key.clone(), fields));
        }
        let stale = WorkTable::from_keys(vec![keys[0].clone()]);
        let checkpoint = Checkpoint::new(
            vec!["kernel-handle".into(), "title".into()],
            vec![EnrichedRecord::unresolved(stale.items[0].clone())],
        );
        let source = source_for(&keys);

        let err = runner(source.clone(), MemoryCheckpointStore::new(), 1)
            .run(&table, Some(checkpoint))
            .await
            .unwrap_err();

        assert!(matches!(err, HarvestError::CheckpointMismatch { row: 0, .. }));
        assert!(source.call_order().is_empty());
    }

    #[tokio::test]
    async fn test_checkpoint_write_failure_is_fatal() {
        let keys = keys(3);
        let table = WorkTable::from_keys(keys.clone());
        let store = MemoryCheckpointStore::new().failing_saves();

        let result = runner(source_for(&keys), store, 2).run(&table, None).await;

        assert!(matches!(result, Err(HarvestError::Checkpoint(_))));
    }

    #[tokio::test]
    async fn test_empty_table() {
        let report = runner(MockMetadataSource::new(), MemoryCheckpointStore::new(), 2)
            .run(&WorkTable::from_keys(vec![]), None)
            .await
            .unwrap();
        assert!(report.records.is_empty());
        assert_eq!(report.checkpoints_written, 0);
    }
}
