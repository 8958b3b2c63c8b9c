//! Integration tests for the kernel pipeline.
//!
//! These tests drive the stages through their file formats:
//! 1. Merge ranked listings into a kernel table on disk
//! 2. Read it back as the driving table
//! 3. Enrich it with metadata into a CSV checkpoint
//! 4. Resume from that checkpoint

use harvester::{
    pipeline::CsvCheckpointStore,
    table::{read_work_table, write_kernel_rows},
    testing::{MockListing, MockMetadataSource},
    BatchRunner, Candidate, CheckpointStore, KernelRef, Merger, MetadataClient, RetryPolicy,
    SortBy,
};
use serde_json::json;

fn payload(score: f64) -> serde_json::Value {
    json!({"kernel": {"bestPublicScore": score, "title": "t"}})
}

#[tokio::test(start_paused = true)]
async fn test_merge_then_enrich_with_checkpoints() {
    let dir = tempfile::tempdir().unwrap();
    let kernels_csv = dir.path().join("kernels.csv");
    let enriched_csv = dir.path().join("enriched.csv");

    // 1. Merge
    let listing = MockListing::new()
        .with_results(
            "titanic",
            SortBy::VoteCount,
            vec![
                Candidate::new("alice/eda").with_title("EDA").with_votes(40),
                Candidate::new("bob/gbm").with_title("GBM").with_votes(12),
            ],
        )
        .with_results(
            "titanic",
            SortBy::Hotness,
            vec![Candidate::new("carol/broken").with_title("Broken")],
        );
    let summary = Merger::new(listing)
        .merge_competitions(&["titanic".to_string()])
        .await;
    assert_eq!(summary.rows.len(), 3);
    write_kernel_rows(&kernels_csv, &summary.rows).unwrap();

    // 2. Read back
    let table = read_work_table(&kernels_csv).unwrap();
    assert_eq!(table.len(), 3);
    assert!(table.column("local-filename").is_some());

    // 3. Enrich: one key never resolves
    let alice = KernelRef::new("alice", "eda");
    let bob = KernelRef::new("bob", "gbm");
    let carol = KernelRef::new("carol", "broken");
    let source = MockMetadataSource::new()
        .with_payload(&alice, payload(0.75))
        .with_payload(&bob, payload(0.25))
        .always_failing(&carol);

    let store = CsvCheckpointStore::new(&enriched_csv);
    let report = BatchRunner::new(MetadataClient::new(source.clone(), RetryPolicy::default()), store)
        .with_interval(2)
        .run(&table, None)
        .await
        .unwrap();

    assert_eq!(report.checkpoints_written, 2);
    assert_eq!(report.failed, vec![carol.clone()]);
    assert_eq!(report.resolved(), 2);
    assert_eq!(source.attempts_for(&carol), 6);

    let written = std::fs::read_to_string(&enriched_csv).unwrap();
    let header = written.lines().next().unwrap();
    assert!(header.starts_with("kernel-handle,"));
    assert!(header.ends_with(",kernel-metadata,public-score"));
    assert_eq!(written.lines().count(), 4);

    // 4. Resume from the final checkpoint: nothing left to fetch
    let checkpoint = CsvCheckpointStore::new(&enriched_csv)
        .load()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(checkpoint.processed(), 3);
    assert_eq!(checkpoint.records[0].public_score, Some(0.75));

    let idle = MockMetadataSource::new();
    let resumed = BatchRunner::new(
        MetadataClient::new(idle.clone(), RetryPolicy::default()),
        CsvCheckpointStore::new(dir.path().join("resumed.csv")),
    )
    .with_interval(2)
    .run(&table, Some(checkpoint))
    .await
    .unwrap();

    assert!(idle.call_order().is_empty());
    assert_eq!(resumed.resumed, 3);
    assert_eq!(resumed.previously_failed, vec![carol]);
    assert_eq!(resumed.records, report.records);
}

#[tokio::test]
async fn test_resume_after_partial_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("kernels.csv");
    let output = dir.path().join("enriched.csv");
    std::fs::write(
        &input,
        "kernel-handle,local-filename\na/one,a__one.ipynb\nb/two,b__two.ipynb\nc/three,c__three.ipynb\n",
    )
    .unwrap();
    let table = read_work_table(&input).unwrap();
    let keys: Vec<KernelRef> = table.items.iter().map(|i| i.key.clone()).collect();
    let source = keys
        .iter()
        .fold(MockMetadataSource::new(), |s, k| s.with_payload(k, payload(0.5)));

    // A run that checkpointed after two rows and then stopped.
    let partial = harvester::Checkpoint::new(
        table.headers.clone(),
        table.items[..2]
            .iter()
            .map(|item| harvester::EnrichedRecord::resolved(item.clone(), payload(0.5), Some(0.5)))
            .collect(),
    );
    let store = CsvCheckpointStore::new(&output);
    store.save(&partial).await.unwrap();

    let checkpoint = store.load().await.unwrap();
    let report = BatchRunner::new(MetadataClient::new(source.clone(), RetryPolicy::default()), store)
        .with_interval(2)
        .run(&table, checkpoint)
        .await
        .unwrap();

    assert_eq!(source.call_order(), vec![keys[2].clone()]);
    assert_eq!(report.records.len(), 3);
    assert_eq!(report.checkpoints_written, 1);

    let reloaded = CsvCheckpointStore::new(&output).load().await.unwrap().unwrap();
    assert_eq!(reloaded.processed(), 3);
    assert_eq!(reloaded.records, report.records);
}
