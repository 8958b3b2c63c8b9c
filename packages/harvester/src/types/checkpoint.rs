//! Durable snapshot of batch progress.

use super::work::{EnrichedRecord, KernelRef};

/// All records resolved so far, in input order.
///
/// The progress index is the record count: resuming skips exactly that many
/// leading work items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Checkpoint {
    /// Header row of the input table (without appended columns)
    pub headers: Vec<String>,

    pub records: Vec<EnrichedRecord>,
}

impl Checkpoint {
    pub fn new(headers: Vec<String>, records: Vec<EnrichedRecord>) -> Self {
        Self { headers, records }
    }

    /// Number of fully processed work items.
    pub fn processed(&self) -> usize {
        self.records.len()
    }

    /// Keys recorded without metadata.
    pub fn unresolved_keys(&self) -> Vec<KernelRef> {
        self.records
            .iter()
            .filter(|r| !r.is_resolved())
            .map(|r| r.item.key.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::work::WorkItem;

    #[test]
    fn test_progress_index() {
        let empty = Checkpoint::default();
        assert_eq!(empty.processed(), 0);

        let item = WorkItem::new(KernelRef::new("a", "b"), vec!["a/b".into()]);
        let checkpoint = Checkpoint::new(
            vec!["kernel-handle".into()],
            vec![
                EnrichedRecord::resolved(item.clone(), serde_json::json!({}), None),
                EnrichedRecord::unresolved(item),
            ],
        );
        assert_eq!(checkpoint.processed(), 2);
        assert_eq!(checkpoint.unresolved_keys(), vec![KernelRef::new("a", "b")]);
    }
}
