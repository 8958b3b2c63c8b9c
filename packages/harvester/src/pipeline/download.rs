//! Kernel source download stage.

use std::fs;
use std::path::{Component, Path};
use tracing::{error, info, warn};

use crate::error::Result;
use crate::pipeline::merge::derive_filename;
use crate::retry::{retry, RetryOutcome, RetryPolicy};
use crate::traits::listing::KernelPuller;
use crate::types::work::{KernelRef, WorkTable, LOCAL_FILENAME_COLUMN};

/// True when `name` is a single path component that stays inside its directory.
fn is_plain_file_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut parts = Path::new(name).components();
    matches!((parts.next(), parts.next()), (Some(Component::Normal(_)), None))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadSummary {
    pub saved: Vec<KernelRef>,
    pub failed: Vec<KernelRef>,
}

/// Pull every kernel of `table` into `out_dir`, named by its `local-filename`.
///
/// Pulls land in a scratch directory inside `out_dir` that is removed when the
/// stage ends. Rows without a local filename fall back to the derived name;
/// rows whose filename is not a plain file name are skipped.
pub async fn download_kernels<P: KernelPuller>(
    table: &WorkTable,
    puller: &P,
    out_dir: &Path,
    policy: &RetryPolicy,
) -> Result<DownloadSummary> {
    fs::create_dir_all(out_dir)?;
    let scratch = tempfile::Builder::new()
        .prefix(".pull-")
        .tempdir_in(out_dir)?;
    let mut summary = DownloadSummary::default();

    for item in &table.items {
        let key = &item.key;
        let file_name = table
            .field(item, LOCAL_FILENAME_COLUMN)
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
            .or_else(|| derive_filename(&key.to_string()));
        let Some(file_name) = file_name else {
            warn!(key = %key, "No local filename");
            summary.failed.push(key.clone());
            continue;
        };
        if !is_plain_file_name(&file_name) {
            warn!(key = %key, file = %file_name, "Local filename leaves the output directory");
            summary.failed.push(key.clone());
            continue;
        }

        let label = key.to_string();
        let pulled = match retry(policy, &label, |_| puller.pull(key, scratch.path())).await {
            RetryOutcome::Succeeded { value, .. } => value,
            RetryOutcome::Exhausted { last_error, .. } => {
                error!(key = %key, error = %last_error, "Download failed");
                summary.failed.push(key.clone());
                continue;
            }
        };

        let target = out_dir.join(&file_name);
        match fs::rename(&pulled, &target) {
            Ok(()) => {
                info!(key = %key, path = %target.display(), "Kernel saved");
                summary.saved.push(key.clone());
            }
            Err(e) => {
                error!(key = %key, error = %e, "Failed to move pulled file");
                summary.failed.push(key.clone());
            }
        }
    }

    info!(
        saved = summary.saved.len(),
        failed = summary.failed.len(),
        "Downloads finished"
    );
    Ok(summary)
}
