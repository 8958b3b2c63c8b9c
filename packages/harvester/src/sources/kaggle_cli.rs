//! Kernel listing and pulls through the `kaggle` command-line tool.
//!
//! The CLI reads its own stored API credentials; nothing here handles them.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

use crate::error::{ListingError, ListingResult};
use crate::traits::listing::{KernelListing, KernelPuller};
use crate::types::candidate::{Candidate, SortBy};
use crate::types::work::KernelRef;

/// Shells out to `kaggle kernels ...`.
#[derive(Debug, Clone)]
pub struct KaggleCli {
    program: String,
}

impl Default for KaggleCli {
    fn default() -> Self {
        Self {
            program: "kaggle".to_string(),
        }
    }
}

impl KaggleCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different executable, e.g. an absolute path.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn run(&self, args: &[&str]) -> ListingResult<Output> {
        debug!(program = %self.program, ?args, "Running listing command");
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|source| ListingError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ListingError::Command {
                program: self.program.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

/// Parse `kernels list --csv` output.
///
/// The tool prints a plain notice instead of a CSV table when nothing
/// matches; that yields an empty list.
pub fn parse_kernel_list(stdout: &str) -> ListingResult<Vec<Candidate>> {
    let has_table = stdout
        .lines()
        .next()
        .map(|header| header.split(',').any(|column| column.trim() == "ref"))
        .unwrap_or(false);
    if !has_table {
        return Ok(Vec::new());
    }

    let mut reader = csv::Reader::from_reader(stdout.as_bytes());
    let mut candidates = Vec::new();
    for row in reader.deserialize() {
        let candidate: Candidate = row?;
        candidates.push(candidate);
    }
    Ok(candidates)
}

/// First file in `dir` named `<slug>*.*`, in name order.
pub fn find_pulled_file(dir: &Path, slug: &str) -> ListingResult<Option<PathBuf>> {
    let mut matches: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with(slug) && name[slug.len()..].contains('.'))
                .unwrap_or(false)
        })
        .collect();
    matches.sort();
    Ok(matches.into_iter().next())
}

#[async_trait]
impl KernelListing for KaggleCli {
    async fn list(
        &self,
        competition: &str,
        sort_by: SortBy,
        page_size: usize,
    ) -> ListingResult<Vec<Candidate>> {
        let page_size = page_size.to_string();
        let output = self
            .run(&[
                "kernels",
                "list",
                "--csv",
                "--competition",
                competition,
                "--sort-by",
                sort_by.as_str(),
                "--page-size",
                page_size.as_str(),
            ])
            .await?;
        parse_kernel_list(&String::from_utf8_lossy(&output.stdout))
    }
}

#[async_trait]
impl KernelPuller for KaggleCli {
    async fn pull(&self, key: &KernelRef, dir: &Path) -> ListingResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let reference = key.to_string();
        let target = dir.to_string_lossy().into_owned();
        self.run(&["kernels", "pull", reference.as_str(), "-p", target.as_str()])
            .await?;

        find_pulled_file(dir, key.slug())?.ok_or(ListingError::MissingOutput(reference))
    }
}
