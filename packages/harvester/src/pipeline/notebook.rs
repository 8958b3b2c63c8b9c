//! Code export: notebooks and scripts flattened to plain text.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::error::Result;

#[derive(Debug, Deserialize)]
struct Notebook {
    #[serde(default)]
    cells: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    #[serde(default)]
    cell_type: String,
    #[serde(default)]
    source: Source,
}

/// Cell source is either one string or a list of lines.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Source {
    Text(String),
    Lines(Vec<String>),
}

impl Default for Source {
    fn default() -> Self {
        Source::Text(String::new())
    }
}

impl Source {
    fn joined(&self) -> String {
        match self {
            Source::Text(text) => text.clone(),
            Source::Lines(lines) => lines.concat(),
        }
    }
}

/// Flatten a notebook: code cells verbatim, markdown cells prefixed with `# `.
///
/// Cells of other types are dropped. Cells are joined with a newline.
pub fn notebook_to_text(json: &str) -> Result<String> {
    let notebook: Notebook = serde_json::from_str(json)?;
    let blocks: Vec<String> = notebook
        .cells
        .iter()
        .filter_map(|cell| match cell.cell_type.as_str() {
            "code" => Some(cell.source.joined()),
            "markdown" => Some(format!("# {}", cell.source.joined())),
            _ => None,
        })
        .collect();
    Ok(blocks.join("\n"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub exported: Vec<PathBuf>,

    /// Files with an unsupported extension or that failed to convert
    pub skipped: Vec<PathBuf>,
}

fn convert(path: &Path) -> Result<Option<String>> {
    let text = match path.extension().and_then(|e| e.to_str()) {
        Some("ipynb") => notebook_to_text(&fs::read_to_string(path)?)?,
        Some("py") => fs::read_to_string(path)?,
        _ => return Ok(None),
    };
    Ok(Some(text))
}

/// Convert every file in `in_dir`, writing `<out_dir>/<file name>.txt`.
pub fn export_code(in_dir: &Path, out_dir: &Path) -> Result<ExportSummary> {
    fs::create_dir_all(out_dir)?;
    let mut files: Vec<PathBuf> = fs::read_dir(in_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let mut summary = ExportSummary::default();
    for path in files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            summary.skipped.push(path);
            continue;
        };

        match convert(&path) {
            Ok(Some(text)) => {
                let target = out_dir.join(format!("{}.txt", name));
                match fs::write(&target, text) {
                    Ok(()) => summary.exported.push(path),
                    Err(e) => {
                        error!(file = %name, error = %e, "Failed to write export");
                        summary.skipped.push(path);
                    }
                }
            }
            Ok(None) => {
                warn!(file = %name, "Unknown file extension, skipping");
                summary.skipped.push(path);
            }
            Err(e) => {
                error!(file = %name, error = %e, "Failed to convert");
                summary.skipped.push(path);
            }
        }
    }

    info!(
        exported = summary.exported.len(),
        skipped = summary.skipped.len(),
        "Code export finished"
    );
    Ok(summary)
}
