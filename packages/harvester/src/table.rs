//! CSV kernel tables: the driving work list, merged kernel rows, and the
//! enriched output/checkpoint table.

use std::io;
use std::path::Path;

use crate::error::{HarvestError, Result};
use crate::files::atomic_write;
use crate::types::candidate::KernelRow;
use crate::types::checkpoint::Checkpoint;
use crate::types::work::{
    EnrichedRecord, KernelRef, WorkItem, WorkTable, KERNEL_HANDLE_COLUMN, METADATA_COLUMN,
    SCORE_COLUMN,
};

/// Read the driving table. Any problem here is fatal to the run.
pub fn read_work_table(path: &Path) -> Result<WorkTable> {
    let file = std::fs::File::open(path).map_err(|e| HarvestError::input_table(path, e))?;
    parse_work_table(file, path)
}

/// Parse a driving table from any reader; `origin` is used in error messages.
pub fn parse_work_table<R: io::Read>(reader: R, origin: &Path) -> Result<WorkTable> {
    let mut csv = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers: Vec<String> = csv
        .headers()
        .map_err(|e| HarvestError::input_table(origin, e))?
        .iter()
        .map(str::to_string)
        .collect();

    let key_column = headers
        .iter()
        .position(|h| h == KERNEL_HANDLE_COLUMN)
        .ok_or_else(|| {
            HarvestError::input_table(origin, format!("missing `{}` column", KERNEL_HANDLE_COLUMN))
        })?;

    let mut table = WorkTable::new(headers);
    for (i, record) in csv.records().enumerate() {
        let row = i + 1;
        let record =
            record.map_err(|e| HarvestError::input_table(origin, format!("row {}: {}", row, e)))?;
        let key: KernelRef = record
            .get(key_column)
            .unwrap_or_default()
            .parse()
            .map_err(|e| HarvestError::input_table(origin, format!("row {}: {}", row, e)))?;
        table
            .items
            .push(WorkItem::new(key, record.iter().map(str::to_string).collect()));
    }
    Ok(table)
}

/// Write the merged kernel table, atomically.
pub fn write_kernel_rows(path: &Path, rows: &[KernelRow]) -> Result<()> {
    atomic_write(path, |w| {
        let mut csv = csv::Writer::from_writer(w);
        for row in rows {
            csv.serialize(row)?;
        }
        csv.flush()?;
        Ok(())
    })
}

fn format_score(score: Option<f64>) -> String {
    score.map(|s| s.to_string()).unwrap_or_default()
}

/// Encode records as CSV: input columns plus metadata and score.
pub fn encode_enriched<W: io::Write>(writer: W, checkpoint: &Checkpoint) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut header = checkpoint.headers.clone();
    header.push(METADATA_COLUMN.to_string());
    header.push(SCORE_COLUMN.to_string());
    csv.write_record(&header)?;

    for record in &checkpoint.records {
        let metadata = match &record.metadata {
            Some(value) => serde_json::to_string(value)?,
            None => String::new(),
        };
        let mut row = record.item.fields.clone();
        row.push(metadata);
        row.push(format_score(record.public_score));
        csv.write_record(&row)?;
    }
    csv.flush()?;
    Ok(())
}

/// Decode an enriched table previously written by [`encode_enriched`].
pub fn decode_enriched<R: io::Read>(reader: R, origin: &Path) -> Result<Checkpoint> {
    let mut csv = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let mut headers: Vec<String> = csv.headers()?.iter().map(str::to_string).collect();

    let tail_ok = headers.len() >= 2
        && headers[headers.len() - 2] == METADATA_COLUMN
        && headers[headers.len() - 1] == SCORE_COLUMN;
    if !tail_ok {
        return Err(HarvestError::input_table(
            origin,
            format!("expected trailing `{}` and `{}` columns", METADATA_COLUMN, SCORE_COLUMN),
        ));
    }
    headers.truncate(headers.len() - 2);

    let key_column = headers
        .iter()
        .position(|h| h == KERNEL_HANDLE_COLUMN)
        .ok_or_else(|| {
            HarvestError::input_table(origin, format!("missing `{}` column", KERNEL_HANDLE_COLUMN))
        })?;

    let mut records = Vec::new();
    for (i, record) in csv.records().enumerate() {
        let row = i + 1;
        let record = record?;
        let mut fields: Vec<String> = record.iter().map(str::to_string).collect();
        if fields.len() != headers.len() + 2 {
            return Err(HarvestError::input_table(
                origin,
                format!("row {}: expected {} fields, found {}", row, headers.len() + 2, fields.len()),
            ));
        }
        let score = fields.pop().unwrap_or_default();
        let metadata = fields.pop().unwrap_or_default();

        let key: KernelRef = fields[key_column]
            .parse()
            .map_err(|e| HarvestError::input_table(origin, format!("row {}: {}", row, e)))?;
        let metadata = if metadata.is_empty() {
            None
        } else {
            Some(serde_json::from_str(&metadata)?)
        };
        let public_score = score.trim().parse().ok();

        records.push(EnrichedRecord {
            item: WorkItem::new(key, fields),
            metadata,
            public_score,
        });
    }

    Ok(Checkpoint::new(headers, records))
}
