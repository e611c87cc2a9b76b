use anyhow::{anyhow, Context, Result};
use std::{io, path::Path};
use tracing::{debug, info};

use crate::domain::ContactRow;

pub const REQUIRED_COLUMNS: [&str; 6] = ["name", "phone", "event_type", "date", "lang", "tz"];

/// Lowercased header row; fails when a required column is absent.
fn normalize_headers(headers: &csv::StringRecord) -> Result<csv::StringRecord> {
    let normalized: csv::StringRecord = headers.iter().map(|h| h.trim().to_lowercase()).collect();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !normalized.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(anyhow!(
            "roster must have columns: {} (missing: {})",
            REQUIRED_COLUMNS.join(", "),
            missing.join(", ")
        ));
    }
    Ok(normalized)
}

/// Loads every row of the roster CSV at `path`.
///
/// A missing file, an unreadable header, or a missing required column is
/// fatal. Rows that fail to decode are skipped.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<ContactRow>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(anyhow!("roster file not found: {}", path.display()));
    }

    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open roster: {}", path.display()))?;
    let rows = read(file).with_context(|| format!("invalid roster: {}", path.display()))?;

    info!(path = %path.display(), rows = rows.len(), "roster.loaded");
    Ok(rows)
}

pub fn read<R: io::Read>(source: R) -> Result<Vec<ContactRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader.headers().context("failed to read roster header")?.clone();
    let headers = normalize_headers(&headers)?;

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        // +2: one for the header, one for 1-based lines.
        let line = idx + 2;
        let row = record.and_then(|mut r| {
            // Short rows read as blank trailing cells.
            while r.len() < headers.len() {
                r.push_field("");
            }
            r.deserialize::<ContactRow>(Some(&headers))
        });
        match row {
            Ok(row) => rows.push(row),
            Err(err) => debug!(line, error = %err, "roster.row_skipped"),
        }
    }
    Ok(rows)
}
