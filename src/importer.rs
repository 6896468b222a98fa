//! Bulk import of patient rows from the dataset CSV.
//!
//! Each row is sanitized and scored, checked against the store by its
//! duplicate probe, and inserted only when new. A bad row is logged and
//! skipped; only problems with the input source itself fail the batch.
//!
//! The existence check and the insert are two separate store calls, so two
//! imports running against the same store at once can both insert a row.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use thiserror::Error;

use crate::records::RawRecord;
use crate::sanitize::sanitize_and_score;
use crate::store::{PatientId, PatientSink, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    EmptyInput,
    ImportFailed,
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("No file")]
    NotFound,

    #[error("Empty data")]
    EmptyInput,

    #[error("Error data: {0}")]
    ImportFailed(String),
}

impl ImportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::NotFound => ErrorKind::NotFound,
            ImportError::EmptyInput => ErrorKind::EmptyInput,
            ImportError::ImportFailed(_) => ErrorKind::ImportFailed,
        }
    }
}

impl From<csv::Error> for ImportError {
    fn from(e: csv::Error) -> Self {
        ImportError::ImportFailed(e.to_string())
    }
}

/// Why a single row did not make it into the store.
#[derive(Error, Debug)]
pub enum SkipReason {
    #[error("unreadable row: {0}")]
    Unreadable(String),

    #[error("{0}")]
    Store(#[from] StoreError),
}

/// One row as handed to [`import_batch`].
pub type RawRow = Result<RawRecord, SkipReason>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    Inserted(PatientId),
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub added_count: usize,
    pub duplicate_count: usize,
    pub failed_count: usize,
    pub message: String,
}

impl ImportSummary {
    fn new(added_count: usize, duplicate_count: usize, failed_count: usize) -> Self {
        ImportSummary {
            added_count,
            duplicate_count,
            failed_count,
            message: format!("Successfully imported {added_count} new patient records"),
        }
    }
}

/// Sanitizes one row and inserts it unless the store already holds its probe.
pub fn import_row<S: PatientSink>(row: RawRow, store: &mut S) -> Result<RowOutcome, SkipReason> {
    let raw = row?;
    let record = sanitize_and_score(&raw);

    if store.exists(&record.probe())? {
        log::debug!("Skipping duplicate {:?}", record.probe());
        return Ok(RowOutcome::Duplicate);
    }

    let id = store.insert(record)?;
    log::debug!("Inserted patient {}", id);
    Ok(RowOutcome::Inserted(id))
}

pub fn import_batch<S, I>(rows: I, store: &mut S) -> Result<ImportSummary, ImportError>
where
    S: PatientSink,
    I: IntoIterator<Item = RawRow>,
{
    let mut rows = rows.into_iter().peekable();
    if rows.peek().is_none() {
        return Err(ImportError::EmptyInput);
    }

    let mut added = 0;
    let mut duplicates = 0;
    let mut failed = 0;

    for (index, row) in rows.enumerate() {
        match import_row(row, store) {
            Ok(RowOutcome::Inserted(_)) => added += 1,
            Ok(RowOutcome::Duplicate) => duplicates += 1,
            Err(e) => {
                log::warn!("Error processing record {}: {}", index + 1, e);
                failed += 1;
            }
        }
    }

    let summary = ImportSummary::new(added, duplicates, failed);
    log::info!(
        "{} ({} duplicates, {} rows skipped)",
        summary.message,
        duplicates,
        failed
    );
    Ok(summary)
}

/// Reads every data row of a headed CSV. Short rows read their missing cells
/// as absent. Rows that fail to decode are kept as [`SkipReason::Unreadable`]
/// so the batch can carry on past them.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<RawRow>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(ImportError::EmptyInput);
    }

    let rows = reader
        .records()
        .map(|row| {
            row.map(|row| RawRecord::from_csv(&headers, &row))
                .map_err(|e| SkipReason::Unreadable(e.to_string()))
        })
        .collect();
    Ok(rows)
}

/// Imports the dataset file at `path` into `store`.
pub fn import_dataset<S: PatientSink>(
    path: &Path,
    store: &mut S,
) -> Result<ImportSummary, ImportError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ImportError::NotFound,
        _ => ImportError::ImportFailed(e.to_string()),
    })?;

    log::info!("Importing patients from {}", path.display());
    let rows = read_rows(file)?;
    import_batch(rows, store)
}
