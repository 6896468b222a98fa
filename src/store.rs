//! Patient document store.
//!
//! Patients are kept as one JSON document per line, after a header line that
//! records the next id to hand out. The whole collection is loaded on open.
//! Inserts append a single line; updates and deletes rewrite the file through
//! a temp file, so a crashed rewrite leaves the previous collection intact.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::records::{DuplicateProbe, PatientRecord};

pub type PatientId = u64;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt document on line {line}: {source}")]
    Corrupt {
        line: usize,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document failed validation: {field} {reason}")]
    Schema { field: &'static str, reason: String },

    #[error("Patient {0} not found")]
    NotFound(PatientId),
}

/// What the importer needs from a store.
pub trait PatientSink {
    fn exists(&self, probe: &DuplicateProbe) -> Result<bool, StoreError>;

    fn insert(&mut self, record: PatientRecord) -> Result<PatientId, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPatient {
    #[serde(rename = "_id")]
    pub id: PatientId,
    #[serde(flatten)]
    pub record: PatientRecord,
}

/// First line of a store file. Ids are never reused, even after the newest
/// document is deleted.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoreHeader {
    next_id: PatientId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    Unchanged,
}

#[derive(Debug)]
pub struct DocumentStore {
    path: Option<PathBuf>,
    patients: Vec<StoredPatient>,
    next_id: PatientId,
}

impl DocumentStore {
    pub fn in_memory() -> Self {
        DocumentStore {
            path: None,
            patients: Vec::new(),
            next_id: 1,
        }
    }

    /// Opens the collection at `path`, creating an empty one if the file is missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut patients = Vec::new();
        let mut recorded_next_id = 0;

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            for (index, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                if index == 0 {
                    if let Ok(header) = serde_json::from_str::<StoreHeader>(&line) {
                        recorded_next_id = header.next_id;
                        continue;
                    }
                }
                let patient: StoredPatient = serde_json::from_str(&line)
                    .map_err(|source| StoreError::Corrupt { line: index + 1, source })?;
                patients.push(patient);
            }
        }

        // Appended inserts run ahead of the header, so take whichever is larger.
        let next_id = patients
            .iter()
            .map(|p| p.id + 1)
            .max()
            .unwrap_or(1)
            .max(recorded_next_id);
        log::debug!("Opened patient store {:?} with {} documents", path, patients.len());

        Ok(DocumentStore {
            path: Some(path),
            patients,
            next_id,
        })
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    pub fn get(&self, id: PatientId) -> Option<&StoredPatient> {
        self.patients.iter().find(|p| p.id == id)
    }

    /// All patients, newest first.
    pub fn list(&self) -> Vec<&StoredPatient> {
        let mut patients: Vec<&StoredPatient> = self.patients.iter().collect();
        patients.sort_by(|a, b| b.id.cmp(&a.id));
        patients
    }

    pub fn update(
        &mut self,
        id: PatientId,
        record: PatientRecord,
    ) -> Result<UpdateOutcome, StoreError> {
        validate(&record)?;
        let position = self
            .patients
            .iter()
            .position(|p| p.id == id)
            .ok_or(StoreError::NotFound(id))?;

        if self.patients[position].record == record {
            return Ok(UpdateOutcome::Unchanged);
        }

        let previous = std::mem::replace(&mut self.patients[position].record, record);
        if let Err(e) = self.flush() {
            self.patients[position].record = previous;
            return Err(e);
        }
        Ok(UpdateOutcome::Updated)
    }

    /// Returns whether a document was removed.
    pub fn delete(&mut self, id: PatientId) -> Result<bool, StoreError> {
        let Some(position) = self.patients.iter().position(|p| p.id == id) else {
            return Ok(false);
        };
        let removed = self.patients.remove(position);
        if let Err(e) = self.flush() {
            self.patients.insert(position, removed);
            return Err(e);
        }
        Ok(true)
    }

    fn flush(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("jsonl.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer(&mut writer, &StoreHeader { next_id: self.next_id })?;
            writer.write_all(b"\n")?;
            for patient in &self.patients {
                serde_json::to_writer(&mut writer, patient)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Writes one new document at the end of the file. A store file that
    /// doesn't exist yet is written whole, header included.
    fn append(&self, patient: &StoredPatient) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !path.exists() {
            return self.flush();
        }

        let mut line = serde_json::to_vec(patient)?;
        line.push(b'\n');
        OpenOptions::new().append(true).open(path)?.write_all(&line)?;
        Ok(())
    }
}

impl PatientSink for DocumentStore {
    fn exists(&self, probe: &DuplicateProbe) -> Result<bool, StoreError> {
        Ok(self.patients.iter().any(|p| probe.matches(&p.record)))
    }

    fn insert(&mut self, record: PatientRecord) -> Result<PatientId, StoreError> {
        validate(&record)?;
        let id = self.next_id;
        self.next_id += 1;
        self.patients.push(StoredPatient { id, record });

        let appended = self.patients.last().map_or(Ok(()), |patient| self.append(patient));
        if let Err(e) = appended {
            self.patients.pop();
            self.next_id = id;
            return Err(e);
        }
        Ok(id)
    }
}

fn schema_error(field: &'static str, reason: impl Into<String>) -> StoreError {
    StoreError::Schema {
        field,
        reason: reason.into(),
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: Option<f64>) -> Result<(), StoreError> {
    if !value.is_finite() {
        return Err(schema_error(field, format!("{value} is not a finite number")));
    }
    if value < min {
        return Err(schema_error(field, format!("{value} is below minimum {min}")));
    }
    match max {
        Some(max) if value > max => Err(schema_error(field, format!("{value} is above maximum {max}"))),
        _ => Ok(()),
    }
}

/// Collection-level rules, applied on every write.
pub fn validate(record: &PatientRecord) -> Result<(), StoreError> {
    check_range("age", record.age, 0.0, Some(120.0))?;
    if record.hypertension != 0 && record.hypertension != 1 {
        return Err(schema_error("hypertension", format!("{} is not 0 or 1", record.hypertension)));
    }
    check_range("avg_glucose_level", record.avg_glucose_level, 0.0, None)?;
    check_range("bmi", record.bmi, 10.0, Some(70.0))?;
    check_range("stroke_risk", record.stroke_risk, 0.0, Some(1.0))?;
    Ok(())
}
