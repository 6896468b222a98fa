//! Stroke risk records: sanitizing and scoring patient rows, bulk CSV import
//! into a schema-checked document store, and the user accounts that guard it.

pub mod config;
pub mod export;
pub mod importer;
pub mod password;
pub mod patients;
pub mod records;
pub mod risk;
pub mod sanitize;
pub mod store;
pub mod users;

pub use importer::{import_batch, import_dataset, ErrorKind, ImportError, ImportSummary, SkipReason};
pub use records::{PatientRecord, RawRecord};
pub use sanitize::sanitize_and_score;
pub use store::{DocumentStore, PatientSink};
