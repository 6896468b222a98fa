//! Manual patient entry and the record operations built on the store.
//!
//! Unlike the importer, a form is never repaired: a value that doesn't parse
//! or fall in its domain is an error for the user to fix.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::records::{
    EverMarried, Gender, PatientRecord, ResidenceType, SmokingStatus, WorkType,
};
use crate::risk::RiskFactors;
use crate::store::{DocumentStore, PatientId, PatientSink, StoreError, StoredPatient, UpdateOutcome};

#[derive(Error, Debug)]
pub enum FormError {
    #[error("Invalid data format: {field} must be a number, got {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Invalid data format: {value:?} is not a valid {field}")]
    InvalidChoice { field: &'static str, value: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Patient fields as typed by a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientForm {
    pub gender: String,
    pub age: String,
    pub hypertension: String,
    pub ever_married: String,
    pub work_type: String,
    pub residence_type: String,
    pub avg_glucose_level: String,
    pub bmi: String,
    pub smoking_status: String,
}

fn number(field: &'static str, value: &str) -> Result<f64, FormError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
        .ok_or_else(|| FormError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

fn choice<T>(field: &'static str, value: &str, parse: impl Fn(&str) -> Option<T>) -> Result<T, FormError> {
    parse(value.trim()).ok_or_else(|| FormError::InvalidChoice {
        field,
        value: value.to_string(),
    })
}

fn gender(value: &str) -> Option<Gender> {
    match value {
        "Male" => Some(Gender::Male),
        "Female" => Some(Gender::Female),
        "Other" => Some(Gender::Other),
        _ => None,
    }
}

/// Form spelling is matched without regard to case, so "Smokes" counts as smoking here.
fn smoking_status(value: &str) -> Option<SmokingStatus> {
    [
        SmokingStatus::NeverSmoked,
        SmokingStatus::FormerlySmoked,
        SmokingStatus::Smokes,
        SmokingStatus::Unknown,
    ]
    .into_iter()
    .find(|status| status.as_str().eq_ignore_ascii_case(value))
}

impl PatientForm {
    /// Parses every field and scores the result.
    pub fn parse(&self) -> Result<PatientRecord, FormError> {
        let hypertension = self
            .hypertension
            .trim()
            .parse::<i32>()
            .map_err(|_| FormError::InvalidNumber {
                field: "hypertension",
                value: self.hypertension.clone(),
            })?;

        let mut record = PatientRecord {
            gender: choice("gender", &self.gender, gender)?,
            age: number("age", &self.age)?,
            hypertension,
            ever_married: choice("ever_married", &self.ever_married, EverMarried::parse_exact)?,
            work_type: choice("work_type", &self.work_type, WorkType::parse_exact)?,
            residence_type: choice("residence_type", &self.residence_type, ResidenceType::parse_exact)?,
            avg_glucose_level: number("avg_glucose_level", &self.avg_glucose_level)?,
            bmi: number("bmi", &self.bmi)?,
            smoking_status: choice("smoking_status", &self.smoking_status, smoking_status)?,
            stroke_risk: 0.0,
        };
        record.stroke_risk = RiskFactors::from_record(&record).score();
        Ok(record)
    }

    pub fn from_record(record: &PatientRecord) -> Self {
        PatientForm {
            gender: record.gender.to_string(),
            age: record.age.to_string(),
            hypertension: record.hypertension.to_string(),
            ever_married: record.ever_married.to_string(),
            work_type: record.work_type.to_string(),
            residence_type: record.residence_type.to_string(),
            avg_glucose_level: record.avg_glucose_level.to_string(),
            bmi: record.bmi.to_string(),
            smoking_status: record.smoking_status.to_string(),
        }
    }
}

pub fn add_patient(store: &mut DocumentStore, form: &PatientForm) -> Result<StoredPatient, FormError> {
    let record = form.parse()?;
    let id = store.insert(record.clone())?;
    log::info!("Added patient {} with stroke risk {}", id, record.stroke_risk);
    Ok(StoredPatient { id, record })
}

pub fn edit_patient(
    store: &mut DocumentStore,
    id: PatientId,
    form: &PatientForm,
) -> Result<UpdateOutcome, FormError> {
    if store.get(id).is_none() {
        return Err(StoreError::NotFound(id).into());
    }
    let record = form.parse()?;
    let outcome = store.update(id, record)?;
    log::info!("Edited patient {}: {:?}", id, outcome);
    Ok(outcome)
}

pub fn delete_patient(store: &mut DocumentStore, id: PatientId) -> Result<(), StoreError> {
    if !store.delete(id)? {
        return Err(StoreError::NotFound(id));
    }
    log::info!("Deleted patient {}", id);
    Ok(())
}

pub fn get_patient(store: &DocumentStore, id: PatientId) -> Result<&StoredPatient, StoreError> {
    store.get(id).ok_or(StoreError::NotFound(id))
}

pub fn list_patients(store: &DocumentStore) -> Vec<&StoredPatient> {
    store.list()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> PatientForm {
        PatientForm {
            gender: "Other".into(),
            age: "64".into(),
            hypertension: "1".into(),
            ever_married: "Yes".into(),
            work_type: "Govt_job".into(),
            residence_type: "Rural".into(),
            avg_glucose_level: "180.5".into(),
            bmi: "28".into(),
            smoking_status: "Smokes".into(),
        }
    }

    #[test]
    fn form_smoking_is_case_insensitive() {
        let record = form().parse().unwrap();
        assert_eq!(record.gender, Gender::Other);
        assert_eq!(record.smoking_status, SmokingStatus::Smokes);
        assert_eq!(record.stroke_risk, 0.8);
    }

    #[test]
    fn bad_number_is_invalid_format() {
        let mut bad = form();
        bad.age = "sixty".into();
        let err = bad.parse().unwrap_err();
        assert!(matches!(err, FormError::InvalidNumber { field: "age", .. }));
        assert!(err.to_string().starts_with("Invalid data format"));
    }

    #[test]
    fn non_finite_numbers_are_invalid_format() {
        for value in ["inf", "-inf", "NaN"] {
            let mut bad = form();
            bad.avg_glucose_level = value.into();
            let err = bad.parse().unwrap_err();
            assert!(matches!(err, FormError::InvalidNumber { field: "avg_glucose_level", .. }));
        }
    }

    #[test]
    fn added_patient_reads_back_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patients.jsonl");

        let mut store = DocumentStore::open(&path).unwrap();
        let mut bad = form();
        bad.avg_glucose_level = "inf".into();
        assert!(add_patient(&mut store, &bad).is_err());
        let added = add_patient(&mut store, &form()).unwrap();
        drop(store);

        let reopened = DocumentStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(get_patient(&reopened, added.id).unwrap().record, added.record);
    }

    #[test]
    fn unknown_gender_is_rejected_on_entry() {
        let mut bad = form();
        bad.gender = "Unknown".into();
        assert!(matches!(bad.parse(), Err(FormError::InvalidChoice { field: "gender", .. })));
    }

    #[test]
    fn out_of_range_entry_hits_the_store_schema() {
        let mut store = DocumentStore::in_memory();
        let mut bad = form();
        bad.age = "200".into();
        let err = add_patient(&mut store, &bad).unwrap_err();
        assert!(matches!(err, FormError::Store(StoreError::Schema { field: "age", .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn add_edit_delete_cycle() {
        let mut store = DocumentStore::in_memory();
        let added = add_patient(&mut store, &form()).unwrap();
        assert_eq!(get_patient(&store, added.id).unwrap().record, added.record);

        let same = PatientForm::from_record(&added.record);
        assert_eq!(edit_patient(&mut store, added.id, &same).unwrap(), UpdateOutcome::Unchanged);

        let mut changed = form();
        changed.hypertension = "0".into();
        assert_eq!(edit_patient(&mut store, added.id, &changed).unwrap(), UpdateOutcome::Updated);
        assert_eq!(get_patient(&store, added.id).unwrap().record.stroke_risk, 0.5);

        delete_patient(&mut store, added.id).unwrap();
        assert!(list_patients(&store).is_empty());
        assert!(matches!(delete_patient(&mut store, added.id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn edit_of_missing_patient_is_not_found() {
        let mut store = DocumentStore::in_memory();
        let err = edit_patient(&mut store, 7, &form()).unwrap_err();
        assert!(matches!(err, FormError::Store(StoreError::NotFound(7))));
    }
}
