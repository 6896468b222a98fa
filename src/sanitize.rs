//! Turns a raw import row into a legal [`PatientRecord`].
//!
//! Every field passes through the same shape of rule: take the value if it is
//! present and readable, otherwise the default, then replace anything outside
//! the field's domain. Nothing here can fail.

use crate::records::{
    EverMarried, Gender, PatientRecord, RawRecord, ResidenceType, SmokingStatus, WorkType,
};
use crate::risk::RiskFactors;

const MAX_AGE: f64 = 120.0;
const MAX_GLUCOSE: f64 = 500.0;
const MIN_BMI: f64 = 10.0;
const FALLBACK_BMI: f64 = 25.0;

pub fn sanitize_and_score(raw: &RawRecord) -> PatientRecord {
    let mut record = PatientRecord {
        gender: gender(raw),
        age: age(raw),
        hypertension: hypertension(raw),
        ever_married: ever_married(raw),
        work_type: work_type(raw),
        residence_type: residence_type(raw),
        avg_glucose_level: avg_glucose_level(raw),
        bmi: bmi(raw),
        smoking_status: smoking_status(raw),
        stroke_risk: 0.0,
    };
    record.stroke_risk = RiskFactors::from_record(&record).score();
    record
}

fn gender(raw: &RawRecord) -> Gender {
    // "Other" is only accepted from manual entry.
    match raw.field("gender").text() {
        Some("Male") => Gender::Male,
        Some("Female") => Gender::Female,
        _ => Gender::Unknown,
    }
}

fn age(raw: &RawRecord) -> f64 {
    let age = raw.field("age").number().unwrap_or(0.0);
    if !(0.0..=MAX_AGE).contains(&age) {
        return 0.0;
    }
    age
}

fn hypertension(raw: &RawRecord) -> i32 {
    // Truncates like an integer cast of a float column: "1.0" reads as 1.
    match raw.field("hypertension").number().map(f64::trunc) {
        Some(value) if value == 1.0 => 1,
        _ => 0,
    }
}

fn ever_married(raw: &RawRecord) -> EverMarried {
    raw.field("ever_married")
        .text()
        .and_then(EverMarried::parse_exact)
        .unwrap_or(EverMarried::Unknown)
}

fn work_type(raw: &RawRecord) -> WorkType {
    raw.field("work_type")
        .text()
        .and_then(WorkType::parse_exact)
        .unwrap_or(WorkType::Unknown)
}

fn residence_type(raw: &RawRecord) -> ResidenceType {
    raw.field("residence_type")
        .text()
        .and_then(ResidenceType::parse_exact)
        .unwrap_or(ResidenceType::Unknown)
}

fn avg_glucose_level(raw: &RawRecord) -> f64 {
    let glucose = raw.field("avg_glucose_level").number().unwrap_or(0.0);
    if !(0.0..=MAX_GLUCOSE).contains(&glucose) {
        return 0.0;
    }
    glucose
}

fn bmi(raw: &RawRecord) -> f64 {
    // No upper bound here; the store rejects anything above its own limit.
    let bmi = raw.field("bmi").number().unwrap_or(0.0);
    if bmi < MIN_BMI {
        return FALLBACK_BMI;
    }
    bmi
}

fn smoking_status(raw: &RawRecord) -> SmokingStatus {
    raw.field("smoking_status")
        .text()
        .and_then(SmokingStatus::parse_exact)
        .unwrap_or(SmokingStatus::Unknown)
}
