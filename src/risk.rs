//! Additive stroke risk rule.
//!
//! Four binary factors, weighted in tenths so sums land exactly on one decimal:
//! hypertension 0.3, age over 60 0.3, glucose over 200 0.2, smoking 0.2.

use crate::records::{PatientRecord, SmokingStatus};

const HYPERTENSION_WEIGHT: u8 = 3;
const AGE_WEIGHT: u8 = 3;
const GLUCOSE_WEIGHT: u8 = 2;
const SMOKING_WEIGHT: u8 = 2;

pub const AGE_THRESHOLD: f64 = 60.0;
pub const GLUCOSE_THRESHOLD: f64 = 200.0;
pub const MAX_RISK: f64 = 1.0;

/// The inputs the score depends on, and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RiskFactors {
    pub hypertension: bool,
    pub over_age_threshold: bool,
    pub high_glucose: bool,
    pub smoker: bool,
}

impl RiskFactors {
    /// Factors for a record, with an exact "smokes" match.
    pub fn from_record(record: &PatientRecord) -> Self {
        Self::new(
            record.hypertension,
            record.age,
            record.avg_glucose_level,
            record.smoking_status == SmokingStatus::Smokes,
        )
    }

    pub fn new(hypertension: i32, age: f64, avg_glucose_level: f64, smoker: bool) -> Self {
        RiskFactors {
            hypertension: hypertension == 1,
            over_age_threshold: age > AGE_THRESHOLD,
            high_glucose: avg_glucose_level > GLUCOSE_THRESHOLD,
            smoker,
        }
    }

    pub fn score(&self) -> f64 {
        let tenths: u8 = [
            (self.hypertension, HYPERTENSION_WEIGHT),
            (self.over_age_threshold, AGE_WEIGHT),
            (self.high_glucose, GLUCOSE_WEIGHT),
            (self.smoker, SMOKING_WEIGHT),
        ]
        .iter()
        .filter(|(present, _)| *present)
        .map(|(_, weight)| weight)
        .sum();

        // Unreachable with the current weights, which top out at exactly 1.0.
        (f64::from(tenths) / 10.0).min(MAX_RISK)
    }
}
