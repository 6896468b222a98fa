use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Cell values the dataset uses for "no value".
const NA_TOKENS: [&str; 12] = [
    "", "N/A", "NA", "n/a", "na", "NaN", "nan", "null", "NULL", "None", "#N/A", "<NA>",
];

/// Column spellings accepted for each canonical field. The public dataset
/// capitalises `Residence_type`.
const FIELD_ALIASES: [(&str, &str); 1] = [("residence_type", "Residence_type")];

/// One field looked up in a [`RawRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawField<'a> {
    Absent,
    Present(&'a str),
}

impl<'a> RawField<'a> {
    pub fn text(self) -> Option<&'a str> {
        match self {
            RawField::Absent => None,
            RawField::Present(value) => Some(value),
        }
    }

    /// Parses the cell as a finite number. Anything unparseable reads as absent.
    pub fn number(self) -> Option<f64> {
        self.text()
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
    }
}

/// An unvalidated input row: column name to cell text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    cells: HashMap<String, String>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        RawRecord {
            cells: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn from_csv(headers: &csv::StringRecord, row: &csv::StringRecord) -> Self {
        Self::from_pairs(headers.iter().zip(row.iter()))
    }

    /// Looks up a canonical field name, falling back to its known column aliases.
    pub fn field(&self, name: &str) -> RawField<'_> {
        let cell = self.cells.get(name).or_else(|| {
            FIELD_ALIASES
                .iter()
                .filter(|(canonical, _)| *canonical == name)
                .find_map(|(_, alias)| self.cells.get(*alias))
        });

        match cell {
            Some(value) if !NA_TOKENS.contains(&value.trim()) => RawField::Present(value),
            _ => RawField::Absent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
    Unknown,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
            Gender::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EverMarried {
    Yes,
    No,
    Unknown,
}

impl EverMarried {
    pub fn as_str(&self) -> &'static str {
        match self {
            EverMarried::Yes => "Yes",
            EverMarried::No => "No",
            EverMarried::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkType {
    Private,
    #[serde(rename = "Self-employed")]
    SelfEmployed,
    #[serde(rename = "Govt_job")]
    GovtJob,
    #[serde(rename = "children")]
    Children,
    #[serde(rename = "Never_worked")]
    NeverWorked,
    Unknown,
}

impl WorkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkType::Private => "Private",
            WorkType::SelfEmployed => "Self-employed",
            WorkType::GovtJob => "Govt_job",
            WorkType::Children => "children",
            WorkType::NeverWorked => "Never_worked",
            WorkType::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResidenceType {
    Urban,
    Rural,
    Unknown,
}

impl ResidenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResidenceType::Urban => "Urban",
            ResidenceType::Rural => "Rural",
            ResidenceType::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmokingStatus {
    #[serde(rename = "never smoked")]
    NeverSmoked,
    #[serde(rename = "formerly smoked")]
    FormerlySmoked,
    #[serde(rename = "smokes")]
    Smokes,
    Unknown,
}

impl SmokingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmokingStatus::NeverSmoked => "never smoked",
            SmokingStatus::FormerlySmoked => "formerly smoked",
            SmokingStatus::Smokes => "smokes",
            SmokingStatus::Unknown => "Unknown",
        }
    }
}

macro_rules! impl_display_and_parse {
    ($($ty:ident => [$($variant:ident),+]),+ $(,)?) => {
        $(
            impl $ty {
                /// Exact, case-sensitive match against the stored spelling.
                pub fn parse_exact(value: &str) -> Option<Self> {
                    [$($ty::$variant),+]
                        .into_iter()
                        .find(|variant| variant.as_str() == value)
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.pad(self.as_str())
                }
            }
        )+
    };
}

impl_display_and_parse! {
    Gender => [Male, Female, Other, Unknown],
    EverMarried => [Yes, No, Unknown],
    WorkType => [Private, SelfEmployed, GovtJob, Children, NeverWorked, Unknown],
    ResidenceType => [Urban, Rural, Unknown],
    SmokingStatus => [NeverSmoked, FormerlySmoked, Smokes, Unknown],
}

/// A sanitized patient document, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub gender: Gender,
    pub age: f64,
    pub hypertension: i32,
    pub ever_married: EverMarried,
    pub work_type: WorkType,
    pub residence_type: ResidenceType,
    pub avg_glucose_level: f64,
    pub bmi: f64,
    pub smoking_status: SmokingStatus,
    pub stroke_risk: f64,
}

impl PatientRecord {
    /// The four fields compared when looking for an existing copy of this record.
    pub fn probe(&self) -> DuplicateProbe {
        DuplicateProbe {
            gender: self.gender,
            age: self.age,
            hypertension: self.hypertension,
            avg_glucose_level: self.avg_glucose_level,
        }
    }
}

/// Duplicate lookup key. Two different patients sharing all four values
/// are treated as the same record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuplicateProbe {
    pub gender: Gender,
    pub age: f64,
    pub hypertension: i32,
    pub avg_glucose_level: f64,
}

impl DuplicateProbe {
    pub fn matches(&self, record: &PatientRecord) -> bool {
        self.gender == record.gender
            && self.age == record.age
            && self.hypertension == record.hypertension
            && self.avg_glucose_level == record.avg_glucose_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn na_tokens_and_missing_columns_are_absent() {
        let raw = RawRecord::from_pairs([("bmi", "N/A"), ("age", "  "), ("gender", "Male")]);
        assert_eq!(raw.field("bmi"), RawField::Absent);
        assert_eq!(raw.field("age"), RawField::Absent);
        assert_eq!(raw.field("work_type"), RawField::Absent);
        assert_eq!(raw.field("gender"), RawField::Present("Male"));
    }

    #[test]
    fn residence_type_reads_dataset_capitalisation() {
        let raw = RawRecord::from_pairs([("Residence_type", "Urban")]);
        assert_eq!(raw.field("residence_type"), RawField::Present("Urban"));
    }

    #[test]
    fn number_rejects_text_and_infinity() {
        assert_eq!(RawField::Present(" 61.5 ").number(), Some(61.5));
        assert_eq!(RawField::Present("abc").number(), None);
        assert_eq!(RawField::Present("inf").number(), None);
        assert_eq!(RawField::Absent.number(), None);
    }

    #[test]
    fn enums_serialize_with_dataset_spelling() {
        let json = serde_json::to_string(&WorkType::SelfEmployed).unwrap();
        assert_eq!(json, "\"Self-employed\"");
        let smoking: SmokingStatus = serde_json::from_str("\"formerly smoked\"").unwrap();
        assert_eq!(smoking, SmokingStatus::FormerlySmoked);
        assert_eq!(WorkType::parse_exact("children"), Some(WorkType::Children));
        assert_eq!(WorkType::parse_exact("Children"), None);
    }
}
