use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use polars_io::parquet::ParquetWriter;
use thiserror::Error;

use crate::store::StoredPatient;

static CSV_FILE_NAME: &str = "patients.csv";
static PARQUET_FILE_NAME: &str = "patients.parquet";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Export I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export frame error: {0}")]
    Polars(#[from] PolarsError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub csv: PathBuf,
    pub parquet: PathBuf,
}

/// One column per stored field, one row per patient.
pub fn patients_frame(patients: &[&StoredPatient]) -> PolarsResult<DataFrame> {
    let ids: Vec<i64> = patients.iter().map(|p| p.id as i64).collect();
    let gender: Vec<&str> = patients.iter().map(|p| p.record.gender.as_str()).collect();
    let age: Vec<f64> = patients.iter().map(|p| p.record.age).collect();
    let hypertension: Vec<i32> = patients.iter().map(|p| p.record.hypertension).collect();
    let ever_married: Vec<&str> = patients
        .iter()
        .map(|p| p.record.ever_married.as_str())
        .collect();
    let work_type: Vec<&str> = patients.iter().map(|p| p.record.work_type.as_str()).collect();
    let residence_type: Vec<&str> = patients
        .iter()
        .map(|p| p.record.residence_type.as_str())
        .collect();
    let glucose: Vec<f64> = patients.iter().map(|p| p.record.avg_glucose_level).collect();
    let bmi: Vec<f64> = patients.iter().map(|p| p.record.bmi).collect();
    let smoking_status: Vec<&str> = patients
        .iter()
        .map(|p| p.record.smoking_status.as_str())
        .collect();
    let stroke_risk: Vec<f64> = patients.iter().map(|p| p.record.stroke_risk).collect();

    DataFrame::new(vec![
        Series::new("_id", ids),
        Series::new("gender", gender),
        Series::new("age", age),
        Series::new("hypertension", hypertension),
        Series::new("ever_married", ever_married),
        Series::new("work_type", work_type),
        Series::new("residence_type", residence_type),
        Series::new("avg_glucose_level", glucose),
        Series::new("bmi", bmi),
        Series::new("smoking_status", smoking_status),
        Series::new("stroke_risk", stroke_risk),
    ])
}

pub async fn write_csv(file_name: &Path, df: &mut DataFrame) -> Result<(), ExportError> {
    let mut file = File::create(file_name)?;

    CsvWriter::new(&mut file).finish(df)?;

    Ok(())
}

pub async fn write_parquet(file_name: &Path, df: &mut DataFrame) -> Result<(), ExportError> {
    let mut file = File::create(file_name)?;

    ParquetWriter::new(&mut file).finish(df)?;

    Ok(())
}

/// Writes every patient to CSV and Parquet under `dir`.
pub async fn export_patients(
    patients: &[&StoredPatient],
    dir: &Path,
) -> Result<ExportPaths, ExportError> {
    fs::create_dir_all(dir)?;
    let mut df = patients_frame(patients)?;

    let paths = ExportPaths {
        csv: dir.join(CSV_FILE_NAME),
        parquet: dir.join(PARQUET_FILE_NAME),
    };
    write_csv(&paths.csv, &mut df).await?;
    write_parquet(&paths.parquet, &mut df).await?;

    log::info!("Exported {} patients to {}", df.height(), dir.display());
    Ok(paths)
}
