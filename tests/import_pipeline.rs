use std::fs;
use std::path::Path;

use stroke_risk::importer::{import_dataset, read_rows, ErrorKind};
use stroke_risk::records::{Gender, SmokingStatus};
use stroke_risk::store::{DocumentStore, PatientSink};
use stroke_risk::{import_batch, RawRecord};

const HEADER: &str = "id,gender,age,hypertension,heart_disease,ever_married,work_type,Residence_type,avg_glucose_level,bmi,smoking_status,stroke";

fn write_dataset(dir: &Path, rows: &[&str]) -> std::path::PathBuf {
    let path = dir.join("dataset.csv");
    let mut body = String::from(HEADER);
    for row in rows {
        body.push('\n');
        body.push_str(row);
    }
    body.push('\n');
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn reimport_into_the_same_store_adds_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(
        dir.path(),
        &[
            "9046,Male,67,0,1,Yes,Private,Urban,228.69,36.6,formerly smoked,1",
            "51676,Female,61,0,0,Yes,Self-employed,Rural,202.21,N/A,never smoked,1",
            "34120,Male,75,1,0,Yes,Private,Urban,221.29,25.8,smokes,1",
        ],
    );
    let store_path = dir.path().join("patients.jsonl");

    {
        let mut store = DocumentStore::open(&store_path).unwrap();
        let first = import_dataset(&dataset, &mut store).unwrap();
        assert_eq!(first.added_count, 3);
    }

    let mut store = DocumentStore::open(&store_path).unwrap();
    let second = import_dataset(&dataset, &mut store).unwrap();
    assert_eq!(second.added_count, 0);
    assert_eq!(second.message, "Successfully imported 0 new patient records");
    assert_eq!(store.len(), 3);

    let smoker = store.get(3).unwrap();
    assert_eq!(smoker.record.smoking_status, SmokingStatus::Smokes);
    assert_eq!(smoker.record.stroke_risk, 1.0);
}

#[test]
fn out_of_range_age_is_sanitized_not_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(
        dir.path(),
        &[
            "1,Female,44,0,0,Yes,Private,Urban,90.1,21.0,never smoked,0",
            "2,Male,200,1,0,Yes,Private,Urban,95.5,27.0,smokes,0",
            "3,Female,70,0,0,No,children,Rural,80.0,19.5,Unknown,0",
        ],
    );
    let mut store = DocumentStore::in_memory();
    let summary = import_dataset(&dataset, &mut store).unwrap();
    assert_eq!(summary.added_count, 3);

    let sanitized = store.get(2).unwrap();
    assert_eq!(sanitized.record.age, 0.0);
    assert_eq!(sanitized.record.stroke_risk, 0.5);
}

#[test]
fn schema_rejection_skips_only_that_row() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(
        dir.path(),
        &[
            "1,Female,44,0,0,Yes,Private,Urban,90.1,21.0,never smoked,0",
            "2,Male,38,0,0,Yes,Private,Urban,95.5,97.6,smokes,0",
            "3,Other,70,0,0,No,children,Rural,80.0,19.5,Unknown,0",
        ],
    );
    let mut store = DocumentStore::in_memory();
    let summary = import_dataset(&dataset, &mut store).unwrap();
    assert_eq!(summary.added_count, 2);
    assert_eq!(summary.failed_count, 1);
    assert_eq!(store.get(2).unwrap().record.gender, Gender::Unknown);
}

#[test]
fn probe_collisions_are_treated_as_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(
        dir.path(),
        &[
            "1,Female,44,0,0,Yes,Private,Urban,90.1,21.0,never smoked,0",
            "2,Female,44,0,1,No,Govt_job,Rural,90.1,33.3,smokes,1",
        ],
    );
    let mut store = DocumentStore::in_memory();
    let summary = import_dataset(&dataset, &mut store).unwrap();
    assert_eq!(summary.added_count, 1);
    assert_eq!(summary.duplicate_count, 1);
}

#[test]
fn empty_and_missing_sources() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = DocumentStore::in_memory();

    let missing = import_dataset(&dir.path().join("nope.csv"), &mut store).unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);

    let header_only = write_dataset(dir.path(), &[]);
    let empty = import_dataset(&header_only, &mut store).unwrap_err();
    assert_eq!(empty.kind(), ErrorKind::EmptyInput);
    assert!(store.is_empty());
}

#[test]
fn rows_can_come_from_anywhere() {
    let mut store = DocumentStore::in_memory();
    let rows = vec![
        Ok(RawRecord::from_pairs([("gender", "Male"), ("age", "75"), ("hypertension", "1")])),
        Ok(RawRecord::from_pairs([("gender", "X"), ("age", "-5"), ("bmi", "5")])),
    ];
    let summary = import_batch(rows, &mut store).unwrap();
    assert_eq!(summary.added_count, 2);

    let probe = store.get(2).unwrap().record.probe();
    assert!(store.exists(&probe).unwrap());
}

#[test]
fn bundled_dataset_imports_cleanly() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/dataset.csv");
    let rows = read_rows(fs::File::open(&path).unwrap()).unwrap();
    let mut store = DocumentStore::in_memory();
    let summary = import_batch(rows, &mut store).unwrap();
    assert_eq!(summary.added_count, 20);
    assert_eq!(summary.failed_count, 0);
}
