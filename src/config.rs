use std::path::PathBuf;

use crate::password::DEFAULT_ITERATIONS;

static DATASET_PATH: &str = "data/dataset.csv";
static PATIENT_STORE_PATH: &str = "data/patients.jsonl";
static USER_DB_PATH: &str = "data/user_base.db";
static OUTPUT_PATH: &str = "data/output/";

/// Where the application keeps its files, and how hard it hashes passwords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub dataset_path: PathBuf,
    pub patient_store_path: PathBuf,
    pub user_db_path: PathBuf,
    pub output_dir: PathBuf,
    pub pbkdf2_iterations: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dataset_path: PathBuf::from(DATASET_PATH),
            patient_store_path: PathBuf::from(PATIENT_STORE_PATH),
            user_db_path: PathBuf::from(USER_DB_PATH),
            output_dir: PathBuf::from(OUTPUT_PATH),
            pbkdf2_iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl Config {
    /// Re-roots every default path under `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Config {
            dataset_path: data_dir.join("dataset.csv"),
            patient_store_path: data_dir.join("patients.jsonl"),
            user_db_path: data_dir.join("user_base.db"),
            output_dir: data_dir.join("output"),
            ..Config::default()
        }
    }
}
