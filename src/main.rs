use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use env_logger::{Builder, Env};
use log::{debug, error, LevelFilter};
use thiserror::Error;

use stroke_risk::config::Config;
use stroke_risk::export::{export_patients, ExportError};
use stroke_risk::importer::{import_dataset, ImportError};
use stroke_risk::patients::{
    add_patient, delete_patient, edit_patient, get_patient, list_patients, FormError, PatientForm,
};
use stroke_risk::store::{DocumentStore, PatientId, StoreError, StoredPatient, UpdateOutcome};
use stroke_risk::users::{User, UserError, UserStore};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = StrokeArgs::parse();

    let log_level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let env = Env::new().filter("STROKE_LOG");
    Builder::new()
        .filter(Some("stroke_risk"), log_level)
        .parse_env(env)
        .init();

    debug!("Arguments {:#?}", cli);

    let start_time = Instant::now();
    let result = stroke_app(cli).await;
    debug!("Finished in {:?}", start_time.elapsed());

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
pub struct StrokeArgs {
    #[clap(long, env = "STROKE_DATA_DIR", parse(from_os_str),
    help = "Directory holding the dataset, patient store and user database")]
    data_dir: Option<PathBuf>,
    #[clap(long, env = "STROKE_DATASET", parse(from_os_str),
    help = "Dataset CSV to import")]
    dataset: Option<PathBuf>,
    #[clap(long, env = "STROKE_PATIENT_STORE", parse(from_os_str),
    help = "Patient document store")]
    patient_store: Option<PathBuf>,
    #[clap(long, env = "STROKE_USER_DB", parse(from_os_str),
    help = "User account database")]
    user_db: Option<PathBuf>,
    #[clap(long, env = "STROKE_PBKDF2_ITERATIONS",
    help = "PBKDF2 iterations for new password hashes")]
    pbkdf2_iterations: Option<u32>,
    #[clap(short, long, parse(from_occurrences),
    help = "Verbose level")]
    verbose: usize,
    #[clap(subcommand)]
    command: Command,
}

impl StrokeArgs {
    fn config(&self) -> Config {
        let mut config = match &self.data_dir {
            Some(dir) => Config::with_data_dir(dir),
            None => Config::default(),
        };
        if let Some(path) = &self.dataset {
            config.dataset_path = path.clone();
        }
        if let Some(path) = &self.patient_store {
            config.patient_store_path = path.clone();
        }
        if let Some(path) = &self.user_db {
            config.user_db_path = path.clone();
        }
        if let Some(iterations) = self.pbkdf2_iterations {
            config.pbkdf2_iterations = iterations;
        }
        config
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a user account
    Register {
        #[clap(long)]
        name: String,
        #[clap(flatten)]
        credentials: Credentials,
    },
    /// Check an email and password
    Login {
        #[clap(flatten)]
        credentials: Credentials,
    },
    /// Change the signed-in user's name and email
    EditUser {
        #[clap(flatten)]
        credentials: Credentials,
        #[clap(long)]
        name: String,
        #[clap(long)]
        new_email: String,
    },
    /// Delete the signed-in user's account
    DeleteUser {
        #[clap(flatten)]
        credentials: Credentials,
    },
    /// Load new patients from the dataset CSV
    Import {
        #[clap(flatten)]
        credentials: Credentials,
    },
    /// Add one patient and show their stroke risk
    Add {
        #[clap(flatten)]
        credentials: Credentials,
        #[clap(flatten)]
        fields: PatientFields,
    },
    /// List patients, newest first
    List {
        #[clap(flatten)]
        credentials: Credentials,
    },
    /// Show one patient
    Show {
        #[clap(flatten)]
        credentials: Credentials,
        id: PatientId,
    },
    /// Replace a patient's fields and rescore
    Edit {
        #[clap(flatten)]
        credentials: Credentials,
        id: PatientId,
        #[clap(flatten)]
        fields: PatientFields,
    },
    /// Delete a patient
    Delete {
        #[clap(flatten)]
        credentials: Credentials,
        id: PatientId,
    },
    /// Write all patients to CSV and Parquet
    Export {
        #[clap(flatten)]
        credentials: Credentials,
        #[clap(short, long, parse(from_os_str), help = "Output directory")]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct Credentials {
    #[clap(long, env = "STROKE_EMAIL")]
    email: String,
    #[clap(long, env = "STROKE_PASSWORD", hide_env_values = true)]
    password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Args, Debug)]
struct PatientFields {
    #[clap(long)]
    gender: String,
    #[clap(long)]
    age: String,
    #[clap(long)]
    hypertension: String,
    #[clap(long)]
    ever_married: String,
    #[clap(long)]
    work_type: String,
    #[clap(long)]
    residence_type: String,
    #[clap(long)]
    avg_glucose_level: String,
    #[clap(long)]
    bmi: String,
    #[clap(long)]
    smoking_status: String,
}

impl From<PatientFields> for PatientForm {
    fn from(fields: PatientFields) -> Self {
        PatientForm {
            gender: fields.gender,
            age: fields.age,
            hypertension: fields.hypertension,
            ever_married: fields.ever_married,
            work_type: fields.work_type,
            residence_type: fields.residence_type,
            avg_glucose_level: fields.avg_glucose_level,
            bmi: fields.bmi,
            smoking_status: fields.smoking_status,
        }
    }
}

#[derive(Error, Debug)]
enum AppError {
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

fn sign_in(users: &UserStore, credentials: &Credentials) -> Result<User, AppError> {
    let user = users.login(&credentials.email, &credentials.password)?;
    debug!("Signed in as user {}", user.id);
    Ok(user)
}

fn print_patient(patient: &StoredPatient) {
    let r = &patient.record;
    println!(
        "{:>5}  {:<7} {:>5.1}  ht={}  married={:<7} work={:<13} residence={:<7} glucose={:>6.2}  bmi={:>4.1}  smoking={:<15} risk={:.1}",
        patient.id,
        r.gender,
        r.age,
        r.hypertension,
        r.ever_married,
        r.work_type,
        r.residence_type,
        r.avg_glucose_level,
        r.bmi,
        r.smoking_status,
        r.stroke_risk,
    );
}

async fn stroke_app(cli: StrokeArgs) -> Result<(), AppError> {
    let config = cli.config();
    let users = UserStore::open(&config.user_db_path, config.pbkdf2_iterations)?;

    match cli.command {
        Command::Register { name, credentials } => {
            users.register(&name, &credentials.email, &credentials.password)?;
            println!("Registration successful! Please login.");
        }
        Command::Login { credentials } => {
            let user = sign_in(&users, &credentials)?;
            println!("Logged in successfully! Welcome, {}.", user.name);
        }
        Command::EditUser {
            credentials,
            name,
            new_email,
        } => {
            let user = sign_in(&users, &credentials)?;
            users.update(user.id, &name, &new_email)?;
            println!("User information updated successfully!");
        }
        Command::DeleteUser { credentials } => {
            let user = sign_in(&users, &credentials)?;
            users.delete(user.id)?;
            println!("Your account has been deleted.");
        }
        Command::Import { credentials } => {
            sign_in(&users, &credentials)?;
            let mut store = DocumentStore::open(&config.patient_store_path)?;
            let summary = import_dataset(&config.dataset_path, &mut store)?;
            println!("{}", summary.message);
        }
        Command::Add {
            credentials,
            fields,
        } => {
            sign_in(&users, &credentials)?;
            let mut store = DocumentStore::open(&config.patient_store_path)?;
            let patient = add_patient(&mut store, &fields.into())?;
            println!("Patient added successfully!");
            print_patient(&patient);
        }
        Command::List { credentials } => {
            sign_in(&users, &credentials)?;
            let store = DocumentStore::open(&config.patient_store_path)?;
            for patient in list_patients(&store) {
                print_patient(patient);
            }
        }
        Command::Show { credentials, id } => {
            sign_in(&users, &credentials)?;
            let store = DocumentStore::open(&config.patient_store_path)?;
            print_patient(get_patient(&store, id)?);
        }
        Command::Edit {
            credentials,
            id,
            fields,
        } => {
            sign_in(&users, &credentials)?;
            let mut store = DocumentStore::open(&config.patient_store_path)?;
            match edit_patient(&mut store, id, &fields.into())? {
                UpdateOutcome::Updated => println!("Patient updated successfully!"),
                UpdateOutcome::Unchanged => println!("No changes were made."),
            }
        }
        Command::Delete { credentials, id } => {
            sign_in(&users, &credentials)?;
            let mut store = DocumentStore::open(&config.patient_store_path)?;
            delete_patient(&mut store, id)?;
            println!("Patient deleted successfully!");
        }
        Command::Export {
            credentials,
            output,
        } => {
            sign_in(&users, &credentials)?;
            let store = DocumentStore::open(&config.patient_store_path)?;
            let dir = output.unwrap_or(config.output_dir);
            let paths = export_patients(&list_patients(&store), &dir).await?;
            println!(
                "Exported patients to {} and {}",
                paths.csv.display(),
                paths.parquet.display()
            );
        }
    }

    Ok(())
}
