use clap::{Parser, Subcommand};
use registry_core::{
    connect_stores, CoreConfig, Page, PatientRecord, RegistryError, DEFAULT_PAGE_LIMIT,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "registry")]
#[command(about = "Patient registration operator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the store tables if they do not exist
    InitSchema,
    /// List patients in id order
    List {
        /// Number of records to skip
        #[arg(long, default_value_t = 0)]
        skip: u64,
        /// Maximum number of records to return
        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: u64,
    },
    /// Show one patient
    Get {
        /// Patient id
        id: i64,
    },
    /// Register a patient, writing the primary store and the mirror
    Register {
        /// Full name (2-100 characters)
        #[arg(long)]
        name: String,
        /// Age in years (1-149)
        #[arg(long)]
        age: i64,
        /// male, female or other
        #[arg(long)]
        gender: String,
        /// Contact details (5-20 characters)
        #[arg(long)]
        contact: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'registry --help' for commands");
        return Ok(());
    };

    let cfg = CoreConfig::from_lookup(|key| std::env::var(key).ok())?;
    // Connecting initialises both stores.
    let stores = connect_stores(&cfg).await?;

    match command {
        Commands::InitSchema => {
            let mirror = if stores.mirror.is_enabled() {
                "enabled"
            } else {
                "disabled"
            };
            println!("Schema ready (mirror {})", mirror);
        }
        Commands::List { skip, limit } => {
            let patients = stores
                .query_service()
                .list_patients(Page::new(skip, limit))
                .await?;
            if patients.is_empty() {
                println!("No patients found.");
            } else {
                for patient in &patients {
                    print_patient(patient);
                }
            }
        }
        Commands::Get { id } => match stores.query_service().get_patient(id).await? {
            Some(patient) => print_patient(&patient),
            None => eprintln!("Patient {} not found", id),
        },
        Commands::Register {
            name,
            age,
            gender,
            contact,
        } => {
            let body = serde_json::json!({
                "name": name,
                "age": age,
                "gender": gender,
                "contact": contact,
            });
            match stores.registration_service().register(&body).await {
                Ok(patient) => {
                    println!("Registered patient with ID: {}", patient.id);
                    print_patient(&patient);
                }
                Err(RegistryError::Validation(violations)) => {
                    eprintln!("Invalid patient data: {}", violations);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}

fn print_patient(patient: &PatientRecord) {
    println!(
        "ID: {}, Name: {}, Age: {}, Gender: {}, Contact: {}",
        patient.id, patient.name, patient.age, patient.gender, patient.contact
    );
}
