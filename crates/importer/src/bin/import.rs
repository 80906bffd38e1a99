use clap::{Parser, Subcommand};
use importer::canonical::{
    CanonicalRallyFile, CanonicalValidator, RallyBundle, RallyImporter, replay,
};
use std::path::{Path, PathBuf};
use storage::Database;
use storage::models::StageId;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rally-import")]
#[command(about = "Rally results importer", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a canonical rally file without touching the database
    Validate { file: PathBuf },
    /// Compute standings from a canonical file and print them as JSON
    Replay {
        file: PathBuf,

        /// Stop after this stage (by ordinal) and show the standings at that point
        #[arg(long)]
        stage: Option<String>,
    },
    /// Write a canonical file to the database in one transaction
    Import {
        file: PathBuf,

        #[arg(long)]
        validate_only: bool,

        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "rally_import={},importer={},storage={}",
                    log_level, log_level, log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Validate { file } => {
            load_and_validate(&file).await?;
        }
        Commands::Replay { file, stage } => {
            handle_replay(&file, stage).await?;
        }
        Commands::Import {
            file,
            validate_only,
            database_url,
        } => {
            handle_import(&file, validate_only, &database_url).await?;
        }
    }

    Ok(())
}

async fn load_and_validate(file: &Path) -> Result<RallyBundle, Box<dyn std::error::Error>> {
    tracing::info!("Loading canonical JSON from: {}", file.display());

    let json_content = tokio::fs::read_to_string(file).await?;
    let canonical: CanonicalRallyFile = serde_json::from_str(&json_content)?;

    tracing::info!(
        "Loaded rally: {} (v{}, {} stages, {} competitors, {} entries)",
        canonical.rally.name,
        canonical.format_version,
        canonical.stages.len(),
        canonical.competitors.len(),
        canonical.entries.len()
    );

    let validation_report = CanonicalValidator::validate(&canonical)?;
    validation_report.log_warnings();
    tracing::info!(
        "Validation successful ({} warning(s))",
        validation_report.warnings.len()
    );

    Ok(RallyBundle::try_from(&canonical)?)
}

async fn handle_replay(
    file: &Path,
    stage: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let bundle = load_and_validate(file).await?;
    let stage = stage.map(StageId::from);

    let report = replay(&bundle, stage.as_ref())?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

async fn handle_import(
    file: &Path,
    validate_only: bool,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let bundle = load_and_validate(file).await?;
    if validate_only {
        return Ok(());
    }

    tracing::info!("Connecting to database...");
    let db = Database::new(database_url).await?;
    db.run_migrations().await?;

    let summary = RallyImporter::new(db.pool())
        .import_to_database(&bundle)
        .await?;
    tracing::info!(
        "Import completed: {} stages, {} competitors, {} entries written, {} skipped as stale",
        summary.stages,
        summary.competitors,
        summary.entries_written,
        summary.entries_skipped
    );

    Ok(())
}
