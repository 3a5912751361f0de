//! # sca-upload
//!
//! Uploads generated master data (`*.tsv.gz`) to the provisioned blob
//! container.
//!
//! ## Usage
//!
//! ```bash
//! sca-upload                 # upload new files, skip existing ones
//! sca-upload --dry-run       # report what would be uploaded
//! sca-upload --overwrite     # re-upload files that already exist
//! ```
//!
//! Exit codes: 0 no failed files, 1 at least one file failed, 2 pre-flight
//! failure (credential store, missing container, unreadable data root).
//! A timestamped audit log is written to `--log-dir` on every run.

use anyhow::{Context, Result};
use clap::Parser;
use sca_infra::config::ConfigSource;
use sca_infra::constants::{DEFAULT_CONFIG_FILE, DEFAULT_DATA_ROOT, DEFAULT_LOG_DIR};
use sca_infra::credentials::CredentialStore;
use sca_infra::logging;
use sca_infra::upload::{
    credential_store_path, AuditLog, ObjectStoreBlobStore, UploadMode, UploadTarget, Uploader,
};
use sca_infra::UploadError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Upload master data to Azure Blob Storage
#[derive(Parser)]
#[command(name = "sca-upload", version, about, long_about = None)]
struct Cli {
    /// Simulate the upload without writing anything remotely
    #[arg(long)]
    dry_run: bool,

    /// Re-upload files that already exist in the container
    #[arg(long)]
    overwrite: bool,

    /// Record a sha256 content hash for every file
    #[arg(long)]
    checksum: bool,

    /// Target container (defaults to STORAGE_CONTAINER_NAME from the credential store)
    #[arg(long)]
    container: Option<String>,

    /// Directory holding the generated master data
    #[arg(long, default_value = DEFAULT_DATA_ROOT)]
    data_root: PathBuf,

    /// Directory for the audit log
    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    log_dir: PathBuf,

    /// Credential store written by sca-provision (falls back to
    /// CREDENTIAL_STORE_PATH from the config file, then the default)
    #[arg(long, env = "CREDENTIAL_STORE_PATH")]
    credentials: Option<PathBuf>,

    /// Environment config file (dotenv format) shared with sca-provision
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("Upload aborted");
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let mut audit = AuditLog::create(&cli.log_dir)
        .map_err(UploadError::AuditLog)
        .with_context(|| format!("Failed to create audit log in {}", cli.log_dir.display()))?;
    info!(path = %audit.path().display(), "Audit log created");

    let target = match resolve_target(&cli) {
        Ok(target) => target,
        Err(e) => {
            // Best effort: the pre-flight error is what matters here
            if let Err(log_error) = audit.line(format!("ERROR {e:#}")) {
                error!(error = %log_error, "Failed to write audit log");
            }
            return Err(e);
        }
    };

    let store = ObjectStoreBlobStore::from_connection_string(
        target.connection_string(),
        &target.container,
    )
    .map_err(UploadError::from)
    .context("Failed to configure the blob storage client")?;

    let mode = UploadMode {
        dry_run: cli.dry_run,
        overwrite: cli.overwrite,
    };
    if mode.dry_run {
        println!("DRY-RUN MODE: files will not be uploaded");
    }

    let report = Uploader::new(&store, mode)
        .with_checksum(cli.checksum)
        .run(&cli.data_root, &mut audit)
        .await?;

    println!("{report}");
    println!("Audit log: {}", audit.path().display());
    Ok(report.succeeded())
}

fn resolve_target(cli: &Cli) -> Result<UploadTarget> {
    let (config_file, required) = match &cli.config {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    let source = ConfigSource::layered(&config_file, required)
        .map_err(UploadError::from)
        .context("Failed to load configuration")?;
    let store_path = credential_store_path(cli.credentials.clone(), &source);

    let store = CredentialStore::load(&store_path).with_context(|| {
        format!("Failed to load credential store {}", store_path.display())
    })?;
    let target = UploadTarget::from_store(&store, cli.container.clone())
        .map_err(UploadError::from)
        .context("Credential store is not ready for uploading")?;
    Ok(target)
}
