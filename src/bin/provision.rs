//! # sca-provision
//!
//! Creates (or reuses) the Azure resources for one environment and writes
//! their connection material to the credential store.
//!
//! ## Usage
//!
//! ```bash
//! # Password from SQL_ADMIN_PASSWORD or an interactive prompt
//! sca-provision
//!
//! # Explicit password and config file
//! sca-provision 'S3cure!Passw0rd' --config environments/dev.env
//! ```
//!
//! Exit codes: 0 all resources ready, 1 a resource failed, 2 pre-flight
//! failure (configuration, authentication, credential store).

use anyhow::{Context, Result};
use clap::Parser;
use sca_infra::config::{prompt_terminal, AdminPassword, ConfigSource, EnvironmentConfig};
use sca_infra::constants::DEFAULT_CONFIG_FILE;
use sca_infra::credentials::CredentialStore;
use sca_infra::logging;
use sca_infra::provider::azure::AzureResourceManager;
use sca_infra::provisioner::Provisioner;
use sca_infra::ProvisionError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Provision the supply chain analytics Azure environment
#[derive(Parser)]
#[command(name = "sca-provision", version, about, long_about = None)]
struct Cli {
    /// SQL administrator password (falls back to SQL_ADMIN_PASSWORD, then a prompt)
    admin_password: Option<String>,

    /// Environment config file (dotenv format); the process environment wins
    #[arg(long)]
    config: Option<PathBuf>,

    /// Credential store path (overrides CREDENTIAL_STORE_PATH)
    #[arg(long)]
    credentials: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("Provisioning aborted");
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let (config_file, required) = match cli.config {
        Some(path) => (path, true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    let source = ConfigSource::layered(&config_file, required)
        .map_err(ProvisionError::from)
        .context("Failed to load configuration")?;
    let config = EnvironmentConfig::from_source(&source)
        .map_err(ProvisionError::from)
        .context("Invalid configuration")?;
    let (password, password_source) = AdminPassword::resolve(
        cli.admin_password,
        &source,
        &config.sql_admin_login,
        prompt_terminal,
    )
    .map_err(ProvisionError::from)
    .context("SQL admin password rejected")?;
    info!(source = ?password_source, "SQL admin password accepted");

    let store_path = cli
        .credentials
        .unwrap_or_else(|| config.credential_store_path.clone());
    let mut store = CredentialStore::load(&store_path)
        .map_err(ProvisionError::from)
        .with_context(|| format!("Failed to load credential store {}", store_path.display()))?;

    let provider = AzureResourceManager::from_config(&config)
        .map_err(|e| ProvisionError::Authentication(e.to_string()))
        .context("Failed to set up Azure credentials")?;

    println!(
        "Provisioning resource group '{}' in {} (subscription {})",
        config.resource_group, config.location, config.subscription_id
    );

    let report = Provisioner::new(&provider, &config)
        .run(&mut store, &password)
        .await?;

    println!("{report}");
    if report.succeeded() {
        println!("Credentials saved to {}", store.path().display());
    } else {
        println!(
            "Provisioning incomplete; re-run to retry. Partial results are in {}",
            store.path().display()
        );
    }
    Ok(report.succeeded())
}
