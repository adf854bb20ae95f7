//! Binary entry point for the Dropwarden CLI.
//!
//! The result object is printed to stdout as a single JSON line; logs go to
//! stderr.

use std::io::{self, Write};
use std::process;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use tracing_subscriber::EnvFilter;

use dropwarden::{
    DesiredState, DigitalOceanClient, DigitalOceanError, ProviderConfig, ReconcileError,
    ReconcileRequest, Reconciler,
};

mod cli;

use cli::{Cli, DropletCommand, StateArg};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError<DigitalOceanError>),
}

impl CliError {
    fn instance_id(&self) -> Option<u64> {
        match self {
            Self::Config(_) => None,
            Self::Reconcile(err) => err.instance_id(),
        }
    }
}

/// Failure object printed in place of a result.
#[derive(Debug, Serialize)]
struct FailureReport {
    failed: bool,
    msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
}

impl From<&CliError> for FailureReport {
    fn from(err: &CliError) -> Self {
        Self {
            failed: true,
            msg: err.to_string(),
            id: err.instance_id(),
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            error!(error = %err, "reconciliation failed");
            write_json(io::stdout(), &FailureReport::from(&err));
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dropwarden=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli {
        Cli::Droplet(command) => run_droplet(command).await,
    }
}

async fn run_droplet(command: DropletCommand) -> Result<(), CliError> {
    let request = reconcile_request(&command);
    request
        .validate()
        .map_err(|err| CliError::Config(err.to_string()))?;

    let config = ProviderConfig::load_without_cli_args()
        .map_err(|err| CliError::Config(err.to_string()))?
        .with_overrides(command.client_id, command.api_key);
    let client = DigitalOceanClient::new(&config).map_err(client_error)?;

    let result = Reconciler::new(client).reconcile(&request).await?;
    write_json(io::stdout(), &result);
    Ok(())
}

/// Keeps the client's configuration message without its own prefix.
fn client_error(err: DigitalOceanError) -> CliError {
    match err {
        DigitalOceanError::Config(message) => CliError::Config(message),
        other => CliError::Config(other.to_string()),
    }
}

fn reconcile_request(command: &DropletCommand) -> ReconcileRequest {
    let state = match command.state {
        StateArg::Present => DesiredState::Present,
        StateArg::Absent => DesiredState::Absent,
    };
    ReconcileRequest {
        state,
        id: command.id,
        name: command.name.clone(),
        unique_name: command.unique_name,
        size_id: command.size_id,
        image_id: command.image_id,
        region_id: command.region_id,
        ssh_key_ids: command.ssh_key_ids.clone(),
        virtio: command.virtio,
        private_networking: command.private_networking,
        backups_enabled: command.backups_enabled,
        wait: command.wait,
        wait_timeout: Duration::from_secs(command.wait_timeout),
    }
}

fn write_json(mut target: impl Write, value: &impl Serialize) {
    match serde_json::to_string(value) {
        Ok(rendered) => {
            writeln!(target, "{rendered}").ok();
        }
        Err(err) => error!(error = %err, "failed to render result"),
    }
}
