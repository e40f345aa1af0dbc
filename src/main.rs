use std::{process::ExitCode, time::Duration};

use anyhow::{Context, Error};
use clap::Parser;
use log::error;

use blockbind::{
    cli::{Cli, Commands},
    error::ReconcileError,
    reconcile::{self, NbdRequest, PartitionsRequest},
};

fn main() -> ExitCode {
    let args = Cli::parse();

    if let Err(e) = setup_logging(&args) {
        eprintln!("Failed to initialize logging: {e:?}");
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(response) => {
            println!("{response}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            let doc = serde_json::json!({ "error": e });
            println!("{}", serde_json::to_string_pretty(&doc).unwrap_or_default());
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Cli) -> Result<String, ReconcileError> {
    match &args.command {
        Commands::Nbd {
            name,
            state,
            format,
            termination_timeout,
        } => {
            let response = reconcile::nbd(&NbdRequest {
                name: name.clone(),
                state: state.clone(),
                format: format.clone(),
                termination_timeout: Duration::from_secs(*termination_timeout),
            })?;
            serialize(&response)
        }
        Commands::Partitions { name, state } => {
            let response = reconcile::partitions(&PartitionsRequest {
                name: name.clone(),
                state: state.clone(),
            })?;
            serialize(&response)
        }
    }
}

fn serialize(response: &impl serde::Serialize) -> Result<String, ReconcileError> {
    serde_json::to_string_pretty(response)
        .map_err(|e| ReconcileError::io("Failed to serialize response", e))
}

fn setup_logging(args: &Cli) -> Result<(), Error> {
    env_logger::builder()
        .format_timestamp(None)
        .filter_level(args.verbosity)
        .try_init()
        .context("Logger already registered")
}
