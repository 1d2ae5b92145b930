use crate::{commands::Commands, error::CliError, shutdown::ShutdownCoordinator};
use clap::Parser;
use connectors::bigquery::BigQueryStore;
use engine::{error::PipelineError, pipeline::Pipeline, settings::LoadSettings};
use model::table::TableRef;
use std::sync::Arc;
use tracing::{Level, error, info, warn};

mod commands;
mod error;
mod sample;
mod shutdown;

/// Environment variable holding the bearer token for the store endpoint.
/// Obtaining and refreshing it is the operator's concern.
const TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

#[derive(Parser)]
#[command(
    name = "rowload",
    version = "0.1.0",
    about = "Concurrent NDJSON loader for analytical table stores"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    // Initialize logger
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => std::process::ExitCode::from(shutdown::ExitCode::Success.as_u8()),
        Err(CliError::Pipeline(PipelineError::Cancelled)) => {
            info!("Run cancelled by shutdown request");
            std::process::ExitCode::from(shutdown::ExitCode::ShutdownRequested.as_u8())
        }
        Err(err) => {
            error!(error = %err, "rowload failed");
            std::process::ExitCode::from(shutdown::ExitCode::GeneralError.as_u8())
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Load {
            project,
            dataset,
            table,
            filepath,
            buffer_length,
            worker,
            on_parse_error,
            endpoint,
        } => {
            let table = TableRef::new(project, dataset, table);
            let settings = LoadSettings::new(
                table,
                filepath,
                buffer_length,
                worker,
                on_parse_error.into(),
            )?;

            let token = std::env::var(TOKEN_ENV).ok();
            if token.is_none() {
                warn!("{TOKEN_ENV} is not set, sending unauthenticated requests");
            }
            let store = BigQueryStore::new(endpoint, token)?;

            let shutdown = ShutdownCoordinator::new();
            shutdown.register_handlers();

            let pipeline = Pipeline::new(settings, Arc::new(store));
            pipeline.run(shutdown.cancel_token()).await?;
            Ok(())
        }
        Commands::Gen { rows, output } => {
            sample::write_sample_file(&output, rows)?;
            Ok(())
        }
    }
}
