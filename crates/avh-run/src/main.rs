mod cli;
mod error;
mod output;

use std::time::Instant;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => {
            avh_config::load_config_from(path).map_err(|e| CliError::from_config(e, path))?
        }
        None => avh_config::load_config()?,
    };
    let run_config = avh_config::build_run_config(&config, &cli.overrides())?;
    let client = avh_core::build_client(&run_config)?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    info!(
        endpoint = %run_config.endpoint,
        firmware = %run_config.firmware.display(),
        "starting device run"
    );
    let started = Instant::now();
    let report = avh_core::run(&client, &run_config, &cancel).await?;

    let rendered = output::render_report(
        &report,
        started.elapsed(),
        cli.output,
        output::should_color(cli.color),
    )?;
    output::print_output(&rendered);
    Ok(())
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("interrupted, cleaning up");
        cancel.cancel();
    }
}
