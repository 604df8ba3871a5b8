mod cli;
mod commands;
mod config;
mod error;
mod output;
mod progress;

use crate::{
    cli::{Args, Commands},
    commands::{CommandExecutor, Overrides},
    config::AppConfig,
    error::{CliError, Result},
};
use clap::Parser;
use std::process;
use tracing::{error, info};
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = ?e, "Application failed");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet)?;

    // `config` works even when the file on disk cannot be parsed
    if let Commands::Config { show, reset } = args.command {
        return config_command(args.config.as_deref(), show, reset);
    }

    let config = AppConfig::load(args.config.as_deref())?;
    info!(?config, "Loaded configuration");

    let (concurrency, output_dir) = match &args.command {
        Commands::Download {
            concurrency,
            output_dir,
            ..
        } => (*concurrency, output_dir.clone()),
        _ => (None, None),
    };
    let overrides = Overrides {
        config_path: args.config.clone(),
        proxy: args.proxy.clone(),
        timeout: args.timeout,
        concurrency,
        output_dir,
    };
    let executor = CommandExecutor::new(&config, overrides, args.output, args.quiet).await?;

    match args.command {
        Commands::Status => executor.status().await?,
        Commands::Reauth => executor.reauth().await?,
        Commands::Area { area_id } => executor.set_area(&area_id).await?,
        Commands::Areas => executor.areas()?,
        Commands::Download {
            url,
            station,
            start,
            end,
            ..
        } => executor.download(url, station, start, end).await?,
        Commands::StreamUrl {
            station,
            start,
            end,
        } => executor.stream_url(&station, &start, &end)?,
        Commands::Rules { match_url } => executor.rules(match_url.as_deref()).await?,
        Commands::Daemon { fresh } => executor.daemon(fresh).await?,
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn config_command(path: Option<&std::path::Path>, show: bool, reset: bool) -> Result<()> {
    if reset {
        let path = AppConfig::reset(path)?;
        println!("✓ Configuration reset to defaults ({})", path.display());
    } else if show {
        let config = AppConfig::load(path)?;
        println!("{}", config.show()?);
    } else {
        println!("Use --show to display current configuration or --reset to reset to defaults");
    }
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Log lines go through the indicatif writer so progress bars stay intact
    let indicatif_layer = IndicatifLayer::new();
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(verbose)
                .with_writer(indicatif_layer.get_stderr_writer()),
        )
        .with(indicatif_layer)
        .with(filter)
        .try_init()
        .map_err(|e| CliError::Initialization(e.to_string()))?;

    Ok(())
}
