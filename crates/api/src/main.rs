//! CarIndex - vehicle catalog synchronization
//!
//! `serve` (the default) runs the periodic sync until interrupted; the other
//! subcommands run one command against the configured catalog and print JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use carindex_infra::config;
use carindex_lib::utils::logging::{init_tracing, LogFormat};
use carindex_lib::{commands, AppContext};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "carindex", version, about = "Vehicle catalog synchronization")]
struct Cli {
    /// Configuration file (TOML or JSON). Without it the environment is tried
    /// first, then the standard file locations.
    #[arg(long, global = true, env = "CARINDEX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scheduled sync until Ctrl-C
    Serve,
    /// Synchronize the catalog once
    Sync {
        /// Only this model year
        #[arg(long)]
        year: Option<i32>,
    },
    /// Statistics over the local store
    Stats,
    /// List catalog years
    Years,
    /// List brands, optionally for one year
    Brands {
        #[arg(long)]
        year: Option<i32>,
    },
    /// List model groups of a brand in a year
    Models { year: i32, brand_id: String },
    /// List versions of a model group
    Versions { year: i32, brand_id: String, model_id: String },
    /// Component health
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let dotenv = dotenvy::dotenv();
    init_tracing(LogFormat::from_env());
    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(err) => tracing::debug!(error = %err, "no .env file loaded"),
    }

    let cli = Cli::parse();
    let config = match cli.config {
        Some(path) => config::load_from_path(path),
        None => config::load(),
    }
    .context("could not load configuration")?;

    let ctx = AppContext::new_with_config(config).await.context("could not initialize application")?;

    let outcome = run(&ctx, cli.command.unwrap_or(Command::Serve)).await;
    ctx.shutdown().await.context("shutdown failed")?;
    outcome
}

async fn run(ctx: &AppContext, command: Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Serve => serve(ctx).await,
        Command::Sync { year } => {
            let summary = match year {
                Some(year) => commands::sync_year(ctx, year).await?,
                None => commands::sync_now(ctx).await?,
            };
            print_json(&summary)?;
            Ok(if summary.errors == 0 { ExitCode::SUCCESS } else { ExitCode::from(2) })
        }
        Command::Stats => print_json(&commands::sync_stats(ctx).await?),
        Command::Years => print_json(&commands::list_years(ctx).await?),
        Command::Brands { year } => print_json(&commands::list_brands(ctx, year).await?),
        Command::Models { year, brand_id } => {
            print_json(&commands::list_models(ctx, year, &brand_id).await?)
        }
        Command::Versions { year, brand_id, model_id } => {
            print_json(&commands::list_versions(ctx, year, &brand_id, &model_id).await?)
        }
        Command::Health => {
            let status = commands::health(ctx).await;
            print_json(&status)?;
            Ok(if status.is_healthy { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}

async fn serve(ctx: &AppContext) -> anyhow::Result<ExitCode> {
    if !ctx.start_scheduler().await? {
        warn!("sync is disabled in configuration; nothing to serve");
        return Ok(ExitCode::SUCCESS);
    }

    info!(cron = %ctx.config.sync.cron_expression, "carindex running; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
    info!("interrupt received, shutting down");
    Ok(ExitCode::SUCCESS)
}

#[allow(clippy::print_stdout)]
fn print_json<T: Serialize>(value: &T) -> anyhow::Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(ExitCode::SUCCESS)
}
