use std::path::PathBuf;

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod config;

use config::{ConfigLoad, ConfigLoader, ConfigLoaderOptions};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "reelmatch")]
#[command(
    about = "Resolve scraped movie uploads to canonical identities and enrich them"
)]
#[command(version)]
struct Cli {
    /// Path to reelmatch.toml (defaults to REELMATCH_CONFIG, then ./reelmatch.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to a .env file (defaults to ./.env when present)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Match entities against the metadata provider and merge them under
    /// canonical keys
    Enrich(EnrichArgs),
    /// Inspect or clear the failed-match ledger
    #[command(subcommand)]
    Failures(FailuresCommand),
    /// Remove a match and move the entity back to its provisional key
    Demote {
        /// Key of the matched entity, e.g. tt0133093
        key: String,
    },
    /// Print one entity as JSON
    Show {
        /// Canonical or provisional key
        key: String,
    },
}

#[derive(ClapArgs, Debug, Clone)]
struct EnrichArgs {
    /// Process at most this many entities
    #[arg(long)]
    limit: Option<usize>,

    /// Skip entities that already carry metadata
    #[arg(long, default_value_t = false)]
    only_unmatched: bool,

    /// Clear the failure ledger first so previously failed entities are retried
    #[arg(long, default_value_t = false)]
    force_retry_failed: bool,
}

#[derive(Debug, Subcommand)]
enum FailuresCommand {
    /// List recorded failures
    List {
        /// Emit JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Clear one failure, or all of them when no identifier is given
    Clear {
        /// Entity key the failure was recorded under
        identifier: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let ConfigLoad { config, warnings } =
        ConfigLoader::with_options(ConfigLoaderOptions {
            config_path: cli.config.clone(),
            env_file: cli.env_file.clone(),
        })
        .load()
        .context("failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if config.metadata.env_file_loaded {
        info!("Loaded environment from .env");
    }
    if let Some(path) = &config.metadata.config_path {
        info!(path = %path.display(), "Loaded configuration file");
    }
    info!(
        store = %config.storage.store_path.display(),
        ledger = %config.storage.ledger_path.display(),
        data_dir = %config.storage.data_dir.display(),
        "Using data files"
    );
    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => warn!(hint = %hint, "{}", warning.message),
            None => warn!("{}", warning.message),
        }
    }

    match cli.command {
        Command::Enrich(args) => app::enrich(&config, args.into()).await,
        Command::Failures(FailuresCommand::List { json }) => {
            app::list_failures(&config, json).await
        }
        Command::Failures(FailuresCommand::Clear { identifier }) => {
            app::clear_failures(&config, identifier.as_deref()).await
        }
        Command::Demote { key } => app::demote(&config, &key).await,
        Command::Show { key } => app::show(&config, &key).await,
    }
}

impl From<EnrichArgs> for reelmatch_core::EnrichOptions {
    fn from(args: EnrichArgs) -> Self {
        Self {
            limit: args.limit,
            only_unmatched: args.only_unmatched,
            force_retry_failed: args.force_retry_failed,
        }
    }
}
