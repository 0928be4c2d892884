use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use feedback_vault::api::server::{connect_db, open_store, AppState};
use feedback_vault::api::ApiServer;
use feedback_vault::config::AppConfig;
use feedback_vault::seed;
use feedback_vault::telemetry::{init_tracing, LogFormat, DEFAULT_FILTER};
use feedback_vault::util::env::init_env;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "feedback-vault", version, about = "FeedbackVault review and rating API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default when no command supplied)
    Serve,
    /// Apply pending SQL migrations and exit
    Migrate {
        /// Directory holding `NNNN_name.sql` files (defaults to MIGRATIONS_DIR)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Insert the starter category tree unless already present
    Seed,
}

#[actix_web::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_env();
    init_tracing(DEFAULT_FILTER, LogFormat::from_env())?;

    let config = AppConfig::from_env().context("failed to load configuration")?;
    config.log_snapshot()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let state = AppState::from_config(&config).await?;
            ApiServer::new(config).run(state).await?;
        }
        Command::Migrate { dir } => {
            let dir = dir.unwrap_or_else(|| PathBuf::from(&config.migrations_dir));
            let db = connect_db(&config).await?;
            let applied = db
                .run_migrations(&dir)
                .await
                .with_context(|| format!("migrations in {} failed", dir.display()))?;
            info!(applied, dir = %dir.display(), "migrations complete");
        }
        Command::Seed => {
            let store = open_store(&config).await?;
            let outcome = seed::seed(store.as_ref())
                .await
                .map_err(|e| anyhow::anyhow!("seed failed: {e}"))?;
            info!(categories = ?outcome.categories, "{}", outcome.message);
        }
    }

    Ok(())
}
