use std::sync::Arc;

use clap::{Parser, Subcommand};
use safewatch::{
    config::AppConfig,
    http_client::build_retryable_client,
    persistence::{sqlite::SqliteStateRepository, traits::StateRepository},
    providers::{traits::TransactionSource, SafeTransactionService},
    supervisor::Supervisor,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding app.yaml.
    #[arg(long)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the continuous monitoring supervisor.
    Run,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Run => run(cli.config_dir.as_deref()).await?,
    }
    Ok(())
}

async fn run(config_dir: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::new(config_dir)?;
    tracing::debug!(database_url = %config.database_url, "configuration loaded");

    let repo = Arc::new(SqliteStateRepository::new(&config.database_url).await?);
    repo.run_migrations().await?;

    let client = Arc::new(build_retryable_client(&config.http_retry_config, config.http_timeout)?);
    let source: Arc<dyn TransactionSource> =
        Arc::new(SafeTransactionService::new(client, config.transaction_page_limit));

    let supervisor = Supervisor::builder()
        .config(config)
        .state(Arc::clone(&repo) as Arc<dyn StateRepository>)
        .source(source)
        .build()?;

    tracing::info!("supervisor initialized, starting monitoring");
    supervisor.run().await?;

    repo.close().await;
    Ok(())
}
