// civic-query: answers one survey question from the command line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use civic_query_core::actors::LlmActorHandle;
use civic_query_core::config::{EngineConfig, ENV_DATABASE_URL, ENV_RECORDS_PATH};
use civic_query_core::store::{CachedStore, DataStore, JsonFileStore, SqliteStore};
use civic_query_core::telemetry::init_tracing;
use civic_query_core::QueryEngine;

#[derive(Debug, Parser)]
#[command(name = "civic-query", version, about = "Ask questions about civic survey results")]
struct Cli {
    /// The question, e.g. "liste os moradores insatisfeitos".
    #[arg(required = true)]
    query: Vec<String>,

    /// JSON file with an array of records.
    #[arg(long, env = ENV_RECORDS_PATH)]
    records: Option<PathBuf>,

    /// SQLite URL with a `records` table; takes precedence over --records.
    #[arg(long, env = ENV_DATABASE_URL)]
    database: Option<String>,

    /// Answer from handler drafts only.
    #[arg(long)]
    no_enhance: bool,

    /// Print the classification instead of answering.
    #[arg(long)]
    classify_only: bool,

    /// Default log level when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing("civic-query", &cli.log_level)?;

    let mut config = EngineConfig::from_env().context("invalid configuration")?;
    if cli.records.is_some() {
        config.records_path = cli.records.clone();
    }
    if cli.database.is_some() {
        config.database_url = cli.database.clone();
    }

    let inner: Arc<dyn DataStore> = match (&config.database_url, &config.records_path) {
        (Some(url), _) => Arc::new(
            SqliteStore::connect(url)
                .await
                .with_context(|| format!("cannot open database {}", url))?,
        ),
        (None, Some(path)) => {
            let store = JsonFileStore::new(path.clone());
            info!("Reading records from {}", store.path().display());
            Arc::new(store)
        }
        (None, None) => bail!(
            "no record source: pass --records or --database (or set {} / {})",
            ENV_RECORDS_PATH,
            ENV_DATABASE_URL
        ),
    };
    let store = CachedStore::new(inner, config.cache_ttl());

    let generator = if cli.no_enhance {
        None
    } else {
        LlmActorHandle::from_config(&config)
    };
    let actor = generator.clone();

    let engine = QueryEngine::new(store, generator, &config);
    info!(
        "Starting engine (enhancement model: {})",
        engine.enhancement_model().as_deref().unwrap_or("disabled")
    );
    let query = cli.query.join(" ");

    if cli.classify_only {
        println!("{}", serde_json::to_string_pretty(&engine.classify(&query))?);
    } else {
        let response = engine.answer(&query).await;
        println!("{}", serde_json::to_string_pretty(&response)?);
    }

    if let Some(actor) = actor {
        actor.shutdown().await;
    }
    Ok(())
}
