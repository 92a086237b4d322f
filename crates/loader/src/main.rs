//! Bulk loader: upserts a JSON sales feed or synthetic data into Postgres.
//!
//! The feed goes through the lenient normalization (alias chains, item
//! lists under several keys, `confirmed` defaulting to true) and is written
//! in chunks, one transaction per chunk.

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use salesbot_core::batch::IngestBatch;
use salesbot_core::error::CoreError;
use salesbot_core::fake::{generate_batch, FakeConfig};
use salesbot_db::repositories::OrderRepo;
use salesbot_db::{SalesSchema, UpsertSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LoadBackend {
    /// Read the JSON feed at `--json-path`.
    Json,
    /// Generate deterministic synthetic sales.
    Fake,
}

#[derive(Debug, Parser)]
#[command(name = "salesbot-loader")]
#[command(version)]
#[command(about = "Load sales into Postgres", long_about = None)]
struct Cli {
    /// Where the sales come from
    #[arg(long, value_enum, env = "DATA_BACKEND", default_value = "json")]
    backend: LoadBackend,

    /// JSON feed to load with the json backend
    #[arg(long, env = "SALES_JSON_PATH", default_value = "data/sales.json")]
    json_path: PathBuf,

    /// Postgres connection string
    #[arg(long, env = "PG_DSN", default_value = "")]
    pg_dsn: String,

    /// Order table; line items go to `<table>_items`
    #[arg(long, env = "PG_TABLE", default_value = SalesSchema::DEFAULT_TABLE)]
    table: String,

    /// Orders per transaction
    #[arg(long, default_value_t = 5000, value_parser = clap::value_parser!(u64).range(1..))]
    chunk_size: u64,

    /// Seed for the fake backend
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of orders for the fake backend
    #[arg(long, default_value_t = 400)]
    fake_orders: usize,
}

impl Cli {
    fn fake_config(&self) -> FakeConfig {
        FakeConfig {
            seed: self.seed,
            orders: self.fake_orders,
            ..FakeConfig::default()
        }
    }
}

fn read_feed(path: &Path) -> Result<IngestBatch, CoreError> {
    let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CoreError::not_found("feed", path.display().to_string()),
        _ => CoreError::Io(e),
    })?;
    let doc: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| CoreError::Parse(format!("{}: {e}", path.display())))?;
    IngestBatch::from_feed(&doc)
}

fn transport(e: impl std::fmt::Display) -> CoreError {
    CoreError::Transport(e.to_string())
}

fn load_batch(cli: &Cli) -> Result<IngestBatch, CoreError> {
    match cli.backend {
        LoadBackend::Json => read_feed(&cli.json_path),
        LoadBackend::Fake => Ok(generate_batch(
            &cli.fake_config(),
            chrono::Local::now().date_naive(),
        )),
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "salesbot_loader=info,salesbot_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if cli.pg_dsn.trim().is_empty() {
        tracing::error!("Empty connection string: pass --pg-dsn or set PG_DSN");
        std::process::exit(2);
    }

    if let Err(e) = run(&cli).await {
        tracing::error!(error = %e, "Load failed");
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<(), CoreError> {
    let schema = SalesSchema::new(&cli.table)?;
    let batch = load_batch(cli)?;
    tracing::info!(
        backend = ?cli.backend,
        orders = batch.len(),
        table = schema.orders(),
        "Batch prepared"
    );

    let pool = salesbot_db::create_pool(&cli.pg_dsn).await.map_err(transport)?;
    salesbot_db::run_migrations(&pool)
        .await
        .map_err(|e| transport(format!("migrations failed: {e}")))?;
    schema.ensure_tables(&pool).await.map_err(transport)?;

    let mut total = UpsertSummary::default();
    for (idx, chunk) in batch.chunks(cli.chunk_size as usize).enumerate() {
        let summary = salesbot_db::ingest(&pool, &schema, &chunk).await?;
        tracing::debug!(chunk = idx + 1, orders = chunk.len(), "Chunk loaded");
        total.merge(summary);
    }
    let stored = OrderRepo::count(&pool, &schema).await.map_err(transport)?;

    tracing::info!(
        deleted = total.orders_deleted,
        orders = total.orders_upserted,
        lines = total.lines_upserted,
        clients_created = total.clients_created,
        items_created = total.items_created,
        pruned = total.lines_pruned,
        stored,
        "Load complete"
    );
    Ok(())
}
