use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use salesbot_bot::config::BotConfig;
use salesbot_bot::dispatcher::Dispatcher;
use salesbot_bot::export::XlsxExporter;
use salesbot_bot::retention;
use salesbot_bot::telegram::TelegramClient;
use salesbot_bot::voice::VoiceWebhook;
use salesbot_core::error::CoreError;
use salesbot_core::fake::{FakeConfig, FakeSource};
use salesbot_core::registry::ReportRegistry;
use salesbot_core::runner::ReportRunner;
use salesbot_core::source::{Backend, JsonFileSource, SalesSource};
use salesbot_db::{PgSalesSource, SalesSchema};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "salesbot_bot=debug,salesbot_core=debug,salesbot_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = match BotConfig::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            tracing::error!(error = %e, "Invalid bot configuration");
            std::process::exit(2);
        }
    };
    tracing::info!(
        backend = %config.backend,
        out_dir = %config.out_dir.display(),
        allowed_users = config.allowed_user_ids.len(),
        "Loaded bot configuration"
    );

    // --- Data source ---
    let source = build_source(&config)
        .await
        .expect("Failed to initialise data source");

    // --- Reports ---
    let registry = Arc::new(ReportRegistry::with_builtin_reports().expect("Report catalog is inconsistent"));
    let runner = ReportRunner::new(registry, source, Arc::new(XlsxExporter), config.out_dir.clone());

    let tg = TelegramClient::new(&config.api_url, &config.token).expect("Failed to build Telegram client");
    let voice = config
        .voice_webhook_url
        .as_deref()
        .map(VoiceWebhook::new)
        .transpose()
        .expect("Failed to build voice webhook client");

    // --- Background jobs ---
    let cancel = CancellationToken::new();
    let retention_handle = tokio::spawn(retention::run(
        config.out_dir.clone(),
        config.retention_days,
        config.retention_interval,
        cancel.clone(),
    ));

    let dispatcher = Arc::new(Dispatcher::new(tg, runner, Arc::clone(&config), voice));
    let dispatcher_handle = tokio::spawn(dispatcher.run(cancel.clone()));

    shutdown_signal().await;
    cancel.cancel();

    let _ = dispatcher_handle.await;
    let _ = retention_handle.await;
    tracing::info!("Graceful shutdown complete");
}

async fn build_source(config: &BotConfig) -> Result<Arc<dyn SalesSource>, CoreError> {
    Ok(match config.backend {
        Backend::Json => Arc::new(JsonFileSource::new(config.json_path.clone())),
        Backend::Fake => Arc::new(FakeSource::new(
            &FakeConfig::default(),
            chrono::Local::now().date_naive(),
        )),
        Backend::Postgres => {
            let schema = SalesSchema::new(&config.table)?;
            let dsn = config.database_url.as_deref().unwrap_or_default();
            let source = PgSalesSource::connect(dsn, schema).await?;
            tracing::info!(table = %config.table, "Postgres data source connected");
            Arc::new(source)
        }
    })
}

/// Wait for SIGINT or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
