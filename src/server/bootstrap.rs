use crate::config::AppConfig;
use crate::dispatch::AppState;
use crate::metrics::Metrics;
use crate::scenario::{Scenario, ScenarioStore};
use crate::section::SectionTable;
use crate::store::ResourceStore;
use crate::transform::SystemClock;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// CLI arguments forwarded from `main()`.
pub struct BootstrapArgs {
    pub config_path: std::path::PathBuf,
    pub listen: Option<String>,
}

/// Server lifecycle: init → build state → serve → shutdown.
pub async fn run(args: BootstrapArgs) -> Result<()> {
    init_tracing();

    let config = AppConfig::load(&args.config_path)?;
    let listen = args.listen.unwrap_or_else(|| config.listen_addr());

    let state = Arc::new(build_state(&config)?);

    let shutdown = Arc::new(Notify::new());

    tracing::info!("server: starting unimock, listen={}", listen);
    let server_handle = tokio::spawn({
        let state = state.clone();
        let shutdown = shutdown.clone();
        async move { crate::server::run_server(&listen, state, shutdown).await }
    });

    wait_for_shutdown(&shutdown).await;

    if let Err(e) = server_handle.await {
        tracing::error!("server: task error: {}", e);
    }

    tracing::info!("server: shutdown complete");
    Ok(())
}

fn build_state(config: &AppConfig) -> Result<AppState> {
    let sections = SectionTable::compile(&config.sections)
        .map_err(|e| anyhow::anyhow!("failed to compile sections: {e}"))?;

    let scenarios = ScenarioStore::new();
    for cfg in &config.scenarios {
        let scenario = Scenario {
            uuid: cfg.uuid.unwrap_or(Uuid::nil()),
            request_path: cfg.request_path.clone(),
            status_code: cfg.status_code,
            content_type: cfg.content_type.clone(),
            location: cfg.location.clone(),
            data: cfg.data.clone(),
        };
        scenarios
            .create(scenario, true)
            .map_err(|e| anyhow::anyhow!("failed to load scenario: {e}"))?;
    }

    Ok(AppState {
        sections,
        store: ResourceStore::new(),
        scenarios,
        metrics: Metrics::new(),
        clock: Arc::new(SystemClock),
    })
}

fn init_tracing() {
    let (non_blocking, guard) = tracing_appender::non_blocking::NonBlockingBuilder::default()
        .buffered_lines_limit(128_000)
        .lossy(true)
        .finish(std::io::stdout());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false)
                .json(),
        )
        .init();

    std::mem::forget(guard);
}

async fn wait_for_shutdown(shutdown: &Arc<Notify>) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("server: received SIGINT, shutting down"),
        _ = terminate => tracing::info!("server: received SIGTERM, shutting down"),
    }

    shutdown.notify_waiters();
}
