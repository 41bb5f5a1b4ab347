//! bountyfeed service entrypoint.
//! Boots the scan pipeline in the background and serves the read-only API.

use std::net::SocketAddr;

use bountyfeed::bootstrap::Running;
use bountyfeed::metrics::Metrics;
use bountyfeed::{AppConfig, Service};
use shuttle_axum::AxumService;
use shuttle_runtime::Service as ShuttleService;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bountyfeed=info,warn"));

    // Shuttle may already have installed a subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

/// The API plus the pipeline it keeps alive until shutdown.
struct BountyfeedService {
    api: AxumService,
    running: Running,
}

#[async_trait::async_trait]
impl ShuttleService for BountyfeedService {
    async fn bind(self, addr: SocketAddr) -> Result<(), shuttle_runtime::Error> {
        let Self { api, running } = self;
        let served = tokio::select! {
            r = api.bind(addr) => r,
            _ = shutdown_signal() => {
                tracing::info!("shutdown signal received");
                Ok(())
            }
        };
        running.shutdown().await?;
        served
    }
}

/// SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
                return;
            }
            Err(e) => tracing::warn!(error = %e, "SIGTERM handler unavailable"),
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
}

#[shuttle_runtime::main]
async fn axum() -> Result<BountyfeedService, shuttle_runtime::Error> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics = Metrics::init()?;
    let config = AppConfig::load_default()?;
    let service = Service::open(config).await?;

    let running = service.start();
    let router = service.router().merge(metrics.router());
    Ok(BountyfeedService {
        api: AxumService::from(router),
        running,
    })
}
