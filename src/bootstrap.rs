// src/bootstrap.rs
//! Wires config into a runnable service: store, broadcast sink, funnel and
//! orchestrator.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::analyze::Scorer;
use crate::api::{self, AppState};
use crate::config::AppConfig;
use crate::ingest::funnel::{Funnel, FunnelStats};
use crate::ingest::providers::build_adapters;
use crate::ingest::scheduler::{spawn_pipeline, Orchestrator, Pipeline};
use crate::ingest::url_guard::ReachabilityProbe;
use crate::net::build_client;
use crate::notify::{BroadcastSink, DiscordNotifier, LogNotifier};
use crate::store::{JsonFileStore, Storage};

const BROADCAST_CAPACITY: usize = 256;

pub struct Service {
    pub config: AppConfig,
    pub store: Arc<dyn Storage>,
    pub sink: Arc<BroadcastSink>,
    pub funnel: Arc<Funnel>,
    pub orchestrator: Arc<Orchestrator>,
}

impl Service {
    /// Open the durable store named in config. Store errors are fatal.
    pub async fn open(config: AppConfig) -> Result<Self> {
        let store = JsonFileStore::open(&config.storage_path).await?;
        Self::with_store(config, Arc::new(store))
    }

    pub fn with_store(config: AppConfig, store: Arc<dyn Storage>) -> Result<Self> {
        let heuristics = Arc::new(config.heuristics());

        let mut sink = BroadcastSink::new(BROADCAST_CAPACITY, config.min_score)
            .with_notifier(Arc::new(LogNotifier));
        if let Some(url) = &config.discord_webhook_url {
            info!(target: "notify", "discord alerts enabled");
            sink = sink.with_notifier(Arc::new(DiscordNotifier::new(url.clone())));
        }
        let sink = Arc::new(sink);

        let probe = if config.reachability.enabled {
            let http = build_client(config.reachability.timeout())?;
            Some(ReachabilityProbe::new(http, config.reachability.timeout()))
        } else {
            None
        };
        let funnel = Funnel::new(store.clone(), sink.clone(), Scorer::new(heuristics.clone()))
            .with_probe(probe)
            .allow_local_urls(config.allow_local_urls);

        let adapters = build_adapters(&config, heuristics)?;
        let orchestrator = Orchestrator::new(adapters, config.poll_interval());

        info!(
            sources = ?config.sources(),
            interval_secs = config.poll_interval_secs,
            min_score = config.min_score,
            "service configured"
        );

        Ok(Self {
            config,
            store,
            sink,
            funnel: Arc::new(funnel),
            orchestrator: Arc::new(orchestrator),
        })
    }

    /// Start scanning in the background.
    pub fn spawn(&self, cancel: CancellationToken) -> Pipeline {
        spawn_pipeline(
            self.orchestrator.clone(),
            self.funnel.clone(),
            self.config.queue_capacity,
            cancel,
        )
    }

    /// Start scanning with a token owned by the returned handle.
    pub fn start(&self) -> Running {
        let cancel = CancellationToken::new();
        let pipeline = self.spawn(cancel.clone());
        Running { pipeline, cancel }
    }

    pub fn router(&self) -> Router {
        api::router(AppState {
            store: self.store.clone(),
        })
    }
}

/// Background tasks of a started service.
pub struct Running {
    pipeline: Pipeline,
    cancel: CancellationToken,
}

impl Running {
    /// Cancel scanning and wait for the scan and funnel tasks to finish.
    pub async fn shutdown(self) -> Result<FunnelStats> {
        info!("stopping pipeline");
        self.cancel.cancel();
        self.pipeline.scan.await.context("scan task")?;
        let stats = self.pipeline.funnel.await.context("funnel task")?;
        info!(
            persisted = stats.persisted,
            duplicates = stats.duplicates,
            rejected = stats.rejected,
            "pipeline stopped"
        );
        Ok(stats)
    }
}
