// src/ingest/scheduler.rs
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{FutureExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::ingest::ensure_metrics_described;
use crate::ingest::funnel::{Funnel, FunnelStats};
use crate::ingest::types::{CandidateRecord, SourceAdapter};

/// Outcome of one scan cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Records pushed into the queue, per adapter.
    pub forwarded: BTreeMap<String, usize>,
    /// Adapters that could not start or panicked.
    pub failed: Vec<String>,
}

impl CycleReport {
    pub fn total(&self) -> usize {
        self.forwarded.values().sum()
    }
}

/// Runs every adapter concurrently, once per interval, into one queue.
pub struct Orchestrator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    interval: Duration,
}

impl Orchestrator {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, interval: Duration) -> Self {
        Self { adapters, interval }
    }

    /// One cycle; returns once every adapter task has finished.
    pub async fn run_cycle(
        &self,
        tx: &mpsc::Sender<CandidateRecord>,
        cancel: &CancellationToken,
    ) -> CycleReport {
        ensure_metrics_described();
        let started = Instant::now();

        let mut set = JoinSet::new();
        for adapter in &self.adapters {
            let adapter = adapter.clone();
            let tx = tx.clone();
            let cancel = cancel.clone();
            set.spawn(async move {
                let name = adapter.name().to_string();
                let res = AssertUnwindSafe(forward(adapter.as_ref(), tx, cancel))
                    .catch_unwind()
                    .await;
                (name, res)
            });
        }

        let mut report = CycleReport::default();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((name, Ok(Ok(n)))) => {
                    report.forwarded.insert(name, n);
                }
                Ok((name, Ok(Err(e)))) => {
                    tracing::warn!(target: "scheduler", source = %name, error = ?e, "adapter failed to start");
                    counter!("scan_source_errors_total", "source" => name.clone()).increment(1);
                    report.failed.push(name);
                }
                Ok((name, Err(_panic))) => {
                    tracing::error!(target: "scheduler", source = %name, "adapter task panicked");
                    counter!("scan_source_errors_total", "source" => name.clone()).increment(1);
                    report.failed.push(name);
                }
                Err(e) => {
                    tracing::error!(target: "scheduler", error = %e, "adapter task aborted");
                }
            }
        }

        let ms = started.elapsed().as_millis() as f64;
        histogram!("scan_cycle_ms").record(ms);
        gauge!("scan_last_cycle_ts").set(chrono::Utc::now().timestamp() as f64);
        report
    }

    /// Cycle immediately, then every `interval`, until cancelled.
    pub async fn run(&self, tx: mpsc::Sender<CandidateRecord>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycle = 0u64;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            cycle += 1;
            let report = self.run_cycle(&tx, &cancel).await;
            tracing::info!(
                target: "scheduler",
                cycle,
                forwarded = report.total(),
                per_source = ?report.forwarded,
                failed = ?report.failed,
                "scan cycle finished"
            );
        }
        tracing::info!(target: "scheduler", cycles = cycle, "orchestrator stopped");
    }
}

/// Drive one adapter's stream into the queue. Every await races `cancel`.
async fn forward(
    adapter: &dyn SourceAdapter,
    tx: mpsc::Sender<CandidateRecord>,
    cancel: CancellationToken,
) -> anyhow::Result<usize> {
    let mut stream = adapter.scan(cancel.clone())?;
    let mut n = 0usize;
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            item = stream.next() => item,
        };
        let Some(rec) = next else { break };
        let sent = tokio::select! {
            _ = cancel.cancelled() => break,
            r = tx.send(rec) => r,
        };
        if sent.is_err() {
            // Consumer is gone; nothing left to do this cycle.
            break;
        }
        n += 1;
        counter!("scan_records_total", "source" => adapter.name().to_string()).increment(1);
    }
    Ok(n)
}

/// Handles for a running pipeline.
pub struct Pipeline {
    pub scan: JoinHandle<()>,
    pub funnel: JoinHandle<FunnelStats>,
}

/// Spawn the orchestrator and the single funnel consumer on one bounded queue.
pub fn spawn_pipeline(
    orchestrator: Arc<Orchestrator>,
    funnel: Arc<Funnel>,
    queue_capacity: usize,
    cancel: CancellationToken,
) -> Pipeline {
    let (tx, rx) = mpsc::channel(queue_capacity.max(1));
    let funnel_cancel = cancel.clone();
    let funnel = tokio::spawn(async move { funnel.run(rx, funnel_cancel).await });
    let scan = tokio::spawn(async move { orchestrator.run(tx, cancel).await });
    Pipeline { scan, funnel }
}
