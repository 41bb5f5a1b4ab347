//! Runs a single scan cycle against the configured sources and prints the
//! highest-scoring records. Uses an in-memory store; nothing is written.

use std::sync::Arc;

use bountyfeed::store::{MemoryStore, Storage};
use bountyfeed::{AppConfig, Service};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::load_default()?;
    let store = Arc::new(MemoryStore::new());
    let service = Service::with_store(config, store.clone())?;

    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(service.config.queue_capacity);
    let funnel = service.funnel.clone();
    let consumer = tokio::spawn({
        let cancel = cancel.clone();
        async move { funnel.run(rx, cancel).await }
    });

    let report = service.orchestrator.run_cycle(&tx, &cancel).await;
    drop(tx);
    let stats = consumer.await?;

    let mut recent = store.get_recent(usize::MAX).await?;
    recent.sort_by(|a, b| b.score.cmp(&a.score));
    for r in recent.iter().take(20) {
        println!(
            "{:>4}  {:<20} {:<12} {}  {}",
            r.score,
            r.record.origin,
            format!("{} {}", r.record.payment_amount, r.record.payment_currency).trim(),
            r.record.title,
            r.record.source_url
        );
    }
    println!(
        "forwarded={} persisted={} duplicates={} rejected={} failed={:?}",
        report.total(),
        stats.persisted,
        stats.duplicates,
        stats.rejected,
        report.failed
    );
    Ok(())
}
