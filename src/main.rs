//! feedwatch — binary entrypoint.
//! Wires configuration, the feed sources, the classifier, and the notifier,
//! then hands control to the run loop.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedwatch::classify::{Classifier, ClassifyBackend, GeminiBackend};
use feedwatch::config::MonitorConfig;
use feedwatch::history::HistoryStore;
use feedwatch::ingest::providers::reddit_rss::RedditRssProvider;
use feedwatch::ingest::types::FeedSource;
use feedwatch::notify::discord::DiscordNotifier;
use feedwatch::scan::Scanner;
use feedwatch::scheduler::run_until_shutdown;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("feedwatch=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

/// Expose Prometheus metrics when `METRICS_ADDR` is set (e.g. `0.0.0.0:9000`).
/// The exporter runs its own listener; the pipeline itself has no HTTP
/// surface.
fn init_metrics() {
    let Ok(addr) = std::env::var("METRICS_ADDR") else {
        return;
    };
    match addr.parse::<std::net::SocketAddr>() {
        Ok(sock) => {
            match metrics_exporter_prometheus::PrometheusBuilder::new()
                .with_http_listener(sock)
                .install()
            {
                Ok(()) => info!(addr = %sock, "metrics exporter listening"),
                Err(e) => warn!(error = %e, "failed to install metrics exporter"),
            }
        }
        Err(e) => warn!(addr = %addr, error = %e, "METRICS_ADDR is not a socket address"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before anything reads the environment; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    // Missing or malformed configuration is fatal; runtime faults are not.
    let cfg = MonitorConfig::load_default().context("loading configuration")?;
    info!(
        sources = cfg.sources.len(),
        keywords = cfg.keywords.len(),
        scan_interval_secs = cfg.scan_interval_secs,
        classify_delay_secs = cfg.classify_delay_secs,
        "configuration loaded"
    );

    init_metrics();

    let backend = GeminiBackend::from_env();
    if backend.is_none() {
        warn!("GEMINI_API_KEY not set; candidates will be treated as relevant without triage");
    }
    let classifier = Classifier::new(backend.map(|b| Box::new(b) as Box<dyn ClassifyBackend>));

    let notifier = DiscordNotifier::from_env();

    let sources: Vec<Box<dyn FeedSource>> = cfg
        .sources
        .iter()
        .map(|sub| Box::new(RedditRssProvider::new(sub.clone())) as Box<dyn FeedSource>)
        .collect();

    let scanner = Scanner::new(
        sources,
        HistoryStore::new(&cfg.history_file),
        classifier,
        Box::new(notifier),
        cfg.keywords.clone(),
    )
    .with_classify_delay(Duration::from_secs(cfg.classify_delay_secs));

    run_until_shutdown(scanner, Duration::from_secs(cfg.scan_interval_secs)).await;
    Ok(())
}
