//! One scan cycle: fetch feeds, dedup against history, keyword-filter into
//! the candidate queue, then drain the queue through the classifier at a
//! throttled rate and notify on accepted verdicts.
//!
//! The two phases are strictly sequential: every source is fetched and
//! filtered before the first classification call, so the total demand on the
//! classifier is known when draining starts.

use std::collections::HashSet;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use tracing::{error, info};

use crate::classify::Classifier;
use crate::history::HistoryStore;
use crate::ingest::types::{FeedItem, FeedSource};
use crate::keywords;
use crate::notify::{Alert, Notifier};

/// Fixed pause after each source's fetch, successful or not. Protects the
/// feed host, not the classifier quota.
const SOURCE_PAUSE: Duration = Duration::from_secs(2);

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "Total items parsed from feeds.");
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_counter!("scan_cycles_total", "Completed scan cycles.");
        describe_counter!("scan_source_errors_total", "Feed fetch/parse errors.");
        describe_counter!("scan_new_items_total", "Items not seen before.");
        describe_counter!("scan_candidates_total", "Items queued for classification.");
        describe_counter!("scan_notified_total", "Alerts delivered.");
        describe_gauge!("scan_last_run_ts", "Unix ts when a scan cycle last completed.");
    });
}

/// A feed item that passed the keyword filter, waiting in the cycle's
/// in-memory queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub item: FeedItem,
    pub keyword: String,
}

/// Counters from one completed cycle, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub history_loaded: usize,
    pub new_items: usize,
    pub queued: usize,
    pub notified: usize,
}

pub struct Scanner {
    sources: Vec<Box<dyn FeedSource>>,
    history: HistoryStore,
    classifier: Classifier,
    notifier: Box<dyn Notifier>,
    keywords: Vec<String>,
    source_pause: Duration,
    classify_delay: Duration,
}

impl Scanner {
    pub fn new(
        sources: Vec<Box<dyn FeedSource>>,
        history: HistoryStore,
        classifier: Classifier,
        notifier: Box<dyn Notifier>,
        keywords: Vec<String>,
    ) -> Self {
        Self {
            sources,
            history,
            classifier,
            notifier,
            keywords,
            source_pause: SOURCE_PAUSE,
            classify_delay: Duration::from_secs(60),
        }
    }

    pub fn with_classify_delay(mut self, delay: Duration) -> Self {
        self.classify_delay = delay;
        self
    }

    /// Tests run with a zero pause; production keeps the default.
    pub fn with_source_pause(mut self, pause: Duration) -> Self {
        self.source_pause = pause;
        self
    }

    /// Run one full cycle. Never returns an error: per-source and
    /// per-candidate failures are contained, logged, and skipped.
    pub async fn run_cycle(&self) -> CycleReport {
        ensure_metrics_described();

        let mut seen = self.history.load();
        let mut report = CycleReport {
            history_loaded: seen.len(),
            ..Default::default()
        };
        info!(entries = seen.len(), "seen-link history loaded");

        let queue = self.collect_candidates(&mut seen, &mut report).await;

        report.queued = queue.len();
        if queue.is_empty() {
            info!("no new items matching keywords");
        } else {
            info!(
                queued = queue.len(),
                delay_secs = self.classify_delay.as_secs(),
                "draining candidate queue"
            );
            self.drain_queue(queue, &mut report).await;
        }

        counter!("scan_cycles_total").increment(1);
        counter!("scan_new_items_total").increment(report.new_items as u64);
        counter!("scan_candidates_total").increment(report.queued as u64);
        counter!("scan_notified_total").increment(report.notified as u64);
        gauge!("scan_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

        report
    }

    /// Phase 1: fetch every source in configured order, dedup against the
    /// seen set, persist new links, and queue keyword matches. A failing
    /// source yields nothing but never aborts the cycle.
    async fn collect_candidates(
        &self,
        seen: &mut HashSet<String>,
        report: &mut CycleReport,
    ) -> Vec<Candidate> {
        let mut queue = Vec::new();

        for source in &self.sources {
            match source.fetch_latest().await {
                Ok(items) => {
                    info!(source = source.name(), items = items.len(), "feed fetched");
                    for item in items {
                        if !seen.insert(item.link.clone()) {
                            continue;
                        }
                        self.history.append(&item.link);
                        report.new_items += 1;

                        if let Some(kw) = keywords::first_match(&item, &self.keywords) {
                            queue.push(Candidate {
                                keyword: kw.to_string(),
                                item,
                            });
                        }
                    }
                }
                Err(e) => {
                    error!(source = source.name(), error = %e, "feed fetch failed, skipping source");
                    counter!("scan_source_errors_total").increment(1);
                }
            }
            tokio::time::sleep(self.source_pause).await;
        }

        queue
    }

    /// Phase 2: drain in arrival order, sleeping between consecutive
    /// classification calls (not after the last). Notification failures are
    /// logged and never retried; dedup keeps the item from coming back.
    async fn drain_queue(&self, queue: Vec<Candidate>, report: &mut CycleReport) {
        let total = queue.len();
        for (i, candidate) in queue.into_iter().enumerate() {
            info!(
                position = i + 1,
                total,
                title = %truncate(&candidate.item.title, 60),
                keyword = %candidate.keyword,
                "classifying candidate"
            );

            let text = format!("{}\n{}", candidate.item.title, candidate.item.summary);
            if self.classifier.classify(&text).await {
                let alert = Alert {
                    title: candidate.item.title,
                    link: candidate.item.link,
                    keyword: candidate.keyword,
                    source: candidate.item.source,
                };
                match self.notifier.send(&alert).await {
                    Ok(()) => {
                        report.notified += 1;
                        info!(link = %alert.link, "alert sent");
                    }
                    Err(e) => {
                        error!(error = %e, link = %alert.link, "notification failed");
                    }
                }
            }

            if i + 1 < total {
                tokio::time::sleep(self.classify_delay).await;
            }
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
