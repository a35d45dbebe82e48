// tests/scan_cycle.rs
// End-to-end cycle behavior with mock sources, backends, and notifiers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use feedwatch::classify::{BackendError, Classifier, ClassifyBackend};
use feedwatch::history::HistoryStore;
use feedwatch::ingest::types::{FeedItem, FeedSource};
use feedwatch::notify::{Alert, Notifier};
use feedwatch::scan::Scanner;

struct MockSource {
    name: String,
    items: Vec<FeedItem>,
}

impl MockSource {
    fn new(name: &str, items: Vec<FeedItem>) -> Self {
        Self {
            name: name.to_string(),
            items,
        }
    }
}

#[async_trait]
impl FeedSource for MockSource {
    async fn fetch_latest(&self) -> Result<Vec<FeedItem>> {
        Ok(self.items.clone())
    }
    fn name(&self) -> &str {
        &self.name
    }
}

struct BrokenSource;

#[async_trait]
impl FeedSource for BrokenSource {
    async fn fetch_latest(&self) -> Result<Vec<FeedItem>> {
        Err(anyhow!("connection refused"))
    }
    fn name(&self) -> &str {
        "broken"
    }
}

#[derive(Clone, Default)]
struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Alert>>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, alert: &Alert) -> Result<()> {
        self.sent.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _alert: &Alert) -> Result<()> {
        Err(anyhow!("webhook returned 503"))
    }
}

struct FixedVerdict {
    reply: &'static str,
}

#[async_trait]
impl ClassifyBackend for FixedVerdict {
    async fn generate(&self, _prompt: &str) -> Result<String, BackendError> {
        Ok(self.reply.to_string())
    }
    fn name(&self) -> &'static str {
        "fixed"
    }
}

fn item(link: &str, title: &str, summary: &str, source: &str) -> FeedItem {
    FeedItem {
        link: link.to_string(),
        title: title.to_string(),
        summary: summary.to_string(),
        source: source.to_string(),
    }
}

fn kws(words: &[&str]) -> Vec<String> {
    words.iter().map(|s| s.to_string()).collect()
}

fn scanner_with(
    sources: Vec<Box<dyn FeedSource>>,
    history: HistoryStore,
    classifier: Classifier,
    notifier: Box<dyn Notifier>,
    keywords: Vec<String>,
) -> Scanner {
    Scanner::new(sources, history, classifier, notifier, keywords)
        .with_source_pause(Duration::ZERO)
        .with_classify_delay(Duration::ZERO)
}

fn two_post_feed() -> Vec<FeedItem> {
    vec![
        item("A", "site down, error 500", "", "gambling"),
        item("B", "lost money, bad luck", "", "gambling"),
    ]
}

#[tokio::test]
async fn matching_item_is_classified_and_notified() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = RecordingNotifier::default();
    let sent = notifier.sent.clone();

    let scanner = scanner_with(
        vec![Box::new(MockSource::new("gambling", two_post_feed()))],
        HistoryStore::new(dir.path().join("seen.txt")),
        Classifier::new(None), // fail-open: everything queued is relevant
        Box::new(notifier),
        kws(&["error"]),
    );

    let report = scanner.run_cycle().await;
    assert_eq!(report.new_items, 2);
    assert_eq!(report.queued, 1);
    assert_eq!(report.notified, 1);

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].link, "A");
    assert_eq!(sent[0].keyword, "error");
    assert_eq!(sent[0].source, "gambling");
}

#[tokio::test]
async fn second_cycle_over_same_feed_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = RecordingNotifier::default();
    let sent = notifier.sent.clone();

    let scanner = scanner_with(
        vec![Box::new(MockSource::new("gambling", two_post_feed()))],
        HistoryStore::new(dir.path().join("seen.txt")),
        Classifier::new(None),
        Box::new(notifier),
        kws(&["error"]),
    );

    let first = scanner.run_cycle().await;
    assert_eq!(first.queued, 1);

    let second = scanner.run_cycle().await;
    assert_eq!(second.new_items, 0);
    assert_eq!(second.queued, 0);
    assert_eq!(second.notified, 0);
    assert_eq!(sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn dedup_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let history_path = dir.path().join("seen.txt");

    {
        let scanner = scanner_with(
            vec![Box::new(MockSource::new("gambling", two_post_feed()))],
            HistoryStore::new(&history_path),
            Classifier::new(None),
            Box::new(RecordingNotifier::default()),
            kws(&["error"]),
        );
        scanner.run_cycle().await;
    }

    // Fresh scanner, same history file: nothing is new.
    let notifier = RecordingNotifier::default();
    let sent = notifier.sent.clone();
    let scanner = scanner_with(
        vec![Box::new(MockSource::new("gambling", two_post_feed()))],
        HistoryStore::new(&history_path),
        Classifier::new(None),
        Box::new(notifier),
        kws(&["error"]),
    );
    let report = scanner.run_cycle().await;
    assert_eq!(report.history_loaded, 2);
    assert_eq!(report.new_items, 0);
    assert!(sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn broken_source_does_not_block_the_others() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = RecordingNotifier::default();
    let sent = notifier.sent.clone();

    let scanner = scanner_with(
        vec![
            Box::new(BrokenSource),
            Box::new(MockSource::new(
                "slots",
                vec![item("C", "withdrawal error again", "", "slots")],
            )),
        ],
        HistoryStore::new(dir.path().join("seen.txt")),
        Classifier::new(None),
        Box::new(notifier),
        kws(&["error"]),
    );

    let report = scanner.run_cycle().await;
    assert_eq!(report.queued, 1);
    assert_eq!(report.notified, 1);
    assert_eq!(sent.lock().unwrap()[0].source, "slots");
}

#[tokio::test]
async fn rejected_verdict_is_not_notified() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = RecordingNotifier::default();
    let sent = notifier.sent.clone();

    let backend = FixedVerdict { reply: "NO" };
    let scanner = scanner_with(
        vec![Box::new(MockSource::new("gambling", two_post_feed()))],
        HistoryStore::new(dir.path().join("seen.txt")),
        Classifier::new(Some(Box::new(backend))),
        Box::new(notifier),
        kws(&["error"]),
    );

    let report = scanner.run_cycle().await;
    assert_eq!(report.queued, 1);
    assert_eq!(report.notified, 0);
    assert!(sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn notification_failure_is_contained() {
    let dir = tempfile::tempdir().unwrap();

    let scanner = scanner_with(
        vec![Box::new(MockSource::new("gambling", two_post_feed()))],
        HistoryStore::new(dir.path().join("seen.txt")),
        Classifier::new(None),
        Box::new(FailingNotifier),
        kws(&["error"]),
    );

    // The cycle completes; the lost notification is simply not counted.
    let report = scanner.run_cycle().await;
    assert_eq!(report.queued, 1);
    assert_eq!(report.notified, 0);
}

#[tokio::test]
async fn keyword_priority_follows_list_order() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = RecordingNotifier::default();
    let sent = notifier.sent.clone();

    let scanner = scanner_with(
        vec![Box::new(MockSource::new(
            "gambling",
            vec![item("D", "error page and total scam", "", "gambling")],
        ))],
        HistoryStore::new(dir.path().join("seen.txt")),
        Classifier::new(None),
        Box::new(notifier),
        kws(&["scam", "error"]),
    );

    scanner.run_cycle().await;
    assert_eq!(sent.lock().unwrap()[0].keyword, "scam");
}
