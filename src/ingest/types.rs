// src/ingest/types.rs
use anyhow::Result;

/// One entry fetched from a feed. Immutable once parsed; lives only within a
/// single scan cycle.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FeedItem {
    /// Canonical item URL, used as the dedup identifier.
    pub link: String,
    pub title: String,
    /// Normalized body text; empty when the feed carries none.
    pub summary: String,
    /// Source feed name, e.g. the subreddit.
    pub source: String,
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<FeedItem>>;
    fn name(&self) -> &str;
}
