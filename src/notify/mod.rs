pub mod discord;

use anyhow::Result;

/// One accepted candidate, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub link: String,
    pub keyword: String,
    pub source: String,
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, alert: &Alert) -> Result<()>;
}
