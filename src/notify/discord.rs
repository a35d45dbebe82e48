use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

use super::{Alert, Notifier};

const EMBED_COLOR_RED: u32 = 0xFF0000;

pub struct DiscordNotifier {
    webhook_url: Option<String>,
    client: Client,
    timeout: Duration,
}

impl DiscordNotifier {
    /// Reads `DISCORD_WEBHOOK_URL`. A value that does not look like an HTTP
    /// URL is treated as absent, with a warning.
    pub fn from_env() -> Self {
        let webhook_url = match std::env::var("DISCORD_WEBHOOK_URL") {
            Ok(url) if url.starts_with("http") => Some(url),
            Ok(_) => {
                warn!("DISCORD_WEBHOOK_URL is not an HTTP URL, notifications disabled");
                None
            }
            Err(_) => None,
        };
        Self {
            webhook_url,
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Builder for tests/tools.
    pub fn new(url: String) -> Self {
        Self {
            webhook_url: Some(url),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

#[derive(Serialize)]
struct EmbedFooter {
    text: String,
}

#[derive(Serialize)]
struct Embed {
    title: String,
    url: String,
    description: String,
    color: u32,
    footer: EmbedFooter,
}

#[derive(Serialize)]
struct WebhookPayload {
    content: String,
    embeds: Vec<Embed>,
}

impl WebhookPayload {
    fn for_alert(alert: &Alert) -> Self {
        Self {
            content: format!(
                "**POTENTIAL ISSUE DETECTED: {}**",
                alert.keyword.to_uppercase()
            ),
            embeds: vec![Embed {
                title: alert.title.clone(),
                url: alert.link.clone(),
                description: format!(
                    "Source: r/{}\nKeyword: **{}**\nVerified by AI triage",
                    alert.source, alert.keyword
                ),
                color: EMBED_COLOR_RED,
                footer: EmbedFooter {
                    text: format!(
                        "feedwatch | {}",
                        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S")
                    ),
                },
            }],
        }
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, alert: &Alert) -> Result<()> {
        let Some(url) = &self.webhook_url else {
            tracing::debug!("Discord disabled (no DISCORD_WEBHOOK_URL)");
            return Ok(());
        };

        let payload = WebhookPayload::for_alert(alert);

        self.client
            .post(url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .context("discord post")?
            .error_for_status()
            .context("discord non-2xx")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_shape_for_alert() {
        let alert = Alert {
            title: "Site frozen mid-spin".into(),
            link: "https://example.test/post".into(),
            keyword: "error".into(),
            source: "gambling".into(),
        };
        let payload = WebhookPayload::for_alert(&alert);
        assert_eq!(payload.content, "**POTENTIAL ISSUE DETECTED: ERROR**");
        assert_eq!(payload.embeds.len(), 1);
        let embed = &payload.embeds[0];
        assert_eq!(embed.url, "https://example.test/post");
        assert!(embed.description.contains("r/gambling"));
        assert!(embed.description.contains("**error**"));
        assert_eq!(embed.color, 0xFF0000);
    }
}
