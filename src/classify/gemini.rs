// src/classify/gemini.rs
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ClassifyBackend;

const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Error)]
pub enum BackendError {
    /// The service signalled rate limiting; the caller should back off and
    /// retry.
    #[error("backend throttled: {0}")]
    Throttled(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("api error: {0}")]
    Api(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Gemini `generateContent` backend. Throttling is recognized from the HTTP
/// 429 status or a RESOURCE_EXHAUSTED error body and surfaced as
/// [`BackendError::Throttled`]; everything else is a terminal failure for the
/// attempt.
pub struct GeminiBackend {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiBackend {
    pub fn new(api_key: String, model_override: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("feedwatch/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model: model_override.unwrap_or(DEFAULT_MODEL).to_string(),
        }
    }

    /// Build from `GEMINI_API_KEY`; `None` when the key is absent or empty,
    /// which puts the classifier into its fail-open mode.
    pub fn from_env() -> Option<Self> {
        match std::env::var("GEMINI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Some(Self::new(key, None)),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<ContentPart<'a>>,
}
#[derive(Serialize)]
struct ContentPart<'a> {
    parts: Vec<TextPart<'a>>,
}
#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}
#[derive(Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}
#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}
#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[async_trait]
impl ClassifyBackend for GeminiBackend {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let req = GenerateRequest {
            contents: vec![ContentPart {
                parts: vec![TextPart { text: prompt }],
            }],
        };

        let url = format!("{API_BASE}/{}:generateContent", self.model);
        let resp = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&req)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS
                || body.contains("RESOURCE_EXHAUSTED")
            {
                return Err(BackendError::Throttled(format!("{status}: {body}")));
            }
            return Err(BackendError::Api(format!("{status}: {body}")));
        }

        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(BackendError::Parse("empty candidate text".to_string()));
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_text_extraction() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "YES"}, {"text": "."}]}}
            ]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(json).unwrap();
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        assert_eq!(text, "YES.");
    }

    #[test]
    fn empty_response_parses_to_no_candidates() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.candidates.is_empty());
    }
}
