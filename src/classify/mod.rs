//! Relevance triage for queued candidates.
//!
//! The external model is the scarce, rate-limited resource in the pipeline;
//! this module carries the retry/backoff logic around it. Contract: every
//! code path out of [`Classifier::classify`] terminates in a boolean, and any
//! path where no verdict could be obtained yields `true` (fail open, never
//! drop a candidate silently).

pub mod gemini;

use std::time::Duration;

use tracing::{error, info, warn};

pub use gemini::{BackendError, GeminiBackend};

const MAX_ATTEMPTS: u32 = 5;
const INITIAL_BACKOFF: Duration = Duration::from_secs(60);
const MAX_BACKOFF: Duration = Duration::from_secs(900);

const TRIAGE_PROMPT: &str = r#"You are a triage analyst for player-reported issues. Evaluate whether the following community post describes a GENUINE technical issue, system error, or a specific scam.

Criteria for 'YES':
1. Reports a technical bug, site freeze, or error code (e.g., "error 500", "game crashed").
2. Describes a specific withdrawal/deposit failure (e.g., "money disappeared", "transaction stuck for 5 days").
3. Provides specific evidence of fraud or rigged games.

Criteria for 'NO':
1. General complaining about losing money or "bad luck".
2. Asking general questions about bonuses or strategies.
3. Low-quality venting or insults without technical details.

Post Content:
"{text}"

Answer ONLY with 'YES' or 'NO'.
"#;

/// Text-generation seam under the classifier. Implementations must surface
/// throttling distinctly from other failures so the backoff logic can tell
/// "wait and retry" from "give up now".
#[async_trait::async_trait]
pub trait ClassifyBackend: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;
    fn name(&self) -> &'static str;
}

/// A reply counts as relevant when it contains "YES", case-insensitively.
/// Models pad verdicts with whitespace, periods, or a short justification;
/// substring matching absorbs all of that.
pub fn interpret_reply(reply: &str) -> bool {
    reply.to_uppercase().contains("YES")
}

pub struct Classifier {
    backend: Option<Box<dyn ClassifyBackend>>,
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl Classifier {
    pub fn new(backend: Option<Box<dyn ClassifyBackend>>) -> Self {
        Self {
            backend,
            max_attempts: MAX_ATTEMPTS,
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
        }
    }

    /// Override the backoff schedule (tests shrink it to keep wall time sane).
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Classify one candidate's text. Never errors:
    /// - no backend configured -> `true` (logged per call),
    /// - throttled -> exponential backoff, up to `max_attempts` attempts,
    ///   then `true`,
    /// - any other backend failure -> `true` immediately.
    pub async fn classify(&self, text: &str) -> bool {
        let Some(backend) = &self.backend else {
            warn!("no classification backend configured, treating candidate as relevant");
            return true;
        };

        let prompt = TRIAGE_PROMPT.replace("{text}", text);
        let mut delay = self.initial_backoff;

        for attempt in 1..=self.max_attempts {
            match backend.generate(&prompt).await {
                Ok(reply) => {
                    let relevant = interpret_reply(&reply);
                    info!(backend = backend.name(), relevant, "classification verdict");
                    return relevant;
                }
                Err(BackendError::Throttled(msg)) => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_secs = delay.as_secs(),
                        error = %msg,
                        "classification backend throttled, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.max_backoff);
                }
                Err(e) => {
                    error!(
                        backend = backend.name(),
                        error = %e,
                        "classification failed, treating candidate as relevant"
                    );
                    return true;
                }
            }
        }

        error!(
            attempts = self.max_attempts,
            "classification retries exhausted, treating candidate as relevant"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_replies_are_relevant() {
        assert!(interpret_reply("YES"));
        assert!(interpret_reply("  yes.  "));
        assert!(interpret_reply("Yes, this is a genuine fault."));
    }

    #[test]
    fn anything_else_is_not_relevant() {
        assert!(!interpret_reply("NO"));
        assert!(!interpret_reply("no, generic complaint"));
        assert!(!interpret_reply(""));
        assert!(!interpret_reply("UNSURE"));
    }

    #[test]
    fn prompt_embeds_the_candidate_text() {
        let rendered = TRIAGE_PROMPT.replace("{text}", "site down, error 500");
        assert!(rendered.contains("site down, error 500"));
        assert!(!rendered.contains("{text}"));
    }
}
