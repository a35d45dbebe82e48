// src/config.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "FEEDWATCH_CONFIG";
const DEFAULT_PATH: &str = "config.json";

fn default_scan_interval() -> u64 {
    3600
}
fn default_classify_delay() -> u64 {
    60
}
fn default_history_file() -> String {
    "seen_links.txt".to_string()
}

/// Startup configuration. Missing or malformed config is a hard error: the
/// process refuses to run half-configured, unlike the soft-fail policy for
/// runtime faults.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Subreddit names to poll, in scan order.
    pub sources: Vec<String>,
    /// Keywords matched case-insensitively against title + summary.
    pub keywords: Vec<String>,
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,
    /// Pause between consecutive classification calls within one cycle.
    #[serde(default = "default_classify_delay")]
    pub classify_delay_secs: u64,
    #[serde(default = "default_history_file")]
    pub history_file: String,
}

impl MonitorConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg: MonitorConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        // Keywords are matched lowercased; normalize once at load.
        cfg.keywords = cfg
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        cfg.sources.retain(|s| !s.trim().is_empty());
        Ok(cfg)
    }

    /// Load using `$FEEDWATCH_CONFIG` when set, falling back to `config.json`
    /// in the working directory.
    pub fn load_default() -> Result<Self> {
        let path = std::env::var(ENV_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_PATH));
        Self::load_from(&path)
    }
}
