//! File-backed record of previously seen item links.
//!
//! The file is the single source of truth for cross-restart dedup: one link
//! per line, append order = chronological order. It is reloaded at the start
//! of every scan cycle so external edits are picked up and in-process memory
//! never outgrows the file's own bound.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{error, info};

/// Above this line count, `load` compacts the file down to the newest
/// `COMPACT_RETAIN` entries.
const COMPACT_THRESHOLD: usize = 5000;
const COMPACT_RETAIN: usize = 1000;

pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the seen-link set. Fails soft: a missing file is an empty
    /// history, and a read error is logged and treated the same way rather
    /// than aborting the cycle.
    ///
    /// Loading also compacts: past `COMPACT_THRESHOLD` lines the file is
    /// rewritten keeping only the newest `COMPACT_RETAIN`, and the retained
    /// set is returned. If the rewrite fails, the full set read from disk is
    /// returned unchanged.
    pub fn load(&self) -> HashSet<String> {
        if !self.path.exists() {
            return HashSet::new();
        }

        let lines: Vec<String> = match fs::read_to_string(&self.path) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) => {
                error!(error = %e, path = %self.path.display(), "failed to read history file");
                return HashSet::new();
            }
        };

        if lines.len() > COMPACT_THRESHOLD {
            info!(entries = lines.len(), "compacting history file");
            let recent = lines[lines.len() - COMPACT_RETAIN..].to_vec();
            match self.rewrite(&recent) {
                Ok(()) => {
                    info!(retained = recent.len(), "history file compacted");
                    return recent.into_iter().collect();
                }
                Err(e) => {
                    error!(error = %e, path = %self.path.display(), "history compaction failed");
                    return lines.into_iter().collect();
                }
            }
        }

        lines.into_iter().collect()
    }

    /// Append one link. Persistence is best-effort: an I/O failure is logged
    /// and swallowed; the calling cycle continues.
    pub fn append(&self, link: &str) {
        let result = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| writeln!(f, "{link}"));
        if let Err(e) = result {
            error!(error = %e, path = %self.path.display(), "failed to append to history file");
        }
    }

    fn rewrite(&self, lines: &[String]) -> std::io::Result<()> {
        let tmp = self.path.with_extension("tmp");
        let mut f = fs::File::create(&tmp)?;
        for line in lines {
            writeln!(f, "{line}")?;
        }
        fs::rename(tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> HistoryStore {
        HistoryStore::new(dir.path().join("seen.txt"))
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store_in(&dir).load().is_empty());
    }

    #[test]
    fn append_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.append("https://example.test/a");
        store.append("https://example.test/b");

        let seen = store.load();
        assert_eq!(seen.len(), 2);
        assert!(seen.contains("https://example.test/a"));
        assert!(seen.contains("https://example.test/b"));
    }

    #[test]
    fn blank_lines_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "a\n\n  \nb\n").unwrap();
        assert_eq!(store.load().len(), 2);
    }

    #[test]
    fn load_compacts_past_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        for i in 0..(COMPACT_THRESHOLD + 1) {
            store.append(&format!("link-{i}"));
        }

        let seen = store.load();
        assert_eq!(seen.len(), COMPACT_RETAIN);
        // Newest entries survive, oldest are gone.
        assert!(seen.contains(&format!("link-{COMPACT_THRESHOLD}")));
        assert!(!seen.contains("link-0"));

        // The file itself was rewritten, so a fresh load sees the same bound.
        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(content.lines().count(), COMPACT_RETAIN);
    }

    #[test]
    fn load_at_threshold_does_not_compact() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        for i in 0..COMPACT_THRESHOLD {
            store.append(&format!("link-{i}"));
        }
        assert_eq!(store.load().len(), COMPACT_THRESHOLD);
    }
}
