//! Persisted cross-run state: the idempotency ledger plus daily PR counters.
//!
//! The store is single-writer. Callers must serialize load → mutate → save per
//! repository, either by running one job at a time or by holding
//! [`FileStateRepository::lock`] for the whole cycle.

use crate::write_atomic;
use anyhow::{Context, Result};
use docdrift_core::{Action, Outcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Marker stored in `area_daily_pr_opened` when a PR was opened without a link.
pub const OPENED_MARKER: &str = "opened";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdempotencyRecord {
    pub created_at: String,
    pub action: Action,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct State {
    /// idempotency key → record. A key is written once and never revisited.
    #[serde(default)]
    pub idempotency: BTreeMap<String, IdempotencyRecord>,
    /// `YYYY-MM-DD` → PRs opened that day.
    #[serde(default)]
    pub daily_pr_count: BTreeMap<String, u32>,
    /// `YYYY-MM-DD:doc_area` → PR link (or [`OPENED_MARKER`]).
    #[serde(default)]
    pub area_daily_pr_opened: BTreeMap<String, String>,
    /// doc_area → most recent PR link.
    #[serde(default)]
    pub area_latest_pr: BTreeMap<String, String>,
}

impl State {
    pub fn is_processed(&self, key: &str) -> bool {
        self.idempotency.contains_key(key)
    }

    pub fn prs_opened_on(&self, day: &str) -> u32 {
        self.daily_pr_count.get(day).copied().unwrap_or(0)
    }

    pub fn area_pr_opened_on(&self, day: &str, doc_area: &str) -> Option<&str> {
        self.area_daily_pr_opened
            .get(&area_day_key(day, doc_area))
            .map(String::as_str)
    }

    pub fn latest_pr(&self, doc_area: &str) -> Option<&str> {
        self.area_latest_pr.get(doc_area).map(String::as_str)
    }
}

pub fn area_day_key(day: &str, doc_area: &str) -> String {
    format!("{day}:{doc_area}")
}

/// Single-writer persistence boundary for [`State`].
pub trait StateRepository {
    /// Load state, or an empty default if none has been saved yet.
    fn load(&self) -> Result<State>;
    fn save(&self, state: &State) -> Result<()>;
}

/// JSON file on disk, saved atomically (write to temp, then rename).
pub struct FileStateRepository {
    path: PathBuf,
}

impl FileStateRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling lock file: `<state>.lock`.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".lock");
        self.path.with_file_name(name)
    }

    /// Advisory exclusive lock; hold the guard across load → mutate → save.
    pub fn lock(&self) -> Result<crate::LockGuard> {
        crate::lock_file(&self.lock_path())
            .with_context(|| format!("locking state: {}", self.path.display()))
    }
}

impl StateRepository for FileStateRepository {
    fn load(&self) -> Result<State> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no state file, starting empty");
            return Ok(State::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading state: {}", self.path.display()))?;
        let state: State = serde_json::from_str(&content)
            .with_context(|| format!("parsing state: {}", self.path.display()))?;
        Ok(state)
    }

    fn save(&self, state: &State) -> Result<()> {
        let data = serde_json::to_string_pretty(state)?;
        write_atomic(&self.path, data.as_bytes())
            .with_context(|| format!("saving state: {}", self.path.display()))?;
        tracing::debug!(
            path = %self.path.display(),
            keys = state.idempotency.len(),
            "state saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> State {
        let mut state = State::default();
        state.idempotency.insert(
            "abc".into(),
            IdempotencyRecord {
                created_at: "2026-10-19T08:00:00Z".into(),
                action: Action::OpenPr,
                outcome: Outcome::PrOpened,
                link: Some("https://example.test/pr/1".into()),
            },
        );
        state.daily_pr_count.insert("2026-10-19".into(), 1);
        state
            .area_daily_pr_opened
            .insert(area_day_key("2026-10-19", "api"), "https://example.test/pr/1".into());
        state
            .area_latest_pr
            .insert("api".into(), "https://example.test/pr/1".into());
        state
    }

    #[test]
    fn load_nonexistent_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileStateRepository::new(dir.path().join("state.json"));
        assert_eq!(repo.load().unwrap(), State::default());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileStateRepository::new(dir.path().join("nested").join("state.json"));
        let state = sample_state();
        repo.save(&state).unwrap();
        let loaded = repo.load().unwrap();
        assert_eq!(loaded, state);
        assert!(loaded.is_processed("abc"));
        assert_eq!(loaded.prs_opened_on("2026-10-19"), 1);
        assert_eq!(loaded.prs_opened_on("2026-10-20"), 0);
        assert!(loaded.area_pr_opened_on("2026-10-19", "api").is_some());
        assert_eq!(loaded.latest_pr("api"), Some("https://example.test/pr/1"));
    }

    #[test]
    fn corrupt_state_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = FileStateRepository::new(&path).load().unwrap_err();
        assert!(format!("{err:#}").contains("parsing state"));
    }

    #[test]
    fn missing_maps_default_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"daily_pr_count":{"2026-10-01":3}}"#).unwrap();
        let state = FileStateRepository::new(&path).load().unwrap();
        assert!(state.idempotency.is_empty());
        assert_eq!(state.prs_opened_on("2026-10-01"), 3);
    }

    #[test]
    fn lock_path_is_sibling() {
        let repo = FileStateRepository::new("/tmp/docdrift/state.json");
        assert_eq!(repo.lock_path(), PathBuf::from("/tmp/docdrift/state.json.lock"));
    }
}
