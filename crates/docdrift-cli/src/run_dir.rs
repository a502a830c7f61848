//! On-disk layout of one run: `<out>/run_<ulid>/{report.json,decision.json,evidence/}`.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const REPORT_FILE: &str = "report.json";
pub const DECISION_FILE: &str = "decision.json";
pub const EVIDENCE_DIR: &str = "evidence";

pub fn new_run_id() -> String {
    format!("run_{}", ulid::Ulid::new())
}

pub struct RunDir {
    root: PathBuf,
}

impl RunDir {
    pub fn create(out: &Path) -> Result<(String, Self)> {
        let id = new_run_id();
        let root = out.join(&id);
        std::fs::create_dir_all(root.join(EVIDENCE_DIR))
            .with_context(|| format!("creating run dir {}", root.display()))?;
        Ok((id, Self { root }))
    }

    pub fn open(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn evidence_dir(&self) -> PathBuf {
        self.root.join(EVIDENCE_DIR)
    }

    pub fn report_path(&self) -> PathBuf {
        self.root.join(REPORT_FILE)
    }

    pub fn decision_path(&self) -> PathBuf {
        self.root.join(DECISION_FILE)
    }
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_string_pretty(value)?;
    docdrift_store::write_atomic(path, data.as_bytes())
        .with_context(|| format!("writing {}", path.display()))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_are_unique_and_prefixed() {
        let a = new_run_id();
        let b = new_run_id();
        assert!(a.starts_with("run_"));
        assert_eq!(a.len(), 4 + 26);
        assert_ne!(a, b);
    }

    #[test]
    fn create_makes_evidence_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let (id, dir) = RunDir::create(tmp.path()).unwrap();
        assert!(dir.evidence_dir().is_dir());
        assert_eq!(dir.root(), tmp.path().join(id));
    }

    #[test]
    fn json_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("x.json");
        write_json(&path, &serde_json::json!({"a": 1})).unwrap();
        let v: serde_json::Value = read_json(&path).unwrap();
        assert_eq!(v["a"], 1);
    }
}
