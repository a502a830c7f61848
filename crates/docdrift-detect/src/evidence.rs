use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Where detectors put their artifacts (diffs, logs, heuristic matches).
///
/// `write` returns the location recorded in [`docdrift_core::Signal::evidence`].
pub trait EvidenceSink: Send + Sync {
    fn write(&self, name: &str, content: &str) -> Result<String>;
}

/// Writes each artifact atomically as `<dir>/<name>`.
pub struct DirEvidence {
    dir: PathBuf,
}

impl DirEvidence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl EvidenceSink for DirEvidence {
    fn write(&self, name: &str, content: &str) -> Result<String> {
        let path = self.dir.join(name);
        docdrift_store::write_atomic(&path, content.as_bytes())?;
        Ok(path.display().to_string())
    }
}

/// Collects artifacts in memory (for testing).
pub struct MemoryEvidence {
    files: Mutex<BTreeMap<String, String>>,
}

impl MemoryEvidence {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.files.lock().unwrap().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }
}

impl Default for MemoryEvidence {
    fn default() -> Self {
        Self::new()
    }
}

impl EvidenceSink for MemoryEvidence {
    fn write(&self, name: &str, content: &str) -> Result<String> {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), content.to_string());
        Ok(name.to_string())
    }
}
