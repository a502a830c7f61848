use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Lists repo-relative paths changed between two revisions.
#[async_trait::async_trait]
pub trait ChangedPathLister: Send + Sync {
    async fn changed_paths(&self, base: &str, head: &str) -> Result<Vec<String>>;
}

/// `git diff --name-only <base> <head>` in the repository root.
pub struct GitChangedPaths {
    repo_root: PathBuf,
}

impl GitChangedPaths {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }
}

#[async_trait::async_trait]
impl ChangedPathLister for GitChangedPaths {
    async fn changed_paths(&self, base: &str, head: &str) -> Result<Vec<String>> {
        let output = Command::new("git")
            .args(["diff", "--name-only", base, head])
            .current_dir(&self.repo_root)
            .output()
            .await
            .context("spawning git diff")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git diff {base} {head} failed: {}", stderr.trim());
        }

        Ok(parse_name_only(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// A fixed list of paths (explicit `--paths`, tests).
pub struct StaticChangedPaths(pub Vec<String>);

#[async_trait::async_trait]
impl ChangedPathLister for StaticChangedPaths {
    async fn changed_paths(&self, _base: &str, _head: &str) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

fn parse_name_only(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.replace('\\', "/"))
        .collect()
}
