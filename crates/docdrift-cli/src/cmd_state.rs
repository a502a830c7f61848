use anyhow::Result;
use docdrift_policy::prune_state;
use docdrift_store::{FileStateRepository, StateRepository};
use std::path::Path;
use time::OffsetDateTime;

/// Execute `docdrift state show`.
pub fn show(state_path: &Path) -> Result<()> {
    let state = FileStateRepository::new(state_path).load()?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

/// Execute `docdrift state prune`.
pub fn prune(state_path: &Path, keep_days: u32) -> Result<()> {
    let repo = FileStateRepository::new(state_path);
    let _guard = repo.lock()?;
    let mut state = repo.load()?;
    let removed = prune_state(&mut state, keep_days, OffsetDateTime::now_utc().date());
    if removed > 0 {
        repo.save(&state)?;
    }
    println!("pruned {removed} entries from {}", state_path.display());
    Ok(())
}
