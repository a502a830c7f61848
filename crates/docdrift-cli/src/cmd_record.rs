use crate::run_dir::{read_json, RunDir};
use anyhow::{Context, Result};
use docdrift_core::{Outcome, PolicyDecision};
use docdrift_policy::apply_outcome;
use docdrift_store::{FileStateRepository, StateRepository};
use std::path::Path;
use time::OffsetDateTime;

/// Execute `docdrift record`: apply an outcome to state under the state lock.
pub fn execute(run: &Path, outcome: &str, link: Option<&str>, state_path: &Path) -> Result<()> {
    let outcome: Outcome = outcome.parse()?;
    let run_dir = RunDir::open(run);
    let decision: PolicyDecision = read_json(&run_dir.decision_path())
        .with_context(|| format!("run {} has no decision to record", run.display()))?;

    let repo = FileStateRepository::new(state_path);
    let _guard = repo.lock()?;
    let mut state = repo.load()?;
    let recorded = apply_outcome(&mut state, &decision, outcome, link, OffsetDateTime::now_utc())?;
    if recorded {
        repo.save(&state)?;
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "recorded": recorded,
            "doc_area": decision.doc_area,
            "action": decision.action,
            "outcome": outcome,
            "idempotency_key": decision.idempotency_key,
        }))?
    );
    Ok(())
}
