use crate::run_dir::{write_json, RunDir};
use anyhow::{Context, Result};
use docdrift_core::config::load_config;
use docdrift_detect::{DirEvidence, DriftDetector, RunInfo, StaticChangedPaths};
use docdrift_policy::{decide, days, score, select_primary, PolicyInput};
use docdrift_store::{FileStateRepository, StateRepository};
use std::path::Path;

pub struct DetectParams<'a> {
    pub repo_root: &'a Path,
    pub base: &'a str,
    pub head: &'a str,
    pub config: &'a Path,
    pub trigger: &'a str,
    pub out: &'a Path,
    pub state: &'a Path,
    pub paths: Option<Vec<String>>,
}

/// Execute `docdrift detect`. Returns whether any drift item was found.
pub fn execute(params: DetectParams<'_>) -> Result<bool> {
    let config = load_config(params.config)?;
    let (run_id, run_dir) = RunDir::create(params.out)?;
    tracing::info!(run_id = %run_id, base = params.base, head = params.head, "detect");

    let repo_name = config.repo.clone();
    let policy = config.policy.clone();
    let areas = config.doc_areas.clone();

    let mut detector = DriftDetector::new(
        config,
        params.repo_root,
        Box::new(DirEvidence::new(run_dir.evidence_dir())),
    );
    if let Some(paths) = params.paths {
        detector = detector.with_lister(Box::new(StaticChangedPaths(paths)));
    }

    let run = RunInfo {
        base: params.base.to_string(),
        head: params.head.to_string(),
        trigger: params.trigger.to_string(),
    };
    let report = tokio::runtime::Runtime::new()?.block_on(detector.detect(&run))?;
    write_json(&run_dir.report_path(), &report)?;

    let items: Vec<serde_json::Value> = report
        .items
        .iter()
        .map(|i| {
            serde_json::json!({
                "doc_area": i.doc_area,
                "score": score(&i.signals),
                "recommended_action": i.recommended_action,
                "summary": i.summary,
            })
        })
        .collect();

    let decision = match select_primary(&report) {
        Some(item) => {
            let area = areas
                .iter()
                .find(|a| a.name == item.doc_area)
                .context("report item has no matching doc area")?;
            let state = FileStateRepository::new(params.state).load()?;
            let today = days::today();
            let decision = decide(&PolicyInput {
                item,
                area,
                policy: &policy,
                state: &state,
                repo: &repo_name,
                base_sha: &report.base_sha,
                head_sha: &report.head_sha,
                today: &today,
            })?;
            write_json(&run_dir.decision_path(), &decision)?;
            Some(decision)
        }
        None => None,
    };

    let summary = serde_json::json!({
        "run_id": run_id,
        "run_dir": run_dir.root().display().to_string(),
        "has_drift": report.has_drift(),
        "items": items,
        "decision": decision,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(report.has_drift())
}
