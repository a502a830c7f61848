use crate::run_dir::read_json;
use anyhow::Result;
use docdrift_core::DriftReport;
use docdrift_policy::{combine_with_agent_confidence, score, select_primary};
use std::path::Path;

/// Execute `docdrift score`.
pub fn execute(report_path: &Path, agent_confidence: Option<f64>) -> Result<()> {
    let report: DriftReport = read_json(report_path)?;
    let items: Vec<serde_json::Value> = report
        .items
        .iter()
        .map(|item| {
            let detector = score(&item.signals);
            serde_json::json!({
                "doc_area": item.doc_area,
                "signals": item.signals.len(),
                "score": detector,
                "combined": combine_with_agent_confidence(detector, agent_confidence),
            })
        })
        .collect();

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "primary": select_primary(&report).map(|i| i.doc_area.as_str()),
            "items": items,
        }))?
    );
    Ok(())
}
