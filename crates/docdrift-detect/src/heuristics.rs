use crate::evidence::EvidenceSink;
use anyhow::Result;
use docdrift_core::config::PathRule;
use docdrift_core::glob::PathGlob;
use docdrift_core::Signal;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub struct PathMatch {
    pub rule: String,
    pub path: String,
    pub impacts: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct HeuristicResult {
    pub signal: Option<Signal>,
    pub impacted_docs: BTreeSet<String>,
    pub summary: String,
    pub evidence_files: Vec<String>,
    pub matches: Vec<PathMatch>,
}

/// Map changed source paths to conceptually impacted docs.
///
/// No match is a legitimate "no conceptual impact" result. A match only claims
/// plausibility, so the signal is tier 2 at a fixed confidence.
pub fn detect_path_impact(
    doc_area: &str,
    rules: &[PathRule],
    changed_paths: &[String],
    evidence: &dyn EvidenceSink,
) -> Result<HeuristicResult> {
    let mut matches = Vec::new();
    let mut impacted_docs = BTreeSet::new();

    for rule in rules {
        let glob = PathGlob::new(&rule.match_glob)?;
        for path in changed_paths {
            if glob.is_match(path) {
                impacted_docs.extend(rule.impacts.iter().cloned());
                matches.push(PathMatch {
                    rule: rule.match_glob.clone(),
                    path: path.clone(),
                    impacts: rule.impacts.clone(),
                });
            }
        }
    }

    if matches.is_empty() {
        return Ok(HeuristicResult::default());
    }

    let mut body = format!("Path heuristics for doc area '{doc_area}'\n\n");
    for m in &matches {
        body.push_str(&format!(
            "- rule `{}` matched `{}` -> {}\n",
            m.rule,
            m.path,
            m.impacts.join(", ")
        ));
    }
    let location = evidence.write(&format!("{doc_area}.heuristics.txt"), &body)?;

    tracing::debug!(doc_area, matches = matches.len(), "path heuristics matched");

    Ok(HeuristicResult {
        signal: Some(Signal::heuristic(vec![location.clone()])),
        summary: format!(
            "{} changed path(s) matched heuristics; impacted docs: {}",
            matches.len(),
            impacted_docs.iter().cloned().collect::<Vec<_>>().join(", ")
        ),
        impacted_docs,
        evidence_files: vec![location],
        matches,
    })
}
