use crate::changes::{ChangedPathLister, GitChangedPaths};
use crate::evidence::EvidenceSink;
use crate::exec::{CommandExecutor, ShellExecutor};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::heuristics::detect_path_impact;
use crate::spec::{detect_spec, SpecContext};
use crate::verify::{run_verification, VerificationResult};
use anyhow::Result;
use docdrift_core::config::{DocAreaConfig, DriftConfig};
use docdrift_core::{Action, DriftItem, DriftReport, Mode, Signal};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

const SUMMARY_SEPARATOR: &str = "\n\n";

/// The revision pair and trigger a run is evaluated for.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub base: String,
    pub head: String,
    pub trigger: String,
}

/// Runs every detector for every configured doc area and assembles the report.
///
/// Detectors run one after another; per area the order is verification, spec,
/// heuristics, and the report keeps areas in declared order.
pub struct DriftDetector {
    config: DriftConfig,
    repo_root: PathBuf,
    executor: Box<dyn CommandExecutor>,
    fetcher: Box<dyn Fetcher>,
    lister: Box<dyn ChangedPathLister>,
    evidence: Box<dyn EvidenceSink>,
}

impl DriftDetector {
    /// Detector with the default shell executor, HTTP fetcher and git lister.
    pub fn new(
        config: DriftConfig,
        repo_root: impl Into<PathBuf>,
        evidence: Box<dyn EvidenceSink>,
    ) -> Self {
        let repo_root = repo_root.into();
        Self {
            config,
            lister: Box::new(GitChangedPaths::new(repo_root.clone())),
            repo_root,
            executor: Box::new(ShellExecutor),
            fetcher: Box::new(HttpFetcher),
            evidence,
        }
    }

    pub fn with_executor(mut self, executor: Box<dyn CommandExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Box<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_lister(mut self, lister: Box<dyn ChangedPathLister>) -> Self {
        self.lister = lister;
        self
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    pub async fn detect(&self, run: &RunInfo) -> Result<DriftReport> {
        let verification = run_verification(
            &self.config.verify.commands,
            Duration::from_secs(self.config.verify.timeout_sec),
            &self.repo_root,
            self.executor.as_ref(),
            self.evidence.as_ref(),
        )
        .await?;

        // Only ask for changed paths when some area has path rules.
        let changed_paths = if self.config.doc_areas.iter().any(|a| !a.detect.paths.is_empty()) {
            self.lister.changed_paths(&run.base, &run.head).await?
        } else {
            Vec::new()
        };
        tracing::debug!(changed = changed_paths.len(), "changed paths listed");

        let mut items = Vec::new();
        for area in &self.config.doc_areas {
            if let Some(item) = self.detect_area(area, &verification, &changed_paths).await? {
                tracing::info!(
                    doc_area = %item.doc_area,
                    signals = item.signals.len(),
                    recommended = item.recommended_action.as_str(),
                    "drift item"
                );
                items.push(item);
            }
        }

        Ok(DriftReport {
            repo: self.config.repo.clone(),
            base_sha: run.base.clone(),
            head_sha: run.head.clone(),
            trigger: run.trigger.clone(),
            generated_at: OffsetDateTime::now_utc().format(&Rfc3339)?,
            items,
        })
    }

    async fn detect_area(
        &self,
        area: &DocAreaConfig,
        verification: &VerificationResult,
        changed_paths: &[String],
    ) -> Result<Option<DriftItem>> {
        let mut signals = Vec::new();
        let mut impacted_docs = BTreeSet::new();
        let mut summaries = Vec::new();

        if let Some(signal) = &verification.signal {
            signals.push(signal.clone());
            summaries.push(verification.summary.clone());
        }

        if let Some(spec) = &area.detect.spec {
            let ctx = SpecContext {
                repo_root: &self.repo_root,
                executor: self.executor.as_ref(),
                fetcher: self.fetcher.as_ref(),
                evidence: self.evidence.as_ref(),
            };
            let det = detect_spec(&area.name, spec, &ctx).await?;
            if let Some(signal) = det.signal {
                signals.push(signal);
                impacted_docs.extend(det.impacted_docs);
            }
            summaries.push(det.summary);
        }

        if !area.detect.paths.is_empty() {
            let res = detect_path_impact(
                &area.name,
                &area.detect.paths,
                changed_paths,
                self.evidence.as_ref(),
            )?;
            if let Some(signal) = res.signal {
                signals.push(signal);
            }
            impacted_docs.extend(res.impacted_docs);
            summaries.push(res.summary);
        }

        if signals.is_empty() {
            return Ok(None);
        }

        let summary = summaries
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(SUMMARY_SEPARATOR);

        Ok(Some(DriftItem {
            doc_area: area.name.clone(),
            mode: area.mode,
            recommended_action: recommend_action(area.mode, &signals),
            signals,
            impacted_docs,
            summary,
        }))
    }
}

/// Advisory default action; the policy engine makes the binding decision.
pub fn recommend_action(mode: Mode, signals: &[Signal]) -> Action {
    if signals.is_empty() {
        return Action::Noop;
    }
    match mode {
        Mode::Autogen if signals.iter().any(Signal::is_strong) => Action::OpenPr,
        Mode::Autogen | Mode::Conceptual => Action::OpenIssue,
    }
}
