use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Strongest tier: failed verification.
pub const TIER_VERIFICATION: u8 = 0;
/// Structural diff of a machine-readable spec.
pub const TIER_SPEC_DIFF: u8 = 1;
/// Plausibility only (path co-occurrence, unreachable ground truth).
pub const TIER_PLAUSIBLE: u8 = 2;

pub const VERIFICATION_CONFIDENCE: f64 = 0.99;
pub const SPEC_DIFF_CONFIDENCE: f64 = 0.95;
pub const HEURISTIC_CONFIDENCE: f64 = 0.67;
pub const WEAK_EVIDENCE_CONFIDENCE: f64 = 0.35;

/// Closed set of evidence kinds a detector can emit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    OpenapiDiff,
    SwaggerDiff,
    GraphqlDiff,
    FernDiff,
    PostmanDiff,
    HeuristicPathImpact,
    DocsCheckFailed,
    WeakEvidence,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::OpenapiDiff => "openapi_diff",
            SignalKind::SwaggerDiff => "swagger_diff",
            SignalKind::GraphqlDiff => "graphql_diff",
            SignalKind::FernDiff => "fern_diff",
            SignalKind::PostmanDiff => "postman_diff",
            SignalKind::HeuristicPathImpact => "heuristic_path_impact",
            SignalKind::DocsCheckFailed => "docs_check_failed",
            SignalKind::WeakEvidence => "weak_evidence",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One piece of evidence that documentation may be stale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Signal {
    pub kind: SignalKind,
    /// Ordinal strength, 0 (strongest) to 3 (weakest).
    pub tier: u8,
    /// Detector-local estimate in [0, 1].
    pub confidence: f64,
    /// Artifact locations (diff files, logs), in the order they were written.
    #[serde(default)]
    pub evidence: Vec<String>,
}

impl Signal {
    pub fn new(kind: SignalKind, tier: u8, confidence: f64, evidence: Vec<String>) -> Self {
        Self {
            kind,
            tier,
            confidence,
            evidence,
        }
    }

    pub fn spec_diff(kind: SignalKind, evidence: Vec<String>) -> Self {
        Self::new(kind, TIER_SPEC_DIFF, SPEC_DIFF_CONFIDENCE, evidence)
    }

    pub fn weak_evidence(evidence: Vec<String>) -> Self {
        Self::new(
            SignalKind::WeakEvidence,
            TIER_PLAUSIBLE,
            WEAK_EVIDENCE_CONFIDENCE,
            evidence,
        )
    }

    pub fn heuristic(evidence: Vec<String>) -> Self {
        Self::new(
            SignalKind::HeuristicPathImpact,
            TIER_PLAUSIBLE,
            HEURISTIC_CONFIDENCE,
            evidence,
        )
    }

    pub fn verification_failed(evidence: Vec<String>) -> Self {
        Self::new(
            SignalKind::DocsCheckFailed,
            TIER_VERIFICATION,
            VERIFICATION_CONFIDENCE,
            evidence,
        )
    }

    pub fn is_strong(&self) -> bool {
        self.tier <= TIER_SPEC_DIFF
    }
}

/// How a doc area is maintained.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Generated from a machine-readable source; safe to patch automatically.
    #[default]
    Autogen,
    /// Hand-written prose; defaults to a human in the loop.
    Conceptual,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Noop,
    OpenPr,
    UpdateExistingPr,
    OpenIssue,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Noop => "NOOP",
            Action::OpenPr => "OPEN_PR",
            Action::UpdateExistingPr => "UPDATE_EXISTING_PR",
            Action::OpenIssue => "OPEN_ISSUE",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What actually happened after a decision was executed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    PrOpened,
    IssueOpened,
    NoChange,
    Blocked,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::PrOpened => "PR_OPENED",
            Outcome::IssueOpened => "ISSUE_OPENED",
            Outcome::NoChange => "NO_CHANGE",
            Outcome::Blocked => "BLOCKED",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "pr_opened" => Ok(Outcome::PrOpened),
            "issue_opened" => Ok(Outcome::IssueOpened),
            "no_change" => Ok(Outcome::NoChange),
            "blocked" => Ok(Outcome::Blocked),
            other => anyhow::bail!(
                "unknown outcome '{other}' (expected pr_opened, issue_opened, no_change or blocked)"
            ),
        }
    }
}

/// One doc area's findings for one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriftItem {
    pub doc_area: String,
    pub mode: Mode,
    /// Detection order: verification, spec, heuristics.
    pub signals: Vec<Signal>,
    pub impacted_docs: BTreeSet<String>,
    pub recommended_action: Action,
    pub summary: String,
}

impl DriftItem {
    pub fn has_strong_signal(&self) -> bool {
        self.signals.iter().any(Signal::is_strong)
    }
}

/// Run metadata plus the drifted doc areas. Written once per run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriftReport {
    pub repo: String,
    pub base_sha: String,
    pub head_sha: String,
    pub trigger: String,
    pub generated_at: String,
    pub items: Vec<DriftItem>,
}

impl DriftReport {
    pub fn has_drift(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn item(&self, doc_area: &str) -> Option<&DriftItem> {
        self.items.iter().find(|i| i.doc_area == doc_area)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyDecision {
    pub doc_area: String,
    pub action: Action,
    pub confidence: f64,
    pub reason: String,
    pub idempotency_key: String,
}
