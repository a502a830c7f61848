use crate::score::score;
use anyhow::Result;
use docdrift_core::canon::canonical_json_bytes;
use docdrift_core::config::{DocAreaConfig, PolicyConfig};
use docdrift_core::glob::GlobList;
use docdrift_core::hash::sha256_hex;
use docdrift_core::{Action, DriftItem, Mode, PolicyDecision};
use docdrift_store::State;

/// Conceptual areas need this much more confidence than the autopatch threshold.
const CONCEPTUAL_MARGIN: f64 = 0.10;
/// Ceiling on the conceptual bar so it stays reachable.
const CONCEPTUAL_MAX_BAR: f64 = 0.95;

/// Everything one decision depends on. `today` is a `YYYY-MM-DD` UTC day key.
pub struct PolicyInput<'a> {
    pub item: &'a DriftItem,
    pub area: &'a DocAreaConfig,
    pub policy: &'a PolicyConfig,
    pub state: &'a State,
    pub repo: &'a str,
    pub base_sha: &'a str,
    pub head_sha: &'a str,
    pub today: &'a str,
}

/// sha256 of the canonical JSON of `{action, base_sha, doc_area, head_sha, repo}`.
pub fn idempotency_key(
    repo: &str,
    doc_area: &str,
    base_sha: &str,
    head_sha: &str,
    action: Action,
) -> String {
    let payload = serde_json::json!({
        "action": action.as_str(),
        "base_sha": base_sha,
        "doc_area": doc_area,
        "head_sha": head_sha,
        "repo": repo,
    });
    sha256_hex(&canonical_json_bytes(&payload))
}

/// Decide what to do about one drift item. Rules are checked in priority order
/// and the first match wins; an already-recorded idempotency key overrides the
/// result with `NOOP`.
pub fn decide(input: &PolicyInput<'_>) -> Result<PolicyDecision> {
    let confidence = score(&input.item.signals);
    let (action, reason) = choose(input, confidence)?;

    let idempotency_key = idempotency_key(
        input.repo,
        &input.item.doc_area,
        input.base_sha,
        input.head_sha,
        action,
    );
    let (action, reason) = if input.state.is_processed(&idempotency_key) {
        (Action::Noop, "already processed".to_string())
    } else {
        (action, reason)
    };

    tracing::info!(
        doc_area = %input.item.doc_area,
        action = action.as_str(),
        confidence,
        reason = %reason,
        "policy decision"
    );

    Ok(PolicyDecision {
        doc_area: input.item.doc_area.clone(),
        action,
        confidence,
        reason,
        idempotency_key,
    })
}

// ── Rules ──

fn choose(input: &PolicyInput<'_>, confidence: f64) -> Result<(Action, String)> {
    let policy = input.policy;
    let item = input.item;

    if let Some(path) = first_non_allowlisted(policy, item)? {
        return Ok((Action::OpenIssue, format!("non-allowlisted path: {path}")));
    }

    let max_files = policy.pr_caps.max_files_touched;
    if item.impacted_docs.len() > max_files {
        return Ok((
            Action::OpenIssue,
            format!(
                "exceeds file cap: {} impacted docs > {max_files}",
                item.impacted_docs.len()
            ),
        ));
    }

    let threshold = policy.confidence.autopatch_threshold;
    let strong = item.has_strong_signal();

    match input.area.mode {
        Mode::Autogen => {
            if !strong {
                return Ok((Action::OpenIssue, "no strong signal".into()));
            }
            if confidence < threshold {
                return Ok((
                    Action::OpenIssue,
                    format!("below threshold: {confidence:.3} < {threshold:.3}"),
                ));
            }
            let opened_today = input.state.prs_opened_on(input.today);
            if opened_today >= policy.pr_caps.max_prs_per_day {
                return Ok(match input.state.latest_pr(&item.doc_area) {
                    Some(pr) => (
                        Action::UpdateExistingPr,
                        format!("daily PR cap reached; updating {pr}"),
                    ),
                    None => (Action::OpenIssue, "daily PR cap reached".into()),
                });
            }
            if input
                .state
                .area_pr_opened_on(input.today, &item.doc_area)
                .is_some()
            {
                return Ok((
                    Action::UpdateExistingPr,
                    "PR already opened for this area today".into(),
                ));
            }
            Ok((Action::OpenPr, "strong signal above threshold".into()))
        }
        Mode::Conceptual => {
            let bar = (threshold + CONCEPTUAL_MARGIN).min(CONCEPTUAL_MAX_BAR);
            if input.area.requires_human_confirmation() {
                return Ok((
                    Action::OpenIssue,
                    "conceptual change requires human confirmation".into(),
                ));
            }
            if strong && confidence >= bar {
                Ok((
                    Action::OpenPr,
                    format!("conceptual change with strong signal: {confidence:.3} >= {bar:.3}"),
                ))
            } else {
                Ok((
                    Action::OpenIssue,
                    "conceptual change needs review".into(),
                ))
            }
        }
    }
}

/// First impacted doc that is neither allowlisted nor excluded. Excluded docs
/// are never acted on, so they do not block the rest.
fn first_non_allowlisted<'a>(
    policy: &PolicyConfig,
    item: &'a DriftItem,
) -> Result<Option<&'a str>> {
    let allow = GlobList::new(&policy.allowlist)?;
    let exclude = GlobList::new(&policy.exclude)?;
    Ok(item
        .impacted_docs
        .iter()
        .map(String::as_str)
        .find(|doc| !allow.is_match(doc) && !exclude.is_match(doc)))
}
