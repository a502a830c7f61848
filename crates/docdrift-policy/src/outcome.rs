//! Recording what happened after a decision was carried out.

use crate::days::{day_key, is_day_key};
use anyhow::Result;
use docdrift_core::{Outcome, PolicyDecision};
use docdrift_store::state::{area_day_key, OPENED_MARKER};
use docdrift_store::{IdempotencyRecord, State};
use time::format_description::well_known::Rfc3339;
use time::{Date, Duration, OffsetDateTime};

/// Record an executed decision. Returns `false` (and changes nothing) when the
/// idempotency key is already present; a key is written exactly once.
///
/// Only `PR_OPENED` touches the PR counters.
pub fn apply_outcome(
    state: &mut State,
    decision: &PolicyDecision,
    outcome: Outcome,
    link: Option<&str>,
    now: OffsetDateTime,
) -> Result<bool> {
    if state.is_processed(&decision.idempotency_key) {
        tracing::debug!(key = %decision.idempotency_key, "outcome already recorded");
        return Ok(false);
    }

    state.idempotency.insert(
        decision.idempotency_key.clone(),
        IdempotencyRecord {
            created_at: now.format(&Rfc3339)?,
            action: decision.action,
            outcome,
            link: link.map(str::to_string),
        },
    );

    if outcome == Outcome::PrOpened {
        let today = day_key(now.date());
        *state.daily_pr_count.entry(today.clone()).or_insert(0) += 1;
        state.area_daily_pr_opened.insert(
            area_day_key(&today, &decision.doc_area),
            link.unwrap_or(OPENED_MARKER).to_string(),
        );
        if let Some(link) = link {
            state
                .area_latest_pr
                .insert(decision.doc_area.clone(), link.to_string());
        }
    }

    tracing::info!(
        doc_area = %decision.doc_area,
        action = decision.action.as_str(),
        outcome = outcome.as_str(),
        "outcome recorded"
    );
    Ok(true)
}

/// Drop day-keyed counters older than `keep_days` before `today`. The
/// idempotency ledger and latest-PR links are kept. Returns entries removed.
pub fn prune_state(state: &mut State, keep_days: u32, today: Date) -> usize {
    let cutoff = today
        .checked_sub(Duration::days(i64::from(keep_days)))
        .map(day_key)
        .unwrap_or_default();
    let stale = |day: &str| is_day_key(day) && day < cutoff.as_str();

    let before = state.daily_pr_count.len() + state.area_daily_pr_opened.len();
    state.daily_pr_count.retain(|day, _| !stale(day.as_str()));
    state.area_daily_pr_opened.retain(|key, _| {
        let day = key.split_once(':').map_or(key.as_str(), |(d, _)| d);
        !stale(day)
    });
    let removed = before - (state.daily_pr_count.len() + state.area_daily_pr_opened.len());

    if removed > 0 {
        tracing::info!(removed, keep_days, "pruned state counters");
    }
    removed
}
