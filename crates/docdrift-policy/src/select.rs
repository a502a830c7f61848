use crate::score::score;
use docdrift_core::{DriftItem, DriftReport};

/// The one item a run decides on: highest score, first declared on ties.
pub fn select_primary(report: &DriftReport) -> Option<&DriftItem> {
    let mut best: Option<(&DriftItem, f64)> = None;
    for item in &report.items {
        let s = score(&item.signals);
        if best.map_or(true, |(_, b)| s > b) {
            best = Some((item, s));
        }
    }
    best.map(|(item, _)| item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docdrift_core::{Action, Mode, Signal, SignalKind};

    fn item(name: &str, signals: Vec<Signal>) -> DriftItem {
        DriftItem {
            doc_area: name.into(),
            mode: Mode::Autogen,
            signals,
            impacted_docs: Default::default(),
            recommended_action: Action::OpenIssue,
            summary: String::new(),
        }
    }

    fn report(items: Vec<DriftItem>) -> DriftReport {
        DriftReport {
            repo: "r".into(),
            base_sha: "b".into(),
            head_sha: "h".into(),
            trigger: "push".into(),
            generated_at: "2026-10-19T00:00:00Z".into(),
            items,
        }
    }

    #[test]
    fn highest_score_wins() {
        let r = report(vec![
            item("guides", vec![Signal::heuristic(vec![])]),
            item("api", vec![Signal::spec_diff(SignalKind::OpenapiDiff, vec![])]),
        ]);
        assert_eq!(select_primary(&r).unwrap().doc_area, "api");
    }

    #[test]
    fn ties_go_to_first_declared() {
        let r = report(vec![
            item("a", vec![Signal::heuristic(vec![])]),
            item("b", vec![Signal::heuristic(vec![])]),
        ]);
        assert_eq!(select_primary(&r).unwrap().doc_area, "a");
    }

    #[test]
    fn empty_report_has_no_primary() {
        assert!(select_primary(&report(vec![])).is_none());
    }
}
