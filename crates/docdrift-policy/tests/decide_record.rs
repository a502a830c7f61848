use docdrift_core::config::parse_config;
use docdrift_core::{Action, DriftItem, Mode, Outcome, PolicyDecision, Signal, SignalKind};
use docdrift_policy::{apply_outcome, decide, PolicyInput};
use docdrift_store::{FileStateRepository, StateRepository};
use time::OffsetDateTime;

const CONFIG: &str = r#"
repo: acme/widgets
policy:
  allowlist: ["docs/**"]
doc_areas:
  - name: api-reference
    mode: autogen
    detect:
      paths:
        - { match: "src/**", impacts: ["docs/api.md"] }
"#;

fn item() -> DriftItem {
    DriftItem {
        doc_area: "api-reference".into(),
        mode: Mode::Autogen,
        signals: vec![Signal::spec_diff(
            SignalKind::OpenapiDiff,
            vec!["openapi.diff.txt".into()],
        )],
        impacted_docs: ["docs/openapi.json".to_string()].into_iter().collect(),
        recommended_action: Action::OpenPr,
        summary: "openapi drift: +1 / -0".into(),
    }
}

#[test]
fn decide_record_decide_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let repo = FileStateRepository::new(dir.path().join("state.json"));
    let config = parse_config(CONFIG).unwrap();
    let area = config.area("api-reference").unwrap();
    let item = item();
    let now = OffsetDateTime::now_utc();
    let today = docdrift_policy::days::day_key(now.date());

    let decide_on = |state: &docdrift_store::State, head: &str| {
        decide(&PolicyInput {
            item: &item,
            area,
            policy: &config.policy,
            state,
            repo: &config.repo,
            base_sha: "abc123",
            head_sha: head,
            today: &today,
        })
        .unwrap()
    };
    let record = |decision: &PolicyDecision, outcome: Outcome, link: Option<&str>| {
        let _guard = repo.lock().unwrap();
        let mut state = repo.load().unwrap();
        assert!(apply_outcome(&mut state, decision, outcome, link, now).unwrap());
        repo.save(&state).unwrap();
    };
    let pr = "https://git.test/acme/widgets/pull/12";

    // First run: nothing recorded yet.
    let first = decide_on(&repo.load().unwrap(), "def456");
    assert_eq!(first.action, Action::OpenPr);
    record(&first, Outcome::PrOpened, Some(pr));

    // Same revision pair again: the daily cap now routes it to the open PR.
    let second = decide_on(&repo.load().unwrap(), "def456");
    assert_eq!(second.action, Action::UpdateExistingPr);
    assert!(second.reason.contains("pull/12"));
    assert_ne!(second.idempotency_key, first.idempotency_key);
    record(&second, Outcome::NoChange, Some(pr));

    // Once that is recorded too, rerunning is a no-op.
    let state = repo.load().unwrap();
    let third = decide_on(&state, "def456");
    assert_eq!(third.action, Action::Noop);
    assert_eq!(third.idempotency_key, second.idempotency_key);
    assert_eq!(state.prs_opened_on(&today), 1);

    // A new head the same day bundles into the PR opened earlier.
    let fourth = decide_on(&state, "fff999");
    assert_eq!(fourth.action, Action::UpdateExistingPr);
    assert!(fourth.reason.contains("pull/12"));
}

#[test]
fn recorded_key_alone_yields_noop() {
    let dir = tempfile::tempdir().unwrap();
    let repo = FileStateRepository::new(dir.path().join("state.json"));
    let config = parse_config(CONFIG).unwrap();
    let item = item();
    let today = docdrift_policy::days::today();
    let decide_on = |state: &docdrift_store::State| {
        decide(&PolicyInput {
            item: &item,
            area: config.area("api-reference").unwrap(),
            policy: &config.policy,
            state,
            repo: &config.repo,
            base_sha: "abc123",
            head_sha: "def456",
            today: &today,
        })
        .unwrap()
    };

    let mut state = repo.load().unwrap();
    let first = decide_on(&state);
    assert_eq!(first.action, Action::OpenPr);

    // An issue outcome leaves the PR counters alone, so the same action is chosen
    // again and its key is found.
    apply_outcome(&mut state, &first, Outcome::IssueOpened, None, OffsetDateTime::now_utc())
        .unwrap();
    repo.save(&state).unwrap();
    let again = decide_on(&repo.load().unwrap());
    assert_eq!(again.action, Action::Noop);
    assert_eq!(again.idempotency_key, first.idempotency_key);
}

#[test]
fn noop_outcome_does_not_touch_state() {
    let dir = tempfile::tempdir().unwrap();
    let repo = FileStateRepository::new(dir.path().join("state.json"));
    let mut state = repo.load().unwrap();
    let config = parse_config(CONFIG).unwrap();
    let item = item();
    let today = docdrift_policy::days::today();

    let decision = decide(&PolicyInput {
        item: &item,
        area: config.area("api-reference").unwrap(),
        policy: &config.policy,
        state: &state,
        repo: &config.repo,
        base_sha: "a",
        head_sha: "b",
        today: &today,
    })
    .unwrap();

    apply_outcome(&mut state, &decision, Outcome::NoChange, None, OffsetDateTime::now_utc())
        .unwrap();
    assert!(state.daily_pr_count.is_empty());
    assert!(state.is_processed(&decision.idempotency_key));
}
