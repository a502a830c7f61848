use crate::evidence::EvidenceSink;
use crate::exec::{render_log, CommandExecutor};
use anyhow::Result;
use docdrift_core::Signal;
use std::path::Path;
use std::time::Duration;

/// Outcome of running every configured verification command.
#[derive(Debug, Clone, Default)]
pub struct VerificationResult {
    /// Present when at least one command exited non-zero.
    pub signal: Option<Signal>,
    /// One log per command, in command order.
    pub logs: Vec<String>,
    pub summary: String,
}

/// Run each command sequentially to completion. A failing command does not stop
/// the rest, so the evidence is complete.
pub async fn run_verification(
    commands: &[String],
    timeout: Duration,
    cwd: &Path,
    executor: &dyn CommandExecutor,
    evidence: &dyn EvidenceSink,
) -> Result<VerificationResult> {
    let mut logs = Vec::new();
    let mut failing_logs = Vec::new();
    let mut failing_cmds = Vec::new();

    for (i, cmd) in commands.iter().enumerate() {
        let output = executor.run(cmd, cwd, timeout).await;
        let location = evidence.write(&format!("docs-check.{}.log", i + 1), &render_log(cmd, &output))?;
        if !output.success() {
            tracing::warn!(cmd, exit_code = output.exit_code, "verification command failed");
            failing_logs.push(location.clone());
            failing_cmds.push(format!("`{cmd}` (exit {})", output.exit_code));
        }
        logs.push(location);
    }

    if failing_logs.is_empty() {
        return Ok(VerificationResult {
            signal: None,
            logs,
            summary: String::new(),
        });
    }

    Ok(VerificationResult {
        summary: format!(
            "docs check failed: {} of {} commands: {}",
            failing_cmds.len(),
            commands.len(),
            failing_cmds.join(", ")
        ),
        signal: Some(Signal::verification_failed(failing_logs)),
        logs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::MemoryEvidence;
    use crate::exec::{CommandOutput, ScriptedExecutor};
    use docdrift_core::SignalKind;

    fn cmds(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn all_passing_yields_no_signal() {
        let exec = ScriptedExecutor::new()
            .with("lint", CommandOutput::new(0, "", ""))
            .with("build", CommandOutput::new(0, "", ""));
        let ev = MemoryEvidence::new();
        let res = run_verification(
            &cmds(&["lint", "build"]),
            Duration::from_secs(5),
            Path::new("."),
            &exec,
            &ev,
        )
        .await
        .unwrap();
        assert!(res.signal.is_none());
        assert_eq!(res.logs, vec!["docs-check.1.log", "docs-check.2.log"]);
        assert!(res.summary.is_empty());
    }

    #[tokio::test]
    async fn failure_is_tier_zero_and_does_not_abort() {
        let exec = ScriptedExecutor::new()
            .with("lint", CommandOutput::new(2, "", "broken link"))
            .with("build", CommandOutput::new(0, "", ""));
        let ev = MemoryEvidence::new();
        let res = run_verification(
            &cmds(&["lint", "build"]),
            Duration::from_secs(5),
            Path::new("."),
            &exec,
            &ev,
        )
        .await
        .unwrap();

        assert_eq!(exec.calls(), vec!["lint", "build"]);
        let signal = res.signal.unwrap();
        assert_eq!(signal.kind, SignalKind::DocsCheckFailed);
        assert_eq!(signal.tier, 0);
        assert!((signal.confidence - 0.99).abs() < 1e-9);
        // Only failing logs are evidence.
        assert_eq!(signal.evidence, vec!["docs-check.1.log"]);
        assert_eq!(res.logs.len(), 2);
        assert!(ev.get("docs-check.1.log").unwrap().contains("broken link"));
        assert!(res.summary.contains("1 of 2"));
    }

    #[tokio::test]
    async fn no_commands_no_signal() {
        let ev = MemoryEvidence::new();
        let res = run_verification(
            &[],
            Duration::from_secs(5),
            Path::new("."),
            &ScriptedExecutor::new(),
            &ev,
        )
        .await
        .unwrap();
        assert!(res.signal.is_none());
        assert!(ev.names().is_empty());
    }
}
