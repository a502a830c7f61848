mod cmd_detect;
mod cmd_record;
mod cmd_score;
mod cmd_state;
mod run_dir;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Exit code for a successful run that found drift.
const EXIT_DRIFT: i32 = 10;

#[derive(Parser)]
#[command(name = "docdrift", version, about = "Documentation drift detection and policy")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect drift between two revisions and decide on the primary item
    Detect {
        /// Base revision
        #[arg(long)]
        base: String,
        /// Head revision
        #[arg(long)]
        head: String,
        /// Config file
        #[arg(long, default_value = docdrift_core::config::DEFAULT_CONFIG_FILE)]
        config: PathBuf,
        /// What triggered the run (push, schedule, manual, ...)
        #[arg(long, default_value = "push")]
        trigger: String,
        /// Directory that receives one sub-directory per run
        #[arg(long, default_value = ".docdrift/runs")]
        out: PathBuf,
        /// State file
        #[arg(long, default_value = ".docdrift/state.json")]
        state: PathBuf,
        /// Changed paths, comma-separated (skips `git diff`)
        #[arg(long, value_delimiter = ',')]
        paths: Option<Vec<String>>,
    },
    /// Record the outcome of executing a run's decision
    Record {
        /// Run directory written by `detect`
        #[arg(long)]
        run: PathBuf,
        /// pr_opened, issue_opened, no_change or blocked
        #[arg(long)]
        outcome: String,
        /// PR or issue URL
        #[arg(long)]
        link: Option<String>,
        /// State file
        #[arg(long, default_value = ".docdrift/state.json")]
        state: PathBuf,
    },
    /// Print per-item confidence scores for a report
    Score {
        /// report.json written by `detect`
        #[arg(long)]
        report: PathBuf,
        /// Confidence reported by the agent that acted on the drift
        #[arg(long)]
        agent_confidence: Option<f64>,
    },
    /// Inspect or maintain the state file
    State {
        #[command(subcommand)]
        cmd: StateCmd,
    },
}

#[derive(Subcommand)]
enum StateCmd {
    /// Print the state file
    Show {
        #[arg(long, default_value = ".docdrift/state.json")]
        state: PathBuf,
    },
    /// Drop day counters older than N days
    Prune {
        #[arg(long)]
        keep_days: u32,
        #[arg(long, default_value = ".docdrift/state.json")]
        state: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DOCDRIFT_LOG")
        .unwrap_or_else(|_| EnvFilter::new("docdrift=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let repo_root = std::env::current_dir()?;

    match cli.cmd {
        Command::Detect {
            base,
            head,
            config,
            trigger,
            out,
            state,
            paths,
        } => {
            let found = cmd_detect::execute(cmd_detect::DetectParams {
                repo_root: &repo_root,
                base: &base,
                head: &head,
                config: &config,
                trigger: &trigger,
                out: &out,
                state: &state,
                paths,
            })?;
            Ok(if found { EXIT_DRIFT } else { 0 })
        }
        Command::Record {
            run,
            outcome,
            link,
            state,
        } => cmd_record::execute(&run, &outcome, link.as_deref(), &state).map(|_| 0),
        Command::Score {
            report,
            agent_confidence,
        } => cmd_score::execute(&report, agent_confidence).map(|_| 0),
        Command::State { cmd } => match cmd {
            StateCmd::Show { state } => cmd_state::show(&state).map(|_| 0),
            StateCmd::Prune { keep_days, state } => cmd_state::prune(&state, keep_days).map(|_| 0),
        },
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}
