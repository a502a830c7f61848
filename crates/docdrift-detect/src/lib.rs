pub mod aggregate;
pub mod changes;
pub mod evidence;
pub mod exec;
pub mod fetch;
pub mod heuristics;
pub mod spec;
pub mod verify;

pub use aggregate::{recommend_action, DriftDetector, RunInfo};
pub use changes::{ChangedPathLister, GitChangedPaths, StaticChangedPaths};
pub use evidence::{DirEvidence, EvidenceSink, MemoryEvidence};
pub use exec::{CommandExecutor, CommandOutput, ShellExecutor};
pub use fetch::{Fetcher, HttpFetcher};
