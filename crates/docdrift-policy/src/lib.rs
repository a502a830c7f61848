pub mod days;
pub mod engine;
pub mod outcome;
pub mod score;
pub mod select;

pub use engine::{decide, idempotency_key, PolicyInput};
pub use outcome::{apply_outcome, prune_state};
pub use score::{combine_with_agent_confidence, score, tier_weight};
pub use select::select_primary;
