pub mod canon;
pub mod config;
pub mod error;
pub mod glob;
pub mod hash;
pub mod types;

pub use types::*;
