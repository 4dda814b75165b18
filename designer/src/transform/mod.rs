//! Transformation module.
//!
//! This module turns definition strings into jobs:
//! - DSL: Commands, variable table and sequential evaluation
//! - Broadcast: Length reconciliation across variables
//! - Expander: Broadcast table to job records
//! - Pipeline: Main design pipeline

pub mod broadcast;
pub mod dsl;
pub mod expander;
pub mod pipeline;

pub use broadcast::broadcast;
pub use dsl::*;
pub use expander::{expand_jobs, ExpansionResult, SkippedRow, RANDOM_MARKER, RANDOM_SEED_VARIABLE};
pub use pipeline::*;
