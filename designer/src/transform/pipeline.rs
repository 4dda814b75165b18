//! High-level pipeline API for job design.
//!
//! Combines all steps in one call: parsing, validation, evaluation,
//! broadcasting and job expansion.
//!
//! # Example
//!
//! ```
//! use fairb::models::JobTemplates;
//! use fairb::transform::pipeline::{design_jobs, DesignOptions};
//!
//! let templates = JobTemplates::new("job_{a}", "echo {a}");
//! let result = design_jobs(None, "a == <!write>(x y z)", &templates, &[], &DesignOptions::default()).unwrap();
//!
//! let names: Vec<_> = result.jobs.iter().map(|j| j.job_name.as_str()).collect();
//! assert_eq!(names, ["job_x", "job_y", "job_z"]);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use super::broadcast::broadcast;
use super::dsl::executor::evaluate_source;
use super::dsl::table::VariableTable;
use super::expander::{expand_jobs, ExpansionResult};
use crate::error::DslResult;
use crate::models::JobTemplates;

/// Options for the design pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignOptions {
    /// Seed for `<!random>` values; random when unset
    pub seed: Option<u64>,
}

/// Evaluate and broadcast a definition string.
///
/// `root` is the directory `glob` and `exists` resolve paths against.
pub fn design_table(root: Option<&Path>, definitions: &str) -> DslResult<VariableTable> {
    let table = evaluate_source(definitions, root)?;
    let table = broadcast(table)?;
    info!(
        "Broadcast {} variables to {} rows",
        table.len(),
        table.max_len()
    );
    Ok(table)
}

/// Evaluate a definition string and expand it into job records.
///
/// This is the main entry point for the engine. It:
/// 1. Parses and validates every definition
/// 2. Evaluates the definitions in order
/// 3. Broadcasts the variables to a common length
/// 4. Expands the templates once per non-null row
pub fn design_jobs(
    root: Option<&Path>,
    definitions: &str,
    templates: &JobTemplates,
    output_datasets: &[String],
    options: &DesignOptions,
) -> DslResult<ExpansionResult> {
    let table = design_table(root, definitions)?;
    expand_jobs(&table, templates, output_datasets, options.seed)
}
