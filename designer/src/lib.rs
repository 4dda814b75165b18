//! # fairb - Job design for version-controlled datasets
//!
//! Turns a compact variable-definition language into a table of
//! reproducible jobs.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Definitions │────▶│   Parser    │────▶│  Executor   │────▶│ Broadcaster │────▶│  Expander   │
//! │  (a == ...) │     │ + Validator │     │ (Variables) │     │  (tiling)   │     │ (JobRecord) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use fairb::{design_jobs, DesignOptions, JobTemplates};
//!
//! let templates = JobTemplates::new("fit_{voi}", "fit --voi {voi} --seed <!random>");
//! let result = design_jobs(
//!     None,
//!     "voi == <!write>(acc pcc)<!multiply>(2)",
//!     &templates,
//!     &[],
//!     &DesignOptions::default(),
//! )
//! .unwrap();
//! assert_eq!(result.jobs.len(), 4);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Commands, definitions and job records
//! - [`parser`] - Definition string parsing
//! - [`validation`] - Command chain ordering rules
//! - [`transform`] - DSL evaluation, broadcasting, job expansion
//! - [`project`] - Project configuration (`fairb.json`)
//! - [`jobs`] - Job table (`job_config.csv`)
//! - [`logging`] - Subscriber setup for the CLI

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Validation
pub mod validation;

// Evaluation
pub mod transform;

// Persistence
pub mod jobs;
pub mod project;

pub mod logging;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{DesignError, DslError, ProjectError, TableError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Command,
    CommandClass,
    CommandStep,
    VariableDefinition,
    JobTemplates,
    JobRecord,
    DesignResources,
};

// =============================================================================
// Re-exports - Parsing and validation
// =============================================================================

pub use parser::{parse_definition, parse_definitions};
pub use validation::{validate_all, validate_chain};

// =============================================================================
// Re-exports - DSL
// =============================================================================

pub use transform::dsl::{
    commands_description,
    evaluate,
    evaluate_source,
    VariableTable,
    Values,
    Cell,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::broadcast;
pub use transform::expander::{expand_jobs, ExpansionResult, SkippedRow};
pub use transform::pipeline::{design_jobs, design_table, DesignOptions};

// =============================================================================
// Re-exports - Project and job table
// =============================================================================

pub use jobs::{record_design, JobConfigRow, JobTable, JOB_CONFIG_COLUMNS};
pub use project::{super_dataset_path, ProjectConfig, StoredDesign};
