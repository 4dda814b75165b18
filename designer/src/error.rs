//! Error types for the job design engine.
//!
//! This module defines one error type per layer:
//!
//! - [`DslError`] - Variable definition parsing and evaluation errors
//! - [`ProjectError`] - Project configuration (`fairb.json`) errors
//! - [`TableError`] - Job table (`job_config.csv`) errors
//! - [`DesignError`] - Top-level orchestration errors used by the CLI
//!
//! Every [`DslError`] names the variable and the command it was raised from,
//! so a failing definition string can be fixed without re-reading the whole
//! chain. Evaluation aborts on the first error; there are no partial results.

use thiserror::Error;

// =============================================================================
// DSL Errors
// =============================================================================

/// Errors raised while parsing or evaluating variable definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DslError {
    /// Malformed marker syntax, unknown command or missing `==` separator.
    #[error("parse error in variable '{variable}' at '{command}': {message}")]
    Parse {
        variable: String,
        command: String,
        message: String,
    },

    /// Producer not first, several producers, or steps after `drop`.
    #[error("ordering error in variable '{variable}' at '{command}': {message}")]
    Ordering {
        variable: String,
        command: String,
        message: String,
    },

    /// A command referenced a variable that is not defined.
    #[error("reference error in variable '{variable}' at '{command}': {message}")]
    Reference {
        variable: String,
        command: String,
        message: String,
    },

    /// Invalid glob/regex syntax, or a pattern that matched nothing.
    #[error("pattern error in variable '{variable}' at '{command}': {message}")]
    Pattern {
        variable: String,
        command: String,
        message: String,
    },

    /// A variable length does not evenly divide the target length.
    #[error("broadcast error in variable '{variable}' at '{command}': {message}")]
    Broadcast {
        variable: String,
        command: String,
        message: String,
    },

    /// A filesystem command was used without a project root.
    #[error("variable '{variable}' uses '{command}' but no project root is known")]
    MissingRoot { variable: String, command: String },
}

impl DslError {
    pub fn parse(variable: impl Into<String>, command: impl Into<String>, message: impl Into<String>) -> Self {
        DslError::Parse {
            variable: variable.into(),
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn ordering(variable: impl Into<String>, command: impl Into<String>, message: impl Into<String>) -> Self {
        DslError::Ordering {
            variable: variable.into(),
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn reference(variable: impl Into<String>, command: impl Into<String>, message: impl Into<String>) -> Self {
        DslError::Reference {
            variable: variable.into(),
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn pattern(variable: impl Into<String>, command: impl Into<String>, message: impl Into<String>) -> Self {
        DslError::Pattern {
            variable: variable.into(),
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn broadcast(variable: impl Into<String>, command: impl Into<String>, message: impl Into<String>) -> Self {
        DslError::Broadcast {
            variable: variable.into(),
            command: command.into(),
            message: message.into(),
        }
    }

    /// Name of the variable the error was raised for.
    pub fn variable(&self) -> &str {
        match self {
            DslError::Parse { variable, .. }
            | DslError::Ordering { variable, .. }
            | DslError::Reference { variable, .. }
            | DslError::Pattern { variable, .. }
            | DslError::Broadcast { variable, .. }
            | DslError::MissingRoot { variable, .. } => variable,
        }
    }

    /// Name of the command the error was raised at.
    pub fn command(&self) -> &str {
        match self {
            DslError::Parse { command, .. }
            | DslError::Ordering { command, .. }
            | DslError::Reference { command, .. }
            | DslError::Pattern { command, .. }
            | DslError::Broadcast { command, .. }
            | DslError::MissingRoot { command, .. } => command,
        }
    }
}

// =============================================================================
// Project Configuration Errors
// =============================================================================

/// Errors reading or writing the project configuration file.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// The project directory has no configuration file.
    #[error("No fairb.json found in {0}")]
    NotFound(String),

    /// Failed to read or write the file.
    #[error("Project IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The file is not valid project JSON.
    #[error("Project JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Job Table Errors
// =============================================================================

/// Errors appending to or reading the job table.
#[derive(Debug, Error)]
pub enum TableError {
    /// Failed to open or write the file.
    #[error("Job table IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed CSV content.
    #[error("Job table CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// The existing file was written with different columns.
    #[error("Job table header mismatch: expected {expected:?}, found {found:?}")]
    HeaderMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
}

// =============================================================================
// Design Errors (top-level)
// =============================================================================

/// Top-level errors returned by the CLI commands.
#[derive(Debug, Error)]
pub enum DesignError {
    /// DSL evaluation error.
    #[error("{0}")]
    Dsl(#[from] DslError),

    /// Project configuration error.
    #[error("{0}")]
    Project(#[from] ProjectError),

    /// Job table error.
    #[error("{0}")]
    Table(#[from] TableError),

    /// JSON output error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The project directory does not exist.
    #[error("fairb project directory doesn't exist: {0}")]
    MissingProject(String),

    /// Jobs reached the job table but the design could not be recorded.
    #[error("{jobs} jobs were appended to {table} but the design was not saved to fairb.json: {source}")]
    Unrecorded {
        jobs: usize,
        table: String,
        source: ProjectError,
    },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for DSL operations.
pub type DslResult<T> = Result<T, DslError>;

/// Result type for project configuration operations.
pub type ProjectResult<T> = Result<T, ProjectError>;

/// Result type for job table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Result type for CLI commands.
pub type DesignResult<T> = Result<T, DesignError>;
