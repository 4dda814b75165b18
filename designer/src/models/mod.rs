//! Domain models for the job design engine.
//!
//! This module contains the core data structures used throughout the engine:
//!
//! - [`Command`] - The 13 DSL commands and their [`CommandClass`]
//! - [`CommandStep`] / [`VariableDefinition`] - Parsed definition chains
//! - [`JobTemplates`] - The four templates a design expands
//! - [`JobRecord`] - One fully substituted job
//! - [`DesignResources`] - Queue/resource settings shared by a design's jobs

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Commands
// =============================================================================

/// Whether a command creates values or consumes existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandClass {
    /// Starts a chain from no prior values.
    Producer,
    /// Modifies the values produced by the preceding step.
    Transformer,
}

/// A DSL command, written `<!name>(argument)` in a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Drop,
    Glob,
    Variable,
    Paste,
    Write,
    Replace,
    Grep,
    IsIn,
    NotIn,
    Multiply,
    Repeat,
    Unique,
    Exists,
}

impl Command {
    /// Every command, producers first.
    pub const ALL: [Command; 13] = [
        Command::Drop,
        Command::Glob,
        Command::Variable,
        Command::Paste,
        Command::Write,
        Command::Replace,
        Command::Grep,
        Command::IsIn,
        Command::NotIn,
        Command::Multiply,
        Command::Repeat,
        Command::Unique,
        Command::Exists,
    ];

    /// Name as written between `<!` and `>`.
    pub fn name(self) -> &'static str {
        match self {
            Command::Drop => "drop",
            Command::Glob => "glob",
            Command::Variable => "variable",
            Command::Paste => "paste",
            Command::Write => "write",
            Command::Replace => "replace",
            Command::Grep => "grep",
            Command::IsIn => "is_in",
            Command::NotIn => "not_in",
            Command::Multiply => "multiply",
            Command::Repeat => "repeat",
            Command::Unique => "unique",
            Command::Exists => "exists",
        }
    }

    /// Look a command up by its marker name.
    pub fn from_name(name: &str) -> Option<Self> {
        Command::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn class(self) -> CommandClass {
        match self {
            Command::Drop | Command::Glob | Command::Variable | Command::Paste | Command::Write => {
                CommandClass::Producer
            }
            Command::Replace
            | Command::Grep
            | Command::IsIn
            | Command::NotIn
            | Command::Multiply
            | Command::Repeat
            | Command::Unique
            | Command::Exists => CommandClass::Transformer,
        }
    }

    /// Whether the command needs a non-empty argument.
    pub fn takes_argument(self) -> bool {
        !matches!(self, Command::Drop | Command::Unique | Command::Exists)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Definitions
// =============================================================================

/// One `<!command>(argument)` step of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandStep {
    pub command: Command,
    /// Argument text with the enclosing parentheses removed.
    pub argument: String,
}

impl CommandStep {
    pub fn new(command: Command, argument: impl Into<String>) -> Self {
        Self {
            command,
            argument: argument.into(),
        }
    }

    pub fn class(&self) -> CommandClass {
        self.command.class()
    }
}

/// A `name == <chain>` definition, evaluated top to bottom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDefinition {
    pub name: String,
    pub chain: Vec<CommandStep>,
}

impl VariableDefinition {
    /// True when the chain only removes the variable.
    pub fn is_drop(&self) -> bool {
        self.chain.first().is_some_and(|s| s.command == Command::Drop)
    }
}

// =============================================================================
// Jobs
// =============================================================================

/// Templates expanded once per row of the broadcast table.
///
/// Each template may contain `{name}` placeholders; `{{` and `}}` are
/// literal braces. The command line may also contain a `<!random>` marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTemplates {
    pub job_name: String,
    pub command_line: String,
    #[serde(default)]
    pub inputs: String,
    #[serde(default)]
    pub outputs: String,
}

impl JobTemplates {
    pub fn new(job_name: impl Into<String>, command_line: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            command_line: command_line.into(),
            inputs: String::new(),
            outputs: String::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: impl Into<String>) -> Self {
        self.inputs = inputs.into();
        self
    }

    pub fn with_outputs(mut self, outputs: impl Into<String>) -> Self {
        self.outputs = outputs.into();
        self
    }
}

/// One fully resolved unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_name: String,
    pub command_line: String,
    pub inputs: String,
    pub outputs: String,
    /// Known output datasets whose path occurs in `outputs`.
    pub output_datasets: Vec<String>,
}

/// Queue and resource settings shared by every job of one design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignResources {
    pub queue: String,
    pub slots: u32,
    pub vmem: Option<u32>,
    pub h_rt: String,
    pub req_disk_gb: Option<u32>,
    pub env_vars: Option<String>,
    pub ephemeral_location: Option<String>,
    pub prereq_get: Option<String>,
    pub message: Option<String>,
    pub is_explicit: bool,
}

impl DesignResources {
    /// Resources for `queue` with the default single slot and 24h runtime.
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            slots: 1,
            vmem: None,
            h_rt: "24:00:00".to_string(),
            req_disk_gb: None,
            env_vars: None,
            ephemeral_location: None,
            prereq_get: None,
            message: None,
            is_explicit: false,
        }
    }
}
