//! Variable definition DSL.
//!
//! This module provides:
//! - `commands`: The 13 commands and their registry
//! - `table`: Variable table the commands read and write
//! - `template`: `{name}` placeholder formatting
//! - `executor`: Evaluate parsed definitions into a table
//!
//! ## Usage Flow
//!
//! ```text
//! definition string → parser::parse_definitions → executor::evaluate → VariableTable
//! ```
//!
//! ## Example
//!
//! ```
//! use fairb::transform::dsl::evaluate_source;
//!
//! let table = evaluate_source("voi == <!write>(acc pcc)<!multiply>(2)", None).unwrap();
//! assert_eq!(table.get("voi").unwrap().len(), 4);
//! ```

pub mod commands;
pub mod executor;
pub mod table;
pub mod template;

// Re-exports for convenience
pub use commands::{commands_description, dispatch, lookup, registry, CommandContext, CommandSpec};
pub use executor::{evaluate, evaluate_source};
pub use table::{Cell, Values, VariableTable};
pub use template::Template;
