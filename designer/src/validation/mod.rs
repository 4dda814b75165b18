//! Structural validation of command chains.
//!
//! A chain is checked before any of its commands runs:
//!
//! - it starts with exactly one producer (`drop`, `glob`, `variable`,
//!   `paste`, `write`) and every later step is a transformer
//! - a `drop` chain has no other step
//! - every command that needs an argument has one
//!
//! # Example
//!
//! ```
//! use fairb::parser::parse_definition;
//! use fairb::validation::validate_chain;
//!
//! let ok = parse_definition("voi == <!write>(acc pcc)<!unique>").unwrap();
//! assert!(validate_chain(&ok).is_ok());
//!
//! let bad = parse_definition("voi == <!unique><!write>(acc pcc)").unwrap();
//! assert!(validate_chain(&bad).is_err());
//! ```

use crate::error::{DslError, DslResult};
use crate::models::{Command, CommandClass, VariableDefinition};

/// Check the ordering invariants of one definition.
pub fn validate_chain(definition: &VariableDefinition) -> DslResult<()> {
    let name = definition.name.as_str();

    let first = definition
        .chain
        .first()
        .ok_or_else(|| DslError::ordering(name, "", "empty command chain"))?;

    if first.class() != CommandClass::Producer {
        return Err(DslError::ordering(
            name,
            first.command.name(),
            "a chain must start with 'drop', 'glob', 'variable', 'paste' or 'write'",
        ));
    }

    if first.command == Command::Drop && definition.chain.len() > 1 {
        return Err(DslError::ordering(
            name,
            definition.chain[1].command.name(),
            "no command may follow 'drop'",
        ));
    }

    if let Some(extra) = definition.chain[1..]
        .iter()
        .find(|step| step.class() == CommandClass::Producer)
    {
        return Err(DslError::ordering(
            name,
            extra.command.name(),
            format!(
                "only one producer per chain, '{}' already started it",
                first.command
            ),
        ));
    }

    if let Some(step) = definition
        .chain
        .iter()
        .find(|step| step.command.takes_argument() && step.argument.trim().is_empty())
    {
        return Err(DslError::ordering(
            name,
            step.command.name(),
            "command requires an argument",
        ));
    }

    Ok(())
}

/// Validate every definition, stopping at the first failure.
pub fn validate_all(definitions: &[VariableDefinition]) -> DslResult<()> {
    definitions.iter().try_for_each(validate_chain)
}
