//! Variable definition parser.
//!
//! Splits a definition string into ordered [`VariableDefinition`]s:
//!
//! ```text
//! svs == <!glob>(inputs/sub-*/mrs/*svs.nii.gz) ; subject == <!variable>(svs)<!grep>(sub-\w+)
//! └─┬─┘  └──────────────┬────────────────────┘
//!  name             command chain
//! ```
//!
//! Definitions are separated by `;`. Within a definition the name is
//! everything before the first `==`. Each command is a `<!name>` marker
//! followed by its argument, optionally wrapped in one layer of
//! parentheses; the argument runs up to the next marker.
//!
//! Only the syntax is checked here. Ordering rules live in
//! [`crate::validation`].

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{DslError, DslResult};
use crate::models::{Command, CommandStep, VariableDefinition};

/// Separator between a variable name and its chain.
pub const ASSIGN: &str = "==";

/// Separator between definitions.
pub const DEFINITION_SEPARATOR: char = ';';

static MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"<!(\w+)>").expect("valid marker regex"));

static VARIABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w-]+$").expect("valid variable name regex"));

/// Parse a full `;`-separated definition string.
///
/// Empty segments (e.g. a trailing `;`) are ignored.
///
/// # Example
/// ```
/// use fairb::parser::parse_definitions;
///
/// let defs = parse_definitions("voi == <!write>(acc pcc)<!multiply>(2)").unwrap();
/// assert_eq!(defs[0].name, "voi");
/// assert_eq!(defs[0].chain.len(), 2);
/// ```
pub fn parse_definitions(source: &str) -> DslResult<Vec<VariableDefinition>> {
    source
        .split(DEFINITION_SEPARATOR)
        .filter(|segment| !segment.trim().is_empty())
        .map(parse_definition)
        .collect()
}

/// Parse a single `name == <chain>` definition.
pub fn parse_definition(source: &str) -> DslResult<VariableDefinition> {
    let source = source.trim();

    let (name, commands) = source
        .split_once(ASSIGN)
        .ok_or_else(|| DslError::parse(source, "", format!("missing '{}' separator", ASSIGN)))?;

    let name = name.trim();
    if !VARIABLE_NAME.is_match(name) {
        return Err(DslError::parse(
            name,
            "",
            "variable names may only contain letters, digits, '_' and '-'",
        ));
    }

    let chain = parse_chain(name, commands.trim())?;

    Ok(VariableDefinition {
        name: name.to_string(),
        chain,
    })
}

/// Parse the command chain of variable `name`.
fn parse_chain(name: &str, commands: &str) -> DslResult<Vec<CommandStep>> {
    let markers: Vec<_> = MARKER.captures_iter(commands).collect();

    let first = match markers.first() {
        Some(m) => m.get(0).map(|g| g.start()).unwrap_or(0),
        None => {
            if commands.contains("<!") {
                return Err(DslError::parse(name, "", "unmatched '<!' marker"));
            }
            return Err(DslError::parse(name, "", "definition has no <!command> marker"));
        }
    };

    let leading = &commands[..first];
    if !leading.trim().is_empty() {
        return Err(DslError::parse(
            name,
            "",
            format!("unexpected text '{}' before the first command", leading.trim()),
        ));
    }

    let mut chain = Vec::with_capacity(markers.len());

    for (idx, caps) in markers.iter().enumerate() {
        let (Some(whole), Some(command_name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let command_name = command_name.as_str();

        let end = markers
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(commands.len());
        let raw_argument = &commands[whole.end()..end];

        if raw_argument.contains("<!") {
            return Err(DslError::parse(name, command_name, "unmatched '<!' marker in argument"));
        }

        let command = Command::from_name(command_name)
            .ok_or_else(|| DslError::parse(name, command_name, "unknown command"))?;

        let argument = strip_parentheses(raw_argument.trim())
            .ok_or_else(|| DslError::parse(name, command_name, "unbalanced parentheses around argument"))?;

        chain.push(CommandStep::new(command, argument.trim()));
    }

    Ok(chain)
}

/// Remove one layer of enclosing parentheses.
///
/// Bare arguments (`<!multiply>5`) are accepted as-is.
fn strip_parentheses(argument: &str) -> Option<&str> {
    match (argument.starts_with('('), argument.ends_with(')')) {
        (true, true) if argument.len() >= 2 => Some(&argument[1..argument.len() - 1]),
        (false, false) => Some(argument),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_write_multiply() {
        let defs = parse_definitions("voi == <!write>(acc pcc)<!multiply>(2)").unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "voi");
        assert_eq!(
            defs[0].chain,
            vec![
                CommandStep::new(Command::Write, "acc pcc"),
                CommandStep::new(Command::Multiply, "2"),
            ]
        );
    }

    #[test]
    fn test_parse_multiple_definitions_in_order() {
        let source = "svs == <!glob>(inputs/sub-*/mrs/*svs.nii.gz) ; \
                      subject == <!variable>(svs)<!grep>(sub-\\w+); \
                      t1w == <!paste> (inputs/{subject}/anat/{subject}_T1w.nii.gz) ;";
        let defs = parse_definitions(source).unwrap();

        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["svs", "subject", "t1w"]);
        assert_eq!(defs[1].chain[1], CommandStep::new(Command::Grep, "sub-\\w+"));
        assert_eq!(
            defs[2].chain[0].argument,
            "inputs/{subject}/anat/{subject}_T1w.nii.gz"
        );
    }

    #[test]
    fn test_parse_bare_argument_and_no_argument() {
        let def = parse_definition("voi == <!write>(acc pcc)<!multiply>5<!unique>").unwrap();
        assert_eq!(def.chain[1], CommandStep::new(Command::Multiply, "5"));
        assert_eq!(def.chain[2], CommandStep::new(Command::Unique, ""));
    }

    #[test]
    fn test_parse_inner_parentheses_kept() {
        let def = parse_definition("run == <!variable>(svs)<!grep>(run-(\\d+))").unwrap();
        assert_eq!(def.chain[1].argument, "run-(\\d+)");
    }

    #[test]
    fn test_missing_separator() {
        let err = parse_definition("voi <!write>(acc)").unwrap_err();
        assert!(matches!(err, DslError::Parse { .. }));
        assert!(err.to_string().contains("=="));
    }

    #[test]
    fn test_unknown_command() {
        let err = parse_definition("voi == <!shuffle>(acc)").unwrap_err();
        assert!(matches!(err, DslError::Parse { .. }));
        assert_eq!(err.variable(), "voi");
        assert_eq!(err.command(), "shuffle");
    }

    #[test]
    fn test_unmatched_marker() {
        let err = parse_definition("voi == <!write(acc)").unwrap_err();
        assert!(matches!(err, DslError::Parse { .. }));

        let err = parse_definition("voi == <!write>(acc)<!unique").unwrap_err();
        assert_eq!(err.command(), "write");
    }

    #[test]
    fn test_text_before_first_marker() {
        let err = parse_definition("voi == acc <!write>(pcc)").unwrap_err();
        assert!(matches!(err, DslError::Parse { .. }));
    }

    #[test]
    fn test_unbalanced_parentheses() {
        let err = parse_definition("voi == <!write>(acc pcc").unwrap_err();
        assert_eq!(err.command(), "write");
    }

    #[test]
    fn test_invalid_name() {
        let err = parse_definition("my var == <!write>(a)").unwrap_err();
        assert!(matches!(err, DslError::Parse { .. }));
    }
}
