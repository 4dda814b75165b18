//! DSL command registry and handlers.
//!
//! Every command maps to a [`CommandSpec`] holding its class and a pure
//! handler. Handlers receive the values produced by the previous step (empty
//! for producers) and return the new values, or `None` for `drop`.

use std::collections::HashSet;
use std::path::Path;

use fancy_regex::Regex;
use tracing::{debug, warn};

use super::table::{Cell, Values, VariableTable};
use super::template::{unescape_braces, Template, PLACEHOLDER};
use crate::error::{DslError, DslResult};
use crate::models::{Command, CommandClass};

/// What a handler can see while it runs.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    /// Variable being defined.
    pub variable: &'a str,
    /// Variables defined so far.
    pub table: &'a VariableTable,
    /// Project root that `glob` and `exists` resolve against.
    pub root: Option<&'a Path>,
}

/// Signature shared by all handlers.
pub type Handler = fn(&CommandContext<'_>, Command, &str, Values) -> DslResult<Option<Values>>;

/// Registry entry for one command.
#[derive(Clone, Copy)]
pub struct CommandSpec {
    pub command: Command,
    pub class: CommandClass,
    pub handler: Handler,
    /// Argument shape, for help output.
    pub argument: &'static str,
    pub summary: &'static str,
}

/// Registry entry for `command`.
pub fn spec(command: Command) -> CommandSpec {
    let (handler, argument, summary): (Handler, &'static str, &'static str) = match command {
        Command::Drop => (call_drop, "-", "Remove the variable from the table"),
        Command::Glob => (call_glob, "patterns", "Sorted paths matching glob patterns, relative to the project root"),
        Command::Variable => (call_variable, "name", "Copy of an existing variable"),
        Command::Paste => (call_paste, "template", "One string per row with {name} placeholders filled in"),
        Command::Write => (call_write, "tokens", "Whitespace-separated literal values"),
        Command::Replace => (call_replace, "pattern replacement", "Regex substitution on every value, then {name} resolution"),
        Command::Grep => (call_grep, "regex", "First regex match of every value (null if none)"),
        Command::IsIn => (call_is_in, "name", "Keep values present in another variable"),
        Command::NotIn => (call_not_in, "name", "Keep values absent from another variable"),
        Command::Multiply => (call_multiply, "count | name", "Tile the whole sequence N times"),
        Command::Repeat => (call_repeat, "count | name", "Repeat each value N times in place"),
        Command::Unique => (call_unique, "-", "Drop duplicates, keeping first occurrences"),
        Command::Exists => (call_exists, "-", "Null out paths that do not exist under the project root"),
    };

    CommandSpec {
        command,
        class: command.class(),
        handler,
        argument,
        summary,
    }
}

/// All registry entries, producers first.
pub fn registry() -> Vec<CommandSpec> {
    Command::ALL.into_iter().map(spec).collect()
}

/// Registry entry for a marker name.
pub fn lookup(name: &str) -> Option<CommandSpec> {
    Command::from_name(name).map(spec)
}

/// Run the handler registered under `name`.
pub fn dispatch(
    ctx: &CommandContext<'_>,
    name: &str,
    argument: &str,
    values: Values,
) -> DslResult<Option<Values>> {
    let entry = lookup(name)
        .ok_or_else(|| DslError::parse(ctx.variable, name, "unknown command"))?;
    (entry.handler)(ctx, entry.command, argument, values)
}

/// Reference table of every command, for `fairb commands`.
pub fn commands_description() -> String {
    let mut out = String::from(
        "Available variable commands:\n\n\
         | Command | Class | Argument | Description |\n\
         |---------|-------|----------|-------------|\n",
    );
    for entry in registry() {
        let class = match entry.class {
            CommandClass::Producer => "producer",
            CommandClass::Transformer => "transformer",
        };
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            entry.command, class, entry.argument, entry.summary
        ));
    }
    out.push_str(
        "\nExample:\n  \
         svs == <!glob>(inputs/sub-*/mrs/*svs.nii.gz) ; \
         subject == <!variable>(svs)<!grep>(sub-\\w+) ; \
         t1w == <!paste>(inputs/{subject}/anat/{subject}_T1w.nii.gz)<!exists>\n",
    );
    out
}

// =============================================================================
// Producers
// =============================================================================

fn call_drop(_ctx: &CommandContext<'_>, _cmd: Command, _arg: &str, _values: Values) -> DslResult<Option<Values>> {
    Ok(None)
}

fn call_glob(ctx: &CommandContext<'_>, cmd: Command, arg: &str, _values: Values) -> DslResult<Option<Values>> {
    let root = std::fs::canonicalize(require_root(ctx, cmd)?).map_err(|e| {
        DslError::pattern(ctx.variable, cmd.name(), format!("cannot resolve project root: {}", e))
    })?;
    let escaped_root = glob::Pattern::escape(&root.to_string_lossy());

    let mut matches = Vec::new();
    for pattern in arg.split_whitespace() {
        if Path::new(pattern).is_absolute() {
            return Err(DslError::pattern(
                ctx.variable,
                cmd.name(),
                format!("'{}' must be relative to the project root", pattern),
            ));
        }

        let full = format!("{}/{}", escaped_root, pattern);
        let paths = glob::glob(&full).map_err(|e| {
            DslError::pattern(ctx.variable, cmd.name(), format!("invalid glob '{}': {}", pattern, e))
        })?;

        for entry in paths {
            match entry {
                Ok(path) => {
                    let relative = path.strip_prefix(&root).map_err(|_| {
                        DslError::pattern(
                            ctx.variable,
                            cmd.name(),
                            format!("'{}' is outside {}", path.display(), root.display()),
                        )
                    })?;
                    matches.push(relative.to_string_lossy().into_owned());
                }
                // Unreadable directories are skipped, not fatal
                Err(e) => warn!("glob error in '{}': {}", ctx.variable, e),
            }
        }
    }

    if matches.is_empty() {
        return Err(DslError::pattern(
            ctx.variable,
            cmd.name(),
            format!("'{}' matched no paths under {}", arg, root.display()),
        ));
    }

    matches.sort();
    debug!(variable = ctx.variable, matches = matches.len(), "glob resolved");
    Ok(Some(matches.into_iter().map(Some).collect()))
}

fn call_variable(ctx: &CommandContext<'_>, cmd: Command, arg: &str, _values: Values) -> DslResult<Option<Values>> {
    Ok(Some(referenced(ctx, cmd, arg.trim())?.to_vec()))
}

fn call_paste(ctx: &CommandContext<'_>, cmd: Command, arg: &str, _values: Values) -> DslResult<Option<Values>> {
    let template = Template::parse(arg).map_err(|e| DslError::parse(ctx.variable, cmd.name(), e))?;
    let names = template.placeholders();

    if names.is_empty() {
        let literal = template
            .render(|_| None)
            .map_err(|e| DslError::reference(ctx.variable, cmd.name(), e))?;
        return Ok(Some(vec![Some(literal)]));
    }

    let columns = names
        .iter()
        .map(|name| Ok((*name, referenced(ctx, cmd, name)?)))
        .collect::<DslResult<Vec<(&str, &[Cell])>>>()?;

    let rows = columns.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
    for (name, column) in &columns {
        if column.is_empty() || rows % column.len() != 0 {
            return Err(DslError::broadcast(
                ctx.variable,
                cmd.name(),
                format!(
                    "'{}' has {} values, which does not divide {} rows",
                    name,
                    column.len(),
                    rows
                ),
            ));
        }
    }

    let pasted = (0..rows)
        .map(|row| {
            let lookup = |name: &str| {
                columns
                    .iter()
                    .find(|(n, _)| *n == name)
                    .and_then(|(_, column)| column[row % column.len()].as_deref())
            };
            // A null in any referenced column makes the whole row null
            template.render(lookup).ok()
        })
        .collect();

    Ok(Some(pasted))
}

fn call_write(_ctx: &CommandContext<'_>, _cmd: Command, arg: &str, _values: Values) -> DslResult<Option<Values>> {
    Ok(Some(arg.split_whitespace().map(|s| Some(s.to_string())).collect()))
}

// =============================================================================
// Transformers
// =============================================================================

fn call_replace(ctx: &CommandContext<'_>, cmd: Command, arg: &str, values: Values) -> DslResult<Option<Values>> {
    let (pattern, replacement) = match arg.split_once(' ') {
        Some((p, r)) if !r.contains(' ') => (p, r),
        _ => {
            return Err(DslError::parse(
                ctx.variable,
                cmd.name(),
                "expected exactly one space: (pattern replacement)",
            ));
        }
    };
    let re = compile(ctx, cmd, pattern)?;

    let replaced = values
        .into_iter()
        .map(|cell| {
            cell.map(|v| {
                re.try_replacen(&v, 0, replacement)
                    .map(|out| unescape_braces(&out))
                    .map_err(|e| regex_failure(ctx, cmd, pattern, e))
            })
            .transpose()
        })
        .collect::<DslResult<Values>>()?;

    let mut names: Vec<&str> = Vec::new();
    for cell in replaced.iter().flatten() {
        for caps in PLACEHOLDER.captures_iter(cell) {
            if let Some(name) = caps.get(1).map(|m| m.as_str()) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
    }

    if names.is_empty() {
        return Ok(Some(replaced));
    }

    let columns = names
        .iter()
        .map(|name| Ok((name.to_string(), referenced(ctx, cmd, name)?)))
        .collect::<DslResult<Vec<(String, &[Cell])>>>()?;

    let resolved = replaced
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            let value = cell.as_deref()?;
            let mut missing = false;
            let out = PLACEHOLDER.replace_all(value, |caps: &regex::Captures<'_>| {
                let name = &caps[1];
                let found = columns
                    .iter()
                    .find(|(n, _)| n == name)
                    .filter(|(_, column)| !column.is_empty())
                    .and_then(|(_, column)| column[row % column.len()].clone());
                found.unwrap_or_else(|| {
                    missing = true;
                    String::new()
                })
            });
            (!missing).then(|| out.into_owned())
        })
        .collect();

    Ok(Some(resolved))
}

fn call_grep(ctx: &CommandContext<'_>, cmd: Command, arg: &str, values: Values) -> DslResult<Option<Values>> {
    let re = compile(ctx, cmd, arg)?;

    let found = values
        .iter()
        .map(|cell| match cell.as_deref() {
            Some(v) => re
                .find(v)
                .map(|m| m.map(|m| m.as_str().to_string()))
                .map_err(|e| regex_failure(ctx, cmd, arg, e)),
            None => Ok(None),
        })
        .collect::<DslResult<Values>>()?;

    if found.iter().all(Option::is_none) {
        return Err(DslError::pattern(
            ctx.variable,
            cmd.name(),
            format!("'{}' matched none of {} values", arg, values.len()),
        ));
    }

    Ok(Some(found))
}

fn call_is_in(ctx: &CommandContext<'_>, cmd: Command, arg: &str, values: Values) -> DslResult<Option<Values>> {
    let other = referenced(ctx, cmd, arg.trim())?;
    Ok(Some(values.into_iter().filter(|v| other.contains(v)).collect()))
}

fn call_not_in(ctx: &CommandContext<'_>, cmd: Command, arg: &str, values: Values) -> DslResult<Option<Values>> {
    let other = referenced(ctx, cmd, arg.trim())?;
    Ok(Some(values.into_iter().filter(|v| !other.contains(v)).collect()))
}

fn call_multiply(ctx: &CommandContext<'_>, cmd: Command, arg: &str, values: Values) -> DslResult<Option<Values>> {
    let times = count_argument(ctx, cmd, arg)?;
    Ok(Some(tile(&values, times)))
}

fn call_repeat(ctx: &CommandContext<'_>, cmd: Command, arg: &str, values: Values) -> DslResult<Option<Values>> {
    let times = count_argument(ctx, cmd, arg)?;
    Ok(Some(
        values
            .iter()
            .flat_map(|v| std::iter::repeat(v.clone()).take(times))
            .collect(),
    ))
}

fn call_unique(_ctx: &CommandContext<'_>, _cmd: Command, _arg: &str, values: Values) -> DslResult<Option<Values>> {
    let mut seen = HashSet::new();
    Ok(Some(values.into_iter().filter(|v| seen.insert(v.clone())).collect()))
}

fn call_exists(ctx: &CommandContext<'_>, cmd: Command, _arg: &str, values: Values) -> DslResult<Option<Values>> {
    let root = require_root(ctx, cmd)?;

    Ok(Some(
        values
            .into_iter()
            .map(|cell| {
                cell.filter(|v| {
                    let path = root.join(v);
                    path.exists() || path.symlink_metadata().is_ok()
                })
            })
            .collect(),
    ))
}

// =============================================================================
// Helpers
// =============================================================================

/// Whole-sequence tiling: `[a, b]` twice is `[a, b, a, b]`.
pub fn tile(values: &[Cell], times: usize) -> Values {
    (0..times).flat_map(|_| values.iter().cloned()).collect()
}

fn referenced<'a>(ctx: &CommandContext<'a>, cmd: Command, name: &str) -> DslResult<&'a [Cell]> {
    ctx.table.get(name).ok_or_else(|| {
        DslError::reference(
            ctx.variable,
            cmd.name(),
            format!("variable '{}' is not defined", name),
        )
    })
}

fn require_root<'a>(ctx: &CommandContext<'a>, cmd: Command) -> DslResult<&'a Path> {
    ctx.root.ok_or_else(|| DslError::MissingRoot {
        variable: ctx.variable.to_string(),
        command: cmd.name().to_string(),
    })
}

/// Patterns support look-around, e.g. `svs(?=.nii.gz)`.
fn compile(ctx: &CommandContext<'_>, cmd: Command, pattern: &str) -> DslResult<Regex> {
    Regex::new(pattern).map_err(|e| {
        DslError::pattern(ctx.variable, cmd.name(), format!("invalid regex '{}': {}", pattern, e))
    })
}

/// Matching can fail at run time once the backtrack limit is hit.
fn regex_failure(ctx: &CommandContext<'_>, cmd: Command, pattern: &str, e: fancy_regex::Error) -> DslError {
    DslError::pattern(ctx.variable, cmd.name(), format!("regex '{}' failed: {}", pattern, e))
}

/// An integer literal, or the length of the named variable.
fn count_argument(ctx: &CommandContext<'_>, cmd: Command, arg: &str) -> DslResult<usize> {
    let arg = arg.trim();
    if let Ok(n) = arg.parse::<usize>() {
        return Ok(n);
    }

    let numeric = arg
        .trim_start_matches(['-', '+'])
        .starts_with(|c: char| c.is_ascii_digit())
        && arg.parse::<f64>().is_ok();
    if numeric {
        return Err(DslError::parse(
            ctx.variable,
            cmd.name(),
            format!("invalid count '{}', expected a non-negative integer", arg),
        ));
    }

    Ok(referenced(ctx, cmd, arg)?.len())
}
