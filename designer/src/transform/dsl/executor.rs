//! DSL Executor
//!
//! Evaluates parsed definitions top to bottom into a [`VariableTable`].
//!
//! Every chain is validated before any command runs. Steps then run in
//! order: the producer starts from no values, every transformer receives the
//! output of the step before. Evaluation stops at the first error.

use std::path::Path;

use tracing::{debug, info};

use super::commands::{dispatch, CommandContext};
use super::table::{Values, VariableTable};
use crate::error::{DslError, DslResult};
use crate::models::{CommandClass, VariableDefinition};
use crate::parser::parse_definitions;
use crate::validation::validate_all;

/// Evaluate `definitions` in order.
///
/// `root` is the project root used by `glob` and `exists`; chains that use
/// neither can be evaluated without one.
pub fn evaluate(definitions: &[VariableDefinition], root: Option<&Path>) -> DslResult<VariableTable> {
    validate_all(definitions)?;

    let mut table = VariableTable::new();

    for definition in definitions {
        if definition.is_drop() {
            debug!(variable = %definition.name, "variable dropped");
            table.remove(&definition.name);
            continue;
        }

        match evaluate_chain(definition, &table, root)? {
            Some(values) => {
                debug!(variable = %definition.name, values = values.len(), "variable defined");
                table.insert(definition.name.clone(), values);
            }
            None => {
                debug!(variable = %definition.name, "variable dropped");
                table.remove(&definition.name);
            }
        }
    }

    info!(
        "Evaluated {} definitions into {} variables",
        definitions.len(),
        table.len()
    );
    Ok(table)
}

/// Parse and evaluate a definition string.
pub fn evaluate_source(source: &str, root: Option<&Path>) -> DslResult<VariableTable> {
    let definitions = parse_definitions(source)?;
    evaluate(&definitions, root)
}

/// Run one chain against the variables defined so far.
///
/// Returns `None` when the chain drops its variable.
fn evaluate_chain(
    definition: &VariableDefinition,
    table: &VariableTable,
    root: Option<&Path>,
) -> DslResult<Option<Values>> {
    let ctx = CommandContext {
        variable: &definition.name,
        table,
        root,
    };

    let mut current: Values = Vec::new();

    for step in &definition.chain {
        if step.class() == CommandClass::Transformer && current.is_empty() {
            return Err(DslError::ordering(
                &definition.name,
                step.command.name(),
                "requires existing values, the previous step produced none",
            ));
        }

        match dispatch(&ctx, step.command.name(), &step.argument, current)? {
            Some(values) => current = values,
            None => return Ok(None),
        }
    }

    Ok(Some(current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::dsl::table::values;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_write_multiply() {
        let table = evaluate_source("voi == <!write>(acc pcc)<!multiply>(2)", None).unwrap();
        assert_eq!(table.get("voi").unwrap(), values(["acc", "pcc", "acc", "pcc"]).as_slice());
    }

    #[test]
    fn test_drop_removes_variable() {
        let table = evaluate_source(
            "voi == <!write>(acc pcc) ; tmp == <!variable>(voi) ; voi == <!drop>",
            None,
        )
        .unwrap();

        let names: Vec<_> = table.names().collect();
        assert_eq!(names, vec!["tmp"]);
    }

    #[test]
    fn test_drop_undefined_is_noop() {
        let table = evaluate_source("svs == <!drop>", None).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_references_earlier_variables_only() {
        let err = evaluate_source("a == <!variable>(b) ; b == <!write>(x)", None).unwrap_err();
        assert!(matches!(err, DslError::Reference { .. }));
        assert_eq!(err.variable(), "a");
        assert_eq!(err.command(), "variable");
    }

    #[test]
    fn test_ordering_checked_before_running() {
        let err = evaluate_source("voi == <!unique><!write>(acc)", None).unwrap_err();
        assert!(matches!(err, DslError::Ordering { .. }));
    }

    #[test]
    fn test_invalid_chain_stops_before_any_command() {
        let dir = tempdir().unwrap();
        let source = "svs == <!glob>(nomatch*.nii) ; voi == <!unique><!write>(acc)";

        let err = evaluate_source(source, Some(dir.path())).unwrap_err();
        assert!(matches!(err, DslError::Ordering { .. }));
        assert_eq!(err.variable(), "voi");
    }

    #[test]
    fn test_transformer_on_empty_values() {
        let err = evaluate_source(
            "done == <!write>(acc) ; voi == <!write>(pcc)<!is_in>(done)<!unique>",
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DslError::Ordering { .. }));
        assert_eq!(err.command(), "unique");
    }

    #[test]
    fn test_glob_grep_paste_exists() {
        let dir = tempdir().unwrap();
        for subject in ["sub-01", "sub-02"] {
            let mrs = dir.path().join("inputs").join(subject).join("mrs");
            fs::create_dir_all(&mrs).unwrap();
            fs::write(mrs.join(format!("{}_svs.nii.gz", subject)), "").unwrap();
        }
        let anat = dir.path().join("inputs/sub-01/anat");
        fs::create_dir_all(&anat).unwrap();
        fs::write(anat.join("sub-01_T1w.nii.gz"), "").unwrap();

        let source = "svs == <!glob>(inputs/sub-*/mrs/*svs.nii.gz) ; \
                      subject == <!variable>(svs)<!grep>(sub-\\d+) ; \
                      t1w == <!paste>(inputs/{subject}/anat/{subject}_T1w.nii.gz)<!exists>";
        let table = evaluate_source(source, Some(dir.path())).unwrap();

        assert_eq!(table.get("subject").unwrap(), values(["sub-01", "sub-02"]).as_slice());
        assert_eq!(
            table.get("t1w").unwrap(),
            &[Some("inputs/sub-01/anat/sub-01_T1w.nii.gz".to_string()), None]
        );
    }

    #[test]
    fn test_redefinition_keeps_position() {
        let table = evaluate_source(
            "a == <!write>(1) ; b == <!write>(2) ; a == <!variable>(a)<!multiply>(2)",
            None,
        )
        .unwrap();

        let names: Vec<_> = table.names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(table.get("a").unwrap().len(), 2);
    }
}
