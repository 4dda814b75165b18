//! Job Expander
//!
//! Turns a broadcast [`VariableTable`] into [`JobRecord`]s, one per row.
//!
//! Rows holding a null value in any variable are skipped. A `<!random>`
//! marker in the command line becomes a `{random_seed}` placeholder backed by
//! a generated variable of 9-digit seeds, one per row.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{DslError, DslResult};
use crate::models::{JobRecord, JobTemplates};
use crate::transform::dsl::table::VariableTable;
use crate::transform::dsl::template::Template;

/// Marker replaced by a per-row random seed.
pub const RANDOM_MARKER: &str = "<!random>";

/// Variable name the random seeds are stored under.
pub const RANDOM_SEED_VARIABLE: &str = "random_seed";

const SEED_RANGE: std::ops::Range<u64> = 100_000_000..1_000_000_000;

/// Result of expanding a table into jobs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExpansionResult {
    pub jobs: Vec<JobRecord>,
    /// Rows left out because of null values
    pub skipped: Vec<SkippedRow>,
}

/// A row that was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub null_variables: Vec<String>,
}

impl ExpansionResult {
    pub fn summary(&self) -> String {
        format!(
            "Expanded: {} jobs, {} rows skipped",
            self.jobs.len(),
            self.skipped.len()
        )
    }
}

/// The four parsed templates, tagged with the field they fill.
struct ParsedTemplates {
    fields: [(&'static str, Template); 4],
}

impl ParsedTemplates {
    fn parse(templates: &JobTemplates, command_line: &str) -> DslResult<Self> {
        let parse = |field: &'static str, source: &str| {
            Template::parse(source)
                .map(|t| (field, t))
                .map_err(|e| DslError::parse(field, field, e))
        };

        Ok(Self {
            fields: [
                parse("job_name", &templates.job_name)?,
                parse("command_line", command_line)?,
                parse("inputs", &templates.inputs)?,
                parse("outputs", &templates.outputs)?,
            ],
        })
    }

    /// Every placeholder must name a variable of `table`.
    fn check_references(&self, table: &VariableTable) -> DslResult<()> {
        for (field, template) in &self.fields {
            if let Some(missing) = template.placeholders().into_iter().find(|n| !table.contains(n)) {
                return Err(DslError::reference(
                    missing,
                    *field,
                    format!("template refers to undefined variable '{}'", missing),
                ));
            }
        }
        Ok(())
    }

    fn render(&self, table: &VariableTable, row: usize) -> DslResult<[String; 4]> {
        let lookup = |name: &str| table.get(name).and_then(|values| values.get(row)?.as_deref());

        let mut out: [String; 4] = Default::default();
        for (slot, (field, template)) in out.iter_mut().zip(&self.fields) {
            *slot = template.render(lookup).map_err(|missing| {
                DslError::reference(missing, *field, "no value for placeholder")
            })?;
        }
        Ok(out)
    }
}

/// Expand a broadcast table into job records.
///
/// `output_datasets` are the project's known output dataset paths; each job
/// is tagged with those occurring in its rendered outputs. `seed` makes the
/// `<!random>` seeds reproducible.
pub fn expand_jobs(
    table: &VariableTable,
    templates: &JobTemplates,
    output_datasets: &[String],
    seed: Option<u64>,
) -> DslResult<ExpansionResult> {
    let rows = table.max_len();
    let mut table = table.clone();

    let command_line = if templates.command_line.contains(RANDOM_MARKER) {
        let seeds = match seed {
            Some(s) => draw_seeds(&mut StdRng::seed_from_u64(s), rows),
            None => draw_seeds(&mut rand::thread_rng(), rows),
        };
        table.insert(
            RANDOM_SEED_VARIABLE,
            seeds.into_iter().map(|s| Some(s.to_string())).collect(),
        );
        templates
            .command_line
            .replace(RANDOM_MARKER, &format!("{{{}}}", RANDOM_SEED_VARIABLE))
    } else {
        templates.command_line.clone()
    };

    let parsed = ParsedTemplates::parse(templates, &command_line)?;
    parsed.check_references(&table)?;

    let mut result = ExpansionResult::default();

    for row in 0..rows {
        let null_variables: Vec<String> = table
            .row(row)
            .into_iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| name.to_string())
            .collect();

        if !null_variables.is_empty() {
            debug!(row, ?null_variables, "skipping row with null values");
            result.skipped.push(SkippedRow { row, null_variables });
            continue;
        }

        let [job_name, command_line, inputs, outputs] = parsed.render(&table, row)?;
        let datasets = output_datasets
            .iter()
            .filter(|d| !d.is_empty() && outputs.contains(d.as_str()))
            .cloned()
            .collect();

        result.jobs.push(JobRecord {
            job_name,
            command_line,
            inputs,
            outputs,
            output_datasets: datasets,
        });
    }

    info!("{}", result.summary());
    Ok(result)
}

/// `count` distinct 9-digit seeds.
fn draw_seeds<R: Rng>(rng: &mut R, count: usize) -> Vec<u64> {
    let mut seen = HashSet::with_capacity(count);
    let mut seeds = Vec::with_capacity(count);
    while seeds.len() < count {
        let seed = rng.gen_range(SEED_RANGE);
        if seen.insert(seed) {
            seeds.push(seed);
        }
    }
    seeds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::dsl::table::values;

    fn table_of(pairs: &[(&str, &[&str])]) -> VariableTable {
        let mut table = VariableTable::new();
        for (name, items) in pairs {
            table.insert(*name, values(items.iter().copied()));
        }
        table
    }

    #[test]
    fn test_job_names_per_row() {
        let table = table_of(&[("a", &["x", "y", "z"])]);
        let templates = JobTemplates::new("job_{a}", "echo {a}");

        let result = expand_jobs(&table, &templates, &[], None).unwrap();
        let names: Vec<_> = result.jobs.iter().map(|j| j.job_name.as_str()).collect();
        assert_eq!(names, vec!["job_x", "job_y", "job_z"]);
        assert_eq!(result.jobs[1].command_line, "echo y");
    }

    #[test]
    fn test_random_seeds_distinct_nine_digits() {
        let table = table_of(&[("a", &["x", "y", "z"])]);
        let templates = JobTemplates::new("job_{a}", "run --seed <!random>");

        let result = expand_jobs(&table, &templates, &[], None).unwrap();
        assert_eq!(result.jobs.len(), 3);

        let seeds: HashSet<u64> = result
            .jobs
            .iter()
            .map(|j| {
                let seed = j.command_line.strip_prefix("run --seed ").unwrap();
                assert_eq!(seed.len(), 9);
                seed.parse().unwrap()
            })
            .collect();
        assert_eq!(seeds.len(), 3);
    }

    #[test]
    fn test_seeded_expansion_is_reproducible() {
        let table = table_of(&[("a", &["x", "y"])]);
        let templates = JobTemplates::new("job_{a}", "run <!random> <!random>");

        let first = expand_jobs(&table, &templates, &[], Some(42)).unwrap();
        let second = expand_jobs(&table, &templates, &[], Some(42)).unwrap();
        assert_eq!(first.jobs, second.jobs);

        let parts: Vec<_> = first.jobs[0].command_line.split(' ').collect();
        assert_eq!(parts[1], parts[2]);
    }

    #[test]
    fn test_null_rows_skipped() {
        let mut table = table_of(&[("subject", &["s1", "s2", "s3"])]);
        table.insert("t2w", vec![Some("a".into()), None, Some("c".into())]);
        let templates = JobTemplates::new("{subject}", "fit {subject}");

        let result = expand_jobs(&table, &templates, &[], None).unwrap();
        assert_eq!(result.jobs.len(), 2);
        assert_eq!(
            result.skipped,
            vec![SkippedRow {
                row: 1,
                null_variables: vec!["t2w".into()],
            }]
        );
        assert_eq!(result.summary(), "Expanded: 2 jobs, 1 rows skipped");
    }

    #[test]
    fn test_output_datasets_tagged() {
        let table = table_of(&[("subject", &["s1", "s2"])]);
        let templates = JobTemplates::new("bet_{subject}", "bet")
            .with_inputs("inputs/mri/{subject}.nii")
            .with_outputs("outputs/bet/{subject}_bet.nii outputs/qc/{subject}.png");
        let datasets = vec![
            "outputs/bet".to_string(),
            "outputs/qc".to_string(),
            "outputs/fsl".to_string(),
        ];

        let result = expand_jobs(&table, &templates, &datasets, None).unwrap();
        assert_eq!(result.jobs[0].output_datasets, vec!["outputs/bet", "outputs/qc"]);
        assert_eq!(result.jobs[1].inputs, "inputs/mri/s2.nii");
    }

    #[test]
    fn test_undefined_placeholder() {
        let table = table_of(&[("a", &["x"])]);
        let templates = JobTemplates::new("job_{a}", "run").with_outputs("out/{subject}");

        let err = expand_jobs(&table, &templates, &[], None).unwrap_err();
        assert!(matches!(err, DslError::Reference { .. }));
        assert_eq!(err.variable(), "subject");
        assert_eq!(err.command(), "outputs");
    }

    #[test]
    fn test_malformed_template() {
        let table = table_of(&[("a", &["x"])]);
        let templates = JobTemplates::new("job_{a", "run");

        let err = expand_jobs(&table, &templates, &[], None).unwrap_err();
        assert!(matches!(err, DslError::Parse { .. }));
        assert_eq!(err.command(), "job_name");
    }

    #[test]
    fn test_empty_table_yields_no_jobs() {
        let templates = JobTemplates::new("job", "run <!random>");
        let result = expand_jobs(&VariableTable::new(), &templates, &[], None).unwrap();
        assert!(result.jobs.is_empty());
    }
}
