//! Job table - `job_config.csv`
//!
//! One row per job. Rows are appended by `design`; earlier rows are never
//! rewritten.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{DesignError, DesignResult, TableError, TableResult};
use crate::models::{DesignResources, JobRecord};
use crate::project::{ProjectConfig, StoredDesign};

/// Column order of the job table
pub const JOB_CONFIG_COLUMNS: [&str; 21] = [
    "job_name",
    "dl_cmd",
    "container",
    "commit",
    "inputs",
    "outputs",
    "is_explicit",
    "output_datasets",
    "prereq_get",
    "message",
    "super_id",
    "clone_target",
    "push_target",
    "ephemeral_location",
    "req_disk_gb",
    "queue",
    "slots",
    "vmem",
    "h_rt",
    "env_vars",
    "batch",
];

/// One job table row. Field order matches [`JOB_CONFIG_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfigRow {
    pub job_name: String,
    pub dl_cmd: String,
    pub container: Option<String>,
    /// Filled in once the job has run
    pub commit: Option<String>,
    pub inputs: String,
    pub outputs: String,
    pub is_explicit: bool,
    /// Space separated
    pub output_datasets: Option<String>,
    pub prereq_get: Option<String>,
    pub message: Option<String>,
    pub super_id: String,
    pub clone_target: Option<String>,
    pub push_target: Option<String>,
    pub ephemeral_location: Option<String>,
    pub req_disk_gb: Option<u32>,
    pub queue: String,
    pub slots: u32,
    pub vmem: Option<u32>,
    pub h_rt: String,
    pub env_vars: Option<String>,
    pub batch: String,
}

impl JobConfigRow {
    /// Combine a job with its design's resources and the project settings
    pub fn from_job(job: &JobRecord, resources: &DesignResources, project: &ProjectConfig) -> Self {
        let output_datasets = if job.output_datasets.is_empty() {
            None
        } else {
            Some(job.output_datasets.join(" "))
        };

        Self {
            job_name: job.job_name.clone(),
            dl_cmd: job.command_line.clone(),
            container: project.container.clone(),
            commit: None,
            inputs: job.inputs.clone(),
            outputs: job.outputs.clone(),
            is_explicit: resources.is_explicit,
            output_datasets,
            prereq_get: resources.prereq_get.clone(),
            message: resources.message.clone(),
            super_id: project.super_id.clone(),
            clone_target: project.clone_target.clone(),
            push_target: project.push_target.clone(),
            ephemeral_location: resources.ephemeral_location.clone(),
            req_disk_gb: resources.req_disk_gb,
            queue: resources.queue.clone(),
            slots: resources.slots,
            vmem: resources.vmem,
            h_rt: resources.h_rt.clone(),
            env_vars: resources.env_vars.clone(),
            batch: project.current_batch.clone(),
        }
    }
}

/// Append-only handle on a job table file
#[derive(Debug, Clone)]
pub struct JobTable {
    path: PathBuf,
}

impl JobTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `rows`, writing the header first if the file is new or empty
    pub fn append(&self, rows: &[JobConfigRow]) -> TableResult<()> {
        let needs_header = match std::fs::metadata(&self.path) {
            Ok(meta) if meta.len() > 0 => {
                self.check_header()?;
                false
            }
            _ => true,
        };

        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);

        if needs_header && rows.is_empty() {
            writer.write_record(JOB_CONFIG_COLUMNS)?;
        }
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        info!("Appended {} jobs to {}", rows.len(), self.path.display());
        Ok(())
    }

    /// Read every row of the table; a missing file is an empty table
    pub fn read_all(&self) -> TableResult<Vec<JobConfigRow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        self.check_header()?;

        let mut reader = csv::Reader::from_path(&self.path)?;
        reader
            .deserialize::<JobConfigRow>()
            .map(|row| row.map_err(TableError::from))
            .collect()
    }

    fn check_header(&self) -> TableResult<()> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let found: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if found != JOB_CONFIG_COLUMNS {
            return Err(TableError::HeaderMismatch {
                expected: JOB_CONFIG_COLUMNS.iter().map(|c| c.to_string()).collect(),
                found,
            });
        }
        Ok(())
    }
}

/// Append `rows` to the project's job table, then record `design` in
/// `fairb.json`.
///
/// If the rows were written but the configuration could not be saved, the
/// design is taken back out of `project` and [`DesignError::Unrecorded`]
/// says which table now holds the extra jobs.
pub fn record_design(
    project: &mut ProjectConfig,
    project_dir: &Path,
    design: StoredDesign,
    rows: &[JobConfigRow],
) -> DesignResult<JobTable> {
    let table = JobTable::new(project.job_config_path());
    table.append(rows)?;

    project.add_design(design);
    if let Err(source) = project.save(project_dir) {
        project.designs.pop();
        return Err(DesignError::Unrecorded {
            jobs: rows.len(),
            table: table.path().display().to_string(),
            source,
        });
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobTemplates;
    use std::fs;
    use tempfile::tempdir;

    fn project() -> ProjectConfig {
        let mut config = ProjectConfig::new("bet", "abc-123", "/data/study/code");
        config.container = Some("containers/fsl".into());
        config
    }

    fn job(name: &str, datasets: &[&str]) -> JobRecord {
        JobRecord {
            job_name: name.into(),
            command_line: format!("bet {}", name),
            inputs: format!("inputs/{}.nii", name),
            outputs: format!("outputs/bet/{}.nii", name),
            output_datasets: datasets.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn test_from_job_merges_settings() {
        let mut resources = DesignResources::new("short.q");
        resources.vmem = Some(8);
        let row = JobConfigRow::from_job(&job("s1", &["outputs/bet", "outputs/qc"]), &resources, &project());

        assert_eq!(row.dl_cmd, "bet s1");
        assert_eq!(row.output_datasets.as_deref(), Some("outputs/bet outputs/qc"));
        assert_eq!(row.container.as_deref(), Some("containers/fsl"));
        assert_eq!(row.batch, "0001");
        assert_eq!(row.slots, 1);
        assert_eq!(row.commit, None);
    }

    #[test]
    fn test_append_twice_keeps_single_header() {
        let dir = tempdir().unwrap();
        let table = JobTable::new(dir.path().join("job_config.csv"));
        let resources = DesignResources::new("short.q");

        table.append(&[JobConfigRow::from_job(&job("s1", &[]), &resources, &project())]).unwrap();
        table
            .append(&[
                JobConfigRow::from_job(&job("s2", &[]), &resources, &project()),
                JobConfigRow::from_job(&job("s3", &["outputs/bet"]), &resources, &project()),
            ])
            .unwrap();

        let content = fs::read_to_string(table.path()).unwrap();
        assert_eq!(content.matches("job_name,dl_cmd").count(), 1);

        let rows = table.read_all().unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.job_name.as_str()).collect();
        assert_eq!(names, vec!["s1", "s2", "s3"]);
        assert_eq!(rows[0].output_datasets, None);
        assert_eq!(rows[2].output_datasets.as_deref(), Some("outputs/bet"));
    }

    #[test]
    fn test_empty_append_writes_header() {
        let dir = tempdir().unwrap();
        let table = JobTable::new(dir.path().join("job_config.csv"));
        table.append(&[]).unwrap();

        let content = fs::read_to_string(table.path()).unwrap();
        assert_eq!(content.trim_end(), JOB_CONFIG_COLUMNS.join(","));
        assert!(table.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_header_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("job_config.csv");
        fs::write(&path, "job_name,cmd\na,b\n").unwrap();

        let table = JobTable::new(&path);
        let row = JobConfigRow::from_job(&job("s1", &[]), &DesignResources::new("q"), &project());
        let err = table.append(&[row]).unwrap_err();
        assert!(matches!(err, TableError::HeaderMismatch { .. }));
    }

    #[test]
    fn test_record_design_saves_config() {
        let dir = tempdir().unwrap();
        let mut config = ProjectConfig::new("bet", "abc-123", dir.path());
        let resources = DesignResources::new("short.q");
        let rows = vec![JobConfigRow::from_job(&job("s1", &[]), &resources, &config)];
        let design = StoredDesign::new("a == <!write>(s1)", JobTemplates::new("{a}", "bet {a}"), resources, 1);

        let table = record_design(&mut config, dir.path(), design, &rows).unwrap();
        assert_eq!(table.read_all().unwrap().len(), 1);
        assert_eq!(ProjectConfig::load(dir.path()).unwrap().designs.len(), 1);
    }

    #[test]
    fn test_record_design_reports_unsaved_config() {
        let dir = tempdir().unwrap();
        let mut config = ProjectConfig::new("bet", "abc-123", dir.path());
        // A regular file where the project directory should be
        let not_a_dir = dir.path().join("fairb-file");
        fs::write(&not_a_dir, "").unwrap();

        let resources = DesignResources::new("short.q");
        let rows = vec![JobConfigRow::from_job(&job("s1", &[]), &resources, &config)];
        let design = StoredDesign::new("a == <!write>(s1)", JobTemplates::new("{a}", "bet {a}"), resources, 1);

        let err = record_design(&mut config, &not_a_dir, design, &rows).unwrap_err();
        match err {
            DesignError::Unrecorded { jobs, table, .. } => {
                assert_eq!(jobs, 1);
                assert!(table.ends_with("job_config.csv"));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(config.designs.is_empty());
        assert_eq!(JobTable::new(config.job_config_path()).read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_table_reads_empty() {
        let dir = tempdir().unwrap();
        let table = JobTable::new(dir.path().join("absent.csv"));
        assert!(table.read_all().unwrap().is_empty());
    }
}
