//! Project configuration - `fairb.json`
//!
//! A project directory lives inside the dataset it designs jobs for. Its
//! configuration names the datasets, the container and the push targets, and
//! keeps a record of every design applied to it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ProjectError, ProjectResult};
use crate::models::{DesignResources, JobTemplates};

/// Configuration file name inside the project directory
pub const CONFIG_FILE: &str = "fairb.json";

/// Default job table file name
pub const JOB_CONFIG_FILE: &str = "job_config.csv";

fn default_batch() -> String {
    "0001".to_string()
}

/// A design as it was applied, with its creation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDesign {
    /// Variable definition string
    pub variables: String,
    #[serde(flatten)]
    pub templates: JobTemplates,
    pub resources: DesignResources,
    /// Number of jobs the design produced
    pub job_count: usize,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

impl StoredDesign {
    pub fn new(
        variables: impl Into<String>,
        templates: JobTemplates,
        resources: DesignResources,
        job_count: usize,
    ) -> Self {
        Self {
            variables: variables.into(),
            templates,
            resources,
            job_count,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Contents of `fairb.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project_name: String,
    /// Identifier of the super dataset
    pub super_id: String,
    pub absolute_path: PathBuf,
    #[serde(default)]
    pub input_datasets: Vec<String>,
    /// Output dataset paths, relative to the super dataset
    #[serde(default)]
    pub output_datasets: Vec<String>,
    pub container: Option<String>,
    pub clone_target: Option<String>,
    pub push_target: Option<String>,
    #[serde(default = "default_batch")]
    pub current_batch: String,
    #[serde(default)]
    pub designs: Vec<StoredDesign>,
    #[serde(default)]
    pub job_config: Option<PathBuf>,
    #[serde(default)]
    pub job_status: Option<PathBuf>,
}

impl ProjectConfig {
    /// Create a configuration for a project directory
    pub fn new(project_name: impl Into<String>, super_id: impl Into<String>, absolute_path: impl Into<PathBuf>) -> Self {
        Self {
            project_name: project_name.into(),
            super_id: super_id.into(),
            absolute_path: absolute_path.into(),
            input_datasets: Vec::new(),
            output_datasets: Vec::new(),
            container: None,
            clone_target: None,
            push_target: None,
            current_batch: default_batch(),
            designs: Vec::new(),
            job_config: None,
            job_status: None,
        }
    }

    /// Load `fairb.json` from a project directory
    pub fn load(dir: &Path) -> ProjectResult<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Err(ProjectError::NotFound(dir.display().to_string()));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write `fairb.json` into a project directory
    pub fn save(&self, dir: &Path) -> ProjectResult<()> {
        fs::create_dir_all(dir)?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(dir.join(CONFIG_FILE), content)?;
        Ok(())
    }

    /// Record an applied design
    pub fn add_design(&mut self, design: StoredDesign) {
        self.designs.push(design);
    }

    /// Job table path, defaulting to the project directory
    pub fn job_config_path(&self) -> PathBuf {
        self.job_config
            .clone()
            .unwrap_or_else(|| self.absolute_path.join(JOB_CONFIG_FILE))
    }
}

/// Root that DSL paths resolve against: the dataset containing the project
pub fn super_dataset_path(project_dir: &Path) -> ProjectResult<PathBuf> {
    let absolute = fs::canonicalize(project_dir)?;
    Ok(absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or(absolute))
}
