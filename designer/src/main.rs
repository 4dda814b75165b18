//! fairb CLI - Design reproducible jobs from variable definitions
//!
//! # Main Commands
//!
//! ```bash
//! fairb design "<variables>" "<dl_cmd>" "<job_name>" --queue short.q   # Append jobs to job_config.csv
//! fairb design ... --dry-run                                           # Print the jobs instead
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! fairb variables "<variables>"    # Print the evaluated variable table
//! fairb commands                   # Show available DSL commands
//! ```

use clap::{Args, Parser, Subcommand};
use fairb::logging::init_logging;
use fairb::{
    commands_description, design_jobs, design_table, evaluate_source, record_design,
    super_dataset_path, DesignError, DesignOptions, DesignResources, JobConfigRow, JobTemplates,
    ProjectConfig, StoredDesign,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fairb")]
#[command(about = "Design reproducible jobs for version-controlled datasets", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a design and append its jobs to the job table
    Design(DesignArgs),

    /// Evaluate definitions and print the variable table as JSON
    Variables {
        /// Variable definitions, separated by ';'
        variables: String,

        /// Project directory (root is its parent)
        #[arg(short = 'c', long = "path", env = "FAIRB_PATH", default_value = ".")]
        path: PathBuf,

        /// Print the table before broadcasting
        #[arg(long)]
        no_broadcast: bool,
    },

    /// Show available DSL commands
    Commands,
}

#[derive(Args)]
struct DesignArgs {
    /// Variable definitions, separated by ';'
    variables: String,

    /// Command line template; may contain <!random>
    dl_cmd: String,

    /// Job name template
    job_name: String,

    /// Inputs template
    #[arg(long, default_value = "")]
    inputs: String,

    /// Outputs template
    #[arg(long, default_value = "")]
    outputs: String,

    /// Files to fetch before the job runs
    #[arg(long)]
    prereq_get: Option<String>,

    /// Commit message for the job's results
    #[arg(long)]
    message: Option<String>,

    /// Disk space the job needs, in GB
    #[arg(long)]
    req_disk_gb: Option<u32>,

    /// Batch queue name
    #[arg(long)]
    queue: String,

    #[arg(long, default_value = "1")]
    slots: u32,

    /// Memory per slot, in GB
    #[arg(long)]
    vmem: Option<u32>,

    /// Hard runtime limit
    #[arg(long, default_value = "24:00:00")]
    h_rt: String,

    /// Environment variables passed to the job
    #[arg(long)]
    env_vars: Option<String>,

    /// Scratch location for the job's clone
    #[arg(long)]
    ephemeral_locations: Option<String>,

    /// Record explicit inputs and outputs on run
    #[arg(long)]
    is_explicit: bool,

    /// Seed for <!random> values
    #[arg(long)]
    seed: Option<u64>,

    /// Print the jobs as JSON instead of appending them
    #[arg(long)]
    dry_run: bool,

    /// Project directory (root is its parent)
    #[arg(short = 'c', long = "path", env = "FAIRB_PATH", default_value = ".")]
    path: PathBuf,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Design(args) => cmd_design(args),

        Commands::Variables {
            variables,
            path,
            no_broadcast,
        } => cmd_variables(&variables, &path, no_broadcast),

        Commands::Commands => cmd_commands(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_design(args: DesignArgs) -> Result<(), DesignError> {
    if !args.path.is_dir() {
        return Err(DesignError::MissingProject(args.path.display().to_string()));
    }

    let mut project = ProjectConfig::load(&args.path)?;
    let root = super_dataset_path(&args.path)?;
    eprintln!("📄 Designing jobs in: {}", root.display());

    let templates = JobTemplates::new(args.job_name, args.dl_cmd)
        .with_inputs(args.inputs)
        .with_outputs(args.outputs);

    let resources = DesignResources {
        queue: args.queue,
        slots: args.slots,
        vmem: args.vmem,
        h_rt: args.h_rt,
        req_disk_gb: args.req_disk_gb,
        env_vars: args.env_vars,
        ephemeral_location: args.ephemeral_locations,
        prereq_get: args.prereq_get,
        message: args.message,
        is_explicit: args.is_explicit,
    };

    let options = DesignOptions { seed: args.seed };
    let result = design_jobs(
        Some(root.as_path()),
        &args.variables,
        &templates,
        &project.output_datasets,
        &options,
    )?;

    eprintln!("⚙️  {}", result.summary());
    for skipped in &result.skipped {
        eprintln!("   ⚠️  Row {} skipped, null in: {}", skipped.row, skipped.null_variables.join(", "));
    }

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&result.jobs)?);
        return Ok(());
    }

    let rows: Vec<JobConfigRow> = result
        .jobs
        .iter()
        .map(|job| JobConfigRow::from_job(job, &resources, &project))
        .collect();

    let design = StoredDesign::new(args.variables, templates, resources, rows.len());
    let table = record_design(&mut project, &args.path, design, &rows)?;
    eprintln!("💾 {} jobs appended to: {}", rows.len(), table.path().display());

    eprintln!("✨ Done!");
    Ok(())
}

fn cmd_variables(variables: &str, path: &Path, no_broadcast: bool) -> Result<(), DesignError> {
    // Definitions without glob/exists still evaluate outside a project
    let root = super_dataset_path(path).ok();

    let table = if no_broadcast {
        evaluate_source(variables, root.as_deref())?
    } else {
        design_table(root.as_deref(), variables)?
    };

    eprintln!("📋 {} variables, {} rows", table.len(), table.max_len());
    println!("{}", serde_json::to_string_pretty(&table)?);
    Ok(())
}

fn cmd_commands() -> Result<(), DesignError> {
    println!("{}", commands_description());
    Ok(())
}
