use std::path::PathBuf;

use anyhow::Context as _;
use chrono::Local;
use fisor_agent::AgentRegistry;
use fisor_training::{
    config::{self, DEFAULT_RESULTS_DIR, Overrides},
    tracker::{JsonlTracker, RunInfo},
    trainer,
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Hyperparameter configuration file (YAML, or JSON by `.json` extension)
    #[arg(long)]
    pub(crate) config: PathBuf,
    /// Index into the environment list (see `list-envs`)
    #[arg(long, default_value_t = 30)]
    pub(crate) env_id: usize,
    /// Leading fraction of the dataset to train on
    #[arg(long, default_value_t = 1.0)]
    pub(crate) ratio: f64,
    /// Tracking project name; keeps the configured one when empty
    #[arg(long, default_value = "")]
    pub(crate) project: String,
    /// Experiment name prefix; derived from the agent settings when empty
    #[arg(long, default_value = "")]
    pub(crate) experiment_name: String,
    /// Root directory of the run outputs
    #[arg(long, default_value = DEFAULT_RESULTS_DIR)]
    pub(crate) results_dir: PathBuf,
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let TrainArg {
        config: config_path,
        env_id,
        ratio,
        project,
        experiment_name,
        results_dir,
    } = arg;

    let base = config::load_config(config_path)
        .with_context(|| format!("Failed to load configuration {}", config_path.display()))?;
    let overrides = Overrides {
        env_id: *env_id,
        ratio: *ratio,
        project: project.clone(),
        experiment_name: experiment_name.clone(),
    };
    let config = config::resolve(
        base,
        &overrides,
        Local::now().date_naive(),
        &mut rand::rng(),
    )?;
    let run_dir = config::prepare_run_dir(results_dir, &config)?;

    let info = RunInfo::from_config(&config).context("Failed to serialize agent configuration")?;
    let mut tracker = JsonlTracker::init(&run_dir, &info)?;
    let registry = AgentRegistry::default();
    let summary = trainer::run_experiment(&config, &run_dir, &registry, &mut tracker)
        .with_context(|| format!("Training {} failed", config.experiment_name))?;

    eprintln!();
    eprintln!("Training completed");
    eprintln!("  Run directory: {}", run_dir.display());
    eprintln!("  Steps: {}", summary.steps);
    eprintln!("  Checkpoints: {}", summary.checkpoints.len());
    if let Some(eval) = &summary.last_eval {
        for (name, value) in eval.iter() {
            eprintln!("  eval/{name}: {}", serde_json::to_string(value)?);
        }
    }
    Ok(())
}
