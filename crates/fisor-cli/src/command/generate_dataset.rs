use std::path::PathBuf;

use anyhow::Context as _;
use fisor_dataset::collect::collect;
use fisor_env::{Environment, POINT_ROBOT, PointRobot, registry};
use rand::SeedableRng as _;
use rand_pcg::Pcg64;

use crate::util::Output;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct GenerateDatasetArg {
    /// Index into the environment list (see `list-envs`)
    #[arg(long)]
    env_id: usize,
    /// Number of episodes to collect
    #[arg(long, default_value_t = 100)]
    episodes: usize,
    /// Seed of the environment and the behavior policy
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &GenerateDatasetArg) -> anyhow::Result<()> {
    let GenerateDatasetArg {
        env_id,
        episodes,
        seed,
        output,
    } = arg;
    let name = registry::env_name(*env_id)
        .with_context(|| format!("Environment index {env_id} is out of range"))?;

    let mut env: Box<dyn Environment> = if name == POINT_ROBOT {
        Box::new(PointRobot::new(0, *seed))
    } else {
        Box::new(registry::make(name, *seed)?)
    };
    tracing::info!(env = name, episodes, seed, "Collecting behavior data");
    let mut rng = Pcg64::seed_from_u64(*seed);
    let file = collect(env.as_mut(), *episodes, &mut rng)
        .with_context(|| format!("Failed to collect data from {name}"))?;

    let mut output = Output::from_output_path(output.clone())?;
    output.write_json(&file)?;

    eprintln!("Collected {} transitions from {name}", file.len());
    eprintln!("  Episodes: {episodes}");
    eprintln!("  Output: {}", output.display_path());
    Ok(())
}
