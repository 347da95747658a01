//! The offline training loop.
//!
//! ```text
//! for i in 0..max_steps:
//!     batch  ← dataset.sample(batch_size)
//!     record ← agent.update(batch)
//!     i % log_interval == 0  → tracker.log(train/*, i)
//!     i % eval_interval == 0 → agent.save(run_dir, save_time); save_time += 1
//!                              evaluate → tracker.log(eval/*, i)
//! ```
//!
//! `save_time` starts at 1 and counts checkpoints; it is independent of the
//! step counter. The first error aborts the run.

use std::path::{Path, PathBuf};

use fisor_agent::{Agent, AgentRegistry, CheckpointError, CreateAgentError, Record};
use fisor_env::Environment as _;

use crate::{
    builder::{self, BuildError, Built, RunEnv},
    config::ExperimentConfig,
    evaluation::{self, EvaluationError},
    tracker::{Tracker, TrackerError},
};

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum TrainError {
    #[display("{_0}")]
    Build(BuildError),
    #[display("failed to prepare agent hyperparameters: {_0}")]
    Kwargs(serde_json::Error),
    #[display("failed to create agent: {_0}")]
    CreateAgent(CreateAgentError),
    #[display("failed to save checkpoint: {_0}")]
    Checkpoint(CheckpointError),
    #[display("evaluation failed: {_0}")]
    Evaluation(EvaluationError),
    #[display("failed to log metrics: {_0}")]
    Tracker(TrackerError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    /// Number of gradient updates performed.
    pub steps: usize,
    /// Checkpoint files in the order they were written.
    pub checkpoints: Vec<PathBuf>,
    /// Record of the last evaluation, without the `eval/` prefix.
    pub last_eval: Option<Record>,
}

/// Builds the environment, dataset and agent for `config` and trains.
pub fn run_experiment(
    config: &ExperimentConfig,
    run_dir: &Path,
    registry: &AgentRegistry,
    tracker: &mut dyn Tracker,
) -> Result<TrainSummary, TrainError> {
    let mut built = builder::build(config)?;
    let mut agent = registry.create(
        config.seed,
        built.env.observation_space(),
        built.env.action_space(),
        config.agent_kwargs.to_map()?,
        built.env_max_steps,
    )?;
    train(config, run_dir, &mut built, agent.as_mut(), tracker)
}

/// Runs the training loop on already constructed components.
pub fn train(
    config: &ExperimentConfig,
    run_dir: &Path,
    built: &mut Built,
    agent: &mut dyn Agent,
    tracker: &mut dyn Tracker,
) -> Result<TrainSummary, TrainError> {
    let mut save_time = 1;
    let mut checkpoints = vec![];
    let mut last_eval = None;

    tracing::info!(
        experiment = %config.experiment_name,
        max_steps = config.max_steps,
        batch_size = config.batch_size,
        "Training started"
    );
    for i in 0..config.max_steps {
        let batch = built.dataset.sample(config.batch_size);
        let info = agent.update(&batch);

        if i % config.log_interval == 0 {
            let record = info.into_loggable();
            tracing::info!(
                step = i,
                critic_loss = record.scalar("critic_loss"),
                actor_loss = record.scalar("actor_loss"),
                "Training progress"
            );
            tracker.log(&record.prefixed("train"), i)?;
        }

        if i % config.eval_interval == 0 {
            checkpoints.push(agent.save(run_dir, save_time)?);
            save_time += 1;

            let eval = evaluate_run(agent, &mut built.env, config.eval_episodes)?;
            tracing::info!(
                step = i,
                eval_return = eval.scalar("return"),
                eval_cost = eval.scalar("cost"),
                "Evaluation"
            );
            tracker.log(&eval.prefixed("eval"), i)?;
            last_eval = Some(eval);
        }
    }
    tracing::info!(
        steps = config.max_steps,
        checkpoints = checkpoints.len(),
        "Training finished"
    );

    Ok(TrainSummary {
        steps: config.max_steps,
        checkpoints,
        last_eval,
    })
}

fn evaluate_run(
    agent: &mut dyn Agent,
    env: &mut RunEnv,
    episodes: usize,
) -> Result<Record, EvaluationError> {
    match env {
        RunEnv::PointRobot(env) => {
            Ok(evaluation::evaluate_point_robot(agent, env, episodes)?.to_record())
        }
        RunEnv::Benchmark(env) => {
            let eval = evaluation::evaluate(agent, env, episodes)?;
            let (normalized_return, normalized_cost) =
                env.normalized_score(eval.mean_return(), eval.mean_cost());
            let mut record = eval.to_record();
            record.insert("normalized_return", normalized_return);
            record.insert("normalized_cost", normalized_cost);
            Ok(record)
        }
    }
}
