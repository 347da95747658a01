//! Evaluation rollouts.
//!
//! Each episode runs the agent's evaluation action until the environment
//! terminates or truncates. Episode returns, costs and lengths are summarized
//! with [`DescriptiveStats`].

use fisor_agent::{Agent, Record};
use fisor_env::{EnvError, Environment, PointRobot};
use fisor_stats::descriptive::DescriptiveStats;

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum EvaluationError {
    #[display("evaluation needs at least one episode")]
    #[from(skip)]
    NoEpisodes,
    #[display("environment failed during evaluation: {_0}")]
    Env(EnvError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Episode {
    episode_return: f64,
    cost: f64,
    length: usize,
}

fn run_episode<E>(agent: &mut dyn Agent, env: &mut E) -> Result<Episode, EnvError>
where
    E: Environment + ?Sized,
{
    let mut observation = env.reset();
    let mut episode = Episode {
        episode_return: 0.0,
        cost: 0.0,
        length: 0,
    };
    loop {
        let action = agent.eval_action(&observation);
        let step = env.step(&action)?;
        episode.episode_return += f64::from(step.reward);
        episode.cost += f64::from(step.cost);
        episode.length += 1;
        if step.is_done() {
            return Ok(episode);
        }
        observation = step.observation;
    }
}

/// Summary of a batch of evaluation episodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub returns: DescriptiveStats,
    pub costs: DescriptiveStats,
    pub lengths: DescriptiveStats,
    /// Fraction of episodes that reached the goal, for goal-reaching tasks.
    pub success_rate: Option<f64>,
}

impl Evaluation {
    /// Mean episode return.
    #[must_use]
    pub fn mean_return(&self) -> f64 {
        self.returns.mean
    }

    /// Mean episode cost.
    #[must_use]
    pub fn mean_cost(&self) -> f64 {
        self.costs.mean
    }

    /// `return`, `return_std`, `cost`, `cost_std`, `episode_len` and, when
    /// known, `success_rate`.
    #[must_use]
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("return", self.returns.mean);
        record.insert("return_std", self.returns.std_dev);
        record.insert("cost", self.costs.mean);
        record.insert("cost_std", self.costs.std_dev);
        record.insert("episode_len", self.lengths.mean);
        if let Some(rate) = self.success_rate {
            record.insert("success_rate", rate);
        }
        record
    }
}

fn summarize(
    episodes: &[Episode],
    success_rate: Option<f64>,
) -> Result<Evaluation, EvaluationError> {
    let stats = |f: fn(&Episode) -> f64| {
        DescriptiveStats::new(episodes.iter().map(f)).ok_or(EvaluationError::NoEpisodes)
    };
    #[expect(clippy::cast_precision_loss)]
    let lengths = stats(|e| e.length as f64)?;
    Ok(Evaluation {
        returns: stats(|e| e.episode_return)?,
        costs: stats(|e| e.cost)?,
        lengths,
        success_rate,
    })
}

/// Runs `episodes` evaluation episodes on a general environment.
pub fn evaluate<E>(
    agent: &mut dyn Agent,
    env: &mut E,
    episodes: usize,
) -> Result<Evaluation, EvaluationError>
where
    E: Environment + ?Sized,
{
    let results = (0..episodes)
        .map(|_| run_episode(agent, env))
        .collect::<Result<Vec<_>, _>>()?;
    summarize(&results, None)
}

/// Runs `episodes` evaluation episodes on the PointRobot task, also reporting
/// how often the goal was reached.
pub fn evaluate_point_robot(
    agent: &mut dyn Agent,
    env: &mut PointRobot,
    episodes: usize,
) -> Result<Evaluation, EvaluationError> {
    let mut results = Vec::with_capacity(episodes);
    let mut successes = 0_usize;
    for _ in 0..episodes {
        results.push(run_episode(agent, env)?);
        if env.reached_goal() {
            successes += 1;
        }
    }
    #[expect(clippy::cast_precision_loss)]
    let success_rate = successes as f64 / episodes.max(1) as f64;
    summarize(&results, Some(success_rate))
}
