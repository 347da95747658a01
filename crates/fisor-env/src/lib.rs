//! Environments used to train and evaluate safe offline RL agents.
//!
//! Every environment emits a scalar reward **and** a scalar cost per step.
//! The training driver never interacts with an environment while learning;
//! environments are only rolled out during evaluation and when collecting
//! behavior datasets.
//!
//! # Environments
//!
//! - [`PointRobot`] - synthetic 2-D navigation around hazard discs, used as a
//!   toy/debugging setup with its own dataset file
//! - [`KinematicTask`] - point-mass safety tasks registered under the benchmark
//!   names listed in [`ENV_LIST`]
//!
//! Benchmark environments are wrapped with [`CostLimit`] before evaluation,
//! which clips actions and exposes normalized scores.
//!
//! # Example
//!
//! ```
//! use fisor_env::{Environment, registry};
//!
//! let mut env = registry::make("OfflineCarRun-v0", 0).unwrap();
//! let obs = env.reset();
//! assert_eq!(obs.len(), env.observation_space().dim());
//! let step = env.step(&[0.5, 0.0]).unwrap();
//! assert!(step.cost >= 0.0);
//! ```

pub use self::{
    kinematic::{KinematicTask, TaskKind},
    point_robot::PointRobot,
    registry::{ENV_LIST, EnvSpec, POINT_ROBOT},
    space::BoxSpace,
    wrapper::CostLimit,
};

pub mod kinematic;
pub mod point_robot;
pub mod registry;
pub mod space;
pub mod wrapper;

/// Errors raised by environment construction and stepping.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum EnvError {
    #[display("unknown environment '{name}'")]
    UnknownEnv { name: String },
    #[display("action has {actual} dimensions, expected {expected}")]
    ActionDim { expected: usize, actual: usize },
    #[display("step called after the episode finished; call reset first")]
    EpisodeFinished,
    #[display("cost limit must be positive, got {cost_limit}")]
    InvalidCostLimit { cost_limit: f64 },
}

/// Outcome of a single environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub observation: Vec<f32>,
    pub reward: f32,
    pub cost: f32,
    /// The episode reached a terminal state (e.g. goal reached).
    pub terminated: bool,
    /// The episode hit the time limit.
    pub truncated: bool,
}

impl Step {
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Core interface for reward/cost environments.
pub trait Environment {
    /// Starts a new episode and returns the initial observation.
    fn reset(&mut self) -> Vec<f32>;

    /// Advances the episode by one action.
    fn step(&mut self, action: &[f32]) -> Result<Step, EnvError>;

    fn observation_space(&self) -> &BoxSpace;

    fn action_space(&self) -> &BoxSpace;

    /// Time limit after which episodes are truncated.
    fn max_episode_steps(&self) -> usize;
}

/// Known return range of an environment, used to normalize rewards and scores.
pub trait EpisodeRewardBounds {
    fn max_episode_reward(&self) -> f64;
    fn min_episode_reward(&self) -> f64;
}

fn check_action_dim(space: &BoxSpace, action: &[f32]) -> Result<(), EnvError> {
    if action.len() == space.dim() {
        Ok(())
    } else {
        Err(EnvError::ActionDim {
            expected: space.dim(),
            actual: action.len(),
        })
    }
}
