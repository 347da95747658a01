//! Learning agents for safe offline RL.
//!
//! An [`Agent`] consumes dataset batches, one update per training step, and
//! reports its diagnostics as a [`Record`]. Agents are created by name through
//! the [`AgentRegistry`], which mirrors how experiment configurations select a
//! model class by string.
//!
//! # Architecture
//!
//! ```text
//! ExperimentConfig.agent_kwargs
//!     ↓ model_cls
//! AgentRegistry ──→ constructor (e.g. Fisor::create)
//!     ↓
//! Box<dyn Agent>
//!     ├─ update(batch)       → Record (train diagnostics)
//!     ├─ eval_action(obs)    → action used by evaluation rollouts
//!     └─ save(dir, version)  → checkpoint file
//! ```
//!
//! # Registered agents
//!
//! - `FISOR` ([`fisor::Fisor`]) - feasibility-guided safe offline RL with
//!   linear critics and a feasibility-weighted actor

use std::{fmt, path::Path, path::PathBuf};

use fisor_dataset::Batch;

pub use self::{
    checkpoint::CheckpointError,
    fisor::{ActorObjective, CriticType, ExtractMethod, Fisor, FisorConfig, SamplingMethod},
    metrics::{MetricValue, Record},
    registry::{AgentInit, AgentRegistry, CreateAgentError},
};

pub mod checkpoint;
pub mod fisor;
pub mod linear;
pub mod metrics;
pub mod registry;

/// A trainable policy with reward and cost critics.
pub trait Agent: fmt::Debug {
    /// Registered model-class name of this agent.
    fn model_name(&self) -> &'static str;

    /// Applies one gradient update on `batch` and returns its diagnostics.
    fn update(&mut self, batch: &Batch<'_>) -> Record;

    /// Chooses the action to execute during evaluation.
    fn eval_action(&mut self, observation: &[f32]) -> Vec<f32>;

    /// Writes a checkpoint tagged with `version` into `dir` and returns its path.
    fn save(&self, dir: &Path, version: usize) -> Result<PathBuf, CheckpointError>;
}
