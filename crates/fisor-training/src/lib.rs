//! Offline safe-RL training driver.
//!
//! Wires the pieces of a FISOR experiment together:
//!
//! ```text
//! config file + Overrides
//!     ↓ config::resolve            (env name, group, experiment name, PointRobot settings)
//! ExperimentConfig ──→ config::prepare_run_dir   (results/<group>/<name>/config.json)
//!     ↓ builder::build             (RunEnv + Dataset + env_max_steps)
//!     ↓ AgentRegistry::create      (model_cls → Box<dyn Agent>)
//!     ↓ trainer::train             (update / log / checkpoint / evaluate)
//! Tracker                          (train/* and eval/* records)
//! ```
//!
//! # Modules
//!
//! - [`config`] - configuration file loading and override resolution
//! - [`builder`] - environment and dataset construction
//! - [`evaluation`] - evaluation rollouts
//! - [`tracker`] - tracking sinks
//! - [`trainer`] - the training loop

pub mod builder;
pub mod config;
pub mod evaluation;
pub mod tracker;
pub mod trainer;
