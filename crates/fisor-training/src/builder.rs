//! Environment and dataset construction for a resolved experiment.

use fisor_agent::CriticType;
use fisor_dataset::{CostTransform, Dataset, DatasetError, LoadOptions};
use fisor_env::{
    BoxSpace, CostLimit, EnvError, Environment, EpisodeRewardBounds as _, KinematicTask,
    POINT_ROBOT, PointRobot, Step, registry,
};

use crate::config::ExperimentConfig;

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum BuildError {
    #[display("No data for Point Robot")]
    #[from(skip)]
    MissingPointRobotData,
    #[display("failed to construct environment: {_0}")]
    Env(EnvError),
    #[display("failed to load dataset: {_0}")]
    Dataset(DatasetError),
}

/// The environment a run evaluates on.
#[derive(Debug, Clone)]
pub enum RunEnv {
    /// Synthetic navigation task; no cost-limit wrapping and no normalization.
    PointRobot(PointRobot),
    /// Registered benchmark task behind the cost-limit wrapper.
    Benchmark(CostLimit<KinematicTask>),
}

impl RunEnv {
    fn as_env(&self) -> &dyn Environment {
        match self {
            Self::PointRobot(env) => env,
            Self::Benchmark(env) => env,
        }
    }

    fn as_env_mut(&mut self) -> &mut dyn Environment {
        match self {
            Self::PointRobot(env) => env,
            Self::Benchmark(env) => env,
        }
    }
}

impl Environment for RunEnv {
    fn reset(&mut self) -> Vec<f32> {
        self.as_env_mut().reset()
    }

    fn step(&mut self, action: &[f32]) -> Result<Step, EnvError> {
        self.as_env_mut().step(action)
    }

    fn observation_space(&self) -> &BoxSpace {
        self.as_env().observation_space()
    }

    fn action_space(&self) -> &BoxSpace {
        self.as_env().action_space()
    }

    fn max_episode_steps(&self) -> usize {
        self.as_env().max_episode_steps()
    }
}

#[derive(Debug)]
pub struct Built {
    pub env: RunEnv,
    pub dataset: Dataset,
    pub env_max_steps: usize,
}

fn load_options(config: &ExperimentConfig, cost_scale: f64, ratio: f64) -> LoadOptions {
    #[expect(clippy::cast_possible_truncation)]
    let (scale, eps) = (cost_scale as f32, config.dataset_kwargs.eps as f32);
    let cost_transform = match config.agent_kwargs.critic_type {
        CriticType::Hj => CostTransform::Reachability { scale },
        CriticType::Qc => CostTransform::Scaled { scale },
    };
    LoadOptions {
        ratio,
        cost_transform,
        clip_to_eps: config.dataset_kwargs.clip_to_eps,
        eps,
    }
}

/// Constructs the environment and loads the matching dataset.
pub fn build(config: &ExperimentConfig) -> Result<Built, BuildError> {
    let (env, mut dataset, env_max_steps) = if config.env_name == POINT_ROBOT {
        let path = config
            .dataset_kwargs
            .pr_data
            .as_deref()
            .ok_or(BuildError::MissingPointRobotData)?;
        let env = PointRobot::new(0, 0);
        let env_max_steps = env.max_episode_steps();
        // the PointRobot data is used as is: full file, unit cost scale
        let dataset = Dataset::load(path, &env, &load_options(config, 1.0, 1.0))?;
        (RunEnv::PointRobot(env), dataset, env_max_steps)
    } else {
        let env = CostLimit::new(
            registry::make(&config.env_name, config.seed)?,
            config.agent_kwargs.cost_limit,
        )?;
        let path = config.dataset_kwargs.benchmark_data_path(&config.env_name);
        let mut dataset = Dataset::load(
            &path,
            &env,
            &load_options(config, config.dataset_kwargs.cost_scale, config.ratio),
        )?;
        let env_max_steps = env.max_episode_steps();
        dataset.normalize_returns(
            env.max_episode_reward(),
            env.min_episode_reward(),
            env_max_steps,
        );
        (RunEnv::Benchmark(env), dataset, env_max_steps)
    };
    dataset.seed(config.seed);
    tracing::info!(
        env = %config.env_name,
        transitions = dataset.len(),
        env_max_steps,
        "Built environment and dataset"
    );
    if let (Some(rewards), Some(costs)) = (dataset.reward_stats(), dataset.cost_stats()) {
        tracing::info!(
            reward_mean = rewards.mean,
            reward_std = rewards.std_dev,
            reward_min = rewards.min,
            reward_max = rewards.max,
            cost_mean = costs.mean,
            cost_max = costs.max,
            "Dataset summary"
        );
    }
    Ok(Built {
        env,
        dataset,
        env_max_steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::DatasetKwargs,
        testing::{write_benchmark_data, write_point_robot_data},
    };

    #[test]
    fn test_benchmark_ratio_and_normalization() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("car_run.json");
        let file = write_benchmark_data(&path, "OfflineCarRun-v0", 2);

        let config = ExperimentConfig {
            env_name: "OfflineCarRun-v0".to_owned(),
            ratio: 0.5,
            dataset_kwargs: DatasetKwargs {
                data_location: Some(path),
                ..DatasetKwargs::default()
            },
            ..ExperimentConfig::default()
        };
        let built = build(&config).unwrap();
        assert_eq!(built.dataset.len(), file.len() / 2);
        assert_eq!(built.env_max_steps, 200);
        let RunEnv::Benchmark(env) = &built.env else {
            panic!("expected a benchmark environment");
        };
        assert_eq!(env.cost_limit(), config.agent_kwargs.cost_limit);

        // rewards are scaled by 200 / (160 - (-10))
        let factor = 200.0_f32 / 170.0;
        let first = &built.dataset.transitions()[0];
        assert!((first.reward - file.rewards[0] * factor).abs() < 1e-4);
        // hj critic: reachability cost labels
        assert!(built.dataset.transitions().iter().all(|t| t.cost == -1.0 || t.cost == 1.0));
    }

    #[test]
    fn test_non_positive_cost_limit_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("car_run.json");
        write_benchmark_data(&path, "OfflineCarRun-v0", 1);

        for cost_limit in [0.0, -5.0] {
            let mut config = ExperimentConfig {
                env_name: "OfflineCarRun-v0".to_owned(),
                dataset_kwargs: DatasetKwargs {
                    data_location: Some(path.clone()),
                    ..DatasetKwargs::default()
                },
                ..ExperimentConfig::default()
            };
            config.agent_kwargs.cost_limit = cost_limit;
            assert!(matches!(
                build(&config),
                Err(BuildError::Env(EnvError::InvalidCostLimit { .. }))
            ));
        }
    }

    #[test]
    fn test_unknown_benchmark_env() {
        let config = ExperimentConfig {
            env_name: "OfflineUnknown-v0".to_owned(),
            ..ExperimentConfig::default()
        };
        assert!(matches!(build(&config), Err(BuildError::Env(_))));
    }

    #[test]
    fn test_missing_benchmark_data() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExperimentConfig {
            env_name: "OfflineCarRun-v0".to_owned(),
            dataset_kwargs: DatasetKwargs {
                data_location: Some(dir.path().join("missing.json")),
                ..DatasetKwargs::default()
            },
            ..ExperimentConfig::default()
        };
        assert!(matches!(build(&config), Err(BuildError::Dataset(_))));
    }

    #[test]
    fn test_point_robot_requires_data() {
        let config = ExperimentConfig {
            env_name: POINT_ROBOT.to_owned(),
            ..ExperimentConfig::default()
        };
        assert!(matches!(
            build(&config),
            Err(BuildError::MissingPointRobotData)
        ));
    }

    #[test]
    fn test_point_robot_uses_full_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pr.json");
        let file = write_point_robot_data(&path, 4);

        let config = ExperimentConfig {
            env_name: POINT_ROBOT.to_owned(),
            ratio: 0.5,
            dataset_kwargs: DatasetKwargs {
                pr_data: Some(path),
                cost_scale: 25.0,
                ..DatasetKwargs::default()
            },
            ..ExperimentConfig::default()
        };
        let built = build(&config).unwrap();
        assert!(matches!(built.env, RunEnv::PointRobot(_)));
        assert_eq!(built.dataset.len(), file.len());
        assert_eq!(built.env_max_steps, fisor_env::point_robot::MAX_EPISODE_STEPS);
        // unit cost scale and unnormalized rewards
        assert!(built.dataset.transitions().iter().all(|t| t.cost == -1.0 || t.cost == 1.0));
        assert_eq!(built.dataset.transitions()[0].reward, file.rewards[0]);
    }
}
