//! Experiment configuration: loading, override resolution and the run directory.
//!
//! A run starts from a hyperparameter file (YAML or JSON) and a small set of
//! command-line [`Overrides`]. [`resolve`] derives the environment name, the
//! tracking group and a unique experiment name, and applies the fixed
//! PointRobot settings. The result is treated as immutable afterwards.
//!
//! [`prepare_run_dir`] creates `<results>/<group>/<experiment_name>` and writes
//! the resolved configuration to `config.json` there.

use std::{
    fs::{self, File},
    io::{self, BufWriter, Write as _},
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use fisor_agent::{ActorObjective, CriticType, ExtractMethod, SamplingMethod};
use fisor_env::{POINT_ROBOT, registry};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, ser::PrettyFormatter};

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_RESULTS_DIR: &str = "results";

/// Upper bound (inclusive) of the random experiment-name suffix.
const NAME_SUFFIX_MAX: u32 = 1000;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[display("failed to parse {}: {source}", path.display())]
    ParseYaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[display("failed to parse {}: {source}", path.display())]
    ParseJson {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("environment index {env_id} is out of range (0..{})", registry::ENV_LIST.len())]
    UnknownEnvId { env_id: usize },
    #[display("No data for Point Robot")]
    MissingPointRobotData,
    #[display("{field} must be positive")]
    NotPositive { field: &'static str },
    #[display("ratio must be in (0, 1], got {ratio}")]
    InvalidRatio { ratio: f64 },
    #[display("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[display("failed to serialize configuration: {source}")]
    Serialize { source: serde_json::Error },
}

/// Fully resolved experiment settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub project: String,
    pub env_name: String,
    pub group: String,
    pub experiment_name: String,
    /// Leading fraction of the benchmark dataset to train on.
    pub ratio: f64,
    pub seed: u64,
    pub max_steps: usize,
    pub batch_size: usize,
    pub log_interval: usize,
    pub eval_interval: usize,
    pub eval_episodes: usize,
    pub agent_kwargs: AgentKwargs,
    pub dataset_kwargs: DatasetKwargs,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            project: String::new(),
            env_name: String::new(),
            group: String::new(),
            experiment_name: String::new(),
            ratio: 1.0,
            seed: 0,
            max_steps: 1_000_000,
            batch_size: 2048,
            log_interval: 1000,
            eval_interval: 250_000,
            eval_episodes: 20,
            agent_kwargs: AgentKwargs::default(),
            dataset_kwargs: DatasetKwargs::default(),
        }
    }
}

/// Agent hyperparameters.
///
/// The keys the driver itself reads are typed; everything else is kept in
/// `extra` and handed to the agent constructor unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentKwargs {
    pub model_cls: String,
    pub cost_limit: f64,
    pub cost_scale: f64,
    pub critic_type: CriticType,
    pub sampling_method: SamplingMethod,
    pub actor_objective: ActorObjective,
    pub extract_method: ExtractMethod,
    #[serde(rename = "N")]
    pub n: usize,
    pub cost_temperature: f64,
    pub reward_temperature: f64,
    pub cost_ub: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for AgentKwargs {
    fn default() -> Self {
        Self {
            model_cls: "FISOR".to_owned(),
            cost_limit: 10.0,
            cost_scale: 1.0,
            critic_type: CriticType::default(),
            sampling_method: SamplingMethod::default(),
            actor_objective: ActorObjective::default(),
            extract_method: ExtractMethod::default(),
            n: 16,
            cost_temperature: 5.0,
            reward_temperature: 3.0,
            cost_ub: 150.0,
            extra: Map::new(),
        }
    }
}

impl AgentKwargs {
    /// Flattens the hyperparameters into the key/value map agents are built from.
    pub fn to_map(&self) -> Result<Map<String, Value>, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(serde::ser::Error::custom(format!(
                "agent kwargs must be a map, got {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetKwargs {
    pub cost_scale: f64,
    /// Dataset file of the PointRobot task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_data: Option<PathBuf>,
    /// Dataset file of a benchmark task; `data/<env_name>.json` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_location: Option<PathBuf>,
    pub clip_to_eps: bool,
    pub eps: f64,
}

impl Default for DatasetKwargs {
    fn default() -> Self {
        Self {
            cost_scale: 1.0,
            pr_data: None,
            data_location: None,
            clip_to_eps: true,
            eps: 1e-5,
        }
    }
}

impl DatasetKwargs {
    #[must_use]
    pub fn benchmark_data_path(&self, env_name: &str) -> PathBuf {
        self.data_location
            .clone()
            .unwrap_or_else(|| Path::new("data").join(format!("{env_name}.json")))
    }
}

/// Command-line values that take precedence over the configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct Overrides {
    pub env_id: usize,
    pub ratio: f64,
    /// Replaces the project when non-empty.
    pub project: String,
    /// Replaces the generated experiment name when non-empty.
    pub experiment_name: String,
}

impl Default for Overrides {
    fn default() -> Self {
        Self {
            env_id: 30,
            ratio: 1.0,
            project: String::new(),
            experiment_name: String::new(),
        }
    }
}

/// Reads a configuration file, choosing the parser by extension.
///
/// `.json` files are parsed as JSON, everything else as YAML.
pub fn load_config<P>(path: P) -> Result<ExperimentConfig, ConfigError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_owned(),
        source,
    })?;
    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&text).map_err(|source| ConfigError::ParseJson {
            path: path.to_owned(),
            source,
        })
    } else {
        serde_yaml::from_str(&text).map_err(|source| ConfigError::ParseYaml {
            path: path.to_owned(),
            source,
        })
    }
}

pub fn env_name_for(env_id: usize) -> Result<&'static str, ConfigError> {
    registry::env_name(env_id).ok_or(ConfigError::UnknownEnvId { env_id })
}

/// `{sampling_method}_{actor_objective}_{critic_type}_N{N}_{extract_method}`
#[must_use]
pub fn default_experiment_name(kwargs: &AgentKwargs) -> String {
    format!(
        "{}_{}_{}_N{}_{}",
        kwargs.sampling_method,
        kwargs.actor_objective,
        kwargs.critic_type,
        kwargs.n,
        kwargs.extract_method
    )
}

/// Applies the overrides to `base` and derives the per-run fields.
///
/// `today` and `rng` feed the unique experiment-name suffix.
pub fn resolve<R>(
    mut base: ExperimentConfig,
    overrides: &Overrides,
    today: NaiveDate,
    rng: &mut R,
) -> Result<ExperimentConfig, ConfigError>
where
    R: Rng + ?Sized,
{
    if !overrides.project.is_empty() {
        base.project.clone_from(&overrides.project);
    }
    base.env_name = env_name_for(overrides.env_id)?.to_owned();
    base.ratio = overrides.ratio;
    base.group.clone_from(&base.env_name);

    let name = if overrides.experiment_name.is_empty() {
        default_experiment_name(&base.agent_kwargs)
    } else {
        overrides.experiment_name.clone()
    };
    let suffix = rng.random_range(0..=NAME_SUFFIX_MAX);
    base.experiment_name = format!(
        "{name}_{}_s{}_{suffix}",
        today.format("%Y-%m-%d"),
        base.seed
    );

    if base.env_name == POINT_ROBOT {
        apply_point_robot_overrides(&mut base);
        if base.dataset_kwargs.pr_data.is_none() {
            return Err(ConfigError::MissingPointRobotData);
        }
    }
    base.agent_kwargs.cost_scale = base.dataset_kwargs.cost_scale;

    validate(&base)?;
    tracing::info!(config = ?base, "Resolved experiment configuration");
    Ok(base)
}

fn apply_point_robot_overrides(config: &mut ExperimentConfig) {
    config.max_steps = 500;
    config.batch_size = 1024;
    config.eval_interval = 100;
    config.agent_kwargs.cost_temperature = 2.0;
    config.agent_kwargs.reward_temperature = 5.0;
    config.agent_kwargs.cost_ub = 150.0;
    config.agent_kwargs.n = 8;
}

fn validate(config: &ExperimentConfig) -> Result<(), ConfigError> {
    for (field, value) in [
        ("batch_size", config.batch_size),
        ("log_interval", config.log_interval),
        ("eval_interval", config.eval_interval),
        ("eval_episodes", config.eval_episodes),
    ] {
        if value == 0 {
            return Err(ConfigError::NotPositive { field });
        }
    }
    if config.agent_kwargs.cost_limit <= 0.0 {
        return Err(ConfigError::NotPositive {
            field: "agent_kwargs.cost_limit",
        });
    }
    if !(config.ratio > 0.0 && config.ratio <= 1.0) {
        return Err(ConfigError::InvalidRatio {
            ratio: config.ratio,
        });
    }
    Ok(())
}

/// Output directory of a resolved run: `<results_root>/<group>/<experiment_name>`.
#[must_use]
pub fn run_dir(results_root: &Path, config: &ExperimentConfig) -> PathBuf {
    results_root
        .join(&config.group)
        .join(&config.experiment_name)
}

/// Creates the run directory and writes `config.json` into it.
pub fn prepare_run_dir(
    results_root: &Path,
    config: &ExperimentConfig,
) -> Result<PathBuf, ConfigError> {
    let dir = run_dir(results_root, config);
    fs::create_dir_all(&dir).map_err(|source| ConfigError::Write {
        path: dir.clone(),
        source,
    })?;

    let path = dir.join(CONFIG_FILE_NAME);
    let write_err = |source| ConfigError::Write {
        path: path.clone(),
        source,
    };
    let file = File::create(&path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    let mut ser =
        serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    config
        .serialize(&mut ser)
        .map_err(|source| ConfigError::Serialize { source })?;
    writer.flush().map_err(write_err)?;

    tracing::info!(dir = %dir.display(), "Prepared run directory");
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64;

    use super::*;

    const POINT_ROBOT_ID: usize = 38;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    fn base() -> ExperimentConfig {
        ExperimentConfig {
            seed: 7,
            dataset_kwargs: DatasetKwargs {
                cost_scale: 25.0,
                pr_data: Some(PathBuf::from("data/point_robot.json")),
                ..DatasetKwargs::default()
            },
            ..ExperimentConfig::default()
        }
    }

    fn resolve_with(base: ExperimentConfig, overrides: &Overrides) -> ExperimentConfig {
        resolve(base, overrides, today(), &mut Pcg64::seed_from_u64(0)).unwrap()
    }

    #[test]
    fn test_every_index_maps_into_env_list() {
        for id in 0..registry::ENV_LIST.len() {
            let name = env_name_for(id).unwrap();
            assert!(registry::ENV_LIST.contains(&name));
            assert_eq!(env_name_for(id).unwrap(), name);
        }
        assert!(matches!(
            env_name_for(registry::ENV_LIST.len()),
            Err(ConfigError::UnknownEnvId { env_id: 39 })
        ));
        assert_eq!(env_name_for(POINT_ROBOT_ID).unwrap(), POINT_ROBOT);
    }

    #[test]
    fn test_generated_experiment_name() {
        let config = resolve_with(base(), &Overrides::default());
        assert_eq!(config.env_name, "OfflineMetadrive-easymean-v0");
        assert_eq!(config.group, config.env_name);
        let prefix = "ddpm_feasibility_hj_N16_minqc_2024-05-17_s7_";
        assert!(config.experiment_name.starts_with(prefix), "{}", config.experiment_name);
        let suffix: u32 = config.experiment_name[prefix.len()..].parse().unwrap();
        assert!(suffix <= NAME_SUFFIX_MAX);
    }

    #[test]
    fn test_explicit_name_and_project() {
        let overrides = Overrides {
            env_id: 7,
            ratio: 0.5,
            project: "safe-rl".to_owned(),
            experiment_name: "ablation".to_owned(),
        };
        let config = resolve_with(base(), &overrides);
        assert_eq!(config.project, "safe-rl");
        assert_eq!(config.ratio, 0.5);
        assert_eq!(config.env_name, "OfflineCarRun-v0");
        assert!(config.experiment_name.starts_with("ablation_2024-05-17_s7_"));
    }

    #[test]
    fn test_empty_project_keeps_file_value() {
        let config = resolve_with(
            ExperimentConfig {
                project: "from-file".to_owned(),
                ..base()
            },
            &Overrides::default(),
        );
        assert_eq!(config.project, "from-file");
    }

    #[test]
    fn test_point_robot_overrides_are_idempotent() {
        let overrides = Overrides {
            env_id: POINT_ROBOT_ID,
            ..Overrides::default()
        };
        let mut input = base();
        input.max_steps = 123;
        input.agent_kwargs.n = 32;
        let a = resolve(input.clone(), &overrides, today(), &mut Pcg64::seed_from_u64(1)).unwrap();
        let b = resolve(input, &overrides, today(), &mut Pcg64::seed_from_u64(2)).unwrap();

        assert_eq!(a.max_steps, 500);
        assert_eq!(a.batch_size, 1024);
        assert_eq!(a.eval_interval, 100);
        assert_eq!(a.agent_kwargs.cost_temperature, 2.0);
        assert_eq!(a.agent_kwargs.reward_temperature, 5.0);
        assert_eq!(a.agent_kwargs.cost_ub, 150.0);
        assert_eq!(a.agent_kwargs.n, 8);
        // the name is derived before the overrides
        assert!(a.experiment_name.starts_with("ddpm_feasibility_hj_N32_minqc_"));

        let strip = |mut c: ExperimentConfig| {
            c.experiment_name.clear();
            c
        };
        assert_eq!(strip(a), strip(b));
    }

    #[test]
    fn test_point_robot_requires_data() {
        let mut input = base();
        input.dataset_kwargs.pr_data = None;
        let overrides = Overrides {
            env_id: POINT_ROBOT_ID,
            ..Overrides::default()
        };
        let err = resolve(input, &overrides, today(), &mut Pcg64::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingPointRobotData));
        assert_eq!(err.to_string(), "No data for Point Robot");
    }

    #[test]
    fn test_cost_scale_synced_into_agent_kwargs() {
        let config = resolve_with(base(), &Overrides::default());
        assert_eq!(config.agent_kwargs.cost_scale, 25.0);
    }

    #[test]
    fn test_invalid_ratio() {
        let overrides = Overrides {
            ratio: 0.0,
            ..Overrides::default()
        };
        let err = resolve(base(), &overrides, today(), &mut Pcg64::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRatio { .. }));
    }

    #[test]
    fn test_load_yaml_keeps_extra_kwargs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fisor.yaml");
        let yaml = "\
seed: 3
max_steps: 1000
agent_kwargs:
  model_cls: FISOR
  critic_type: qc
  N: 4
  actor_lr: 0.001
  decay_steps: 500
dataset_kwargs:
  cost_scale: 25
";
        fs::write(&path, yaml).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.seed, 3);
        assert_eq!(config.agent_kwargs.critic_type, CriticType::Qc);
        assert_eq!(config.agent_kwargs.n, 4);
        assert_eq!(config.agent_kwargs.extra.get("actor_lr"), Some(&Value::from(0.001)));
        assert_eq!(config.agent_kwargs.extra.get("decay_steps"), Some(&Value::from(500)));
        assert_eq!(config.dataset_kwargs.cost_scale, 25.0);

        let map = config.agent_kwargs.to_map().unwrap();
        assert_eq!(map.get("N"), Some(&Value::from(4)));
        assert_eq!(map.get("critic_type"), Some(&Value::from("qc")));
        assert_eq!(map.get("actor_lr"), Some(&Value::from(0.001)));
    }

    #[test]
    fn test_load_json_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fisor.json");
        fs::write(&path, r#"{"seed": 11, "eval_episodes": 5}"#).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.seed, 11);
        assert_eq!(config.eval_episodes, 5);
    }

    #[test]
    fn test_run_dir_written_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut input = base();
        input.agent_kwargs.extra.insert("actor_lr".to_owned(), Value::from(3e-4));
        let config = resolve_with(input, &Overrides::default());

        let run = prepare_run_dir(dir.path(), &config).unwrap();
        assert_eq!(run, dir.path().join(&config.group).join(&config.experiment_name));

        let text = fs::read_to_string(run.join(CONFIG_FILE_NAME)).unwrap();
        assert!(text.contains("\n    \"project\""));
        assert_eq!(load_config(run.join(CONFIG_FILE_NAME)).unwrap(), config);

        // re-preparing an existing directory is fine
        prepare_run_dir(dir.path(), &config).unwrap();
    }
}
