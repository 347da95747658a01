//! Name-keyed agent construction.

use std::collections::BTreeMap;

use fisor_env::BoxSpace;
use serde_json::{Map, Value};

use crate::{Agent, fisor};

/// Everything a constructor needs to build an agent.
#[derive(Debug)]
pub struct AgentInit<'a> {
    pub seed: u64,
    pub observation_space: &'a BoxSpace,
    pub action_space: &'a BoxSpace,
    /// Model hyperparameters, with `model_cls` and `cost_scale` removed and
    /// `env_max_steps` inserted.
    pub kwargs: Map<String, Value>,
}

pub type AgentConstructor = fn(AgentInit<'_>) -> Result<Box<dyn Agent>, CreateAgentError>;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum CreateAgentError {
    #[display("agent kwargs have no model_cls")]
    MissingModelClass,
    #[display("model_cls must be a string, got {value}")]
    InvalidModelClass { value: Value },
    #[display("unknown model class '{name}'")]
    UnknownModel { name: String },
    #[display("invalid hyperparameters for {model}: {source}")]
    InvalidKwargs {
        model: &'static str,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct AgentRegistry {
    constructors: BTreeMap<String, AgentConstructor>,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(fisor::MODEL_NAME, fisor::Fisor::create);
        registry
    }
}

impl AgentRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    pub fn register<S>(&mut self, name: S, constructor: AgentConstructor)
    where
        S: Into<String>,
    {
        self.constructors.insert(name.into(), constructor);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Creates the agent selected by `kwargs["model_cls"]`.
    pub fn create(
        &self,
        seed: u64,
        observation_space: &BoxSpace,
        action_space: &BoxSpace,
        mut kwargs: Map<String, Value>,
        env_max_steps: usize,
    ) -> Result<Box<dyn Agent>, CreateAgentError> {
        let name = match kwargs.remove("model_cls") {
            Some(Value::String(name)) => name,
            Some(value) => return Err(CreateAgentError::InvalidModelClass { value }),
            None => return Err(CreateAgentError::MissingModelClass),
        };
        kwargs.remove("cost_scale");
        kwargs.insert("env_max_steps".to_owned(), env_max_steps.into());

        let constructor = self
            .constructors
            .get(&name)
            .ok_or_else(|| CreateAgentError::UnknownModel { name: name.clone() })?;
        tracing::info!(model = %name, seed, "Creating agent");
        constructor(AgentInit {
            seed,
            observation_space,
            action_space,
            kwargs,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{Fisor, fisor::SamplingMethod};

    fn kwargs(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn spaces() -> (BoxSpace, BoxSpace) {
        (BoxSpace::uniform(3, -1.0, 1.0), BoxSpace::uniform(2, -1.0, 1.0))
    }

    #[test]
    fn test_default_registers_fisor() {
        let registry = AgentRegistry::default();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["FISOR"]);
    }

    #[test]
    fn test_create_fisor() {
        let (obs, act) = spaces();
        let agent = AgentRegistry::default()
            .create(
                0,
                &obs,
                &act,
                kwargs(json!({
                    "model_cls": "FISOR",
                    "cost_scale": 25,
                    "N": 8,
                    "sampling_method": "ddim",
                })),
                500,
            )
            .unwrap();
        assert_eq!(agent.model_name(), "FISOR");

        let dir = tempfile::tempdir().unwrap();
        let path = agent.save(dir.path(), 1).unwrap();
        let fisor = Fisor::load(path).unwrap();
        assert_eq!(fisor.config().n, 8);
        assert_eq!(fisor.config().env_max_steps, 500);
        assert_eq!(fisor.config().sampling_method, SamplingMethod::Ddim);
    }

    #[test]
    fn test_unknown_model() {
        let (obs, act) = spaces();
        let err = AgentRegistry::default()
            .create(0, &obs, &act, kwargs(json!({"model_cls": "CPQ"})), 100)
            .unwrap_err();
        assert!(matches!(err, CreateAgentError::UnknownModel { name } if name == "CPQ"));
    }

    #[test]
    fn test_missing_model_class() {
        let (obs, act) = spaces();
        let err = AgentRegistry::default()
            .create(0, &obs, &act, Map::new(), 100)
            .unwrap_err();
        assert!(matches!(err, CreateAgentError::MissingModelClass));
    }

    #[test]
    fn test_invalid_hyperparameter_type() {
        let (obs, act) = spaces();
        let err = AgentRegistry::default()
            .create(
                0,
                &obs,
                &act,
                kwargs(json!({"model_cls": "FISOR", "critic_type": "td3"})),
                100,
            )
            .unwrap_err();
        assert!(matches!(err, CreateAgentError::InvalidKwargs { model: "FISOR", .. }));
    }
}
