//! FISOR: feasibility-guided safe offline RL.
//!
//! The agent learns four value functions and one policy from a fixed dataset:
//!
//! | model          | input  | target                                                   |
//! |----------------|--------|----------------------------------------------------------|
//! | `critic`       | `(s,a)`| `r + γ · mask · V(s')`                                   |
//! | `value`        | `s`    | upper expectile of `Q(s,a)` over dataset actions          |
//! | `cost_critic`  | `(s,a)`| HJ: `(1-γ)c + γ·max(c, Vc(s'))`, QC: `c + γ·mask·Vc(s')`  |
//! | `cost_value`   | `s`    | expectile of `Qc(s,a)` over dataset actions              |
//! | `actor`        | `s`    | weighted behavior cloning                                |
//!
//! # Feasibility-guided actor
//!
//! With the `feasibility` objective every dataset action is weighted by the
//! region its state falls into:
//!
//! ```text
//! infeasible (Vc(s) > threshold):
//!     w = min(exp((Vc - Qc) · cost_temperature), cost_ub)
//! feasible (Vc(s) <= threshold and Qc(s,a) <= threshold):
//!     w = min(exp((Q - V) · reward_temperature), MAX_REWARD_WEIGHT)
//! otherwise:
//!     w = 0
//! ```
//!
//! In the infeasible region the actor imitates actions that reduce the
//! constraint violation the most; in the feasible region it imitates
//! high-advantage actions that keep the state feasible. The `bc` objective sets
//! every weight to 1.
//!
//! # Action extraction
//!
//! At evaluation time `N` candidates are drawn around the actor mean and one
//! is picked by [`ExtractMethod`].
//!
//! # Current Limitations
//!
//! - **Linear models**: all heads are linear in hand-built features, so the
//!   feasible region is approximated by a half-space
//! - **No target networks**: critics bootstrap from the current value heads
//! - **Gaussian candidates**: candidate actions come from a fixed-width
//!   Gaussian around the actor mean rather than a generative policy

use std::path::{Path, PathBuf};

use fisor_dataset::Batch;
use fisor_env::BoxSpace;
use rand::SeedableRng as _;
use rand_distr::{Distribution as _, StandardNormal};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::{
    Agent, CheckpointError, Record, checkpoint,
    linear::{
        Gradient, LinearModel, state_action_feature_dim, state_action_features, state_feature_dim,
        state_features,
    },
    registry::{AgentInit, CreateAgentError},
};

pub const MODEL_NAME: &str = "FISOR";

/// Upper clip of the feasible-region advantage weights.
const MAX_REWARD_WEIGHT: f32 = 100.0;
/// Per-sample TD errors are clipped to this magnitude (Huber gradient).
const ERROR_CLIP: f32 = 1.0;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum CriticType {
    /// Hamilton-Jacobi reachability cost critic.
    #[default]
    #[display("hj")]
    Hj,
    /// Discounted cumulative cost critic.
    #[display("qc")]
    Qc,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum ActorObjective {
    #[default]
    #[display("feasibility")]
    Feasibility,
    #[display("bc")]
    Bc,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum SamplingMethod {
    /// Every candidate gets full-width noise.
    #[default]
    #[display("ddpm")]
    Ddpm,
    /// Noise width grows linearly with the candidate index; candidate 0 is the mean.
    #[display("ddim")]
    Ddim,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum ExtractMethod {
    /// Candidate with the highest reward critic value.
    #[display("maxq")]
    Maxq,
    /// Candidate with the lowest cost critic value.
    #[default]
    #[display("minqc")]
    Minqc,
}

/// FISOR hyperparameters.
///
/// Unknown keys are ignored so that the whole `agent_kwargs` map of an
/// experiment configuration can be deserialized into this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FisorConfig {
    pub actor_lr: f32,
    pub critic_lr: f32,
    pub value_lr: f32,
    pub discount: f32,
    /// Expectile of the reward value function.
    pub critic_hyperparam: f32,
    /// Expectile of the cost value function.
    pub cost_critic_hyperparam: f32,
    pub critic_type: CriticType,
    pub actor_objective: ActorObjective,
    pub sampling_method: SamplingMethod,
    pub extract_method: ExtractMethod,
    pub cost_temperature: f32,
    pub reward_temperature: f32,
    pub cost_ub: f32,
    pub cost_limit: f32,
    /// Number of candidate actions drawn at evaluation.
    #[serde(rename = "N")]
    pub n: usize,
    /// Standard deviation of candidate noise.
    pub actor_noise: f32,
    pub env_max_steps: usize,
}

impl Default for FisorConfig {
    fn default() -> Self {
        Self {
            actor_lr: 3e-4,
            critic_lr: 3e-4,
            value_lr: 3e-4,
            discount: 0.99,
            critic_hyperparam: 0.9,
            cost_critic_hyperparam: 0.9,
            critic_type: CriticType::Hj,
            actor_objective: ActorObjective::Feasibility,
            sampling_method: SamplingMethod::Ddpm,
            extract_method: ExtractMethod::Minqc,
            cost_temperature: 5.0,
            reward_temperature: 3.0,
            cost_ub: 150.0,
            cost_limit: 10.0,
            n: 16,
            actor_noise: 0.2,
            env_max_steps: 1000,
        }
    }
}

impl FisorConfig {
    /// Cost level separating feasible from infeasible states.
    fn feasibility_threshold(&self) -> f32 {
        match self.critic_type {
            CriticType::Hj => 0.0,
            CriticType::Qc => self.cost_limit,
        }
    }
}

fn fresh_rng() -> Pcg64 {
    Pcg64::seed_from_u64(0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fisor {
    config: FisorConfig,
    observation_space: BoxSpace,
    action_space: BoxSpace,
    actor: LinearModel,
    critic: LinearModel,
    value: LinearModel,
    cost_critic: LinearModel,
    cost_value: LinearModel,
    updates: u64,
    #[serde(skip, default = "fresh_rng")]
    rng: Pcg64,
}

impl Fisor {
    #[must_use]
    pub fn new(
        seed: u64,
        observation_space: BoxSpace,
        action_space: BoxSpace,
        config: FisorConfig,
    ) -> Self {
        let obs_dim = observation_space.dim();
        let act_dim = action_space.dim();
        let s_dim = state_feature_dim(obs_dim);
        let sa_dim = state_action_feature_dim(obs_dim, act_dim);
        Self {
            config,
            observation_space,
            action_space,
            actor: LinearModel::zeros(s_dim, act_dim),
            critic: LinearModel::zeros(sa_dim, 1),
            value: LinearModel::zeros(s_dim, 1),
            cost_critic: LinearModel::zeros(sa_dim, 1),
            cost_value: LinearModel::zeros(s_dim, 1),
            updates: 0,
            rng: Pcg64::seed_from_u64(seed),
        }
    }

    /// Registry constructor: parses the hyperparameter map into a [`FisorConfig`].
    pub fn create(init: AgentInit<'_>) -> Result<Box<dyn Agent>, CreateAgentError> {
        let config: FisorConfig = serde_json::from_value(init.kwargs.into()).map_err(|source| {
            CreateAgentError::InvalidKwargs {
                model: MODEL_NAME,
                source,
            }
        })?;
        tracing::debug!(?config, "Creating FISOR agent");
        Ok(Box::new(Self::new(
            init.seed,
            init.observation_space.clone(),
            init.action_space.clone(),
            config,
        )))
    }

    pub fn load<P>(path: P) -> Result<Self, CheckpointError>
    where
        P: AsRef<Path>,
    {
        checkpoint::read_json(path.as_ref())
    }

    #[must_use]
    pub fn config(&self) -> &FisorConfig {
        &self.config
    }

    #[must_use]
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Deterministic actor output, clipped to the action space.
    #[must_use]
    pub fn mean_action(&self, observation: &[f32]) -> Vec<f32> {
        let mut action = self.actor.predict(&state_features(observation));
        self.action_space.clip(&mut action);
        action
    }

    #[must_use]
    pub fn q_value(&self, observation: &[f32], action: &[f32]) -> f32 {
        self.critic
            .predict_scalar(&state_action_features(observation, action))
    }

    #[must_use]
    pub fn cost_q_value(&self, observation: &[f32], action: &[f32]) -> f32 {
        self.cost_critic
            .predict_scalar(&state_action_features(observation, action))
    }

    fn actor_weight(&self, q: f32, v: f32, qc: f32, vc: f32) -> f32 {
        let config = &self.config;
        match config.actor_objective {
            ActorObjective::Bc => 1.0,
            ActorObjective::Feasibility => {
                let threshold = config.feasibility_threshold();
                if vc > threshold {
                    ((vc - qc) * config.cost_temperature)
                        .exp()
                        .min(config.cost_ub)
                } else if qc <= threshold {
                    ((q - v) * config.reward_temperature)
                        .exp()
                        .min(MAX_REWARD_WEIGHT)
                } else {
                    0.0
                }
            }
        }
    }

    fn cost_target(&self, cost: f32, mask: f32, next_vc: f32) -> f32 {
        let gamma = self.config.discount;
        match self.config.critic_type {
            CriticType::Hj => {
                if mask == 0.0 {
                    cost
                } else {
                    (1.0 - gamma) * cost + gamma * cost.max(next_vc)
                }
            }
            CriticType::Qc => cost + gamma * mask * next_vc,
        }
    }

    fn candidates(&mut self, mean: &[f32]) -> Vec<Vec<f32>> {
        let n = self.config.n.max(1);
        #[expect(clippy::cast_precision_loss)]
        let scale = |i: usize| match self.config.sampling_method {
            SamplingMethod::Ddpm => 1.0,
            SamplingMethod::Ddim => i as f32 / n as f32,
        };
        (0..n)
            .map(|i| {
                let width = self.config.actor_noise * scale(i);
                let mut action = mean
                    .iter()
                    .map(|m| {
                        let eps: f32 = StandardNormal.sample(&mut self.rng);
                        m + width * eps
                    })
                    .collect::<Vec<_>>();
                self.action_space.clip(&mut action);
                action
            })
            .collect()
    }
}

/// Expectile regression weight `|τ - 1(u < 0)|`.
fn expectile_weight(diff: f32, expectile: f32) -> f32 {
    if diff < 0.0 { 1.0 - expectile } else { expectile }
}

#[derive(Debug, Default)]
struct UpdateStats {
    critic_loss: f64,
    value_loss: f64,
    cost_critic_loss: f64,
    cost_value_loss: f64,
    actor_loss: f64,
    q: f64,
    v: f64,
    qc: f64,
    vc: f64,
    weight: f64,
    unsafe_count: usize,
    feasible_count: usize,
}

impl Agent for Fisor {
    fn model_name(&self) -> &'static str {
        MODEL_NAME
    }

    #[expect(clippy::cast_precision_loss)]
    fn update(&mut self, batch: &Batch<'_>) -> Record {
        let mut g_critic = Gradient::for_model(&self.critic);
        let mut g_value = Gradient::for_model(&self.value);
        let mut g_cost_critic = Gradient::for_model(&self.cost_critic);
        let mut g_cost_value = Gradient::for_model(&self.cost_value);
        let mut g_actor = Gradient::for_model(&self.actor);
        let mut stats = UpdateStats::default();
        let mut action_sum = vec![0.0_f64; self.action_space.dim()];
        let threshold = self.config.feasibility_threshold();
        let gamma = self.config.discount;

        for t in batch.iter() {
            let s = state_features(&t.observation);
            let s_next = state_features(&t.next_observation);
            let sa = state_action_features(&t.observation, &t.action);

            let q = self.critic.predict_scalar(&sa);
            let v = self.value.predict_scalar(&s);
            let next_v = self.value.predict_scalar(&s_next);
            let qc = self.cost_critic.predict_scalar(&sa);
            let vc = self.cost_value.predict_scalar(&s);
            let next_vc = self.cost_value.predict_scalar(&s_next);

            // reward critic
            let td = q - (t.reward + gamma * t.mask * next_v);
            g_critic.accumulate(&[td.clamp(-ERROR_CLIP, ERROR_CLIP)], &sa);
            stats.critic_loss += f64::from(td * td);

            // reward value
            let u = q - v;
            let w = expectile_weight(u, self.config.critic_hyperparam);
            g_value.accumulate(&[-w * u.clamp(-ERROR_CLIP, ERROR_CLIP)], &s);
            stats.value_loss += f64::from(w * u * u);

            // cost critic
            let td_c = qc - self.cost_target(t.cost, t.mask, next_vc);
            g_cost_critic.accumulate(&[td_c.clamp(-ERROR_CLIP, ERROR_CLIP)], &sa);
            stats.cost_critic_loss += f64::from(td_c * td_c);

            // cost value
            let u_c = qc - vc;
            let w_c = expectile_weight(u_c, self.config.cost_critic_hyperparam);
            g_cost_value.accumulate(&[-w_c * u_c.clamp(-ERROR_CLIP, ERROR_CLIP)], &s);
            stats.cost_value_loss += f64::from(w_c * u_c * u_c);

            // actor
            let weight = self.actor_weight(q, v, qc, vc);
            let mean = self.actor.predict(&s);
            let diff = mean
                .iter()
                .zip(&t.action)
                .map(|(m, a)| m - a)
                .collect::<Vec<_>>();
            let d_out = diff.iter().map(|d| weight * d).collect::<Vec<_>>();
            g_actor.accumulate(&d_out, &s);
            stats.actor_loss += f64::from(weight * diff.iter().map(|d| d * d).sum::<f32>());

            for (sum, m) in action_sum.iter_mut().zip(&mean) {
                *sum += f64::from(*m);
            }
            stats.q += f64::from(q);
            stats.v += f64::from(v);
            stats.qc += f64::from(qc);
            stats.vc += f64::from(vc);
            stats.weight += f64::from(weight);
            if vc > threshold {
                stats.unsafe_count += 1;
            } else if qc <= threshold {
                stats.feasible_count += 1;
            }
        }

        let n = batch.len().max(1);
        let inv = 1.0 / n as f32;
        for g in [
            &mut g_critic,
            &mut g_value,
            &mut g_cost_critic,
            &mut g_cost_value,
            &mut g_actor,
        ] {
            g.scale(inv);
        }
        self.critic.apply_gradient(&g_critic, self.config.critic_lr);
        self.value.apply_gradient(&g_value, self.config.value_lr);
        self.cost_critic
            .apply_gradient(&g_cost_critic, self.config.critic_lr);
        self.cost_value
            .apply_gradient(&g_cost_value, self.config.value_lr);
        self.actor.apply_gradient(&g_actor, self.config.actor_lr);
        self.updates += 1;

        let n = n as f64;
        let mut record = Record::new();
        record.insert("critic_loss", stats.critic_loss / n);
        record.insert("value_loss", stats.value_loss / n);
        record.insert("cost_critic_loss", stats.cost_critic_loss / n);
        record.insert("cost_value_loss", stats.cost_value_loss / n);
        record.insert("actor_loss", stats.actor_loss / n);
        record.insert("q", stats.q / n);
        record.insert("v", stats.v / n);
        record.insert("qc", stats.qc / n);
        record.insert("vc", stats.vc / n);
        record.insert("weights", stats.weight / n);
        record.insert("unsafe_ratio", stats.unsafe_count as f64 / n);
        record.insert("feasible_ratio", stats.feasible_count as f64 / n);
        record.insert(
            "actor_mean",
            action_sum.into_iter().map(|s| s / n).collect::<Vec<_>>(),
        );
        record
    }

    fn eval_action(&mut self, observation: &[f32]) -> Vec<f32> {
        let mean = self.mean_action(observation);
        if self.config.n <= 1 {
            return mean;
        }
        let candidates = self.candidates(&mean);
        let scored = candidates.into_iter().map(|action| {
            let score = match self.config.extract_method {
                ExtractMethod::Maxq => self.q_value(observation, &action),
                ExtractMethod::Minqc => -self.cost_q_value(observation, &action),
            };
            (score, action)
        });
        scored
            .max_by(|(a, _), (b, _)| a.total_cmp(b))
            .map_or(mean, |(_, action)| action)
    }

    fn save(&self, dir: &Path, version: usize) -> Result<PathBuf, CheckpointError> {
        let path = checkpoint::path_for(dir, version);
        checkpoint::write_json(&path, self)?;
        Ok(path)
    }
}
