use std::path::Path;

use fisor_env::Environment;
use fisor_stats::descriptive::DescriptiveStats;
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg64;

use crate::{DatasetError, DatasetFile};

/// Distance above which consecutive rows are treated as different trajectories.
const DISCONTINUITY_EPS: f32 = 1e-6;

/// How raw per-step costs are relabeled for the cost critic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CostTransform {
    /// Reachability labels: `scale` for violating steps, `-1` otherwise.
    Reachability { scale: f32 },
    /// Costs multiplied by `scale`.
    Scaled { scale: f32 },
}

impl CostTransform {
    #[must_use]
    pub fn apply(self, cost: f32) -> f32 {
        match self {
            Self::Reachability { scale } => {
                if cost > 0.0 {
                    scale
                } else {
                    -1.0
                }
            }
            Self::Scaled { scale } => cost * scale,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Leading fraction of the transitions to keep, in `(0, 1]`.
    pub ratio: f64,
    pub cost_transform: CostTransform,
    pub clip_to_eps: bool,
    pub eps: f32,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            ratio: 1.0,
            cost_transform: CostTransform::Scaled { scale: 1.0 },
            clip_to_eps: true,
            eps: 1e-5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub observation: Vec<f32>,
    pub action: Vec<f32>,
    pub reward: f32,
    pub cost: f32,
    pub next_observation: Vec<f32>,
    /// `0.0` when the transition ends in a terminal state, `1.0` otherwise.
    pub mask: f32,
    /// Last transition of a trajectory.
    pub done: bool,
}

/// A batch of transitions borrowed from a [`Dataset`].
#[derive(Debug, Clone)]
pub struct Batch<'a> {
    transitions: Vec<&'a Transition>,
}

impl<'a> Batch<'a> {
    #[must_use]
    pub fn new(transitions: Vec<&'a Transition>) -> Self {
        Self { transitions }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Transition> + '_ {
        self.transitions.iter().copied()
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    transitions: Vec<Transition>,
    rng: Pcg64,
}

impl Dataset {
    /// Loads and preprocesses the dataset file at `path` for `env`.
    pub fn load<P, E>(path: P, env: &E, options: &LoadOptions) -> Result<Self, DatasetError>
    where
        P: AsRef<Path>,
        E: Environment + ?Sized,
    {
        let path = path.as_ref();
        let file = DatasetFile::load(path)?;
        let dataset = Self::from_file(
            file,
            env.observation_space().dim(),
            env.action_space().dim(),
            options,
        )?;
        tracing::info!(
            path = %path.display(),
            transitions = dataset.len(),
            ratio = options.ratio,
            "Loaded dataset"
        );
        Ok(dataset)
    }

    pub fn from_file(
        mut file: DatasetFile,
        observation_dim: usize,
        action_dim: usize,
        options: &LoadOptions,
    ) -> Result<Self, DatasetError> {
        file.validate(observation_dim, action_dim)?;
        if !(options.ratio > 0.0 && options.ratio <= 1.0) {
            return Err(DatasetError::InvalidRatio {
                ratio: options.ratio,
            });
        }
        if options.ratio < 1.0 {
            #[expect(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                clippy::cast_precision_loss
            )]
            let keep = (file.len() as f64 * options.ratio).floor() as usize;
            file.truncate(keep);
        }
        if file.is_empty() {
            return Err(DatasetError::Empty);
        }

        let dones = episode_boundaries(&file);
        let lim = 1.0 - options.eps;
        let DatasetFile {
            observations,
            actions,
            next_observations,
            rewards,
            costs,
            terminals,
            timeouts: _,
        } = file;

        let transitions = observations
            .into_iter()
            .zip(actions)
            .zip(next_observations)
            .zip(rewards.into_iter().zip(costs))
            .zip(terminals.into_iter().zip(dones))
            .map(
                |(
                    (((observation, mut action), next_observation), (reward, cost)),
                    (terminal, done),
                )| {
                    if options.clip_to_eps {
                        for a in &mut action {
                            *a = a.clamp(-lim, lim);
                        }
                    }
                    Transition {
                        observation,
                        action,
                        reward,
                        cost: options.cost_transform.apply(cost),
                        next_observation,
                        mask: if terminal { 0.0 } else { 1.0 },
                        done,
                    }
                },
            )
            .collect();

        Ok(Self {
            transitions,
            rng: Pcg64::seed_from_u64(0),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    #[must_use]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Reseeds the sampling generator.
    pub fn seed(&mut self, seed: u64) {
        self.rng = Pcg64::seed_from_u64(seed);
    }

    /// Draws `batch_size` transitions uniformly with replacement.
    pub fn sample(&mut self, batch_size: usize) -> Batch<'_> {
        let len = self.transitions.len();
        let indices = (0..batch_size)
            .map(|_| self.rng.random_range(0..len))
            .collect::<Vec<_>>();
        Batch::new(indices.into_iter().map(|i| &self.transitions[i]).collect())
    }

    /// Rescales rewards so that the known episode return range maps onto
    /// `max_episode_steps`.
    ///
    /// # Panics
    ///
    /// Panics if `max_episode_reward <= min_episode_reward`.
    pub fn normalize_returns(
        &mut self,
        max_episode_reward: f64,
        min_episode_reward: f64,
        max_episode_steps: usize,
    ) {
        assert!(
            max_episode_reward > min_episode_reward,
            "episode reward range must be non-empty"
        );
        #[expect(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let factor =
            (max_episode_steps as f64 / (max_episode_reward - min_episode_reward)) as f32;
        for t in &mut self.transitions {
            t.reward *= factor;
        }
        tracing::debug!(factor, "Normalized dataset rewards");
    }

    /// Summary of the (transformed) per-step rewards; `None` when empty.
    #[must_use]
    pub fn reward_stats(&self) -> Option<DescriptiveStats> {
        DescriptiveStats::from_f32(self.transitions.iter().map(|t| t.reward))
    }

    #[must_use]
    pub fn cost_stats(&self) -> Option<DescriptiveStats> {
        DescriptiveStats::from_f32(self.transitions.iter().map(|t| t.cost))
    }

    /// Number of trajectories, counted by `done` flags.
    #[must_use]
    pub fn trajectory_count(&self) -> usize {
        self.transitions.iter().filter(|t| t.done).count()
    }
}

fn episode_boundaries(file: &DatasetFile) -> Vec<bool> {
    let len = file.len();
    (0..len)
        .map(|i| {
            if i + 1 == len || file.terminals[i] || file.timeouts[i] {
                return true;
            }
            let gap = file.observations[i + 1]
                .iter()
                .zip(&file.next_observations[i])
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f32>()
                .sqrt();
            gap > DISCONTINUITY_EPS
        })
        .collect()
}
