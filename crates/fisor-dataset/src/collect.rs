//! Behavior data collection.
//!
//! Rolls out a noisy, temporally correlated random policy and records every
//! transition in [`DatasetFile`] layout. The resulting data covers both safe
//! and unsafe behavior, which is what the FISOR critics need to separate the
//! feasible region from the infeasible one.

use fisor_env::{EnvError, Environment};
use rand::Rng;

use crate::DatasetFile;

/// Weight of the previous action in the correlated behavior policy.
const ACTION_INERTIA: f32 = 0.8;

/// Collects `episodes` full episodes from `env`.
pub fn collect<E, R>(env: &mut E, episodes: usize, rng: &mut R) -> Result<DatasetFile, EnvError>
where
    E: Environment + ?Sized,
    R: Rng + ?Sized,
{
    let mut file = DatasetFile::default();
    for _ in 0..episodes {
        let mut observation = env.reset();
        let mut action = env.action_space().sample(rng);
        loop {
            let noise = env.action_space().sample(rng);
            for (a, n) in action.iter_mut().zip(&noise) {
                *a = ACTION_INERTIA * *a + (1.0 - ACTION_INERTIA) * n;
            }
            let step = env.step(&action)?;
            let done = step.is_done();

            file.observations.push(observation);
            file.actions.push(action.clone());
            file.next_observations.push(step.observation.clone());
            file.rewards.push(step.reward);
            file.costs.push(step.cost);
            file.terminals.push(step.terminated);
            file.timeouts.push(step.truncated);

            if done {
                break;
            }
            observation = step.observation;
        }
    }
    tracing::debug!(episodes, transitions = file.len(), "Collected behavior data");
    Ok(file)
}
