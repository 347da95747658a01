use crate::{BoxSpace, EnvError, Environment, EpisodeRewardBounds, Step};

/// Adds cost-limit semantics to a benchmark environment.
///
/// Actions are clipped into the action space before they reach the inner
/// environment, and episode scores can be normalized against the inner
/// environment's reward bounds and the configured cost limit.
#[derive(Debug, Clone)]
pub struct CostLimit<E> {
    inner: E,
    cost_limit: f64,
}

impl<E> CostLimit<E>
where
    E: Environment + EpisodeRewardBounds,
{
    /// Wraps `inner`; `cost_limit` must be positive.
    pub fn new(inner: E, cost_limit: f64) -> Result<Self, EnvError> {
        if cost_limit > 0.0 {
            Ok(Self { inner, cost_limit })
        } else {
            Err(EnvError::InvalidCostLimit { cost_limit })
        }
    }

    #[must_use]
    pub fn cost_limit(&self) -> f64 {
        self.cost_limit
    }

    /// Rescales an episode return into `[0, 1]` against the known reward range
    /// and an episode cost relative to the cost limit.
    #[must_use]
    pub fn normalized_score(&self, episode_return: f64, episode_cost: f64) -> (f64, f64) {
        let max = self.inner.max_episode_reward();
        let min = self.inner.min_episode_reward();
        (
            (episode_return - min) / (max - min),
            episode_cost / self.cost_limit,
        )
    }
}

impl<E> Environment for CostLimit<E>
where
    E: Environment + EpisodeRewardBounds,
{
    fn reset(&mut self) -> Vec<f32> {
        self.inner.reset()
    }

    fn step(&mut self, action: &[f32]) -> Result<Step, EnvError> {
        let action = self.inner.action_space().clipped(action);
        self.inner.step(&action)
    }

    fn observation_space(&self) -> &BoxSpace {
        self.inner.observation_space()
    }

    fn action_space(&self) -> &BoxSpace {
        self.inner.action_space()
    }

    fn max_episode_steps(&self) -> usize {
        self.inner.max_episode_steps()
    }
}

impl<E> EpisodeRewardBounds for CostLimit<E>
where
    E: EpisodeRewardBounds,
{
    fn max_episode_reward(&self) -> f64 {
        self.inner.max_episode_reward()
    }

    fn min_episode_reward(&self) -> f64 {
        self.inner.min_episode_reward()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;

    #[test]
    fn test_normalized_score() {
        // OfflineCarRun-v0: reward range [-10, 160]
        let env = CostLimit::new(registry::make("OfflineCarRun-v0", 0).unwrap(), 10.0).unwrap();
        let (ret, cost) = env.normalized_score(75.0, 5.0);
        assert!((ret - 0.5).abs() < 1e-12);
        assert!((cost - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_actions_are_clipped() {
        let mut wrapped =
            CostLimit::new(registry::make("OfflineCarRun-v0", 0).unwrap(), 10.0).unwrap();
        let mut plain = registry::make("OfflineCarRun-v0", 0).unwrap();
        wrapped.reset();
        plain.reset();
        let a = wrapped.step(&[5.0, -5.0]).unwrap();
        let b = plain.step(&[1.0, -1.0]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_non_positive_cost_limit_is_error() {
        for cost_limit in [0.0, -1.0, f64::NAN] {
            let err = CostLimit::new(registry::make("OfflineCarRun-v0", 0).unwrap(), cost_limit)
                .unwrap_err();
            assert!(matches!(err, EnvError::InvalidCostLimit { .. }), "{cost_limit}");
        }
    }
}
