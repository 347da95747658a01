//! Environment list and benchmark registry.
//!
//! [`ENV_LIST`] is the fixed, ordered table that command-line environment
//! indices select from. Every name except [`POINT_ROBOT`] has an [`EnvSpec`]
//! and can be constructed with [`make`].

use crate::{
    EnvError, KinematicTask,
    TaskKind::{self, Button, Circle, Drive, Goal, Push, Run, Velocity},
};

/// Name of the synthetic navigation environment.
pub const POINT_ROBOT: &str = "PointRobot";

pub const ENV_LIST: [&str; 39] = [
    // bullet safety gym
    "OfflineAntCircle-v0",
    "OfflineAntRun-v0",
    "OfflineCarCircle-v0",
    "OfflineDroneCircle-v0",
    "OfflineDroneRun-v0",
    "OfflineBallCircle-v0",
    "OfflineBallRun-v0",
    "OfflineCarRun-v0",
    // safety gymnasium: car
    "OfflineCarButton1Gymnasium-v0",
    "OfflineCarButton2Gymnasium-v0",
    "OfflineCarCircle1Gymnasium-v0",
    "OfflineCarCircle2Gymnasium-v0",
    "OfflineCarGoal1Gymnasium-v0",
    "OfflineCarGoal2Gymnasium-v0",
    "OfflineCarPush1Gymnasium-v0",
    "OfflineCarPush2Gymnasium-v0",
    // safety gymnasium: point
    "OfflinePointButton1Gymnasium-v0",
    "OfflinePointButton2Gymnasium-v0",
    "OfflinePointCircle1Gymnasium-v0",
    "OfflinePointCircle2Gymnasium-v0",
    "OfflinePointGoal1Gymnasium-v0",
    "OfflinePointGoal2Gymnasium-v0",
    "OfflinePointPush1Gymnasium-v0",
    "OfflinePointPush2Gymnasium-v0",
    // safety gymnasium: velocity
    "OfflineAntVelocityGymnasium-v1",
    "OfflineHalfCheetahVelocityGymnasium-v1",
    "OfflineHopperVelocityGymnasium-v1",
    "OfflineSwimmerVelocityGymnasium-v1",
    "OfflineWalker2dVelocityGymnasium-v1",
    // metadrive
    "OfflineMetadrive-easysparse-v0",
    "OfflineMetadrive-easymean-v0",
    "OfflineMetadrive-easydense-v0",
    "OfflineMetadrive-mediumsparse-v0",
    "OfflineMetadrive-mediummean-v0",
    "OfflineMetadrive-mediumdense-v0",
    "OfflineMetadrive-hardsparse-v0",
    "OfflineMetadrive-hardmean-v0",
    "OfflineMetadrive-harddense-v0",
    POINT_ROBOT,
];

/// Static description of a registered benchmark environment.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvSpec {
    pub name: &'static str,
    pub kind: TaskKind,
    pub max_episode_steps: usize,
    /// Best known episode return, used for score normalization.
    pub max_episode_reward: f64,
    /// Worst known episode return, used for score normalization.
    pub min_episode_reward: f64,
}

impl EnvSpec {
    const fn new(
        name: &'static str,
        kind: TaskKind,
        max_episode_steps: usize,
        max_episode_reward: f64,
        min_episode_reward: f64,
    ) -> Self {
        Self {
            name,
            kind,
            max_episode_steps,
            max_episode_reward,
            min_episode_reward,
        }
    }

    /// Finds the spec registered under `name`.
    #[must_use]
    pub fn lookup(name: &str) -> Option<&'static EnvSpec> {
        ENV_SPECS.iter().find(|spec| spec.name == name)
    }
}

/// Returns the environment name at `index` in [`ENV_LIST`].
#[must_use]
pub fn env_name(index: usize) -> Option<&'static str> {
    ENV_LIST.get(index).copied()
}

/// Constructs the registered benchmark environment `name`.
pub fn make(name: &str, seed: u64) -> Result<KinematicTask, EnvError> {
    let spec = EnvSpec::lookup(name).ok_or_else(|| EnvError::UnknownEnv {
        name: name.to_owned(),
    })?;
    Ok(KinematicTask::new(spec, seed))
}

static ENV_SPECS: [EnvSpec; 38] = [
    EnvSpec::new("OfflineAntCircle-v0", Circle, 500, 250.0, 0.0),
    EnvSpec::new("OfflineAntRun-v0", Run, 200, 160.0, -10.0),
    EnvSpec::new("OfflineCarCircle-v0", Circle, 300, 150.0, 0.0),
    EnvSpec::new("OfflineDroneCircle-v0", Circle, 300, 150.0, 0.0),
    EnvSpec::new("OfflineDroneRun-v0", Run, 200, 160.0, -10.0),
    EnvSpec::new("OfflineBallCircle-v0", Circle, 200, 100.0, 0.0),
    EnvSpec::new("OfflineBallRun-v0", Run, 100, 80.0, -5.0),
    EnvSpec::new("OfflineCarRun-v0", Run, 200, 160.0, -10.0),
    EnvSpec::new("OfflineCarButton1Gymnasium-v0", Button, 1000, 40.0, -5.0),
    EnvSpec::new("OfflineCarButton2Gymnasium-v0", Button, 1000, 40.0, -5.0),
    EnvSpec::new("OfflineCarCircle1Gymnasium-v0", Circle, 500, 250.0, 0.0),
    EnvSpec::new("OfflineCarCircle2Gymnasium-v0", Circle, 500, 250.0, 0.0),
    EnvSpec::new("OfflineCarGoal1Gymnasium-v0", Goal, 1000, 40.0, -5.0),
    EnvSpec::new("OfflineCarGoal2Gymnasium-v0", Goal, 1000, 40.0, -5.0),
    EnvSpec::new("OfflineCarPush1Gymnasium-v0", Push, 1000, 25.0, -5.0),
    EnvSpec::new("OfflineCarPush2Gymnasium-v0", Push, 1000, 25.0, -5.0),
    EnvSpec::new("OfflinePointButton1Gymnasium-v0", Button, 1000, 40.0, -5.0),
    EnvSpec::new("OfflinePointButton2Gymnasium-v0", Button, 1000, 40.0, -5.0),
    EnvSpec::new("OfflinePointCircle1Gymnasium-v0", Circle, 500, 250.0, 0.0),
    EnvSpec::new("OfflinePointCircle2Gymnasium-v0", Circle, 500, 250.0, 0.0),
    EnvSpec::new("OfflinePointGoal1Gymnasium-v0", Goal, 1000, 40.0, -5.0),
    EnvSpec::new("OfflinePointGoal2Gymnasium-v0", Goal, 1000, 40.0, -5.0),
    EnvSpec::new("OfflinePointPush1Gymnasium-v0", Push, 1000, 25.0, -5.0),
    EnvSpec::new("OfflinePointPush2Gymnasium-v0", Push, 1000, 25.0, -5.0),
    EnvSpec::new("OfflineAntVelocityGymnasium-v1", Velocity, 1000, 800.0, -50.0),
    EnvSpec::new("OfflineHalfCheetahVelocityGymnasium-v1", Velocity, 1000, 800.0, -50.0),
    EnvSpec::new("OfflineHopperVelocityGymnasium-v1", Velocity, 1000, 600.0, -50.0),
    EnvSpec::new("OfflineSwimmerVelocityGymnasium-v1", Velocity, 1000, 300.0, -50.0),
    EnvSpec::new("OfflineWalker2dVelocityGymnasium-v1", Velocity, 1000, 700.0, -50.0),
    EnvSpec::new("OfflineMetadrive-easysparse-v0", Drive, 1000, 8.0, 0.0),
    EnvSpec::new("OfflineMetadrive-easymean-v0", Drive, 1000, 8.0, 0.0),
    EnvSpec::new("OfflineMetadrive-easydense-v0", Drive, 1000, 8.0, 0.0),
    EnvSpec::new("OfflineMetadrive-mediumsparse-v0", Drive, 1000, 8.0, 0.0),
    EnvSpec::new("OfflineMetadrive-mediummean-v0", Drive, 1000, 8.0, 0.0),
    EnvSpec::new("OfflineMetadrive-mediumdense-v0", Drive, 1000, 8.0, 0.0),
    EnvSpec::new("OfflineMetadrive-hardsparse-v0", Drive, 1000, 8.0, 0.0),
    EnvSpec::new("OfflineMetadrive-hardmean-v0", Drive, 1000, 8.0, 0.0),
    EnvSpec::new("OfflineMetadrive-harddense-v0", Drive, 1000, 8.0, 0.0),
];

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_every_benchmark_name_is_registered() {
        for name in ENV_LIST.iter().filter(|n| **n != POINT_ROBOT) {
            assert!(EnvSpec::lookup(name).is_some(), "{name} has no spec");
        }
        assert_eq!(ENV_SPECS.len(), ENV_LIST.len() - 1);
    }

    #[test]
    fn test_names_are_unique() {
        let names = ENV_LIST.iter().collect::<HashSet<_>>();
        assert_eq!(names.len(), ENV_LIST.len());
    }

    #[test]
    fn test_env_name_is_deterministic() {
        for index in 0..ENV_LIST.len() {
            let name = env_name(index).unwrap();
            assert_eq!(env_name(index), Some(name));
            assert!(ENV_LIST.contains(&name));
        }
        assert_eq!(env_name(ENV_LIST.len()), None);
        assert_eq!(env_name(38), Some(POINT_ROBOT));
    }

    #[test]
    fn test_reward_bounds_are_ordered() {
        for spec in &ENV_SPECS {
            assert!(spec.max_episode_reward > spec.min_episode_reward, "{}", spec.name);
        }
    }

    #[test]
    fn test_make_unknown() {
        assert!(matches!(
            make(POINT_ROBOT, 0),
            Err(EnvError::UnknownEnv { .. })
        ));
    }
}
