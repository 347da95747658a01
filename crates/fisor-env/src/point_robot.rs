//! Synthetic point-robot navigation task.
//!
//! A robot starts below a field of hazard discs and has to reach a goal above
//! them. The straight line from start to goal crosses the hazards, so a
//! reward-greedy policy accumulates cost while a safe policy has to detour.
//!
//! ```text
//!   y
//!   3 ┌─────────────────┐
//!     │        G        │   G: goal (radius 0.25)
//!     │                 │
//!   0 │      (hazard)   │   cost 1 per step inside a hazard
//!     │                 │
//!     │        S        │   S: start region
//!  -3 └─────────────────┘
//!    -3                 3  x
//! ```
//!
//! Observations are the robot position `[x, y]`; actions are per-axis
//! velocities in `[-1, 1]`, scaled by [`STEP_SIZE`].

use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg64;

use crate::{BoxSpace, EnvError, Environment, Step, check_action_dim};

pub const MAX_EPISODE_STEPS: usize = 100;
pub const STEP_SIZE: f32 = 0.15;
pub const ARENA_HALF_WIDTH: f32 = 3.0;
pub const GOAL: [f32; 2] = [0.0, 2.5];
pub const GOAL_RADIUS: f32 = 0.25;
const START: [f32; 2] = [0.0, -2.5];
const START_JITTER: f32 = 0.3;
const PROGRESS_SCALE: f32 = 10.0;

/// Hazard layouts selectable by the robot id.
const LAYOUTS: &[&[Hazard]] = &[
    &[Hazard {
        center: [0.0, 0.0],
        radius: 1.0,
    }],
    &[
        Hazard {
            center: [-0.8, 0.3],
            radius: 0.7,
        },
        Hazard {
            center: [0.8, -0.3],
            radius: 0.7,
        },
    ],
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hazard {
    pub center: [f32; 2],
    pub radius: f32,
}

impl Hazard {
    #[must_use]
    pub fn contains(&self, pos: [f32; 2]) -> bool {
        distance(pos, self.center) <= self.radius
    }
}

#[derive(Debug, Clone)]
pub struct PointRobot {
    id: usize,
    rng: Pcg64,
    hazards: &'static [Hazard],
    pos: [f32; 2],
    steps: usize,
    reached_goal: bool,
    finished: bool,
    observation_space: BoxSpace,
    action_space: BoxSpace,
}

impl PointRobot {
    /// Creates the task; `id` selects the hazard layout (wrapping around).
    #[must_use]
    pub fn new(id: usize, seed: u64) -> Self {
        Self {
            id,
            rng: Pcg64::seed_from_u64(seed),
            hazards: LAYOUTS[id % LAYOUTS.len()],
            pos: START,
            steps: 0,
            reached_goal: false,
            finished: true,
            observation_space: BoxSpace::uniform(2, -ARENA_HALF_WIDTH, ARENA_HALF_WIDTH),
            action_space: BoxSpace::uniform(2, -1.0, 1.0),
        }
    }

    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    #[must_use]
    pub fn hazards(&self) -> &[Hazard] {
        self.hazards
    }

    #[must_use]
    pub fn position(&self) -> [f32; 2] {
        self.pos
    }

    /// Whether the current (or last) episode ended at the goal.
    #[must_use]
    pub fn reached_goal(&self) -> bool {
        self.reached_goal
    }

    fn in_hazard(&self, pos: [f32; 2]) -> bool {
        self.hazards.iter().any(|h| h.contains(pos))
    }
}

impl Environment for PointRobot {
    fn reset(&mut self) -> Vec<f32> {
        self.pos = [
            START[0] + self.rng.random_range(-START_JITTER..=START_JITTER),
            START[1] + self.rng.random_range(-START_JITTER..=START_JITTER) * 0.5,
        ];
        self.steps = 0;
        self.reached_goal = false;
        self.finished = false;
        self.pos.to_vec()
    }

    fn step(&mut self, action: &[f32]) -> Result<Step, EnvError> {
        if self.finished {
            return Err(EnvError::EpisodeFinished);
        }
        check_action_dim(&self.action_space, action)?;
        let action = self.action_space.clipped(action);

        let before = distance(self.pos, GOAL);
        for (p, a) in self.pos.iter_mut().zip(&action) {
            *p = (*p + a * STEP_SIZE).clamp(-ARENA_HALF_WIDTH, ARENA_HALF_WIDTH);
        }
        let after = distance(self.pos, GOAL);
        self.steps += 1;

        let cost = if self.in_hazard(self.pos) { 1.0 } else { 0.0 };
        self.reached_goal = after <= GOAL_RADIUS;
        let terminated = self.reached_goal;
        let truncated = !terminated && self.steps >= MAX_EPISODE_STEPS;
        self.finished = terminated || truncated;

        Ok(Step {
            observation: self.pos.to_vec(),
            reward: (before - after) * PROGRESS_SCALE,
            cost,
            terminated,
            truncated,
        })
    }

    fn observation_space(&self) -> &BoxSpace {
        &self.observation_space
    }

    fn action_space(&self) -> &BoxSpace {
        &self.action_space
    }

    fn max_episode_steps(&self) -> usize {
        MAX_EPISODE_STEPS
    }
}

pub(crate) fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_before_reset_fails() {
        let mut env = PointRobot::new(0, 0);
        assert!(matches!(
            env.step(&[0.0, 1.0]),
            Err(EnvError::EpisodeFinished)
        ));
    }

    #[test]
    fn test_straight_line_crosses_hazard() {
        let mut env = PointRobot::new(0, 0);
        env.reset();
        let mut total_cost = 0.0;
        loop {
            let step = env.step(&[0.0, 1.0]).unwrap();
            total_cost += step.cost;
            if step.is_done() {
                break;
            }
        }
        assert!(total_cost > 0.0);
    }

    #[test]
    fn test_truncates_at_time_limit() {
        let mut env = PointRobot::new(0, 3);
        env.reset();
        let mut steps = 0;
        loop {
            // push into the bottom wall forever
            let step = env.step(&[0.0, -1.0]).unwrap();
            steps += 1;
            if step.is_done() {
                assert!(step.truncated);
                assert!(!step.terminated);
                break;
            }
        }
        assert_eq!(steps, MAX_EPISODE_STEPS);
        assert!(!env.reached_goal());
    }

    #[test]
    fn test_reaching_goal_terminates() {
        let mut env = PointRobot::new(1, 0);
        env.reset();
        let mut done = false;
        for _ in 0..MAX_EPISODE_STEPS {
            let pos = env.position();
            let action = [
                ((GOAL[0] - pos[0]) / STEP_SIZE).clamp(-1.0, 1.0),
                ((GOAL[1] - pos[1]) / STEP_SIZE).clamp(-1.0, 1.0),
            ];
            let step = env.step(&action).unwrap();
            if step.is_done() {
                assert!(step.terminated);
                done = true;
                break;
            }
        }
        assert!(done);
        assert!(env.reached_goal());
    }

    #[test]
    fn test_action_dimension_checked() {
        let mut env = PointRobot::new(0, 0);
        env.reset();
        assert!(matches!(
            env.step(&[0.0]),
            Err(EnvError::ActionDim {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_layout_selected_by_id() {
        assert_eq!(PointRobot::new(0, 0).hazards().len(), 1);
        assert_eq!(PointRobot::new(1, 0).hazards().len(), 2);
        assert_eq!(PointRobot::new(2, 0).hazards().len(), 1);
    }
}
