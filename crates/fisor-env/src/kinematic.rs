//! Point-mass safety tasks standing in for the benchmark suites.
//!
//! All tasks share one damped point-mass body: actions set the target velocity
//! in `[-1, 1]²`, velocity relaxes toward it each step, and the body is confined to a square
//! arena. The [`TaskKind`] decides the reward and the (binary) cost:
//!
//! | kind       | reward                              | cost                               |
//! |------------|-------------------------------------|------------------------------------|
//! | `Circle`   | tangential speed near the circle    | `abs(x)` beyond the boundary       |
//! | `Run`      | forward speed                       | over speed limit or off the track  |
//! | `Velocity` | forward speed                       | over speed limit                   |
//! | `Goal`     | progress to the goal (+1 on arrival)| inside a hazard                    |
//! | `Button`   | same as `Goal`                      | inside a hazard (denser layout)    |
//! | `Push`     | same as `Goal`, slower body         | inside a hazard                    |
//! | `Drive`    | forward progress                    | outside the lane                   |
//!
//! Observations are `[x, y, vx, vy, goal_dx, goal_dy, hazard_clearance]`.

use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg64;

use crate::{
    BoxSpace, EnvError, EnvSpec, Environment, EpisodeRewardBounds, Step, check_action_dim,
    point_robot::{Hazard, distance},
};

pub const OBSERVATION_DIM: usize = 7;
pub const ACTION_DIM: usize = 2;

const ARENA_HALF_WIDTH: f32 = 4.0;
const DT: f32 = 0.1;
const DAMPING: f32 = 0.9;
const GOAL_RADIUS: f32 = 0.3;
const CIRCLE_RADIUS: f32 = 2.0;
const CIRCLE_BOUNDARY: f32 = 1.5;
const SPEED_LIMIT: f32 = 0.75;
const TRACK_HALF_WIDTH: f32 = 1.0;
const LANE_HALF_WIDTH: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Circle,
    Run,
    Velocity,
    Goal,
    Button,
    Push,
    Drive,
}

impl TaskKind {
    fn acceleration(self) -> f32 {
        match self {
            Self::Push => 0.6,
            _ => 1.0,
        }
    }

    fn hazards(self) -> &'static [Hazard] {
        match self {
            Self::Goal | Self::Push => &[
                Hazard {
                    center: [0.0, 0.0],
                    radius: 0.8,
                },
                Hazard {
                    center: [1.8, 1.8],
                    radius: 0.5,
                },
            ],
            Self::Button => &[
                Hazard {
                    center: [0.0, 0.0],
                    radius: 0.8,
                },
                Hazard {
                    center: [-1.8, 1.5],
                    radius: 0.6,
                },
                Hazard {
                    center: [1.8, -1.5],
                    radius: 0.6,
                },
            ],
            _ => &[],
        }
    }

    fn has_goal(self) -> bool {
        matches!(self, Self::Goal | Self::Button | Self::Push)
    }
}

#[derive(Debug, Clone)]
pub struct KinematicTask {
    spec: &'static EnvSpec,
    rng: Pcg64,
    pos: [f32; 2],
    vel: [f32; 2],
    goal: [f32; 2],
    steps: usize,
    finished: bool,
    observation_space: BoxSpace,
    action_space: BoxSpace,
}

impl KinematicTask {
    #[must_use]
    pub fn new(spec: &'static EnvSpec, seed: u64) -> Self {
        Self {
            spec,
            rng: Pcg64::seed_from_u64(seed),
            pos: [0.0; 2],
            vel: [0.0; 2],
            goal: [0.0; 2],
            steps: 0,
            finished: true,
            observation_space: BoxSpace::uniform(OBSERVATION_DIM, -10.0, 10.0),
            action_space: BoxSpace::uniform(ACTION_DIM, -1.0, 1.0),
        }
    }

    fn kind(&self) -> TaskKind {
        self.spec.kind
    }

    fn random_point(&mut self, half_width: f32) -> [f32; 2] {
        [
            self.rng.random_range(-half_width..=half_width),
            self.rng.random_range(-half_width..=half_width),
        ]
    }

    fn sample_goal(&mut self) -> [f32; 2] {
        let hazards = self.kind().hazards();
        loop {
            let goal = self.random_point(ARENA_HALF_WIDTH - 1.0);
            if hazards
                .iter()
                .all(|h| distance(goal, h.center) > h.radius + GOAL_RADIUS)
            {
                return goal;
            }
        }
    }

    fn hazard_clearance(&self) -> f32 {
        self.kind()
            .hazards()
            .iter()
            .map(|h| distance(self.pos, h.center) - h.radius)
            .fold(ARENA_HALF_WIDTH, f32::min)
    }

    fn observation(&self) -> Vec<f32> {
        let (gx, gy) = if self.kind().has_goal() {
            (self.goal[0] - self.pos[0], self.goal[1] - self.pos[1])
        } else {
            (0.0, 0.0)
        };
        vec![
            self.pos[0],
            self.pos[1],
            self.vel[0],
            self.vel[1],
            gx,
            gy,
            self.hazard_clearance(),
        ]
    }

    fn speed(&self) -> f32 {
        self.vel[0].hypot(self.vel[1])
    }

    fn reward_and_cost(&mut self, prev_pos: [f32; 2]) -> (f32, f32) {
        let [x, y] = self.pos;
        let [vx, vy] = self.vel;
        let over_speed = self.speed() > SPEED_LIMIT;
        match self.kind() {
            TaskKind::Circle => {
                let radius = x.hypot(y);
                let tangential = (-vx * y + vy * x) / radius.max(1e-3);
                let reward = tangential / (1.0 + (radius - CIRCLE_RADIUS).abs());
                (reward, indicator(x.abs() > CIRCLE_BOUNDARY))
            }
            TaskKind::Run => (vx, indicator(over_speed || y.abs() > TRACK_HALF_WIDTH)),
            TaskKind::Velocity => (vx, indicator(over_speed)),
            TaskKind::Drive => (x - prev_pos[0], indicator(y.abs() > LANE_HALF_WIDTH)),
            TaskKind::Goal | TaskKind::Button | TaskKind::Push => {
                let mut reward = distance(prev_pos, self.goal) - distance(self.pos, self.goal);
                if distance(self.pos, self.goal) <= GOAL_RADIUS {
                    reward += 1.0;
                    self.goal = self.sample_goal();
                }
                let cost = self.kind().hazards().iter().any(|h| h.contains(self.pos));
                (reward, indicator(cost))
            }
        }
    }
}

fn indicator(flag: bool) -> f32 {
    if flag { 1.0 } else { 0.0 }
}

impl Environment for KinematicTask {
    fn reset(&mut self) -> Vec<f32> {
        self.pos = match self.kind() {
            TaskKind::Circle => [0.0, 0.0],
            TaskKind::Run | TaskKind::Velocity | TaskKind::Drive => {
                [-ARENA_HALF_WIDTH + 0.5, self.rng.random_range(-0.2..=0.2)]
            }
            TaskKind::Goal | TaskKind::Button | TaskKind::Push => {
                let hazards = self.kind().hazards();
                loop {
                    let pos = self.random_point(ARENA_HALF_WIDTH - 0.5);
                    if hazards.iter().all(|h| !h.contains(pos)) {
                        break pos;
                    }
                }
            }
        };
        if self.kind().has_goal() {
            self.goal = self.sample_goal();
        }
        self.vel = [0.0; 2];
        self.steps = 0;
        self.finished = false;
        self.observation()
    }

    fn step(&mut self, action: &[f32]) -> Result<Step, EnvError> {
        if self.finished {
            return Err(EnvError::EpisodeFinished);
        }
        check_action_dim(&self.action_space, action)?;
        let action = self.action_space.clipped(action);

        let prev_pos = self.pos;
        let accel = self.kind().acceleration();
        for i in 0..2 {
            self.vel[i] = DAMPING * self.vel[i] + (1.0 - DAMPING) * accel * action[i];
            self.pos[i] =
                (self.pos[i] + self.vel[i] * DT).clamp(-ARENA_HALF_WIDTH, ARENA_HALF_WIDTH);
        }
        self.steps += 1;

        let (reward, cost) = self.reward_and_cost(prev_pos);
        let truncated = self.steps >= self.spec.max_episode_steps;
        self.finished = truncated;

        Ok(Step {
            observation: self.observation(),
            reward,
            cost,
            terminated: false,
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
        self.spec.max_episode_steps
    }
}

impl EpisodeRewardBounds for KinematicTask {
    fn max_episode_reward(&self) -> f64 {
        self.spec.max_episode_reward
    }

    fn min_episode_reward(&self) -> f64 {
        self.spec.min_episode_reward
    }
}
