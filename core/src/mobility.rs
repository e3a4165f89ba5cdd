use log::debug;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::TAU;

use crate::engine::{as_secs_f64, SimTime, US_PER_SEC};
use crate::traits::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Bounds {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self { x_min, x_max, y_min, y_max }
    }

    pub fn contains(&self, p: &Position) -> bool {
        p.x >= self.x_min && p.x <= self.x_max && p.y >= self.y_min && p.y <= self.y_max
    }

    pub fn clamp(&self, p: Position) -> Position {
        Position {
            x: p.x.clamp(self.x_min, self.x_max),
            y: p.y.clamp(self.y_min, self.y_max),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.x_min.is_finite()
            && self.x_max.is_finite()
            && self.y_min.is_finite()
            && self.y_max.is_finite()
            && self.x_min <= self.x_max
            && self.y_min <= self.y_max
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(-50.0, 50.0, -50.0, 50.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridOrder {
    RowFirst,
    ColumnFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    pub min_x: f64,
    pub min_y: f64,
    pub delta_x: f64,
    pub delta_y: f64,
    pub grid_width: u32,
    pub order: GridOrder,
}

impl GridLayout {
    pub fn position(&self, index: u32) -> Position {
        let width = self.grid_width.max(1);
        let (col, row) = match self.order {
            GridOrder::RowFirst => (index % width, index / width),
            GridOrder::ColumnFirst => (index / width, index % width),
        };
        Position {
            x: self.min_x + self.delta_x * col as f64,
            y: self.min_y + self.delta_y * row as f64,
        }
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            min_x: 0.0,
            min_y: 0.0,
            delta_x: 5.0,
            delta_y: 10.0,
            grid_width: 3,
            order: GridOrder::RowFirst,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomWalkParams {
    pub bounds: Bounds,
    pub speed_min: f64,
    pub speed_max: f64,
    pub step_interval_us: SimTime,
    pub redirect_interval_us: SimTime,
}

impl Default for RandomWalkParams {
    fn default() -> Self {
        Self {
            bounds: Bounds::default(),
            speed_min: 2.0,
            speed_max: 4.0,
            step_interval_us: US_PER_SEC,
            redirect_interval_us: US_PER_SEC,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum MobilityModel {
    #[default]
    Fixed,
    RandomWalk(RandomWalkParams),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkState {
    pub direction: f64,
    pub speed: f64,
    pub last_redirect: SimTime,
    pub last_step: SimTime,
}

pub struct MobilityEngine {
    walkers: BTreeMap<NodeId, (RandomWalkParams, WalkState)>,
    rng: StdRng,
}

impl MobilityEngine {
    pub fn new(seed: u64) -> Self {
        Self {
            walkers: BTreeMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn register(&mut self, node: NodeId, params: RandomWalkParams, now: SimTime) {
        let (direction, speed) = self.sample(&params);
        self.walkers.insert(
            node,
            (
                params,
                WalkState {
                    direction,
                    speed,
                    last_redirect: now,
                    last_step: now,
                },
            ),
        );
    }

    pub fn unregister(&mut self, node: NodeId) {
        self.walkers.remove(&node);
    }

    pub fn is_mobile(&self, node: NodeId) -> bool {
        self.walkers.contains_key(&node)
    }

    pub fn params(&self, node: NodeId) -> Option<&RandomWalkParams> {
        self.walkers.get(&node).map(|(p, _)| p)
    }

    pub fn state(&self, node: NodeId) -> Option<&WalkState> {
        self.walkers.get(&node).map(|(_, s)| s)
    }

    pub fn mobile_nodes(&self) -> Vec<NodeId> {
        self.walkers.keys().copied().collect()
    }

    fn sample(&mut self, params: &RandomWalkParams) -> (f64, f64) {
        let direction = self.rng.gen_range(0.0..TAU);
        let speed = if params.speed_max > params.speed_min {
            self.rng.gen_range(params.speed_min..params.speed_max)
        } else {
            params.speed_min
        };
        (direction, speed)
    }

    /// Moves `node` from `from` to its position at `now`. Returns `None` for
    /// nodes that are not walking.
    ///
    /// A move that would leave the bound box is clamped to the boundary and
    /// a fresh direction is drawn.
    pub fn step(&mut self, node: NodeId, from: Position, now: SimTime) -> Option<Position> {
        let (params, mut state) = *self.walkers.get(&node)?;
        let dt = as_secs_f64(now.saturating_sub(state.last_step));
        let candidate = Position {
            x: from.x + state.speed * state.direction.cos() * dt,
            y: from.y + state.speed * state.direction.sin() * dt,
        };

        let next = if params.bounds.contains(&candidate) {
            if now.saturating_sub(state.last_redirect) >= params.redirect_interval_us {
                let (direction, speed) = self.sample(&params);
                state.direction = direction;
                state.speed = speed;
                state.last_redirect = now;
            }
            candidate
        } else {
            let clamped = params.bounds.clamp(candidate);
            let (direction, speed) = self.sample(&params);
            debug!(
                "node {} hit the boundary at ({:.2}, {:.2}), new heading {:.3} rad",
                node, clamped.x, clamped.y, direction
            );
            state.direction = direction;
            state.speed = speed;
            state.last_redirect = now;
            clamped
        };

        state.last_step = now;
        self.walkers.insert(node, (params, state));
        Some(next)
    }
}
