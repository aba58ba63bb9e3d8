//! Mobility models

use meshsim_core::{MobilityModel, NodeId, Position, SimRng};
use rand::Rng;

use crate::config::Dimensions;

/// Nodes never move
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMobility;

impl MobilityModel for NoMobility {
    fn next_position(&mut self, _node: NodeId, current: &Position, _rng: &mut SimRng) -> Position {
        *current
    }
}

/// Random waypoint movement inside the deployment area
///
/// The node picks a uniformly random waypoint and a speed in
/// `[min_speed, max_speed]`, walks there in straight steps of `speed` per
/// round, pauses for `pause_rounds` rounds, and repeats.
#[derive(Debug, Clone)]
pub struct RandomWaypoint {
    dimensions: Dimensions,
    min_speed: f64,
    max_speed: f64,
    pause_rounds: u32,
    waypoint: Option<Position>,
    speed: f64,
    paused: u32,
}

impl RandomWaypoint {
    pub fn new(dimensions: Dimensions, min_speed: f64, max_speed: f64, pause_rounds: u32) -> Self {
        Self {
            dimensions,
            min_speed,
            max_speed,
            pause_rounds,
            waypoint: None,
            speed: 0.0,
            paused: 0,
        }
    }

    pub fn waypoint(&self) -> Option<Position> {
        self.waypoint
    }
}

impl MobilityModel for RandomWaypoint {
    fn next_position(&mut self, _node: NodeId, current: &Position, rng: &mut SimRng) -> Position {
        if self.paused > 0 {
            self.paused -= 1;
            return *current;
        }

        let waypoint = match self.waypoint {
            Some(waypoint) => waypoint,
            None => {
                let waypoint = random_position(&self.dimensions, rng);
                self.speed = if self.max_speed > self.min_speed {
                    rng.random_range(self.min_speed..=self.max_speed)
                } else {
                    self.min_speed
                };
                self.waypoint = Some(waypoint);
                waypoint
            }
        };

        let next = current.step_towards(&waypoint, self.speed);
        if next == waypoint {
            self.waypoint = None;
            self.paused = self.pause_rounds;
        }
        next
    }
}

/// A uniformly random position inside `dimensions`
pub(crate) fn random_position(dimensions: &Dimensions, rng: &mut SimRng) -> Position {
    let z = if dimensions.z > 0.0 {
        rng.random::<f64>() * dimensions.z
    } else {
        0.0
    };
    Position::new(
        rng.random::<f64>() * dimensions.x,
        rng.random::<f64>() * dimensions.y,
        z,
    )
}
