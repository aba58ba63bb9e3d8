//! Node positions

use std::fmt;

use serde::{Deserialize, Serialize};

/// A point in the (up to three dimensional) deployment area
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    /// The origin
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// A position on the `z = 0` plane
    pub const fn planar(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Euclidean distance to `other`
    pub fn distance(&self, other: &Position) -> f64 {
        self.squared_distance(other).sqrt()
    }

    /// Squared Euclidean distance to `other`
    pub fn squared_distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Move at most `step` units towards `target`, stopping on it
    pub fn step_towards(&self, target: &Position, step: f64) -> Position {
        let distance = self.distance(target);
        if distance <= step || distance == 0.0 {
            return *target;
        }
        let ratio = step / distance;
        Position {
            x: self.x + (target.x - self.x) * ratio,
            y: self.y + (target.y - self.y) * ratio,
            z: self.z + (target.z - self.z) * ratio,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Position::planar(0.0, 0.0);
        let b = Position::planar(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(a.squared_distance(&b), 25.0);
    }

    #[test]
    fn test_step_towards() {
        let a = Position::planar(0.0, 0.0);
        let b = Position::planar(10.0, 0.0);
        assert_eq!(a.step_towards(&b, 4.0), Position::planar(4.0, 0.0));
        // Overshooting lands exactly on the target
        assert_eq!(a.step_towards(&b, 25.0), b);
    }
}
