//! Distribution models used for bulk node creation

use meshsim_core::{DistributionModel, Position, SimRng};

use super::mobility::random_position;
use crate::config::Dimensions;

/// Uniformly random positions inside the deployment area
#[derive(Debug, Clone, Copy)]
pub struct RandomDistribution {
    dimensions: Dimensions,
}

impl RandomDistribution {
    pub fn new(dimensions: Dimensions) -> Self {
        Self { dimensions }
    }
}

impl DistributionModel for RandomDistribution {
    fn next_position(&mut self, rng: &mut SimRng) -> Position {
        random_position(&self.dimensions, rng)
    }
}

/// Square grid covering the area, filled row by row
#[derive(Debug, Clone)]
pub struct GridDistribution {
    dimensions: Dimensions,
    side: usize,
    placed: usize,
}

impl GridDistribution {
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            side: 1,
            placed: 0,
        }
    }
}

impl DistributionModel for GridDistribution {
    fn set_number_of_nodes(&mut self, count: usize) {
        self.side = ((count as f64).sqrt().ceil() as usize).max(1);
        self.placed = 0;
    }

    fn next_position(&mut self, _rng: &mut SimRng) -> Position {
        let col = self.placed % self.side;
        let row = (self.placed / self.side) % self.side;
        self.placed += 1;
        let dx = self.dimensions.x / self.side as f64;
        let dy = self.dimensions.y / self.side as f64;
        Position::planar(dx * (col as f64 + 0.5), dy * (row as f64 + 0.5))
    }
}

/// Evenly spaced along the horizontal middle line of the area
#[derive(Debug, Clone)]
pub struct LineDistribution {
    dimensions: Dimensions,
    count: usize,
    placed: usize,
}

impl LineDistribution {
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            count: 1,
            placed: 0,
        }
    }
}

impl DistributionModel for LineDistribution {
    fn set_number_of_nodes(&mut self, count: usize) {
        self.count = count.max(1);
        self.placed = 0;
    }

    fn next_position(&mut self, _rng: &mut SimRng) -> Position {
        let index = self.placed % self.count;
        self.placed += 1;
        let spacing = self.dimensions.x / self.count as f64;
        Position::planar(spacing * (index as f64 + 0.5), self.dimensions.y / 2.0)
    }
}

/// Evenly spaced on a circle around the center of the area
#[derive(Debug, Clone)]
pub struct CircleDistribution {
    dimensions: Dimensions,
    count: usize,
    placed: usize,
}

impl CircleDistribution {
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            count: 1,
            placed: 0,
        }
    }

    fn radius(&self) -> f64 {
        self.dimensions.x.min(self.dimensions.y) / 3.0
    }
}

impl DistributionModel for CircleDistribution {
    fn set_number_of_nodes(&mut self, count: usize) {
        self.count = count.max(1);
        self.placed = 0;
    }

    fn next_position(&mut self, _rng: &mut SimRng) -> Position {
        let angle = std::f64::consts::TAU * self.placed as f64 / self.count as f64;
        self.placed += 1;
        let radius = self.radius();
        Position::planar(
            self.dimensions.x / 2.0 + radius * angle.cos(),
            self.dimensions.y / 2.0 + radius * angle.sin(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_grid_places_distinct_cells() {
        let mut grid = GridDistribution::new(Dimensions::default());
        grid.set_number_of_nodes(4);
        let mut rng = SimRng::seed_from_u64(0);
        let positions: Vec<_> = (0..4).map(|_| grid.next_position(&mut rng)).collect();
        assert_eq!(positions[0], Position::planar(25.0, 25.0));
        assert_eq!(positions[3], Position::planar(75.0, 75.0));
    }

    #[test]
    fn test_line_spacing() {
        let mut line = LineDistribution::new(Dimensions::default());
        line.set_number_of_nodes(5);
        let mut rng = SimRng::seed_from_u64(0);
        let a = line.next_position(&mut rng);
        let b = line.next_position(&mut rng);
        assert_eq!(a.distance(&b), 20.0);
        assert_eq!(a.y, 50.0);
    }

    #[test]
    fn test_circle_radius() {
        let mut circle = CircleDistribution::new(Dimensions::default());
        circle.set_number_of_nodes(8);
        let mut rng = SimRng::seed_from_u64(0);
        let center = Position::planar(50.0, 50.0);
        for _ in 0..8 {
            let p = circle.next_position(&mut rng);
            assert!((p.distance(&center) - 100.0 / 3.0).abs() < 1e-9);
        }
    }
}
