//! Transmission (message delay) models

use meshsim_core::{Packet, SimRng, TransmissionModel};
use rand::Rng;

/// Every packet takes the same time to arrive
#[derive(Debug, Clone, Copy)]
pub struct ConstantDelay {
    delay: f64,
}

impl ConstantDelay {
    pub fn new(delay: f64) -> Self {
        Self { delay }
    }
}

impl Default for ConstantDelay {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl TransmissionModel for ConstantDelay {
    fn delivery_delay(&self, _packet: &Packet, _rng: &mut SimRng) -> f64 {
        self.delay
    }
}

/// Delay drawn uniformly from `[min, max]`
#[derive(Debug, Clone, Copy)]
pub struct RandomDelay {
    min: f64,
    max: f64,
}

impl RandomDelay {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }
}

impl TransmissionModel for RandomDelay {
    fn delivery_delay(&self, _packet: &Packet, rng: &mut SimRng) -> f64 {
        if self.max > self.min {
            rng.random_range(self.min..=self.max)
        } else {
            self.min
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshsim_core::{Message, NodeId, PacketId, Position, SimTime};
    use rand::SeedableRng;

    #[test]
    fn test_random_delay_bounds() {
        let packet = Packet {
            id: PacketId(0),
            origin: NodeId(0),
            destination: NodeId(1),
            message: Message::new(()),
            send_time: SimTime::ZERO,
            arrival_time: SimTime::ZERO,
            positive_delivery: true,
            origin_position: Position::ORIGIN,
            intensity: 1.0,
        };
        let mut rng = SimRng::seed_from_u64(5);
        let model = RandomDelay::new(0.5, 2.0);
        for _ in 0..500 {
            let delay = model.delivery_delay(&packet, &mut rng);
            assert!((0.5..=2.0).contains(&delay));
        }
        assert_eq!(RandomDelay::new(3.0, 1.0).delivery_delay(&packet, &mut rng), 3.0);
        assert_eq!(ConstantDelay::default().delivery_delay(&packet, &mut rng), 1.0);
    }
}
