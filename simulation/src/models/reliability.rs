//! Reliability models

use meshsim_core::{Packet, ReliabilityModel, SimRng};
use rand::Rng;

/// Every packet reaches its destination
#[derive(Debug, Clone, Copy, Default)]
pub struct ReliableDelivery;

impl ReliabilityModel for ReliableDelivery {
    fn reaches_destination(&mut self, _packet: &Packet, _rng: &mut SimRng) -> bool {
        true
    }
}

/// Each packet is lost independently with `drop_probability`
#[derive(Debug, Clone, Copy)]
pub struct LossyDelivery {
    drop_probability: f64,
}

impl LossyDelivery {
    pub fn new(drop_probability: f64) -> Self {
        Self {
            drop_probability: drop_probability.clamp(0.0, 1.0),
        }
    }
}

impl ReliabilityModel for LossyDelivery {
    fn reaches_destination(&mut self, _packet: &Packet, rng: &mut SimRng) -> bool {
        rng.random::<f64>() >= self.drop_probability
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshsim_core::{Message, NodeId, PacketId, Position, SimTime};
    use rand::SeedableRng;

    fn packet() -> Packet {
        Packet {
            id: PacketId(0),
            origin: NodeId(0),
            destination: NodeId(1),
            message: Message::new(()),
            send_time: SimTime::ZERO,
            arrival_time: SimTime::new(1.0),
            positive_delivery: true,
            origin_position: Position::ORIGIN,
            intensity: 1.0,
        }
    }

    #[test]
    fn test_lossy_extremes() {
        let mut rng = SimRng::seed_from_u64(3);
        let packet = packet();
        assert!((0..100).all(|_| LossyDelivery::new(0.0).reaches_destination(&packet, &mut rng)));
        assert!((0..100).all(|_| !LossyDelivery::new(1.0).reaches_destination(&packet, &mut rng)));
    }

    #[test]
    fn test_lossy_rate() {
        let mut rng = SimRng::seed_from_u64(11);
        let mut model = LossyDelivery::new(0.3);
        let packet = packet();
        let delivered = (0..10_000)
            .filter(|_| model.reaches_destination(&packet, &mut rng))
            .count();
        assert!((6_500..7_500).contains(&delivered), "delivered {delivered}");
    }
}
