//! Interference models

use meshsim_core::{InterferenceModel, Packet, Position};

/// Packets are never disturbed
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInterference;

impl InterferenceModel for NoInterference {
    fn is_disturbed(&self, _packet: &Packet, _receiver: &Position, _in_air: &[&Packet]) -> bool {
        false
    }
}

/// Signal to interference-plus-noise ratio model
///
/// The received power of a transmission decays as `intensity / d^alpha`.
/// A packet is lost if its power divided by the noise plus the power of
/// every other transmission in the air falls below `threshold`.
#[derive(Debug, Clone, Copy)]
pub struct SinrInterference {
    alpha: f64,
    threshold: f64,
    noise: f64,
}

impl SinrInterference {
    pub fn new(alpha: f64, threshold: f64, noise: f64) -> Self {
        Self {
            alpha,
            threshold,
            noise,
        }
    }

    fn received_power(&self, packet: &Packet, receiver: &Position) -> f64 {
        let distance = packet.origin_position.distance(receiver).max(1e-9);
        packet.intensity / distance.powf(self.alpha)
    }
}

impl InterferenceModel for SinrInterference {
    fn is_disturbed(&self, packet: &Packet, receiver: &Position, in_air: &[&Packet]) -> bool {
        let signal = self.received_power(packet, receiver);
        let interference: f64 = in_air
            .iter()
            .filter(|other| other.origin != packet.origin)
            .map(|other| self.received_power(other, receiver))
            .sum();
        let denominator = self.noise + interference;
        if denominator <= 0.0 {
            return false;
        }
        signal / denominator < self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshsim_core::{Message, NodeId, PacketId, SimTime};

    fn from(origin: u32, at: Position) -> Packet {
        Packet {
            id: PacketId(origin as u64),
            origin: NodeId(origin),
            destination: NodeId(99),
            message: Message::new(()),
            send_time: SimTime::ZERO,
            arrival_time: SimTime::new(1.0),
            positive_delivery: true,
            origin_position: at,
            intensity: 1.0,
        }
    }

    #[test]
    fn test_lone_packet_is_not_disturbed() {
        let sinr = SinrInterference::new(2.0, 1.2, 0.0);
        let packet = from(0, Position::planar(1.0, 0.0));
        assert!(!sinr.is_disturbed(&packet, &Position::ORIGIN, &[]));
    }

    #[test]
    fn test_near_interferer_disturbs() {
        let sinr = SinrInterference::new(2.0, 1.2, 0.0);
        let packet = from(0, Position::planar(4.0, 0.0));
        let near = from(1, Position::planar(1.0, 0.0));
        let far = from(2, Position::planar(40.0, 0.0));

        assert!(sinr.is_disturbed(&packet, &Position::ORIGIN, &[&near]));
        assert!(!sinr.is_disturbed(&packet, &Position::ORIGIN, &[&far]));
    }
}
