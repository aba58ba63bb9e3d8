//! Model traits
//!
//! These are the fixed extension points the schedulers call on every node.
//! The scheduler never interprets what a model does, it only calls it at
//! the right point of a round or event. All randomness a model needs comes
//! through the `rng` argument so a seeded run stays reproducible.

use std::collections::BTreeSet;

use crate::SimRng;
use crate::identity::NodeId;
use crate::message::Packet;
use crate::position::Position;

/// Computes where a node moves each round (synchronous mode only)
pub trait MobilityModel: Send {
    /// The node's position for the current round
    fn next_position(&mut self, node: NodeId, current: &Position, rng: &mut SimRng) -> Position;
}

/// Decides which nodes a node has outgoing edges to
pub trait ConnectivityModel: Send {
    /// Returns `true` if a node at `from` can reach a node at `to`
    fn is_connected(&self, from: &Position, to: &Position) -> bool;

    /// Recompute the outgoing edges of `node`
    ///
    /// `others` holds the frozen positions of every node for this pass,
    /// including `node` itself. The default implementation links every
    /// other node for which [`is_connected`](Self::is_connected) holds.
    fn update_connections(
        &mut self,
        node: NodeId,
        position: &Position,
        current: &BTreeSet<NodeId>,
        others: &[(NodeId, Position)],
    ) -> BTreeSet<NodeId> {
        let _ = current;
        others
            .iter()
            .filter(|(id, pos)| *id != node && self.is_connected(position, pos))
            .map(|(id, _)| *id)
            .collect()
    }
}

/// Decides whether a packet was disturbed by concurrent transmissions
pub trait InterferenceModel: Send {
    /// `in_air` holds every other packet in flight at the time of the test
    fn is_disturbed(&self, packet: &Packet, receiver: &Position, in_air: &[&Packet]) -> bool;
}

/// Decides whether a sent packet reaches its destination
pub trait ReliabilityModel: Send {
    fn reaches_destination(&mut self, packet: &Packet, rng: &mut SimRng) -> bool;
}

/// Computes how long a packet is in the air
pub trait TransmissionModel: Send {
    fn delivery_delay(&self, packet: &Packet, rng: &mut SimRng) -> f64;
}

/// Places nodes during bulk creation
pub trait DistributionModel: Send {
    /// Announce how many nodes the next bulk creation will place
    fn set_number_of_nodes(&mut self, count: usize) {
        let _ = count;
    }

    fn next_position(&mut self, rng: &mut SimRng) -> Position;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct WithinTwo;

    impl ConnectivityModel for WithinTwo {
        fn is_connected(&self, from: &Position, to: &Position) -> bool {
            from.distance(to) <= 2.0
        }
    }

    #[test]
    fn test_default_update_connections() {
        let others = vec![
            (NodeId(0), Position::planar(0.0, 0.0)),
            (NodeId(1), Position::planar(1.0, 0.0)),
            (NodeId(2), Position::planar(5.0, 0.0)),
        ];
        let edges = WithinTwo.update_connections(
            NodeId(0),
            &others[0].1,
            &BTreeSet::new(),
            &others,
        );
        assert_eq!(edges.into_iter().collect::<Vec<_>>(), vec![NodeId(1)]);
    }
}
