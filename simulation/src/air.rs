//! Packets currently in the air
//!
//! Every transmitted packet stays in this buffer from its send time until it
//! is delivered (or dropped) at its destination. Interference models look at
//! the buffer to decide whether concurrent transmissions disturbed a packet.

use std::collections::BTreeMap;

use meshsim_core::{NodeId, Packet, PacketId, SimTime};

/// Buffer of in-flight packets, ordered by packet id
#[derive(Debug, Default)]
pub struct PacketsInTheAir {
    packets: BTreeMap<PacketId, Packet>,
}

impl PacketsInTheAir {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, packet: Packet) {
        self.packets.insert(packet.id, packet);
    }

    pub fn remove(&mut self, id: PacketId) -> Option<Packet> {
        self.packets.remove(&id)
    }

    /// Remove and return every packet for `destination` that has arrived by
    /// `now`, in `(arrival_time, id)` order
    pub fn take_arrived(&mut self, destination: NodeId, now: SimTime) -> Vec<Packet> {
        let ids: Vec<PacketId> = self
            .packets
            .values()
            .filter(|p| p.destination == destination && p.arrival_time <= now)
            .map(|p| p.id)
            .collect();

        let mut arrived: Vec<Packet> = ids
            .into_iter()
            .filter_map(|id| self.packets.remove(&id))
            .collect();
        arrived.sort_by(|a, b| a.arrival_time.cmp(&b.arrival_time).then(a.id.cmp(&b.id)));
        arrived
    }

    /// Remove every packet sent by or addressed to `node`
    pub fn remove_for_node(&mut self, node: NodeId) -> usize {
        let before = self.packets.len();
        self.packets
            .retain(|_, p| p.origin != node && p.destination != node);
        before - self.packets.len()
    }

    /// Evaluate interference once for every packet still expected to arrive
    ///
    /// `disturbed` receives a packet and every other packet in the air. All
    /// decisions are taken against the same snapshot before any packet is
    /// marked, so the result does not depend on iteration order. Returns the
    /// number of packets newly marked as lost.
    pub fn test_for_interference<F>(&mut self, mut disturbed: F) -> usize
    where
        F: FnMut(&Packet, &[&Packet]) -> bool,
    {
        let lost: Vec<PacketId> = {
            let all: Vec<&Packet> = self.packets.values().collect();
            all.iter()
                .filter(|p| p.positive_delivery)
                .filter(|p| {
                    let others: Vec<&Packet> =
                        all.iter().copied().filter(|o| o.id != p.id).collect();
                    disturbed(p, &others)
                })
                .map(|p| p.id)
                .collect()
        };

        for id in &lost {
            if let Some(packet) = self.packets.get_mut(id) {
                packet.deny_delivery();
            }
        }
        lost.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Packet> {
        self.packets.values()
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn clear(&mut self) {
        self.packets.clear();
    }
}
