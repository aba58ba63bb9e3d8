//! Connectivity models

use std::collections::BTreeSet;

use meshsim_core::{ConnectivityModel, NodeId, Position};

/// Two nodes are connected iff they are at most `radius` apart
#[derive(Debug, Clone, Copy)]
pub struct UnitDiskGraph {
    radius: f64,
}

impl UnitDiskGraph {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }
}

impl ConnectivityModel for UnitDiskGraph {
    fn is_connected(&self, from: &Position, to: &Position) -> bool {
        from.squared_distance(to) <= self.radius * self.radius
    }
}

/// Edges are set by hand (see [`crate::topology`]) and never re-evaluated
///
/// Edges to nodes that no longer exist are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticConnectivity;

impl ConnectivityModel for StaticConnectivity {
    fn is_connected(&self, _from: &Position, _to: &Position) -> bool {
        false
    }

    fn update_connections(
        &mut self,
        _node: NodeId,
        _position: &Position,
        current: &BTreeSet<NodeId>,
        others: &[(NodeId, Position)],
    ) -> BTreeSet<NodeId> {
        current
            .iter()
            .copied()
            .filter(|id| others.iter().any(|(other, _)| other == id))
            .collect()
    }
}
