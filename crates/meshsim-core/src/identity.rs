//! Node identity
//!
//! Nodes are identified by a dense `u32`. The ordering of [`NodeId`] is the
//! iteration order of every per-node pass, which makes it part of the
//! determinism contract: two runs over the same node set visit nodes in the
//! same order.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Identifier of a simulated node
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display("N{_0}")]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a node id from its raw value
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw value
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The id following this one
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Generate the ids `0..count`
    pub fn range(count: u32) -> Vec<Self> {
        (0..count).map(Self).collect()
    }
}

impl From<u32> for NodeId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId::new(7).to_string(), "N7");
    }

    #[test]
    fn test_node_id_range() {
        let ids = NodeId::range(3);
        assert_eq!(ids, vec![NodeId(0), NodeId(1), NodeId(2)]);
        assert_eq!(ids[1].next(), NodeId(2));
    }

    #[test]
    fn test_node_id_ordering() {
        assert!(NodeId(1) < NodeId(2));
        assert_eq!(NodeId::from(4).raw(), 4);
    }
}
