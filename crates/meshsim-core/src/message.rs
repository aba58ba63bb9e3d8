//! Algorithm payloads and the packets that carry them
//!
//! The simulator never interprets a [`Message`]; it only moves it between
//! nodes inside a [`Packet`]. Payloads are reference counted so that a
//! broadcast can hand the same message to every neighbor without copying.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::identity::NodeId;
use crate::position::Position;
use crate::time::SimTime;

/// An opaque, type-erased algorithm payload
#[derive(Clone)]
pub struct Message {
    payload: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Message {
    /// Wrap an algorithm value
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            payload: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Borrow the payload as `T`, if that is what it holds
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Returns `true` if the payload is a `T`
    pub fn is<T: Any>(&self) -> bool {
        self.payload.is::<T>()
    }

    /// Rust type name of the payload, for diagnostics
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Message").field(&self.type_name).finish()
    }
}

/// Unique identifier of a packet within one simulation
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display("P{_0}")]
pub struct PacketId(pub u64);

/// The transmission envelope of a message on one link
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: PacketId,
    pub origin: NodeId,
    pub destination: NodeId,
    pub message: Message,
    pub send_time: SimTime,
    pub arrival_time: SimTime,
    /// Cleared by the reliability or interference model when the packet is lost
    pub positive_delivery: bool,
    pub origin_position: Position,
    /// Signal strength, used by interference models
    pub intensity: f64,
}

impl Packet {
    /// Mark the packet as lost
    pub fn deny_delivery(&mut self) {
        self.positive_delivery = false;
    }

    /// Returns `true` if the packet is still in flight at `now`
    pub fn in_flight_at(&self, now: SimTime) -> bool {
        self.send_time <= now && now < self.arrival_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Token(u32);

    #[test]
    fn test_message_downcast() {
        let msg = Message::new(Token(9));
        assert!(msg.is::<Token>());
        assert_eq!(msg.downcast_ref::<Token>(), Some(&Token(9)));
        assert!(msg.downcast_ref::<String>().is_none());
        assert!(format!("{msg:?}").contains("Token"));
    }

    #[test]
    fn test_packet_flight_window() {
        let mut packet = Packet {
            id: PacketId(1),
            origin: NodeId(0),
            destination: NodeId(1),
            message: Message::new(Token(1)),
            send_time: SimTime::new(2.0),
            arrival_time: SimTime::new(3.0),
            positive_delivery: true,
            origin_position: Position::ORIGIN,
            intensity: 1.0,
        };
        assert!(packet.in_flight_at(SimTime::new(2.5)));
        assert!(!packet.in_flight_at(SimTime::new(3.0)));

        packet.deny_delivery();
        assert!(!packet.positive_delivery);
        assert_eq!(packet.id.to_string(), "P1");
    }
}
