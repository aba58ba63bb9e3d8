//! Timer-driven request/response between two nodes
//!
//! The initiator sends a [`Ping`] every `interval` time units until it has
//! sent `rounds` of them; the peer answers each with a [`Pong`]. Messages
//! go out with `send_direct`, so no edge is needed.

use meshsim_core::{Message, NodeId, Packet, StepError, TimerTag};
use tracing::debug;

use crate::node::{Node, NodeContext};

const SEND_PING: TimerTag = TimerTag(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping {
    pub seq: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pong {
    pub seq: u32,
}

pub struct PingPongNode {
    peer: NodeId,
    initiator: bool,
    interval: f64,
    rounds: u32,
    pings_sent: u32,
    pings_received: u32,
    pongs_received: u32,
}

impl PingPongNode {
    /// The node starting the exchange
    pub fn initiator(peer: NodeId, interval: f64, rounds: u32) -> Self {
        Self {
            peer,
            initiator: true,
            interval,
            rounds,
            pings_sent: 0,
            pings_received: 0,
            pongs_received: 0,
        }
    }

    /// The node answering pings
    pub fn responder(peer: NodeId) -> Self {
        Self {
            peer,
            initiator: false,
            interval: 0.0,
            rounds: 0,
            pings_sent: 0,
            pings_received: 0,
            pongs_received: 0,
        }
    }

    pub fn pongs_received(&self) -> u32 {
        self.pongs_received
    }
}

impl Node for PingPongNode {
    fn init(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), StepError> {
        if self.initiator && self.rounds > 0 {
            ctx.start_timer_relative(self.interval, SEND_PING)?;
        }
        Ok(())
    }

    fn check_requirements(&self) -> Result<(), StepError> {
        if self.initiator && !(self.interval.is_finite() && self.interval > 0.0) {
            return Err(StepError::WrongConfiguration(format!(
                "ping interval must be positive, got {}",
                self.interval
            )));
        }
        Ok(())
    }

    fn on_timer(&mut self, ctx: &mut NodeContext<'_>, tag: TimerTag) -> Result<(), StepError> {
        if tag != SEND_PING {
            return Ok(());
        }
        self.pings_sent += 1;
        ctx.send_direct(self.peer, Message::new(Ping { seq: self.pings_sent }));
        if self.pings_sent < self.rounds {
            ctx.start_timer_relative(self.interval, SEND_PING)?;
        }
        Ok(())
    }

    fn handle_messages(
        &mut self,
        ctx: &mut NodeContext<'_>,
        inbox: &[Packet],
    ) -> Result<(), StepError> {
        for packet in inbox {
            if let Some(ping) = packet.message.downcast_ref::<Ping>() {
                self.pings_received += 1;
                ctx.send_direct(packet.origin, Message::new(Pong { seq: ping.seq }));
            } else if let Some(pong) = packet.message.downcast_ref::<Pong>() {
                self.pongs_received += 1;
                debug!(seq = pong.seq, rtt = ctx.now().as_f64() - packet.send_time.as_f64(), "pong");
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        if self.initiator {
            format!(
                "initiator: {}/{} pings sent, {} pongs",
                self.pings_sent, self.rounds, self.pongs_received
            )
        } else {
            format!("responder: {} pings answered", self.pings_received)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Mode, SimConfig};
    use crate::registry::ModelRegistry;
    use crate::world::World;
    use meshsim_core::{Position, SimTime};

    #[test]
    fn test_async_exchange() {
        let config = SimConfig {
            mode: Mode::Asynchronous,
            ..SimConfig::default()
        };
        let mut world = World::new(config, ModelRegistry::with_builtins()).unwrap();
        world
            .add_node(PingPongNode::initiator(NodeId(1), 2.0, 3), Position::ORIGIN)
            .unwrap();
        world
            .add_node(PingPongNode::responder(NodeId(0)), Position::planar(1.0, 0.0))
            .unwrap();

        while let Some(event) = world.next_event() {
            world.handle_event(event).unwrap();
        }
        // pings at 2, 4, 6; last pong arrives at 6 + 1 + 1
        assert_eq!(world.now(), SimTime::new(8.0));
        assert_eq!(world.stats().messages_sent, 6);
        assert!(world.describe(NodeId(0)).unwrap().contains("3 pongs"));
    }

    #[test]
    fn test_rejects_non_positive_interval() {
        let mut world = World::new(SimConfig::default(), ModelRegistry::with_builtins()).unwrap();
        let err = world
            .add_node(PingPongNode::initiator(NodeId(1), 0.0, 1), Position::ORIGIN)
            .unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(world.node_count(), 0);
    }
}
