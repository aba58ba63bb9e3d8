//! Flooding a token from a single source
//!
//! The source starts a timer at `t + 1` and broadcasts a [`FloodToken`]
//! when it fires, which works the same way in both modes. Every node
//! rebroadcasts the first token it sees. [`FloodingGlobal`] ends the run
//! once every node has been reached.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use meshsim_core::{Message, Packet, SimTime, StepError, TimerTag};
use tracing::trace;

use crate::node::{CustomGlobal, Node, NodeContext};

const START: TimerTag = TimerTag(1);

/// The flooded payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloodToken {
    pub hops: u32,
}

/// Counters shared by every flooding node and the global
#[derive(Debug, Default)]
pub struct FloodStats {
    reached: AtomicUsize,
    forwarded: AtomicUsize,
}

impl FloodStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reached(&self) -> usize {
        self.reached.load(Ordering::Acquire)
    }

    pub fn forwarded(&self) -> usize {
        self.forwarded.load(Ordering::Acquire)
    }
}

pub struct FloodingNode {
    source: bool,
    /// Hop count and time of the first token received
    reached: Option<(u32, SimTime)>,
    stats: Arc<FloodStats>,
}

impl FloodingNode {
    pub fn new(source: bool, stats: Arc<FloodStats>) -> Self {
        Self {
            source,
            reached: None,
            stats,
        }
    }

    pub fn reached(&self) -> Option<(u32, SimTime)> {
        self.reached
    }

    fn forward(&mut self, ctx: &mut NodeContext<'_>, hops: u32) {
        let sent = ctx.broadcast(Message::new(FloodToken { hops }));
        self.stats.forwarded.fetch_add(sent, Ordering::AcqRel);
    }
}

impl Node for FloodingNode {
    fn init(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), StepError> {
        if self.source {
            ctx.start_timer_relative(1.0, START)?;
        }
        Ok(())
    }

    fn on_timer(&mut self, ctx: &mut NodeContext<'_>, tag: TimerTag) -> Result<(), StepError> {
        if tag == START && self.reached.is_none() {
            self.reached = Some((0, ctx.now()));
            self.stats.reached.fetch_add(1, Ordering::AcqRel);
            self.forward(ctx, 1);
        }
        Ok(())
    }

    fn handle_messages(
        &mut self,
        ctx: &mut NodeContext<'_>,
        inbox: &[Packet],
    ) -> Result<(), StepError> {
        if self.reached.is_some() {
            return Ok(());
        }
        let Some(token) = inbox
            .iter()
            .filter_map(|p| p.message.downcast_ref::<FloodToken>())
            .min_by_key(|t| t.hops)
        else {
            return Ok(());
        };
        let hops = token.hops;
        trace!(hops, "token reached node");
        self.reached = Some((hops, ctx.now()));
        self.stats.reached.fetch_add(1, Ordering::AcqRel);
        self.forward(ctx, hops + 1);
        Ok(())
    }

    fn describe(&self) -> String {
        match self.reached {
            Some((hops, at)) => format!("reached after {hops} hops at {at}"),
            None if self.source => "source (not started)".to_string(),
            None => "waiting".to_string(),
        }
    }
}

/// Ends the run once `node_count` nodes have seen the token
pub struct FloodingGlobal {
    stats: Arc<FloodStats>,
    node_count: usize,
}

impl FloodingGlobal {
    pub fn new(stats: Arc<FloodStats>, node_count: usize) -> Self {
        Self { stats, node_count }
    }
}

impl CustomGlobal for FloodingGlobal {
    fn has_terminated(&self, _now: SimTime) -> bool {
        self.node_count > 0 && self.stats.reached() >= self.node_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::registry::ModelRegistry;
    use crate::topology::TopologyBuilder;
    use crate::world::World;
    use meshsim_core::Position;

    #[test]
    fn test_flood_over_a_line() {
        let mut config = SimConfig::default();
        config.models.connectivity = "static".into();
        let stats = FloodStats::new();
        let mut world = World::new(config, ModelRegistry::with_builtins())
            .unwrap()
            .with_global(FloodingGlobal::new(stats.clone(), 4));
        for i in 0..4 {
            world
                .add_node(
                    FloodingNode::new(i == 0, stats.clone()),
                    Position::planar(i as f64, 0.0),
                )
                .unwrap();
        }
        TopologyBuilder::new(4).line().apply(&mut world).unwrap();

        let mut rounds = 0;
        while !world.has_terminated() && rounds < 10 {
            world.run_round().unwrap();
            rounds += 1;
        }
        // source fires in round 1, each hop takes one round
        assert_eq!(rounds, 4);
        assert_eq!(stats.reached(), 4);
        assert!(world.describe(meshsim_core::NodeId(3)).unwrap().contains("3 hops"));
    }
}
