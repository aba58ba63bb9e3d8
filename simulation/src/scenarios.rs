//! Pre-built scenarios for the CLI and tests
//!
//! A [`Scenario`] names a demo algorithm, a node count, and how edges are
//! formed. It adjusts the configuration it needs (a hand-made topology
//! requires the `static` connectivity model) and populates a world.

use derive_more::Display;
use meshsim_core::{SimResult, SimRng};
use rand::SeedableRng;
use tracing::info;

use crate::algorithms::{FloodStats, FloodingGlobal, FloodingNode, PingPongNode};
use crate::config::SimConfig;
use crate::registry::ModelRegistry;
use crate::topology::TopologyBuilder;
use crate::world::World;

/// Which demo algorithm to run
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    #[default]
    #[display("flooding")]
    Flooding,
    #[display("ping-pong")]
    PingPong,
}

/// How edges are formed
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopologyKind {
    /// Whatever the configured connectivity model computes
    #[default]
    #[display("model")]
    Model,
    #[display("ring")]
    Ring,
    #[display("line")]
    Line,
    #[display("star")]
    Star,
    #[display("full")]
    Full,
    #[display("random")]
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scenario {
    pub algorithm: Algorithm,
    pub nodes: u32,
    pub topology: TopologyKind,
}

impl Scenario {
    pub fn new(algorithm: Algorithm, nodes: u32, topology: TopologyKind) -> Self {
        Self {
            algorithm,
            nodes,
            topology,
        }
    }

    /// Adjust `config` to what the scenario needs
    pub fn prepare_config(&self, config: &mut SimConfig) {
        if self.topology != TopologyKind::Model {
            config.models.connectivity = "static".into();
        }
    }

    /// Build a world from `config` and populate it
    pub fn build_world(&self, mut config: SimConfig, registry: ModelRegistry) -> SimResult<World> {
        self.prepare_config(&mut config);
        let mut world = World::new(config, registry)?;
        self.populate(&mut world)?;
        world.reevaluate_connections();
        Ok(world)
    }

    /// Create the scenario's nodes, edges, and custom global in `world`
    pub fn populate(&self, world: &mut World) -> SimResult<()> {
        info!(
            algorithm = %self.algorithm,
            nodes = self.nodes,
            topology = %self.topology,
            "populating world"
        );
        match self.algorithm {
            Algorithm::Flooding => self.populate_flooding(world)?,
            Algorithm::PingPong => self.populate_ping_pong(world)?,
        }
        self.apply_topology(world)
    }

    fn populate_flooding(&self, world: &mut World) -> SimResult<()> {
        let stats = FloodStats::new();
        world.set_global(Box::new(FloodingGlobal::new(
            stats.clone(),
            self.nodes as usize,
        )));
        let source = world.next_node_id();
        world.create_nodes(self.nodes as usize, |id| {
            Box::new(FloodingNode::new(id == source, stats.clone()))
        })?;
        Ok(())
    }

    fn populate_ping_pong(&self, world: &mut World) -> SimResult<()> {
        let registry = world.registry().clone();
        let mut distribution =
            registry.distribution(&world.config().models.distribution, world.config())?;
        distribution.set_number_of_nodes(self.nodes as usize);
        let mut rng = SimRng::seed_from_u64(world.config().seed);

        for _ in 0..self.nodes / 2 {
            let initiator = world.next_node_id();
            let responder = initiator.next();
            let a = distribution.next_position(&mut rng);
            let b = distribution.next_position(&mut rng);
            let models = registry.node_models(world.config())?;
            world.add_node_boxed(
                Box::new(PingPongNode::initiator(responder, 2.0, 5)),
                a,
                models,
            )?;
            let models = registry.node_models(world.config())?;
            world.add_node_boxed(Box::new(PingPongNode::responder(initiator)), b, models)?;
        }
        Ok(())
    }

    fn apply_topology(&self, world: &mut World) -> SimResult<()> {
        let builder = TopologyBuilder::new(self.nodes);
        let topology = match self.topology {
            TopologyKind::Model => return Ok(()),
            TopologyKind::Ring => builder.ring(),
            TopologyKind::Line => builder.line(),
            TopologyKind::Star => builder.star(),
            TopologyKind::Full => builder.full_mesh(),
            TopologyKind::Random => {
                let mut rng = SimRng::seed_from_u64(world.config().seed);
                builder.random(0.3, &mut rng)
            }
        };
        topology.apply(world)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshsim_core::NodeId;

    #[test]
    fn test_flooding_ring_terminates() {
        let scenario = Scenario::new(Algorithm::Flooding, 6, TopologyKind::Ring);
        let mut world = scenario
            .build_world(SimConfig::default(), ModelRegistry::with_builtins())
            .unwrap();
        assert_eq!(world.config().models.connectivity, "static");
        assert_eq!(world.edge_count(), 12);

        let mut rounds = 0;
        while !world.has_terminated() {
            world.run_round().unwrap();
            rounds += 1;
            assert!(rounds <= 10);
        }
        // farthest node of a 6-ring is 3 hops from the source
        assert_eq!(rounds, 4);
    }

    #[test]
    fn test_ping_pong_pairs() {
        let scenario = Scenario::new(Algorithm::PingPong, 5, TopologyKind::Model);
        let world = scenario
            .build_world(SimConfig::default(), ModelRegistry::with_builtins())
            .unwrap();
        assert_eq!(world.node_count(), 4);
        assert!(world.describe(NodeId(3)).unwrap().starts_with("responder"));
    }
}
