//! The simulated world
//!
//! [`World`] owns every node together with its models, and a [`Kernel`]
//! holding the shared simulation state: the clock, the event queue, timers,
//! the packets in the air, statistics, and the run's single random number
//! generator. The schedulers drive a world one round or one event at a time;
//! nothing in here is global or thread-local.

use std::collections::{BTreeMap, BTreeSet};

use meshsim_core::{
    ConfigError, Event, EventKind, EventQueue, Message, NodeId, Packet, PacketId, Position,
    ReliabilityModel, RuntimeError, SimError, SimResult, SimRng, SimTime, StepError, Timer,
    TimerList, TimerTag, TransmissionModel,
};
use meshsim_logging::NodeContextGuard;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, trace};

use crate::air::PacketsInTheAir;
use crate::config::{Mode, SimConfig};
use crate::host::Progress;
use crate::models::NodeModels;
use crate::node::{CustomGlobal, GlobalContext, Node, NodeContext, NoGlobal};
use crate::registry::ModelRegistry;

/// Counters reported at the end of every run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimStats {
    pub messages_sent: u64,
    pub messages_delivered: u64,
    pub messages_dropped: u64,
    /// Packets marked as lost by an interference model
    pub messages_disturbed: u64,
    pub nacks_generated: u64,
    pub timers_fired: u64,
    pub events_handled: u64,
    pub rounds_executed: u64,
}

/// Shared simulation state reachable from algorithm callbacks
pub struct Kernel {
    mode: Mode,
    generate_nacks: bool,
    now: SimTime,
    even_round: bool,
    queue: EventQueue,
    node_timers: BTreeMap<NodeId, TimerList>,
    global_timers: TimerList,
    air: PacketsInTheAir,
    /// Lost packets waiting to be handed back to their sender (synchronous)
    nacks: BTreeMap<NodeId, Vec<Packet>>,
    transmission: Box<dyn TransmissionModel>,
    rng: SimRng,
    stats: SimStats,
    next_packet: u64,
}

impl Kernel {
    fn new(config: &SimConfig, transmission: Box<dyn TransmissionModel>) -> Self {
        Self {
            mode: config.mode,
            generate_nacks: config.generate_nacks,
            now: SimTime::ZERO,
            even_round: true,
            queue: EventQueue::new(),
            node_timers: BTreeMap::new(),
            global_timers: TimerList::new(),
            air: PacketsInTheAir::new(),
            nacks: BTreeMap::new(),
            transmission,
            rng: SimRng::seed_from_u64(config.seed),
            stats: SimStats::default(),
            next_packet: 0,
        }
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn is_even_round(&self) -> bool {
        self.even_round
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn air(&self) -> &PacketsInTheAir {
        &self.air
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn rng(&mut self) -> &mut SimRng {
        &mut self.rng
    }

    /// Put a packet on the air
    ///
    /// The reliability model decides now whether the packet will arrive; a
    /// lost packet still occupies the air until its arrival time. In
    /// synchronous mode a packet arrives no earlier than the next round.
    pub(crate) fn transmit(
        &mut self,
        origin: NodeId,
        origin_position: Position,
        destination: NodeId,
        message: Message,
        reliability: &mut dyn ReliabilityModel,
    ) -> PacketId {
        let id = PacketId(self.next_packet);
        self.next_packet += 1;

        let mut packet = Packet {
            id,
            origin,
            destination,
            message,
            send_time: self.now,
            arrival_time: self.now,
            positive_delivery: true,
            origin_position,
            intensity: 1.0,
        };

        let delay = self.transmission.delivery_delay(&packet, &mut self.rng);
        let delay = match self.mode {
            Mode::Synchronous => delay.max(1.0),
            Mode::Asynchronous => delay.max(0.0),
        };
        packet.arrival_time = self.now.plus(delay);
        packet.positive_delivery = reliability.reaches_destination(&packet, &mut self.rng);
        self.stats.messages_sent += 1;

        trace!(
            packet = %id,
            from = %origin,
            to = %destination,
            arrival = %packet.arrival_time,
            delivered = packet.positive_delivery,
            "packet sent"
        );

        if self.mode == Mode::Asynchronous {
            self.queue.insert(Event::packet(packet.clone()));
        }
        self.air.add(packet);
        id
    }

    /// Schedule a validated timer
    pub(crate) fn schedule_timer(&mut self, timer: Timer) {
        match (self.mode, timer.target) {
            (Mode::Asynchronous, _) => {
                self.queue.insert(Event::timer(timer));
            }
            (Mode::Synchronous, Some(node)) => {
                self.node_timers.entry(node).or_default().push(timer);
            }
            (Mode::Synchronous, None) => self.global_timers.push(timer),
        }
    }

    fn record_loss(&mut self, packet: Packet) -> Option<Packet> {
        self.stats.messages_dropped += 1;
        if self.generate_nacks {
            self.stats.nacks_generated += 1;
            Some(packet)
        } else {
            None
        }
    }

    fn clear(&mut self) {
        self.now = SimTime::ZERO;
        self.even_round = true;
        self.queue.drop_all_events();
        self.node_timers.clear();
        self.global_timers.clear();
        self.air.clear();
        self.nacks.clear();
        self.stats = SimStats::default();
        self.next_packet = 0;
    }
}

/// A node and everything attached to it
pub struct NodeSlot {
    algorithm: Box<dyn Node>,
    position: Position,
    edges: BTreeSet<NodeId>,
    models: NodeModels,
    neighborhood_changed: bool,
}

/// All simulation state of one run
pub struct World {
    config: SimConfig,
    registry: ModelRegistry,
    nodes: BTreeMap<NodeId, NodeSlot>,
    kernel: Kernel,
    global: Box<dyn CustomGlobal>,
    next_id: u32,
}

impl World {
    /// Build an empty world, resolving the configured models
    pub fn new(config: SimConfig, registry: ModelRegistry) -> Result<Self, ConfigError> {
        config.validate()?;
        registry.validate(&config)?;
        let transmission = registry.transmission(&config.models.transmission, &config)?;
        let kernel = Kernel::new(&config, transmission);
        Ok(Self {
            config,
            registry,
            nodes: BTreeMap::new(),
            kernel,
            global: Box::new(NoGlobal),
            next_id: 0,
        })
    }

    /// Replace the custom global
    pub fn with_global(mut self, global: impl CustomGlobal + 'static) -> Self {
        self.global = Box::new(global);
        self
    }

    pub fn set_global(&mut self, global: Box<dyn CustomGlobal>) {
        self.global = global;
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn mode(&self) -> Mode {
        self.kernel.mode
    }

    pub fn now(&self) -> SimTime {
        self.kernel.now
    }

    pub fn is_even_round(&self) -> bool {
        self.kernel.even_round
    }

    pub fn stats(&self) -> &SimStats {
        &self.kernel.stats
    }

    pub fn queue(&self) -> &EventQueue {
        &self.kernel.queue
    }

    pub fn packets_in_air(&self) -> &PacketsInTheAir {
        &self.kernel.air
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    /// Id the next added node will get
    pub fn next_node_id(&self) -> NodeId {
        NodeId(self.next_id)
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn position(&self, id: NodeId) -> Option<Position> {
        self.nodes.get(&id).map(|slot| slot.position)
    }

    pub fn edges(&self, id: NodeId) -> Option<&BTreeSet<NodeId>> {
        self.nodes.get(&id).map(|slot| &slot.edges)
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|slot| slot.edges.len()).sum()
    }

    pub fn describe(&self, id: NodeId) -> Option<String> {
        self.nodes.get(&id).map(|slot| slot.algorithm.describe())
    }

    /// Snapshot of the counters shown to the host
    pub fn progress(&self) -> Progress {
        Progress {
            time: self.kernel.now,
            rounds: self.kernel.stats.rounds_executed,
            events: self.kernel.stats.events_handled,
            nodes: self.nodes.len(),
            pending_events: self.kernel.queue.len(),
            packets_in_air: self.kernel.air.len(),
        }
    }

    // ========================================================================
    // Node management (host side, between runs)
    // ========================================================================

    /// Add a node with the configured default models
    pub fn add_node(&mut self, algorithm: impl Node + 'static, position: Position) -> SimResult<NodeId> {
        let models = self.registry.node_models(&self.config)?;
        self.add_node_boxed(Box::new(algorithm), position, models)
    }

    /// Add a node with explicit models
    pub fn add_node_with_models(
        &mut self,
        algorithm: impl Node + 'static,
        position: Position,
        models: NodeModels,
    ) -> SimResult<NodeId> {
        self.add_node_boxed(Box::new(algorithm), position, models)
    }

    /// Add a node, check its requirements, and run its `init`
    pub fn add_node_boxed(
        &mut self,
        algorithm: Box<dyn Node>,
        position: Position,
        models: NodeModels,
    ) -> SimResult<NodeId> {
        let id = NodeId(self.next_id);
        if self.nodes.contains_key(&id) {
            return Err(RuntimeError::DuplicateNode(id).into());
        }
        algorithm
            .check_requirements()
            .map_err(|e| SimError::node(id, e))?;

        self.next_id += 1;
        self.nodes.insert(
            id,
            NodeSlot {
                algorithm,
                position,
                edges: BTreeSet::new(),
                models,
                neighborhood_changed: false,
            },
        );

        let World { nodes, kernel, .. } = self;
        if let Some(slot) = nodes.get_mut(&id) {
            let _guard = NodeContextGuard::new(id);
            let mut ctx = NodeContext::new(
                id,
                slot.position,
                &slot.edges,
                slot.models.reliability.as_mut(),
                kernel,
            );
            if let Err(e) = slot.algorithm.init(&mut ctx) {
                nodes.remove(&id);
                return Err(SimError::node(id, e));
            }
        }

        trace!(node = %id, %position, "node added");
        Ok(id)
    }

    /// Create `count` nodes placed by the configured distribution model
    pub fn create_nodes<F>(&mut self, count: usize, mut factory: F) -> SimResult<Vec<NodeId>>
    where
        F: FnMut(NodeId) -> Box<dyn Node>,
    {
        let mut distribution = self
            .registry
            .distribution(&self.config.models.distribution, &self.config)?;
        distribution.set_number_of_nodes(count);

        let mut created = Vec::with_capacity(count);
        for _ in 0..count {
            let position = distribution.next_position(&mut self.kernel.rng);
            let algorithm = factory(NodeId(self.next_id));
            let models = self.registry.node_models(&self.config)?;
            created.push(self.add_node_boxed(algorithm, position, models)?);
        }
        info!(
            count,
            distribution = %self.config.models.distribution,
            "created nodes"
        );
        Ok(created)
    }

    /// Remove a node together with its edges, timers, events, and packets
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), RuntimeError> {
        if self.nodes.remove(&id).is_none() {
            return Err(RuntimeError::NodeNotFound(id));
        }
        for slot in self.nodes.values_mut() {
            if slot.edges.remove(&id) {
                slot.neighborhood_changed = true;
            }
        }
        let events = self.kernel.queue.remove_all_events_for_node(id);
        let packets = self.kernel.air.remove_for_node(id);
        self.kernel.node_timers.remove(&id);
        self.kernel.nacks.remove(&id);
        debug!(node = %id, events, packets, "node removed");
        Ok(())
    }

    /// Add a directed edge `from -> to`
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), RuntimeError> {
        if !self.nodes.contains_key(&to) {
            return Err(RuntimeError::NodeNotFound(to));
        }
        let slot = self
            .nodes
            .get_mut(&from)
            .ok_or(RuntimeError::NodeNotFound(from))?;
        if from != to && slot.edges.insert(to) {
            slot.neighborhood_changed = true;
        }
        Ok(())
    }

    /// Add edges in both directions
    pub fn connect_bidirectional(&mut self, a: NodeId, b: NodeId) -> Result<(), RuntimeError> {
        self.connect(a, b)?;
        self.connect(b, a)
    }

    /// Move a node (host side)
    pub fn set_position(&mut self, id: NodeId, position: Position) -> Result<(), RuntimeError> {
        let slot = self
            .nodes
            .get_mut(&id)
            .ok_or(RuntimeError::NodeNotFound(id))?;
        slot.position = position;
        Ok(())
    }

    /// Recompute every node's edges from the current positions
    pub fn reevaluate_connections(&mut self) -> usize {
        self.connectivity_pass()
    }

    /// Drop all events, packets, and timers and rewind the clock
    ///
    /// Nodes and their edges are kept; the random number generator is
    /// re-seeded so the next run replays from the start.
    pub fn reset(&mut self) {
        self.kernel.clear();
        self.kernel.rng = SimRng::seed_from_u64(self.config.seed);
        info!(nodes = self.nodes.len(), "world reset");
    }

    // ========================================================================
    // Synchronous rounds
    // ========================================================================

    /// Execute one complete round
    ///
    /// The passes run strictly in order and each pass covers every node
    /// before the next one starts. An error abandons the rest of the round.
    pub fn run_round(&mut self) -> SimResult<()> {
        self.begin_round();
        self.pre_round()?;
        self.handle_global_timers()?;
        self.mobility_pass();
        self.connectivity_pass();
        if self.config.interference {
            self.interference_pass();
        }
        self.step_pass()?;
        self.post_round()?;
        self.kernel.stats.rounds_executed += 1;
        Ok(())
    }

    /// Advance the round counter and flip the round parity
    pub fn begin_round(&mut self) {
        self.kernel.now = self.kernel.now.next_round();
        self.kernel.even_round = !self.kernel.even_round;
        debug!(round = self.kernel.now.round(), "round started");
    }

    fn pre_round(&mut self) -> SimResult<()> {
        let mut ctx = GlobalContext::new(&mut self.kernel, self.nodes.len());
        self.global.pre_round(&mut ctx).map_err(SimError::GlobalStep)
    }

    fn post_round(&mut self) -> SimResult<()> {
        let mut ctx = GlobalContext::new(&mut self.kernel, self.nodes.len());
        self.global.post_round(&mut ctx).map_err(SimError::GlobalStep)
    }

    /// Fire every global timer due this round
    pub fn handle_global_timers(&mut self) -> SimResult<()> {
        let due = self.kernel.global_timers.take_due(self.kernel.now);
        for timer in due {
            self.fire_global_timer(timer.tag)?;
        }
        Ok(())
    }

    /// Move every node, if mobility is enabled
    pub fn mobility_pass(&mut self) {
        if !self.config.mobility {
            return;
        }
        let World { nodes, kernel, .. } = self;
        for (id, slot) in nodes.iter_mut() {
            slot.position = slot
                .models
                .mobility
                .next_position(*id, &slot.position, &mut kernel.rng);
        }
    }

    /// Recompute every node's edges against a frozen snapshot of positions
    ///
    /// Returns the number of nodes whose edge set changed.
    pub fn connectivity_pass(&mut self) -> usize {
        let snapshot: Vec<(NodeId, Position)> = self
            .nodes
            .iter()
            .map(|(id, slot)| (*id, slot.position))
            .collect();

        let mut changed = 0;
        for (id, slot) in self.nodes.iter_mut() {
            let edges = slot.models.connectivity.update_connections(
                *id,
                &slot.position,
                &slot.edges,
                &snapshot,
            );
            if edges != slot.edges {
                slot.edges = edges;
                slot.neighborhood_changed = true;
                changed += 1;
            }
        }
        if changed > 0 {
            trace!(changed, "connectivity updated");
        }
        changed
    }

    /// Evaluate interference across all packets in the air, once
    pub fn interference_pass(&mut self) -> usize {
        let World { nodes, kernel, .. } = self;
        let disturbed = kernel.air.test_for_interference(|packet, in_air| {
            nodes
                .get(&packet.destination)
                .map(|slot| {
                    slot.models
                        .interference
                        .is_disturbed(packet, &slot.position, in_air)
                })
                .unwrap_or(false)
        });
        kernel.stats.messages_disturbed += disturbed as u64;
        disturbed
    }

    /// Step every node in ascending id order
    pub fn step_pass(&mut self) -> SimResult<()> {
        for id in self.node_ids() {
            self.step_node(id)?;
        }
        Ok(())
    }

    fn step_node(&mut self, id: NodeId) -> SimResult<()> {
        let World { nodes, kernel, .. } = self;
        let Some(slot) = nodes.get_mut(&id) else {
            return Ok(());
        };
        let _guard = NodeContextGuard::new(id);
        let now = kernel.now;

        let due = kernel
            .node_timers
            .get_mut(&id)
            .map(|timers| timers.take_due(now))
            .unwrap_or_default();
        let mut nacks = kernel.nacks.remove(&id).unwrap_or_default();
        let mut inbox = Vec::new();
        for packet in kernel.air.take_arrived(id, now) {
            if packet.positive_delivery {
                kernel.stats.messages_delivered += 1;
                inbox.push(packet);
            } else if let Some(nack) = kernel.record_loss(packet) {
                if nack.origin == id {
                    nacks.push(nack);
                } else {
                    kernel.nacks.entry(nack.origin).or_default().push(nack);
                }
            }
        }
        kernel.stats.timers_fired += due.len() as u64;

        let changed = std::mem::take(&mut slot.neighborhood_changed);
        let algorithm = &mut slot.algorithm;
        let mut ctx = NodeContext::new(
            id,
            slot.position,
            &slot.edges,
            slot.models.reliability.as_mut(),
            kernel,
        );

        let result = (|| {
            if changed {
                algorithm.neighborhood_change(&mut ctx)?;
            }
            for timer in due {
                algorithm.on_timer(&mut ctx, timer.tag)?;
            }
            algorithm.pre_step(&mut ctx)?;
            if !nacks.is_empty() {
                algorithm.handle_nack_messages(&mut ctx, &nacks)?;
            }
            algorithm.handle_messages(&mut ctx, &inbox)?;
            algorithm.post_step(&mut ctx)
        })();

        trace!(node = %id, round = now.round(), messages = inbox.len(), "node stepped");
        result.map_err(|e| SimError::node(id, e))
    }

    // ========================================================================
    // Asynchronous events
    // ========================================================================

    /// Pop the next event, `None` if the queue is empty
    pub fn next_event(&mut self) -> Option<Event> {
        self.kernel.queue.get_next_event()
    }

    /// Ask the custom global to refill an empty queue
    pub fn refill_event_queue(&mut self) -> SimResult<()> {
        let mut ctx = GlobalContext::new(&mut self.kernel, self.nodes.len());
        self.global
            .handle_empty_event_queue(&mut ctx)
            .map_err(SimError::GlobalStep)
    }

    /// Handle one event popped from the queue
    ///
    /// Sets the clock to the event's fire time first; the handler may insert
    /// further events.
    pub fn handle_event(&mut self, event: Event) -> SimResult<()> {
        self.kernel.now = event.fire_time;
        self.kernel.stats.events_handled += 1;
        match event.kind {
            EventKind::Timer(timer) => {
                self.kernel.stats.timers_fired += 1;
                match timer.target {
                    Some(node) => self.fire_node_timer(node, timer.tag),
                    None => self.fire_global_timer(timer.tag),
                }
            }
            EventKind::Packet(packet) => self.deliver_packet(packet),
        }
    }

    fn fire_node_timer(&mut self, id: NodeId, tag: TimerTag) -> SimResult<()> {
        self.with_node(id, |node, ctx| node.on_timer(ctx, tag))
    }

    fn fire_global_timer(&mut self, tag: TimerTag) -> SimResult<()> {
        let mut ctx = GlobalContext::new(&mut self.kernel, self.nodes.len());
        self.global
            .on_global_timer(&mut ctx, tag)
            .map_err(SimError::GlobalStep)
    }

    fn deliver_packet(&mut self, mut packet: Packet) -> SimResult<()> {
        self.kernel.air.remove(packet.id);

        if packet.positive_delivery && self.config.interference {
            if let Some(slot) = self.nodes.get(&packet.destination) {
                let in_air: Vec<&Packet> = self.kernel.air.iter().collect();
                if slot
                    .models
                    .interference
                    .is_disturbed(&packet, &slot.position, &in_air)
                {
                    packet.deny_delivery();
                    self.kernel.stats.messages_disturbed += 1;
                }
            }
        }

        if packet.positive_delivery && self.nodes.contains_key(&packet.destination) {
            self.kernel.stats.messages_delivered += 1;
            let destination = packet.destination;
            let inbox = [packet];
            return self.with_node(destination, |node, ctx| node.handle_messages(ctx, &inbox));
        }

        match self.kernel.record_loss(packet) {
            Some(nack) => {
                let origin = nack.origin;
                let nacks = [nack];
                self.with_node(origin, |node, ctx| node.handle_nack_messages(ctx, &nacks))
            }
            None => Ok(()),
        }
    }

    /// Run `f` on a node's algorithm with a fresh context; absent nodes are
    /// skipped
    fn with_node<F>(&mut self, id: NodeId, f: F) -> SimResult<()>
    where
        F: FnOnce(&mut dyn Node, &mut NodeContext<'_>) -> Result<(), StepError>,
    {
        let World { nodes, kernel, .. } = self;
        let Some(slot) = nodes.get_mut(&id) else {
            trace!(node = %id, "event for a removed node ignored");
            return Ok(());
        };
        let _guard = NodeContextGuard::new(id);
        let mut ctx = NodeContext::new(
            id,
            slot.position,
            &slot.edges,
            slot.models.reliability.as_mut(),
            kernel,
        );
        f(slot.algorithm.as_mut(), &mut ctx).map_err(|e| SimError::node(id, e))
    }

    // ========================================================================
    // Custom global
    // ========================================================================

    pub fn has_terminated(&self) -> bool {
        self.global.has_terminated(self.kernel.now)
    }

    pub fn on_exit(&mut self) {
        self.global.on_exit();
    }

    /// Start a global timer from the host side
    pub fn start_global_timer(&mut self, delta: f64, tag: TimerTag) -> SimResult<()> {
        let timer = Timer::global(self.kernel.now, delta, tag)?;
        self.kernel.schedule_timer(timer);
        Ok(())
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("mode", &self.kernel.mode)
            .field("now", &self.kernel.now)
            .field("nodes", &self.nodes.len())
            .field("pending_events", &self.kernel.queue.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UnitDiskGraph;
    use std::sync::{Arc, Mutex};

    /// Records every message payload it receives
    struct Recorder {
        log: Arc<Mutex<Vec<(NodeId, u32)>>>,
    }

    impl Node for Recorder {
        fn handle_messages(
            &mut self,
            ctx: &mut NodeContext<'_>,
            inbox: &[Packet],
        ) -> Result<(), StepError> {
            for packet in inbox {
                if let Some(value) = packet.message.downcast_ref::<u32>() {
                    self.log.lock().unwrap().push((ctx.id(), *value));
                }
            }
            Ok(())
        }
    }

    /// Sends its id to every neighbor in round 1
    struct Greeter;

    impl Node for Greeter {
        fn pre_step(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), StepError> {
            if ctx.now().round() == 1 {
                let id = ctx.id().raw();
                ctx.broadcast(Message::new(id));
            }
            Ok(())
        }

        fn handle_messages(
            &mut self,
            _ctx: &mut NodeContext<'_>,
            _inbox: &[Packet],
        ) -> Result<(), StepError> {
            Ok(())
        }
    }

    fn world() -> World {
        World::new(SimConfig::default(), ModelRegistry::with_builtins()).unwrap()
    }

    #[test]
    fn test_node_ids_are_dense_and_ordered() {
        let mut world = world();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let id = world
                .add_node(Recorder { log: log.clone() }, Position::planar(i as f64, 0.0))
                .unwrap();
            assert_eq!(id, NodeId(i));
        }
        assert_eq!(world.node_ids(), NodeId::range(3));
    }

    #[test]
    fn test_connectivity_pass_uses_udg() {
        let mut world = world();
        world.add_node(Greeter, Position::planar(0.0, 0.0)).unwrap();
        world.add_node(Greeter, Position::planar(10.0, 0.0)).unwrap();
        world.add_node(Greeter, Position::planar(90.0, 0.0)).unwrap();

        assert_eq!(world.reevaluate_connections(), 2);
        assert_eq!(world.edges(NodeId(0)).unwrap(), &BTreeSet::from([NodeId(1)]));
        assert!(world.edges(NodeId(2)).unwrap().is_empty());
    }

    #[test]
    fn test_sync_messages_arrive_next_round() {
        let mut world = world();
        let log = Arc::new(Mutex::new(Vec::new()));
        let models = || {
            NodeModels::fixed().with_connectivity(UnitDiskGraph::new(50.0))
        };
        world
            .add_node_with_models(Greeter, Position::planar(0.0, 0.0), models())
            .unwrap();
        world
            .add_node_with_models(Recorder { log: log.clone() }, Position::planar(5.0, 0.0), models())
            .unwrap();

        world.run_round().unwrap();
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(world.packets_in_air().len(), 1);

        world.run_round().unwrap();
        assert_eq!(*log.lock().unwrap(), vec![(NodeId(1), 0)]);
        assert_eq!(world.stats().messages_delivered, 1);
        assert_eq!(world.stats().rounds_executed, 2);
    }

    #[test]
    fn test_round_parity_flips() {
        let mut world = world();
        assert!(world.is_even_round());
        world.run_round().unwrap();
        assert!(!world.is_even_round());
        assert_eq!(world.now(), SimTime::new(1.0));
        world.run_round().unwrap();
        assert!(world.is_even_round());
    }

    #[test]
    fn test_remove_node_cleans_up() {
        let mut world = world();
        world.add_node(Greeter, Position::planar(0.0, 0.0)).unwrap();
        world.add_node(Greeter, Position::planar(1.0, 0.0)).unwrap();
        world.reevaluate_connections();
        world.run_round().unwrap();
        assert_eq!(world.packets_in_air().len(), 2);

        world.remove_node(NodeId(1)).unwrap();
        assert!(world.packets_in_air().is_empty());
        assert!(world.edges(NodeId(0)).unwrap().is_empty());
        assert!(matches!(
            world.remove_node(NodeId(1)),
            Err(RuntimeError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_reset_keeps_nodes() {
        let mut world = world();
        world.add_node(Greeter, Position::ORIGIN).unwrap();
        world.run_round().unwrap();
        world.start_global_timer(5.0, TimerTag(1)).unwrap();

        world.reset();
        assert_eq!(world.now(), SimTime::ZERO);
        assert_eq!(world.stats(), &SimStats::default());
        assert_eq!(world.node_count(), 1);
    }
}
