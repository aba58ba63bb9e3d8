//! Algorithm extension points
//!
//! A simulated algorithm is a [`Node`] implementation; simulation-wide logic
//! (termination, per-round bookkeeping, global timers) lives in a
//! [`CustomGlobal`]. Both are driven by the schedulers and talk back to the
//! simulation through a context value that is only valid for the duration
//! of one callback.

use std::collections::BTreeSet;

use meshsim_core::{
    Message, NodeId, Packet, PacketId, Position, ReliabilityModel, SimRng, SimTime, StepError,
    Timer, TimerTag,
};

use crate::world::Kernel;

/// Per-node algorithm code
///
/// In synchronous mode each round calls, in order: [`neighborhood_change`]
/// (only if the node's edges changed), [`on_timer`] for every due timer,
/// [`pre_step`], [`handle_nack_messages`], [`handle_messages`], and
/// [`post_step`]. In asynchronous mode only [`on_timer`],
/// [`handle_messages`], and [`handle_nack_messages`] are called, one event
/// at a time.
///
/// Returning [`StepError::WrongConfiguration`] stops the current run and
/// hands control back to the host; any other error is fatal.
///
/// [`neighborhood_change`]: Node::neighborhood_change
/// [`on_timer`]: Node::on_timer
/// [`pre_step`]: Node::pre_step
/// [`handle_nack_messages`]: Node::handle_nack_messages
/// [`handle_messages`]: Node::handle_messages
/// [`post_step`]: Node::post_step
pub trait Node: Send {
    /// Called once when the node is added to the world
    fn init(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), StepError> {
        let _ = ctx;
        Ok(())
    }

    /// Verify that the node can run under the current models
    fn check_requirements(&self) -> Result<(), StepError> {
        Ok(())
    }

    fn neighborhood_change(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), StepError> {
        let _ = ctx;
        Ok(())
    }

    fn pre_step(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), StepError> {
        let _ = ctx;
        Ok(())
    }

    /// Packets that reached this node
    fn handle_messages(
        &mut self,
        ctx: &mut NodeContext<'_>,
        inbox: &[Packet],
    ) -> Result<(), StepError>;

    /// Packets this node sent that were lost on the way
    ///
    /// In synchronous mode a loss is detected during the receiver's step,
    /// so the NACK reaches the sender in the same round when the sender's
    /// id is above the receiver's, and in the next round otherwise. A
    /// sender stepping before its receiver sees the NACK one round later.
    /// In asynchronous mode the NACK is handled as part of the delivery
    /// event that lost the packet.
    fn handle_nack_messages(
        &mut self,
        ctx: &mut NodeContext<'_>,
        nacks: &[Packet],
    ) -> Result<(), StepError> {
        let _ = (ctx, nacks);
        Ok(())
    }

    fn post_step(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), StepError> {
        let _ = ctx;
        Ok(())
    }

    fn on_timer(&mut self, ctx: &mut NodeContext<'_>, tag: TimerTag) -> Result<(), StepError> {
        let _ = (ctx, tag);
        Ok(())
    }

    /// One-line description for host status output
    fn describe(&self) -> String {
        String::new()
    }
}

/// Simulation-wide hooks
pub trait CustomGlobal: Send {
    /// Called at the start of every round, before global timers fire
    fn pre_round(&mut self, ctx: &mut GlobalContext<'_>) -> Result<(), StepError> {
        let _ = ctx;
        Ok(())
    }

    /// Called at the end of every round
    fn post_round(&mut self, ctx: &mut GlobalContext<'_>) -> Result<(), StepError> {
        let _ = ctx;
        Ok(())
    }

    fn on_global_timer(
        &mut self,
        ctx: &mut GlobalContext<'_>,
        tag: TimerTag,
    ) -> Result<(), StepError> {
        let _ = (ctx, tag);
        Ok(())
    }

    /// Checked after every round or event; `true` ends the run
    fn has_terminated(&self, now: SimTime) -> bool {
        let _ = now;
        false
    }

    /// Asked to refill the event queue when it runs dry
    fn handle_empty_event_queue(&mut self, ctx: &mut GlobalContext<'_>) -> Result<(), StepError> {
        let _ = ctx;
        Ok(())
    }

    /// Called once before the process exits
    fn on_exit(&mut self) {}
}

/// A custom global without behavior
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGlobal;

impl CustomGlobal for NoGlobal {}

/// A node's view of the simulation during one callback
pub struct NodeContext<'a> {
    id: NodeId,
    position: Position,
    edges: &'a BTreeSet<NodeId>,
    reliability: &'a mut dyn ReliabilityModel,
    kernel: &'a mut Kernel,
}

impl<'a> NodeContext<'a> {
    pub(crate) fn new(
        id: NodeId,
        position: Position,
        edges: &'a BTreeSet<NodeId>,
        reliability: &'a mut dyn ReliabilityModel,
        kernel: &'a mut Kernel,
    ) -> Self {
        Self {
            id,
            position,
            edges,
            reliability,
            kernel,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn now(&self) -> SimTime {
        self.kernel.now()
    }

    /// Parity of the current round (synchronous mode)
    pub fn is_even_round(&self) -> bool {
        self.kernel.is_even_round()
    }

    /// Nodes this node has an outgoing edge to
    pub fn neighbors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.edges.iter().copied()
    }

    pub fn has_edge_to(&self, node: NodeId) -> bool {
        self.edges.contains(&node)
    }

    /// Send over an edge; returns `None` if there is no edge to `to`
    pub fn send(&mut self, to: NodeId, message: Message) -> Option<PacketId> {
        if !self.edges.contains(&to) {
            return None;
        }
        Some(self.send_direct(to, message))
    }

    /// Send to any node, regardless of edges
    pub fn send_direct(&mut self, to: NodeId, message: Message) -> PacketId {
        self.kernel
            .transmit(self.id, self.position, to, message, &mut *self.reliability)
    }

    /// Send to every neighbor; returns the number of packets sent
    pub fn broadcast(&mut self, message: Message) -> usize {
        let targets: Vec<NodeId> = self.edges.iter().copied().collect();
        for to in &targets {
            self.send_direct(*to, message.clone());
        }
        targets.len()
    }

    /// Start a timer on this node firing `delta` from now
    pub fn start_timer_relative(&mut self, delta: f64, tag: TimerTag) -> Result<(), StepError> {
        let timer = Timer::relative(self.now(), delta, Some(self.id), tag)?;
        self.kernel.schedule_timer(timer);
        Ok(())
    }

    /// Start a timer on this node firing at `time`
    pub fn start_timer_absolute(&mut self, time: SimTime, tag: TimerTag) -> Result<(), StepError> {
        let timer = Timer::absolute(self.now(), time, Some(self.id), tag)?;
        self.kernel.schedule_timer(timer);
        Ok(())
    }

    /// Start a global timer firing `delta` from now
    pub fn start_global_timer(&mut self, delta: f64, tag: TimerTag) -> Result<(), StepError> {
        let timer = Timer::global(self.now(), delta, tag)?;
        self.kernel.schedule_timer(timer);
        Ok(())
    }

    /// The run's random number generator
    pub fn rng(&mut self) -> &mut SimRng {
        self.kernel.rng()
    }
}

/// The custom global's view of the simulation during one callback
pub struct GlobalContext<'a> {
    kernel: &'a mut Kernel,
    node_count: usize,
}

impl<'a> GlobalContext<'a> {
    pub(crate) fn new(kernel: &'a mut Kernel, node_count: usize) -> Self {
        Self { kernel, node_count }
    }

    pub fn now(&self) -> SimTime {
        self.kernel.now()
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn pending_events(&self) -> usize {
        self.kernel.queue().len()
    }

    pub fn start_global_timer(&mut self, delta: f64, tag: TimerTag) -> Result<(), StepError> {
        let timer = Timer::global(self.now(), delta, tag)?;
        self.kernel.schedule_timer(timer);
        Ok(())
    }

    pub fn start_global_timer_absolute(
        &mut self,
        time: SimTime,
        tag: TimerTag,
    ) -> Result<(), StepError> {
        let timer = Timer::absolute(self.now(), time, None, tag)?;
        self.kernel.schedule_timer(timer);
        Ok(())
    }

    /// Start a timer on `node` firing `delta` from now
    pub fn start_node_timer(
        &mut self,
        node: NodeId,
        delta: f64,
        tag: TimerTag,
    ) -> Result<(), StepError> {
        let timer = Timer::relative(self.now(), delta, Some(node), tag)?;
        self.kernel.schedule_timer(timer);
        Ok(())
    }

    pub fn rng(&mut self) -> &mut SimRng {
        self.kernel.rng()
    }
}
