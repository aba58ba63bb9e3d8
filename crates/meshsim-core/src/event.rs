//! Events and the event queue
//!
//! The [`EventQueue`] is the single source of truth for "what happens next"
//! in asynchronous mode. Events are ordered by `(fire_time, sequence)`:
//! the sequence number is assigned on insertion and breaks ties between
//! events with identical fire times, so equal-time events are dispatched in
//! insertion order. Without the tie-break a seeded run would not be
//! reproducible.

use std::collections::BTreeMap;
use std::fmt;

use crate::identity::NodeId;
use crate::message::Packet;
use crate::time::SimTime;
use crate::timer::Timer;

/// What an event does when handled
#[derive(Debug, Clone)]
pub enum EventKind {
    /// A packet reaching its destination
    Packet(Packet),
    /// A timer firing
    Timer(Timer),
}

/// A timestamped unit of work in asynchronous mode
#[derive(Debug, Clone)]
pub struct Event {
    pub fire_time: SimTime,
    /// Assigned by [`EventQueue::insert`] when unset
    pub sequence: Option<u64>,
    pub kind: EventKind,
}

impl Event {
    /// The arrival of `packet` at its destination
    pub fn packet(packet: Packet) -> Self {
        Self {
            fire_time: packet.arrival_time,
            sequence: None,
            kind: EventKind::Packet(packet),
        }
    }

    /// The expiry of `timer`
    pub fn timer(timer: Timer) -> Self {
        Self {
            fire_time: timer.fire_time,
            sequence: None,
            kind: EventKind::Timer(timer),
        }
    }

    /// The node this event is delivered to, `None` for global timers
    pub fn target(&self) -> Option<NodeId> {
        match &self.kind {
            EventKind::Packet(packet) => Some(packet.destination),
            EventKind::Timer(timer) => timer.target,
        }
    }

    /// Returns `true` if the event involves `node` as target or packet origin
    pub fn involves(&self, node: NodeId) -> bool {
        match &self.kind {
            EventKind::Packet(packet) => packet.destination == node || packet.origin == node,
            EventKind::Timer(timer) => timer.target == Some(node),
        }
    }

    pub fn is_node_event(&self) -> bool {
        self.target().is_some()
    }

    /// Ordering key, available once the event has been inserted
    pub fn key(&self) -> Option<EventKey> {
        self.sequence.map(|sequence| EventKey {
            fire_time: self.fire_time,
            sequence,
        })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EventKind::Packet(packet) => write!(
                f,
                "packet {} {} -> {} at {}",
                packet.id, packet.origin, packet.destination, self.fire_time
            ),
            EventKind::Timer(timer) => match timer.target {
                Some(node) => write!(f, "timer {:?} on {} at {}", timer.tag, node, self.fire_time),
                None => write!(f, "global timer {:?} at {}", timer.tag, self.fire_time),
            },
        }
    }
}

/// Dispatch-order key of a queued event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey {
    pub fire_time: SimTime,
    pub sequence: u64,
}

/// Pending events ordered by `(fire_time, sequence)`
#[derive(Debug, Default)]
pub struct EventQueue {
    events: BTreeMap<EventKey, Event>,
    next_sequence: u64,
    event_number: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an event, assigning it the next sequence number if it has none
    ///
    /// A preset sequence is kept only when it is ahead of every sequence
    /// handed out so far; otherwise it could collide with a queued event, so
    /// the event gets a fresh one instead. Insertion never displaces a
    /// queued event.
    pub fn insert(&mut self, mut event: Event) -> EventKey {
        let sequence = match event.sequence {
            Some(preset) if preset >= self.next_sequence && preset < u64::MAX => {
                self.next_sequence = preset + 1;
                preset
            }
            _ => self.fresh_sequence(),
        };
        event.sequence = Some(sequence);
        let key = EventKey {
            fire_time: event.fire_time,
            sequence,
        };
        self.events.insert(key, event);
        self.event_number = self.event_number.saturating_add(1);
        key
    }

    fn fresh_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.saturating_add(1);
        sequence
    }

    /// Remove and return the event with the smallest key, `None` when empty
    pub fn get_next_event(&mut self) -> Option<Event> {
        self.events.pop_first().map(|(_, event)| event)
    }

    /// Fire time of the next event without removing it
    pub fn peek_time(&self) -> Option<SimTime> {
        self.events.keys().next().map(|key| key.fire_time)
    }

    pub fn peek(&self) -> Option<&Event> {
        self.events.values().next()
    }

    /// Remove the event with the given sequence number
    pub fn drop_event(&mut self, sequence: u64) -> Option<Event> {
        let key = *self.events.keys().find(|key| key.sequence == sequence)?;
        self.events.remove(&key)
    }

    /// Remove every pending event
    pub fn drop_all_events(&mut self) {
        self.events.clear();
    }

    /// Remove every event targeting `node` or carrying a packet from it
    pub fn remove_all_events_for_node(&mut self, node: NodeId) -> usize {
        let before = self.events.len();
        self.events.retain(|_, event| !event.involves(node));
        before - self.events.len()
    }

    /// Remove every node-bound event, keeping global timers
    pub fn prune_all_node_events(&mut self) -> usize {
        let before = self.events.len();
        self.events.retain(|_, event| !event.is_node_event());
        before - self.events.len()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Pending events in dispatch order
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    /// Number of insertions ever made; diagnostic only
    pub fn event_number(&self) -> u64 {
        self.event_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, PacketId};
    use crate::position::Position;
    use crate::timer::TimerTag;

    fn node_timer(time: f64, node: u32, tag: u64) -> Event {
        Event::timer(Timer {
            fire_time: SimTime::new(time),
            target: Some(NodeId(node)),
            tag: TimerTag(tag),
        })
    }

    fn global_timer(time: f64, tag: u64) -> Event {
        Event::timer(Timer {
            fire_time: SimTime::new(time),
            target: None,
            tag: TimerTag(tag),
        })
    }

    fn packet(time: f64, from: u32, to: u32) -> Event {
        Event::packet(Packet {
            id: PacketId(0),
            origin: NodeId(from),
            destination: NodeId(to),
            message: Message::new(()),
            send_time: SimTime::ZERO,
            arrival_time: SimTime::new(time),
            positive_delivery: true,
            origin_position: Position::ORIGIN,
            intensity: 1.0,
        })
    }

    fn tag_of(event: &Event) -> u64 {
        match &event.kind {
            EventKind::Timer(timer) => timer.tag.0,
            EventKind::Packet(_) => u64::MAX,
        }
    }

    #[test]
    fn test_equal_fire_time_is_fifo() {
        let mut queue = EventQueue::new();
        queue.insert(node_timer(5.0, 0, 1)); // A
        queue.insert(node_timer(5.0, 0, 2)); // B

        let first = queue.get_next_event().unwrap();
        assert_eq!(tag_of(&first), 1);
        assert_eq!(tag_of(&queue.get_next_event().unwrap()), 2);
    }

    #[test]
    fn test_pops_in_non_decreasing_time() {
        let mut queue = EventQueue::new();
        for (i, time) in [7.0, 1.0, 3.5, 1.0, 9.0, 0.5].into_iter().enumerate() {
            queue.insert(node_timer(time, 0, i as u64));
        }

        let mut last = SimTime::ZERO;
        let mut popped = Vec::new();
        while let Some(event) = queue.get_next_event() {
            assert!(event.fire_time >= last);
            last = event.fire_time;
            popped.push(tag_of(&event));
        }
        assert_eq!(popped, vec![5, 1, 3, 2, 0, 4]);
    }

    #[test]
    fn test_empty_queue_returns_none() {
        let mut queue = EventQueue::new();
        assert!(queue.get_next_event().is_none());
        assert!(queue.peek_time().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_sequence_is_never_reused() {
        let mut queue = EventQueue::new();
        let a = queue.insert(node_timer(1.0, 0, 1));
        queue.get_next_event();
        let b = queue.insert(node_timer(1.0, 0, 2));
        assert!(b.sequence > a.sequence);
        assert_eq!(queue.event_number(), 2);
    }

    #[test]
    fn test_preset_sequence_collision_keeps_both() {
        let mut queue = EventQueue::new();
        let mut first = node_timer(5.0, 0, 1);
        first.sequence = Some(0);
        let mut second = node_timer(5.0, 0, 2);
        second.sequence = Some(0);

        let a = queue.insert(first);
        let b = queue.insert(second);
        assert_ne!(a, b);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.event_number(), 2);

        // the earlier insertion still comes first
        assert_eq!(tag_of(&queue.get_next_event().unwrap()), 1);
        assert_eq!(tag_of(&queue.get_next_event().unwrap()), 2);
    }

    #[test]
    fn test_preset_sequence_ahead_is_kept() {
        let mut queue = EventQueue::new();
        let mut event = node_timer(1.0, 0, 1);
        event.sequence = Some(10);
        assert_eq!(queue.insert(event).sequence, 10);
        assert_eq!(queue.insert(node_timer(1.0, 0, 2)).sequence, 11);

        // stale presets are renumbered
        let mut stale = node_timer(1.0, 0, 3);
        stale.sequence = Some(3);
        assert_eq!(queue.insert(stale).sequence, 12);
    }

    #[test]
    fn test_max_preset_sequence_does_not_overflow() {
        let mut queue = EventQueue::new();
        let mut event = node_timer(1.0, 0, 1);
        event.sequence = Some(u64::MAX);
        let key = queue.insert(event);
        assert_eq!(key.sequence, 0);
        assert_eq!(queue.insert(node_timer(1.0, 0, 2)).sequence, 1);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_removal_keeps_order() {
        let mut queue = EventQueue::new();
        queue.insert(node_timer(1.0, 1, 1));
        let dropped = queue.insert(node_timer(2.0, 2, 2));
        queue.insert(global_timer(2.0, 3));
        queue.insert(packet(3.0, 1, 2));
        queue.insert(node_timer(4.0, 3, 5));

        assert!(queue.drop_event(dropped.sequence).is_some());
        assert!(queue.drop_event(dropped.sequence).is_none());

        // Packet from node 1 counts as involving node 1
        assert_eq!(queue.remove_all_events_for_node(NodeId(1)), 2);
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.prune_all_node_events(), 1);
        let remaining: Vec<_> = queue.iter().map(tag_of).collect();
        assert_eq!(remaining, vec![3]);

        queue.drop_all_events();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_event_targets() {
        assert_eq!(packet(1.0, 3, 4).target(), Some(NodeId(4)));
        assert_eq!(global_timer(1.0, 0).target(), None);
        assert!(node_timer(1.0, 2, 0).is_node_event());
    }
}
