//! One-shot timers
//!
//! A timer is plain data: when it fires, its [`TimerTag`] is handed to the
//! owning node (or to the custom global for global timers), which decides
//! what the tag means. Validation happens at construction, so an invalid
//! timer is never scheduled.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TimerError;
use crate::identity::NodeId;
use crate::time::SimTime;

/// Algorithm-defined label identifying what a timer should do when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerTag(pub u64);

/// A deferred, one-shot action bound to a node or to the simulation
#[derive(Debug, Clone, PartialEq)]
pub struct Timer {
    pub fire_time: SimTime,
    /// `None` for global timers
    pub target: Option<NodeId>,
    pub tag: TimerTag,
}

impl Timer {
    /// A timer firing `delta` after `now`
    pub fn relative(
        now: SimTime,
        delta: f64,
        target: Option<NodeId>,
        tag: TimerTag,
    ) -> Result<Self, TimerError> {
        if !delta.is_finite() || delta <= 0.0 {
            return Err(TimerError::NonPositiveDelay(delta));
        }
        Ok(Self {
            fire_time: now.plus(delta),
            target,
            tag,
        })
    }

    /// A timer firing at `time`, which must lie strictly after `now`
    pub fn absolute(
        now: SimTime,
        time: SimTime,
        target: Option<NodeId>,
        tag: TimerTag,
    ) -> Result<Self, TimerError> {
        if !time.is_finite() || time <= now {
            return Err(TimerError::NotInFuture {
                requested: time.as_f64(),
                now: now.as_f64(),
            });
        }
        Ok(Self {
            fire_time: time,
            target,
            tag,
        })
    }

    /// A global timer firing `delta` after `now`
    pub fn global(now: SimTime, delta: f64, tag: TimerTag) -> Result<Self, TimerError> {
        Self::relative(now, delta, None, tag)
    }

    pub fn is_global(&self) -> bool {
        self.target.is_none()
    }

    pub fn is_due(&self, now: SimTime) -> bool {
        self.fire_time <= now
    }
}

/// Pending timers of one owner in synchronous mode
///
/// Timers are drained in `(fire_time, start order)` order, so two timers due
/// in the same round fire in the order they were started.
#[derive(Debug, Default, Clone)]
pub struct TimerList {
    timers: BTreeMap<(SimTime, u64), Timer>,
    started: u64,
}

impl TimerList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, timer: Timer) {
        let order = self.started;
        self.started += 1;
        self.timers.insert((timer.fire_time, order), timer);
    }

    /// Remove and return every timer due at `now`
    pub fn take_due(&mut self, now: SimTime) -> Vec<Timer> {
        let mut due = Vec::new();
        while let Some(((fire_time, _), _)) = self.timers.first_key_value() {
            if *fire_time > now {
                break;
            }
            if let Some((_, timer)) = self.timers.pop_first() {
                due.push(timer);
            }
        }
        due
    }

    pub fn next_fire_time(&self) -> Option<SimTime> {
        self.timers.keys().next().map(|(time, _)| *time)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Timer> {
        self.timers.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAG: TimerTag = TimerTag(1);

    #[test]
    fn test_relative_rejects_non_positive_delay() {
        let now = SimTime::new(10.0);
        assert!(matches!(
            Timer::relative(now, 0.0, Some(NodeId(1)), TAG),
            Err(TimerError::NonPositiveDelay(_))
        ));
        assert!(Timer::relative(now, -1.0, Some(NodeId(1)), TAG).is_err());
        assert!(Timer::relative(now, f64::NAN, Some(NodeId(1)), TAG).is_err());
        assert!(Timer::global(now, 0.0, TAG).is_err());
    }

    #[test]
    fn test_relative_fire_time() {
        let timer = Timer::relative(SimTime::new(10.0), 3.0, Some(NodeId(2)), TAG).unwrap();
        assert_eq!(timer.fire_time, SimTime::new(13.0));
        assert_eq!(timer.target, Some(NodeId(2)));
        assert!(!timer.is_global());
    }

    #[test]
    fn test_absolute_must_be_in_future() {
        let now = SimTime::new(4.0);
        assert!(matches!(
            Timer::absolute(now, now, None, TAG),
            Err(TimerError::NotInFuture { .. })
        ));
        assert!(Timer::absolute(now, SimTime::new(3.0), None, TAG).is_err());
        let timer = Timer::absolute(now, SimTime::new(4.5), None, TAG).unwrap();
        assert!(timer.is_global());
    }

    #[test]
    fn test_timer_list_drains_due_in_start_order() {
        let mut list = TimerList::new();
        let now = SimTime::ZERO;
        list.push(Timer::relative(now, 2.0, Some(NodeId(0)), TimerTag(10)).unwrap());
        list.push(Timer::relative(now, 1.0, Some(NodeId(0)), TimerTag(20)).unwrap());
        list.push(Timer::relative(now, 2.0, Some(NodeId(0)), TimerTag(30)).unwrap());
        list.push(Timer::relative(now, 5.0, Some(NodeId(0)), TimerTag(40)).unwrap());

        assert!(list.take_due(SimTime::new(0.5)).is_empty());

        let due: Vec<_> = list
            .take_due(SimTime::new(2.0))
            .into_iter()
            .map(|t| t.tag)
            .collect();
        assert_eq!(due, vec![TimerTag(20), TimerTag(10), TimerTag(30)]);
        assert_eq!(list.len(), 1);
        assert_eq!(list.next_fire_time(), Some(SimTime::new(5.0)));
    }
}
