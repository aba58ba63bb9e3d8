//! Runtime state shared between the host and the scheduler thread
//!
//! The scheduler is the only writer of the clock and the counters; the host
//! reads them at any time and may set the abort flag concurrently. All
//! fields are atomics so neither side ever blocks on the other.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use meshsim_core::SimTime;
use serde::Serialize;

/// Flags and counters of the current run
#[derive(Debug)]
pub struct RuntimeState {
    running: AtomicBool,
    abort_requested: AtomicBool,
    /// `f64` bits of the current time
    time: AtomicU64,
    even_round: AtomicBool,
    events: AtomicU64,
    rounds: AtomicU64,
}

/// A consistent copy of [`RuntimeState`] for display
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub time: SimTime,
    pub is_running: bool,
    pub abort_requested: bool,
    pub is_even_round: bool,
    pub events: u64,
    pub rounds: u64,
}

impl RuntimeState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            abort_requested: AtomicBool::new(false),
            time: AtomicU64::new(SimTime::ZERO.as_f64().to_bits()),
            even_round: AtomicBool::new(true),
            events: AtomicU64::new(0),
            rounds: AtomicU64::new(0),
        }
    }

    /// Claim the running flag; `false` if a run is already active
    pub fn try_begin_run(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn end_run(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ask the active scheduler to stop at the next boundary
    pub fn request_abort(&self) {
        self.abort_requested.store(true, Ordering::Release);
    }

    pub fn abort_requested(&self) -> bool {
        self.abort_requested.load(Ordering::Acquire)
    }

    /// Consume a pending abort request
    pub fn take_abort(&self) -> bool {
        self.abort_requested.swap(false, Ordering::AcqRel)
    }

    pub fn clear_abort(&self) {
        self.abort_requested.store(false, Ordering::Release);
    }

    pub fn set_time(&self, time: SimTime, even_round: bool) {
        self.time.store(time.as_f64().to_bits(), Ordering::Release);
        self.even_round.store(even_round, Ordering::Release);
    }

    pub fn time(&self) -> SimTime {
        SimTime::new(f64::from_bits(self.time.load(Ordering::Acquire)))
    }

    pub fn record_event(&self) -> u64 {
        self.events.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn record_round(&self) -> u64 {
        self.rounds.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn events(&self) -> u64 {
        self.events.load(Ordering::Acquire)
    }

    pub fn rounds(&self) -> u64 {
        self.rounds.load(Ordering::Acquire)
    }

    /// Rewind the clock and counters (host side, idle only)
    pub fn reset(&self) {
        self.set_time(SimTime::ZERO, true);
        self.events.store(0, Ordering::Release);
        self.rounds.store(0, Ordering::Release);
        self.clear_abort();
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            time: self.time(),
            is_running: self.is_running(),
            abort_requested: self.abort_requested(),
            is_even_round: self.even_round.load(Ordering::Acquire),
            events: self.events(),
            rounds: self.rounds(),
        }
    }
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the running flag when dropped, including on unwind
pub(crate) struct RunningGuard<'a> {
    state: &'a RuntimeState,
}

impl<'a> RunningGuard<'a> {
    pub(crate) fn new(state: &'a RuntimeState) -> Self {
        Self { state }
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.state.end_run();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_run_claim() {
        let state = RuntimeState::new();
        assert!(state.try_begin_run());
        assert!(!state.try_begin_run());
        state.end_run();
        assert!(state.try_begin_run());
    }

    #[test]
    fn test_abort_is_consumed() {
        let state = RuntimeState::new();
        state.request_abort();
        assert!(state.abort_requested());
        assert!(state.take_abort());
        assert!(!state.take_abort());
    }

    #[test]
    fn test_guard_releases_running_flag() {
        let state = RuntimeState::new();
        assert!(state.try_begin_run());
        {
            let _guard = RunningGuard::new(&state);
        }
        assert!(!state.is_running());
    }

    #[test]
    fn test_time_round_trips_through_bits() {
        let state = RuntimeState::new();
        state.set_time(SimTime::new(12.5), false);
        state.record_event();
        let snapshot = state.snapshot();
        assert_eq!(snapshot.time, SimTime::new(12.5));
        assert!(!snapshot.is_even_round);
        assert_eq!(snapshot.events, 1);

        state.reset();
        assert_eq!(state.time(), SimTime::ZERO);
        assert_eq!(state.events(), 0);
    }
}
