//! Stop a run at a fixed time

use meshsim_core::SimTime;

use crate::node::CustomGlobal;

/// Terminates once simulation time reaches `limit`
///
/// In synchronous mode time is the round counter, so this is a round limit.
#[derive(Debug, Clone, Copy)]
pub struct RoundLimit {
    limit: f64,
}

impl RoundLimit {
    pub fn new(limit: u64) -> Self {
        Self {
            limit: limit as f64,
        }
    }

    pub fn at_time(limit: SimTime) -> Self {
        Self {
            limit: limit.as_f64(),
        }
    }
}

impl CustomGlobal for RoundLimit {
    fn has_terminated(&self, now: SimTime) -> bool {
        now.as_f64() >= self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit() {
        let limit = RoundLimit::new(3);
        assert!(!limit.has_terminated(SimTime::new(2.0)));
        assert!(limit.has_terminated(SimTime::new(3.0)));
        assert!(RoundLimit::at_time(SimTime::new(2.5)).has_terminated(SimTime::new(2.5)));
    }
}
