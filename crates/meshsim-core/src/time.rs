//! Simulation time
//!
//! In asynchronous mode time is the fire time of the most recently handled
//! event; in synchronous mode it is the round counter. Both are carried as
//! an `f64` wrapped in [`SimTime`], which is totally ordered through
//! [`f64::total_cmp`] so it can key ordered collections.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A point in simulation time
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimTime(f64);

impl SimTime {
    /// The start of every simulation
    pub const ZERO: SimTime = SimTime(0.0);

    /// Wrap a raw time value
    pub const fn new(time: f64) -> Self {
        Self(time)
    }

    /// Get the raw time value
    pub const fn as_f64(self) -> f64 {
        self.0
    }

    /// The time `delta` after `self`
    pub fn plus(self, delta: f64) -> Self {
        Self(self.0 + delta)
    }

    /// The time of the next round (synchronous mode)
    pub fn next_round(self) -> Self {
        Self(self.0 + 1.0)
    }

    /// Round counter view of this time (synchronous mode)
    pub fn round(self) -> u64 {
        if self.0 <= 0.0 { 0 } else { self.0 as u64 }
    }

    /// Returns `true` if the value is neither NaN nor infinite
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

// Bit-level hashing agrees with `total_cmp`: `-0.0` and `0.0` are distinct
// keys, and so is every NaN payload.
impl Hash for SimTime {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl From<f64> for SimTime {
    fn from(time: f64) -> Self {
        Self(time)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}", self.0)
    }
}
