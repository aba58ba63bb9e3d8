//! Demo algorithms
//!
//! Small algorithms that exercise the schedulers: flooding (message
//! fan-out over edges), ping-pong (timers and direct sends), and a round
//! limit for the termination predicate.

pub mod flooding;
pub mod ping_pong;
pub mod round_limit;

pub use flooding::{FloodStats, FloodToken, FloodingGlobal, FloodingNode};
pub use ping_pong::{Ping, PingPongNode, Pong};
pub use round_limit::RoundLimit;
