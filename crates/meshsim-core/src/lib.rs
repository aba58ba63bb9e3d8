//! # meshsim core
//!
//! Core types, ordering primitives, and collaborator traits for the meshsim
//! network algorithm simulator.
//!
//! Everything in this crate is free of threads and global state: the
//! schedulers in the `meshsim` crate own these values and drive them.
//!
//! ## Key Types
//!
//! - [`NodeId`]: Dense, ordered node identifier
//! - [`SimTime`]: Totally ordered simulation time
//! - [`Event`] / [`EventQueue`]: The `(fire_time, sequence)` ordered backlog
//!   used in asynchronous mode
//! - [`Timer`] / [`TimerList`]: One-shot deferred actions
//! - [`Packet`] / [`Message`]: Transmission envelope and opaque payload
//!
//! ## Key Traits
//!
//! - [`MobilityModel`], [`ConnectivityModel`], [`InterferenceModel`],
//!   [`ReliabilityModel`], [`TransmissionModel`], [`DistributionModel`]:
//!   the fixed extension points the schedulers call on every node

pub mod error;
pub mod event;
pub mod identity;
pub mod message;
pub mod position;
pub mod time;
pub mod timer;
pub mod traits;

// Re-export main types
pub use error::*;
pub use event::{Event, EventKey, EventKind, EventQueue};
pub use identity::NodeId;
pub use message::{Message, Packet, PacketId};
pub use position::Position;
pub use time::SimTime;
pub use timer::{Timer, TimerList, TimerTag};
pub use traits::*;

/// The single random number generator type used by every model.
///
/// All randomness in a run flows from one seeded instance so that a fixed
/// seed reproduces the run exactly.
pub type SimRng = rand::rngs::StdRng;
