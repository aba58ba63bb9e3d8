//! # meshsim
//!
//! A network algorithm simulator. Per-node algorithm code runs either in
//! fixed **rounds** (synchronous mode) or as globally ordered **events**
//! (asynchronous mode), deterministically for a fixed seed, on a scheduler
//! thread that a host can observe and abort.
//!
//! ## Architecture
//!
//! - **World** (`world.rs`): nodes, their models, and the kernel (clock,
//!   event queue, timers, packets in the air, random number generator)
//! - **Node API** (`node.rs`): the [`Node`] and [`CustomGlobal`] traits and
//!   the contexts algorithm code uses to send messages and start timers
//! - **Models** (`models/`, `registry.rs`): built-in mobility, connectivity,
//!   interference, reliability, transmission, and distribution models,
//!   looked up by name
//! - **Schedulers** (`scheduler/`): the round-driven and event-driven
//!   state machines
//! - **Runtime** (`runtime.rs`): one scheduler thread per run, the startup
//!   gate, and cooperative abort
//! - **Host** (`host.rs`): progress notifications and exit strategies
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use meshsim::*;
//!
//! let scenario = Scenario::new(Algorithm::Flooding, 16, TopologyKind::Ring);
//! let world = scenario.build_world(SimConfig::default(), ModelRegistry::default())?;
//! let runtime = Runtime::new(world, Arc::new(LoggingHost), Arc::new(BatchExit))?;
//!
//! let report = runtime.run_blocking(100, false).unwrap();
//! println!("{} after {} rounds", report.outcome, report.units);
//! ```

pub mod air;
pub mod algorithms;
pub mod config;
pub mod host;
pub mod models;
pub mod node;
pub mod registry;
pub mod runtime;
pub mod scenarios;
pub mod scheduler;
pub mod state;
pub mod topology;
pub mod world;

pub use air::PacketsInTheAir;
pub use config::{Dimensions, ModelConfig, ModelParams, Mode, SimConfig};
pub use host::{
    BatchExit, ChannelHost, EndAction, EndReason, EventInfo, ExitStrategy, HostNotifier,
    HostUpdate, InteractiveExit, LoggingHost, NoopHost, Progress,
};
pub use models::NodeModels;
pub use node::{CustomGlobal, GlobalContext, NoGlobal, Node, NodeContext};
pub use registry::{AnyModel, ModelKind, ModelRegistry};
pub use runtime::{NodeCreation, Runtime};
pub use scenarios::{Algorithm, Scenario, TopologyKind};
pub use scheduler::{
    AsynchronousScheduler, RunBudget, RunOutcome, RunReport, Scheduler, SchedulerHandles,
    SynchronousScheduler,
};
pub use state::{RuntimeState, StateSnapshot};
pub use topology::{Topology, TopologyBuilder, from_edges};
pub use world::{Kernel, SimStats, World};

// Re-export core types so algorithms only need this crate
pub use meshsim_core::{
    ConfigError, Message, NodeId, Packet, PacketId, Position, RuntimeError, SimError, SimResult,
    SimRng, SimTime, StepError, TimerError, TimerTag,
};
