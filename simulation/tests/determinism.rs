//! Reproducibility tests
//!
//! Two runs with the same seed and the same inputs must see the same events
//! in the same order at the same times, in either scheduling mode; changing
//! the seed changes the run.

use std::sync::{Arc, Mutex};

use meshsim::{
    InteractiveExit, Message, Mode, ModelRegistry, Node, NodeContext, NodeId, NoopHost, Packet,
    Position, RunOutcome, Runtime, SimConfig, SimTime, StepError, World,
};
use rand::Rng;

type Trace = Arc<Mutex<Vec<(SimTime, NodeId)>>>;

const NODES: u32 = 8;

/// Passes a token to a random node until it has travelled `HOPS` times
struct RandomWalk {
    trace: Trace,
}

#[derive(Debug, Clone, Copy)]
struct Token(u32);

const HOPS: u32 = 40;

impl RandomWalk {
    fn forward(&self, ctx: &mut NodeContext<'_>, hops: u32) {
        let me = ctx.id().raw();
        let mut to = ctx.rng().random_range(0..NODES - 1);
        if to >= me {
            to += 1;
        }
        ctx.send_direct(NodeId(to), Message::new(Token(hops)));
    }
}

impl Node for RandomWalk {
    fn init(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), StepError> {
        if ctx.id() == NodeId(0) {
            self.forward(ctx, 1);
        }
        Ok(())
    }

    fn handle_messages(
        &mut self,
        ctx: &mut NodeContext<'_>,
        inbox: &[Packet],
    ) -> Result<(), StepError> {
        for packet in inbox {
            let Some(Token(hops)) = packet.message.downcast_ref::<Token>().copied() else {
                continue;
            };
            self.trace.lock().unwrap().push((ctx.now(), ctx.id()));
            if hops < HOPS {
                self.forward(ctx, hops + 1);
            }
        }
        Ok(())
    }
}

fn walk_runtime(config: SimConfig, trace: &Trace) -> Runtime {
    let mut world = World::new(config, ModelRegistry::with_builtins()).unwrap();
    world
        .create_nodes(NODES as usize, |_| {
            Box::new(RandomWalk {
                trace: trace.clone(),
            })
        })
        .unwrap();

    Runtime::new(
        world,
        Arc::new(NoopHost),
        Arc::new(InteractiveExit::default()),
    )
    .unwrap()
}

fn traced_run(seed: u64) -> Vec<(SimTime, NodeId)> {
    let mut config = SimConfig {
        mode: Mode::Asynchronous,
        seed,
        ..SimConfig::default()
    };
    config.models.transmission = "random".into();

    let trace: Trace = Arc::new(Mutex::new(Vec::new()));
    let runtime = walk_runtime(config, &trace);
    let report = runtime.run_blocking(1_000, false).unwrap();
    assert_eq!(report.units, HOPS as u64);

    trace.lock().unwrap().clone()
}

/// Round-driven walk with moving nodes; returns the trace and final positions
fn traced_rounds(seed: u64) -> (Vec<(SimTime, NodeId)>, Vec<Position>) {
    let mut config = SimConfig {
        mode: Mode::Synchronous,
        mobility: true,
        seed,
        ..SimConfig::default()
    };
    config.models.mobility = "random_waypoint".into();
    config.models.transmission = "random".into();

    let trace: Trace = Arc::new(Mutex::new(Vec::new()));
    let runtime = walk_runtime(config, &trace);
    let report = runtime.run_blocking(400, false).unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.units, 400);

    let positions: Vec<Position> = runtime.with_world(|w| {
        NodeId::range(NODES)
            .into_iter()
            .filter_map(|id| w.position(id))
            .collect()
    });
    let trace = trace.lock().unwrap().clone();
    (trace, positions)
}

#[test]
fn test_same_seed_same_trace() {
    let first = traced_run(42);
    let second = traced_run(42);
    assert_eq!(first.len(), HOPS as usize);
    assert_eq!(first, second);
}

#[test]
fn test_different_seed_different_trace() {
    assert_ne!(traced_run(1), traced_run(2));
}

#[test]
fn test_same_seed_same_rounds() {
    let (first, first_positions) = traced_rounds(42);
    let (second, second_positions) = traced_rounds(42);
    assert_eq!(first.len(), HOPS as usize);
    assert_eq!(first, second);
    assert_eq!(first_positions.len(), NODES as usize);
    assert_eq!(first_positions, second_positions);

    // every delivery lands on a whole round
    assert!(first.iter().all(|(time, _)| time.as_f64().fract() == 0.0));

    let (_, other_positions) = traced_rounds(43);
    assert_ne!(first_positions, other_positions);
}

#[test]
fn test_trace_times_are_monotonic() {
    let trace = traced_run(7);
    assert!(trace.windows(2).all(|w| w[0].0 <= w[1].0));
    assert!(trace.iter().all(|(time, _)| *time > SimTime::ZERO));
}
