//! Runtime orchestration
//!
//! [`Runtime`] owns the world and at most one scheduler thread. The host
//! starts runs with [`Runtime::run`], which returns immediately, and stops
//! them cooperatively with [`Runtime::abort`]. A run does not touch the
//! world before node creation has completed: [`Runtime::begin_node_creation`]
//! closes a startup gate that the scheduler thread waits on.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use meshsim_core::{ConfigError, RuntimeError, SimError};
use meshsim_logging::RunContextGuard;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Mode;
use crate::host::{EndAction, ExitStrategy, HostNotifier};
use crate::scheduler::{self, RunBudget, RunOutcome, RunReport, SchedulerHandles};
use crate::state::{RunningGuard, RuntimeState, StateSnapshot};
use crate::world::World;

enum StartupGate {
    Open,
    /// Node creation in progress; completes when the sender fires
    Pending(oneshot::Receiver<()>),
}

/// Drives a [`World`] on a dedicated scheduler thread
pub struct Runtime {
    mode: Mode,
    infinite_runs: bool,
    world: Arc<Mutex<World>>,
    state: Arc<RuntimeState>,
    gate: Arc<Mutex<StartupGate>>,
    host: Arc<dyn HostNotifier>,
    exit: Arc<dyn ExitStrategy>,
    worker: Mutex<Option<JoinHandle<RunReport>>>,
    last_report: Mutex<Option<RunReport>>,
}

impl Runtime {
    pub fn new(
        world: World,
        host: Arc<dyn HostNotifier>,
        exit: Arc<dyn ExitStrategy>,
    ) -> Result<Self, ConfigError> {
        world.config().validate()?;
        let state = RuntimeState::new();
        state.set_time(world.now(), world.is_even_round());
        Ok(Self {
            mode: world.mode(),
            infinite_runs: world.config().infinite_runs,
            world: Arc::new(Mutex::new(world)),
            state: Arc::new(state),
            gate: Arc::new(Mutex::new(StartupGate::Open)),
            host,
            exit,
            worker: Mutex::new(None),
            last_report: Mutex::new(None),
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Start a run of `count` rounds or events on the scheduler thread
    ///
    /// Returns `false` without doing anything if a run is already active or
    /// if `count <= 0`. When `consider_infinite` is set and the
    /// configuration allows infinite runs, the run is unbounded regardless
    /// of `count`.
    pub fn run(&self, count: i64, consider_infinite: bool) -> bool {
        let budget = if consider_infinite && self.infinite_runs {
            RunBudget::Unbounded
        } else if count <= 0 {
            debug!(count, "ignoring empty run request");
            return false;
        } else {
            RunBudget::Bounded(count as u64)
        };

        if !self.state.try_begin_run() {
            debug!("run requested while a run is active");
            return false;
        }

        let mut worker = self.worker.lock();
        if let Some(previous) = worker.take() {
            self.store_report(previous);
        }
        self.state.clear_abort();

        let run_id = Uuid::new_v4();
        let handles = SchedulerHandles {
            world: self.world.clone(),
            state: self.state.clone(),
            host: self.host.clone(),
            exit: self.exit.clone(),
            run_id,
        };
        let gate = self.gate.clone();
        let mode = self.mode;

        let spawned = thread::Builder::new()
            .name("meshsim-scheduler".into())
            .spawn(move || {
                let state = handles.state.clone();
                let _running = RunningGuard::new(&state);
                let _run = RunContextGuard::new(run_id);

                if let Err(error) = wait_for_nodes(&gate) {
                    return not_started(&handles, mode, error);
                }
                scheduler::for_mode(mode, handles).run(budget)
            });

        match spawned {
            Ok(handle) => {
                info!(%run_id, %mode, %budget, "run started");
                *worker = Some(handle);
                true
            }
            Err(e) => {
                error!(error = %e, "failed to spawn scheduler thread");
                self.state.end_run();
                false
            }
        }
    }

    /// Ask the active run to stop at the next round or event boundary
    pub fn abort(&self) {
        if self.state.is_running() {
            debug!("abort requested");
        }
        self.state.request_abort();
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Wait for the active (or last finished) run and return its report
    pub fn join(&self) -> Option<RunReport> {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            self.store_report(handle);
        }
        self.last_report()
    }

    /// `run` followed by `join`; `None` if no run was started
    pub fn run_blocking(&self, count: i64, consider_infinite: bool) -> Option<RunReport> {
        if self.run(count, consider_infinite) {
            self.join()
        } else {
            None
        }
    }

    pub fn last_report(&self) -> Option<RunReport> {
        self.last_report.lock().clone()
    }

    fn store_report(&self, handle: JoinHandle<RunReport>) {
        match handle.join() {
            Ok(report) => *self.last_report.lock() = Some(report),
            Err(_) => {
                error!(error = %RuntimeError::SchedulerPanicked, "scheduler thread panicked");
                self.state.end_run();
            }
        }
    }

    /// Close the startup gate until the returned handle completes
    pub fn begin_node_creation(&self) -> Result<NodeCreation, RuntimeError> {
        if self.state.is_running() {
            return Err(RuntimeError::SimulationRunning);
        }
        let (tx, rx) = oneshot::channel();
        *self.gate.lock() = StartupGate::Pending(rx);
        Ok(NodeCreation {
            world: self.world.clone(),
            done: Some(tx),
        })
    }

    /// Read the world between units of work
    pub fn with_world<R>(&self, f: impl FnOnce(&World) -> R) -> R {
        f(&self.world.lock())
    }

    /// Mutate the world; refused while a run is active
    pub fn with_world_mut<R>(&self, f: impl FnOnce(&mut World) -> R) -> Result<R, RuntimeError> {
        if self.state.is_running() {
            return Err(RuntimeError::SimulationRunning);
        }
        Ok(f(&mut self.world.lock()))
    }

    /// Drop all events, packets, and timers and rewind time
    pub fn reset(&self) -> Result<(), RuntimeError> {
        self.with_world_mut(|world| world.reset())?;
        self.state.reset();
        Ok(())
    }

    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.state.snapshot()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if self.state.is_running() {
            warn!("runtime dropped during a run; requesting abort");
            self.state.request_abort();
        }
    }
}

fn wait_for_nodes(gate: &Mutex<StartupGate>) -> Result<(), SimError> {
    let pending = std::mem::replace(&mut *gate.lock(), StartupGate::Open);
    if let StartupGate::Pending(rx) = pending {
        debug!("waiting for node creation");
        rx.blocking_recv()
            .map_err(|_| RuntimeError::NodeCreationAborted)?;
        debug!("node creation complete");
    }
    Ok(())
}

fn not_started(handles: &SchedulerHandles, mode: Mode, error: SimError) -> RunReport {
    warn!(error = %error, "run did not start");
    handles.host.run_failed(&error);
    let (time, stats) = {
        let world = handles.world.lock();
        (world.now(), world.stats().clone())
    };
    let outcome = RunOutcome::Failed {
        reason: error.to_string(),
        recoverable: error.is_recoverable(),
        action: EndAction::ReturnToHost,
    };
    let report = RunReport::not_started(handles.run_id, mode, time, outcome, stats);
    handles.host.run_finished(&report);
    report
}

/// Exclusive access to the world while nodes are being created
///
/// Dropping the handle without calling [`complete`](NodeCreation::complete)
/// fails a waiting run with [`RuntimeError::NodeCreationAborted`].
pub struct NodeCreation {
    world: Arc<Mutex<World>>,
    done: Option<oneshot::Sender<()>>,
}

impl NodeCreation {
    pub fn with_world<R>(&self, f: impl FnOnce(&mut World) -> R) -> R {
        f(&mut self.world.lock())
    }

    /// Connect the new nodes and open the startup gate
    pub fn complete(mut self) {
        let changed = self.world.lock().reevaluate_connections();
        debug!(changed, "node creation completed");
        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::host::{InteractiveExit, NoopHost};
    use crate::registry::ModelRegistry;

    fn runtime(config: SimConfig) -> Runtime {
        let world = World::new(config, ModelRegistry::with_builtins()).unwrap();
        Runtime::new(world, Arc::new(NoopHost), Arc::new(InteractiveExit::default())).unwrap()
    }

    #[test]
    fn test_empty_requests_are_ignored() {
        let runtime = runtime(SimConfig::default());
        assert!(!runtime.run(0, false));
        assert!(!runtime.run(-3, false));
        assert!(!runtime.run(0, true));
        assert!(runtime.join().is_none());
    }

    #[test]
    fn test_infinite_flag_needs_config() {
        let config = SimConfig {
            infinite_runs: true,
            ..SimConfig::default()
        };
        let runtime = runtime(config);
        assert!(runtime.run(0, true));
        runtime.abort();
        let report = runtime.join().unwrap();
        assert_eq!(report.outcome, RunOutcome::Aborted);
    }

    #[test]
    fn test_blocking_run() {
        let runtime = runtime(SimConfig::default());
        let report = runtime.run_blocking(4, false).unwrap();
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.units, 4);
        assert_eq!(runtime.snapshot().rounds, 4);
        assert!(!runtime.is_running());

        runtime.reset().unwrap();
        assert_eq!(runtime.with_world(|w| w.now()), meshsim_core::SimTime::ZERO);
    }
}
