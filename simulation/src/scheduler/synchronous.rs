//! Round-driven scheduler

use chrono::Utc;
use tracing::{debug, info};

use super::{RunBudget, RunOutcome, RunReport, Scheduler, SchedulerHandles, refresh_due};
use crate::config::Mode;
use crate::host::EndReason;

/// Executes whole rounds until the budget, the termination predicate, an
/// error, or an abort stops the run
pub struct SynchronousScheduler {
    handles: SchedulerHandles,
}

impl SynchronousScheduler {
    pub fn new(handles: SchedulerHandles) -> Self {
        Self { handles }
    }
}

impl Scheduler for SynchronousScheduler {
    fn mode(&self) -> Mode {
        Mode::Synchronous
    }

    fn run(&mut self, budget: RunBudget) -> RunReport {
        let h = &self.handles;
        let started_at = Utc::now();
        let (start_time, refresh_rate) = {
            let world = h.world.lock();
            (world.now(), world.config().refresh_rate)
        };
        info!(%budget, time = %start_time, "synchronous run started");

        let mut rounds = 0u64;
        let outcome = loop {
            if !budget.allows(rounds) {
                break RunOutcome::Completed;
            }
            if h.state.take_abort() {
                debug!(rounds, "abort observed before round");
                break RunOutcome::Aborted;
            }

            let mut world = h.world.lock();
            let result = world.run_round();
            h.state.set_time(world.now(), world.is_even_round());
            if let Err(e) = result {
                drop(world);
                break h.fail(e);
            }
            rounds += 1;
            h.state.record_round();
            let terminated = world.has_terminated();
            let progress = world.progress();
            drop(world);

            if terminated {
                info!(round = progress.time.round(), "termination predicate fired");
                break RunOutcome::Terminated {
                    action: h.exit.on_end(EndReason::TerminationPredicate),
                };
            }
            if refresh_due(rounds, refresh_rate, budget) {
                h.host.counters_updated(&progress);
                h.host.redraw();
            }
        };

        h.finish(Mode::Synchronous, None, outcome, rounds, start_time, started_at)
    }
}
