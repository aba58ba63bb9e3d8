//! Schedulers
//!
//! A scheduler drives a [`World`] for one run on the scheduler thread:
//! [`SynchronousScheduler`] one round at a time, [`AsynchronousScheduler`]
//! one event at a time. Both lock the world once per unit of work, check
//! the abort flag only at unit boundaries, and report the end of the run
//! as a [`RunReport`].

mod asynchronous;
mod synchronous;

pub use asynchronous::AsynchronousScheduler;
pub use synchronous::SynchronousScheduler;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use derive_more::Display;
use meshsim_core::{SimError, SimTime};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Mode;
use crate::host::{EndAction, EndReason, EventInfo, ExitStrategy, HostNotifier};
use crate::state::RuntimeState;
use crate::world::{SimStats, World};

/// How many rounds or events a run may execute
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum RunBudget {
    #[display("{_0}")]
    Bounded(u64),
    #[display("unbounded")]
    Unbounded,
}

impl RunBudget {
    /// Whether another unit may run after `done` units
    pub fn allows(self, done: u64) -> bool {
        match self {
            RunBudget::Bounded(limit) => done < limit,
            RunBudget::Unbounded => true,
        }
    }

    /// Whether `done` units exhaust the budget
    pub fn is_last(self, done: u64) -> bool {
        matches!(self, RunBudget::Bounded(limit) if done >= limit)
    }
}

/// How a run ended
#[derive(Debug, Display, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The requested number of rounds or events ran
    #[display("completed")]
    Completed,
    /// The host asked the run to stop
    #[display("aborted")]
    Aborted,
    /// The termination predicate fired
    #[display("terminated")]
    Terminated { action: EndAction },
    /// No event was left after the refill attempt
    #[display("queue exhausted")]
    QueueExhausted { action: EndAction },
    #[display("failed: {reason}")]
    Failed {
        reason: String,
        recoverable: bool,
        action: EndAction,
    },
}

impl RunOutcome {
    /// What the host should do next
    pub fn action(&self) -> EndAction {
        match self {
            RunOutcome::Completed | RunOutcome::Aborted => EndAction::ReturnToHost,
            RunOutcome::Terminated { action }
            | RunOutcome::QueueExhausted { action }
            | RunOutcome::Failed { action, .. } => *action,
        }
    }
}

/// Summary of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub mode: Mode,
    pub outcome: RunOutcome,
    /// Rounds or events executed
    pub units: u64,
    pub start_time: SimTime,
    pub end_time: SimTime,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stats: SimStats,
}

impl RunReport {
    /// A report for a run that never reached its first unit
    pub(crate) fn not_started(
        run_id: Uuid,
        mode: Mode,
        time: SimTime,
        outcome: RunOutcome,
        stats: SimStats,
    ) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            mode,
            outcome,
            units: 0,
            start_time: time,
            end_time: time,
            started_at: now,
            finished_at: now,
            stats,
        }
    }

    /// Process exit code requested by the exit strategy, if any
    pub fn exit_code(&self) -> Option<i32> {
        match self.outcome.action() {
            EndAction::Exit { code } => Some(code),
            EndAction::ReturnToHost => None,
        }
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// The runnable side of a scheduler
pub trait Scheduler: Send {
    fn mode(&self) -> Mode;

    /// Execute one run on the calling thread
    fn run(&mut self, budget: RunBudget) -> RunReport;
}

/// Handles a scheduler needs to reach the world and the host
#[derive(Clone)]
pub struct SchedulerHandles {
    pub world: Arc<Mutex<World>>,
    pub state: Arc<RuntimeState>,
    pub host: Arc<dyn HostNotifier>,
    pub exit: Arc<dyn ExitStrategy>,
    pub run_id: Uuid,
}

impl SchedulerHandles {
    /// Map a run-stopping error to an outcome and tell the host
    ///
    /// Recoverable errors always hand control back to the host; fatal ones
    /// ask the exit strategy.
    fn fail(&self, error: SimError) -> RunOutcome {
        self.host.run_failed(&error);
        let recoverable = error.is_recoverable();
        let action = if recoverable {
            warn!(error = %error, "run stopped");
            EndAction::ReturnToHost
        } else {
            error!(error = %error, "run failed");
            self.exit.on_end(EndReason::FatalError)
        };
        RunOutcome::Failed {
            reason: error.to_string(),
            recoverable,
            action,
        }
    }

    /// Final host refresh, exit hooks, and the report
    ///
    /// The refresh reports `last_event` as current before releasing it.
    fn finish(
        &self,
        mode: Mode,
        last_event: Option<&EventInfo>,
        outcome: RunOutcome,
        units: u64,
        start_time: SimTime,
        started_at: DateTime<Utc>,
    ) -> RunReport {
        let (progress, end_time, stats) = {
            let mut world = self.world.lock();
            if matches!(outcome.action(), EndAction::Exit { .. }) {
                world.on_exit();
            }
            (world.progress(), world.now(), world.stats().clone())
        };

        self.host.counters_updated(&progress);
        if last_event.is_some() {
            self.host.event_changed(last_event);
        }
        self.host.redraw();
        self.host.event_changed(None);

        let report = RunReport {
            run_id: self.run_id,
            mode,
            outcome,
            units,
            start_time,
            end_time,
            started_at,
            finished_at: Utc::now(),
            stats,
        };

        match &report.outcome {
            RunOutcome::Aborted => debug!(units, time = %end_time, "run aborted"),
            outcome => info!(%outcome, units, time = %end_time, "run ended"),
        }
        self.host.run_finished(&report);
        report
    }
}

/// Every `rate`-th unit except the last of the budget
fn refresh_due(units: u64, rate: u64, budget: RunBudget) -> bool {
    units % rate.max(1) == 0 && !budget.is_last(units)
}

/// Build the scheduler for `mode`
pub fn for_mode(mode: Mode, handles: SchedulerHandles) -> Box<dyn Scheduler> {
    match mode {
        Mode::Synchronous => Box::new(SynchronousScheduler::new(handles)),
        Mode::Asynchronous => Box::new(AsynchronousScheduler::new(handles)),
    }
}
