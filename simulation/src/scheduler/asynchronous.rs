//! Event-driven scheduler

use chrono::Utc;
use tracing::{debug, info, trace, warn};

use super::{RunBudget, RunOutcome, RunReport, Scheduler, SchedulerHandles, refresh_due};
use crate::config::Mode;
use crate::host::{EndReason, EventInfo};

/// Pops and handles events in `(fire_time, sequence)` order
///
/// When the queue runs dry the custom global gets exactly one chance to
/// refill it; if the queue is still empty afterwards the run ends without
/// advancing time.
pub struct AsynchronousScheduler {
    handles: SchedulerHandles,
}

impl AsynchronousScheduler {
    pub fn new(handles: SchedulerHandles) -> Self {
        Self { handles }
    }
}

impl Scheduler for AsynchronousScheduler {
    fn mode(&self) -> Mode {
        Mode::Asynchronous
    }

    fn run(&mut self, budget: RunBudget) -> RunReport {
        let h = &self.handles;
        let started_at = Utc::now();
        let (start_time, refresh_rate) = {
            let world = h.world.lock();
            (world.now(), world.config().refresh_rate)
        };
        info!(%budget, time = %start_time, "asynchronous run started");

        let mut events = 0u64;
        let mut last_event: Option<EventInfo> = None;
        let outcome = loop {
            if !budget.allows(events) {
                break RunOutcome::Completed;
            }
            if h.state.take_abort() {
                debug!(events, "abort observed before event");
                break RunOutcome::Aborted;
            }

            let mut world = h.world.lock();
            let mut next = world.next_event();
            if next.is_none() && world.config().handle_empty_event_queue {
                if let Err(e) = world.refill_event_queue() {
                    drop(world);
                    break h.fail(e);
                }
                next = world.next_event();
            }
            let Some(event) = next else {
                let time = world.now();
                drop(world);
                warn!(%time, events, "event queue is empty");
                break RunOutcome::QueueExhausted {
                    action: h.exit.on_end(EndReason::QueueExhausted),
                };
            };

            let info: &EventInfo = last_event.insert(EventInfo::from(&event));
            trace!(event = %info.description, "handling event");
            let result = world.handle_event(event);
            h.state.set_time(world.now(), world.is_even_round());
            if let Err(e) = result {
                drop(world);
                break h.fail(e);
            }
            events += 1;
            h.state.record_event();
            let terminated = world.has_terminated();
            let progress = world.progress();
            drop(world);

            if refresh_due(events, refresh_rate, budget) {
                h.host.counters_updated(&progress);
                h.host.event_changed(Some(info));
                h.host.redraw();
            }
            if terminated {
                info!(time = %progress.time, "termination predicate fired");
                break RunOutcome::Terminated {
                    action: h.exit.on_end(EndReason::TerminationPredicate),
                };
            }
        };

        h.finish(
            Mode::Asynchronous,
            last_event.as_ref(),
            outcome,
            events,
            start_time,
            started_at,
        )
    }
}
