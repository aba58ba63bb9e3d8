//! Host notifications and exit strategies
//!
//! The host (batch driver, REPL, or an embedding application) observes a
//! run through a [`HostNotifier`]. Notifications carry plain snapshots and
//! are fire-and-forget: the scheduler never waits for the host to consume
//! them.
//!
//! What happens when a run ends by itself (termination predicate, exhausted
//! queue, fatal error) is decided by an injected [`ExitStrategy`] instead of
//! branches on the kind of host.

use meshsim_core::{Event, NodeId, SimError, SimTime};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::scheduler::RunReport;

/// Counters shown to the host while a run progresses
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub time: SimTime,
    pub rounds: u64,
    pub events: u64,
    pub nodes: usize,
    pub pending_events: usize,
    pub packets_in_air: usize,
}

/// Read-only descriptor of the event being processed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventInfo {
    pub fire_time: SimTime,
    pub sequence: Option<u64>,
    pub target: Option<NodeId>,
    pub description: String,
}

impl From<&Event> for EventInfo {
    fn from(event: &Event) -> Self {
        Self {
            fire_time: event.fire_time,
            sequence: event.sequence,
            target: event.target(),
            description: event.to_string(),
        }
    }
}

/// Receives progress notifications from the scheduler thread
pub trait HostNotifier: Send + Sync {
    fn counters_updated(&self, progress: &Progress) {
        let _ = progress;
    }

    /// The event currently processed, `None` once the run is over
    fn event_changed(&self, event: Option<&EventInfo>) {
        let _ = event;
    }

    fn redraw(&self) {}

    fn run_finished(&self, report: &RunReport) {
        let _ = report;
    }

    fn run_failed(&self, error: &SimError) {
        let _ = error;
    }
}

/// Ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHost;

impl HostNotifier for NoopHost {}

/// Writes notifications to the tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHost;

impl HostNotifier for LoggingHost {
    fn counters_updated(&self, progress: &Progress) {
        info!(
            time = %progress.time,
            rounds = progress.rounds,
            events = progress.events,
            pending = progress.pending_events,
            in_air = progress.packets_in_air,
            "progress"
        );
    }

    fn run_finished(&self, report: &RunReport) {
        info!(
            outcome = %report.outcome,
            units = report.units,
            time = %report.end_time,
            sent = report.stats.messages_sent,
            delivered = report.stats.messages_delivered,
            "run finished"
        );
    }

    fn run_failed(&self, error: &SimError) {
        if error.is_recoverable() {
            warn!(error = %error, "run stopped by a recoverable error");
        } else {
            error!(error = %error, "run failed");
        }
    }
}

/// A notification forwarded over a channel
#[derive(Debug, Clone)]
pub enum HostUpdate {
    Progress(Progress),
    Event(Option<EventInfo>),
    Redraw,
    Finished(Box<RunReport>),
    Failed(String),
}

/// Forwards notifications to an unbounded channel
///
/// Sending never blocks; updates are silently dropped once the receiver is
/// gone.
#[derive(Debug, Clone)]
pub struct ChannelHost {
    tx: mpsc::UnboundedSender<HostUpdate>,
}

impl ChannelHost {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, update: HostUpdate) {
        let _ = self.tx.send(update);
    }
}

impl HostNotifier for ChannelHost {
    fn counters_updated(&self, progress: &Progress) {
        self.send(HostUpdate::Progress(*progress));
    }

    fn event_changed(&self, event: Option<&EventInfo>) {
        self.send(HostUpdate::Event(event.cloned()));
    }

    fn redraw(&self) {
        self.send(HostUpdate::Redraw);
    }

    fn run_finished(&self, report: &RunReport) {
        self.send(HostUpdate::Finished(Box::new(report.clone())));
    }

    fn run_failed(&self, error: &SimError) {
        self.send(HostUpdate::Failed(error.to_string()));
    }
}

/// Why a run ended without reaching its requested count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The custom global's termination predicate returned `true`
    TerminationPredicate,
    /// The event queue stayed empty after the refill attempt
    QueueExhausted,
    /// A non-recoverable error stopped the run
    FatalError,
}

/// What the host should do after a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EndAction {
    /// Keep the simulation inspectable and wait for the next command
    ReturnToHost,
    /// Run the exit hooks and leave the process with `code`
    Exit { code: i32 },
}

/// Decides between exiting and handing control back to the host
pub trait ExitStrategy: Send + Sync {
    fn on_end(&self, reason: EndReason) -> EndAction;
}

/// Non-interactive runs: every self-ended run exits the process
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchExit;

impl ExitStrategy for BatchExit {
    fn on_end(&self, reason: EndReason) -> EndAction {
        match reason {
            EndReason::FatalError => EndAction::Exit { code: 1 },
            EndReason::TerminationPredicate | EndReason::QueueExhausted => {
                EndAction::Exit { code: 0 }
            }
        }
    }
}

/// Interactive runs: stay inspectable unless configured to exit on
/// termination; fatal errors still end the process
#[derive(Debug, Default, Clone, Copy)]
pub struct InteractiveExit {
    pub exit_on_termination: bool,
}

impl ExitStrategy for InteractiveExit {
    fn on_end(&self, reason: EndReason) -> EndAction {
        match reason {
            EndReason::FatalError => EndAction::Exit { code: 1 },
            EndReason::TerminationPredicate if self.exit_on_termination => {
                EndAction::Exit { code: 0 }
            }
            EndReason::TerminationPredicate | EndReason::QueueExhausted => {
                EndAction::ReturnToHost
            }
        }
    }
}
