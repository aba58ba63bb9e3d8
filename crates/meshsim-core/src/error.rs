//! Error types for meshsim

use thiserror::Error;

use crate::identity::NodeId;

/// Top-level error type for a simulation run
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Node {node} failed: {source}")]
    NodeStep {
        node: NodeId,
        #[source]
        source: StepError,
    },

    #[error("Global hook failed: {0}")]
    GlobalStep(StepError),
}

impl SimError {
    /// Returns `true` if the process may continue and start another run
    pub fn is_recoverable(&self) -> bool {
        match self {
            SimError::NodeStep { source, .. } | SimError::GlobalStep(source) => {
                source.is_recoverable()
            }
            SimError::Runtime(RuntimeError::NodeCreationAborted) => true,
            _ => false,
        }
    }

    /// Attribute a step error to `node`
    pub fn node(node: NodeId, source: StepError) -> Self {
        SimError::NodeStep { node, source }
    }
}

/// Errors in the resolved configuration; always fatal
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Mobility is not supported in asynchronous mode")]
    MobilityInAsynchronousMode,

    #[error("Refresh rate must be at least 1")]
    ZeroRefreshRate,

    #[error("Unknown {kind} model: {name}")]
    UnknownModel { kind: String, name: String },

    #[error("Model {name} is not a {expected} model")]
    ModelKindMismatch { name: String, expected: String },

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Errors raised when scheduling a timer
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimerError {
    #[error("Timer delay must be positive, got {0}")]
    NonPositiveDelay(f64),

    #[error("Timer time {requested} is not after the current time {now}")]
    NotInFuture { requested: f64, now: f64 },
}

/// Errors raised by algorithm code during a step or event
#[derive(Debug, Error)]
pub enum StepError {
    /// The algorithm found the simulation misconfigured; stops the run only
    #[error("Wrong configuration: {0}")]
    WrongConfiguration(String),

    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    #[error("Fatal: {0}")]
    Fatal(String),
}

impl StepError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StepError::WrongConfiguration(_))
    }
}

/// Errors from the runtime orchestrator
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Operation refused while a simulation is running")]
    SimulationRunning,

    #[error("Node creation was abandoned before completing")]
    NodeCreationAborted,

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node already exists: {0}")]
    DuplicateNode(NodeId),

    #[error("Scheduler thread panicked")]
    SchedulerPanicked,
}

/// Result type alias using SimError
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SimError::Config(ConfigError::MobilityInAsynchronousMode);
        assert!(err.to_string().contains("asynchronous"));

        let err = SimError::node(NodeId(3), StepError::WrongConfiguration("no edges".into()));
        assert_eq!(err.to_string(), "Node N3 failed: Wrong configuration: no edges");
    }

    #[test]
    fn test_error_conversion() {
        let err: SimError = TimerError::NonPositiveDelay(0.0).into();
        assert!(matches!(err, SimError::Timer(_)));

        let step: StepError = TimerError::NonPositiveDelay(-1.0).into();
        assert!(!step.is_recoverable());
    }

    #[test]
    fn test_recoverability() {
        assert!(
            SimError::node(NodeId(0), StepError::WrongConfiguration("x".into())).is_recoverable()
        );
        assert!(!SimError::GlobalStep(StepError::Fatal("x".into())).is_recoverable());
        assert!(!SimError::Config(ConfigError::ZeroRefreshRate).is_recoverable());
    }
}
