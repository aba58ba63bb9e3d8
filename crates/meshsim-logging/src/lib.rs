//! Structured logging for the meshsim simulator
//!
//! This crate wires `tracing` for simulation runs:
//!
//! - **Console output**: pretty (default) or JSONL
//! - **File output**: JSONL files via tracing-appender, optionally rotated
//! - **Node context**: log lines emitted by algorithm code are attributed to
//!   the node currently being stepped
//!
//! # Quick Start
//!
//! ```ignore
//! use meshsim_logging::{LogConfig, SimSubscriberBuilder};
//!
//! // Keep the guard alive for the whole program when file output is on
//! let _guard = SimSubscriberBuilder::new()
//!     .with_config(LogConfig::batch("./logs"))
//!     .init();
//! ```
//!
//! # Node Context
//!
//! ```ignore
//! use meshsim_logging::NodeContextGuard;
//!
//! let _guard = NodeContextGuard::new(node_id);
//! tracing::debug!("stepping"); // spans opened here carry the node id
//! ```

pub mod config;
pub mod context;
pub mod layers;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use context::{NodeContextData, NodeContextGuard, RunContextGuard};
pub use layers::{NodeContextExtension, NodeContextLayer};

use std::fs::{self, File};

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Log file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Log appender error: {0}")]
    Appender(String),

    #[error("Subscriber already installed: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Builder for configuring and initializing the global subscriber
pub struct SimSubscriberBuilder {
    config: LogConfig,
}

impl SimSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Set the level of one target, e.g. `("meshsim::world", "trace")`
    pub fn with_target(mut self, target: impl Into<String>, level: impl Into<String>) -> Self {
        self.config = self.config.with_target(target, level);
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Initialize the subscriber globally, reporting failures on stderr
    ///
    /// The returned guard flushes file output when dropped and must be kept
    /// alive for the duration of the program.
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Warning: failed to initialize logging: {e}");
                None
            }
        }
    }

    /// Try to initialize the subscriber globally
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(self.config.filter_directives())
                .map_err(|e| LoggingError::Filter(e.to_string()))?,
        };

        let (file_writer, guard) = match &self.config.file {
            Some(file_config) => {
                let (writer, guard) = log_file_writer(file_config)?;
                (Some(writer), Some(guard))
            }
            None => (None, None),
        };

        let console = &self.config.console;
        let jsonl = &self.config.jsonl;

        let pretty_console = (console.enabled && console.pretty).then(|| {
            tracing_subscriber::fmt::layer()
                .with_ansi(console.ansi)
                .with_target(true)
                .with_thread_names(jsonl.include_thread_info)
        });

        let json_console = (console.enabled && !console.pretty).then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(jsonl.include_spans)
                .flatten_event(jsonl.flatten_events)
                .with_file(jsonl.include_location)
                .with_line_number(jsonl.include_location)
                .with_thread_names(jsonl.include_thread_info)
        });

        let file_layer = file_writer.map(|writer| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(jsonl.include_spans)
                .flatten_event(jsonl.flatten_events)
                .with_file(jsonl.include_location)
                .with_line_number(jsonl.include_location)
                .with_thread_names(jsonl.include_thread_info)
                .with_writer(writer)
        });

        Registry::default()
            .with(env_filter)
            .with(NodeContextLayer::new())
            .with(pretty_console)
            .with(json_console)
            .with(file_layer)
            .try_init()?;

        Ok(guard)
    }
}

impl Default for SimSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Open the non-blocking writer for file output
///
/// `Never` truncates a single `<prefix>.log`; the rotating strategies append
/// to dated files.
pub fn log_file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(&config.directory)?;

    let rotation = match config.rotation {
        RotationStrategy::Never => {
            let file = File::create(config.directory.join(format!("{}.log", config.prefix)))?;
            return Ok(tracing_appender::non_blocking(file));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(config.prefix.as_str())
        .filename_suffix("log")
        .build(&config.directory)
        .map_err(|e| LoggingError::Appender(e.to_string()))?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging with default settings (pretty console)
pub fn init_default() {
    SimSubscriberBuilder::new().init();
}

/// Initialize logging for development (verbose, pretty console output)
pub fn init_development() {
    SimSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .init();
}

/// Initialize logging for testing (minimal output, ignores double init)
pub fn init_testing() {
    let _ = SimSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creation() {
        let builder = SimSubscriberBuilder::new();
        assert_eq!(builder.config().default_level, "info");
        assert!(builder.config().console.pretty);
    }

    #[test]
    fn test_builder_with_config() {
        let builder = SimSubscriberBuilder::new().with_config(LogConfig::development());
        assert_eq!(builder.config().default_level, "debug");
    }

    #[test]
    fn test_builder_overrides() {
        let builder = SimSubscriberBuilder::new()
            .with_level("trace")
            .with_target("meshsim::air", "off")
            .with_console(false)
            .with_file_output(FileConfig::default());
        assert_eq!(builder.config().filter_directives(), "trace,meshsim::air=off");
        assert!(!builder.config().console.enabled);
        assert!(builder.config().file.is_some());
    }
}
