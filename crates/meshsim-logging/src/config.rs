//! Logging configuration
//!
//! Usually embedded as the `[logging]` table of a simulation config file:
//!
//! ```toml
//! [logging]
//! default_level = "info"
//!
//! [logging.targets]
//! "meshsim::world" = "trace"   # every node step and packet
//! "meshsim::scheduler" = "debug"
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level for every target without its own entry; `RUST_LOG` wins over
    /// the whole filter
    pub default_level: String,

    /// Per-target levels, e.g. `meshsim::world = "trace"`
    pub targets: BTreeMap<String, String>,

    pub console: ConsoleConfig,

    /// JSONL file output; off when `None`
    pub file: Option<FileConfig>,

    pub jsonl: JsonlConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            targets: BTreeMap::new(),
            console: ConsoleConfig::default(),
            file: None,
            jsonl: JsonlConfig::default(),
        }
    }
}

impl LogConfig {
    /// Scheduler milestones at debug, per-node steps at trace
    pub fn development() -> Self {
        Self {
            default_level: "debug".to_string(),
            targets: BTreeMap::from([("meshsim::world".to_string(), "trace".to_string())]),
            console: ConsoleConfig {
                enabled: true,
                pretty: true,
                ansi: true,
            },
            ..Default::default()
        }
    }

    /// Batch runs: terse console plus a JSONL file per run
    pub fn batch(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            default_level: "info".to_string(),
            console: ConsoleConfig {
                enabled: true,
                pretty: true,
                ansi: false,
            },
            file: Some(FileConfig {
                directory: log_dir.into(),
                prefix: "meshsim".to_string(),
                rotation: RotationStrategy::Never,
            }),
            ..Default::default()
        }
    }

    /// Minimal output for tests
    pub fn testing() -> Self {
        Self {
            default_level: "warn".to_string(),
            console: ConsoleConfig {
                enabled: true,
                pretty: true,
                ansi: false,
            },
            ..Default::default()
        }
    }

    /// Set the level of one target
    pub fn with_target(mut self, target: impl Into<String>, level: impl Into<String>) -> Self {
        self.targets.insert(target.into(), level.into());
        self
    }

    /// The `EnvFilter` directive string, default level first
    pub fn filter_directives(&self) -> String {
        let mut directives = self.default_level.clone();
        for (target, level) in &self.targets {
            directives.push_str(&format!(",{target}={level}"));
        }
        directives
    }
}

/// Console output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    /// Human-readable lines; JSONL otherwise
    pub pretty: bool,
    pub ansi: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pretty: true,
            ansi: true,
        }
    }
}

/// Where JSONL log files go
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub directory: PathBuf,
    /// Files are named `<prefix>.log`, or dated `<prefix>.<date>.log` when
    /// rotated
    pub prefix: String,
    pub rotation: RotationStrategy,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            prefix: "meshsim".to_string(),
            rotation: RotationStrategy::Never,
        }
    }
}

/// Log file rotation; long interactive sessions may want `Hourly`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationStrategy {
    Daily,
    Hourly,
    /// One file per process, truncated on start
    #[default]
    Never,
}

/// Shape of JSONL records
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonlConfig {
    /// Put event fields (`node`, `round`, `packet`, ...) at the top level
    pub flatten_events: bool,
    pub include_spans: bool,
    /// Thread names tell scheduler output (`meshsim-scheduler`) apart from
    /// host output
    pub include_thread_info: bool,
    pub include_location: bool,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            flatten_events: true,
            include_spans: true,
            include_thread_info: true,
            include_location: false,
        }
    }
}
