//! Simulation configuration
//!
//! A [`SimConfig`] holds the already-resolved values the schedulers and the
//! world consume. It can be built in code or loaded from TOML; every field
//! has a default, so a config file only needs to name what it changes.
//!
//! ```toml
//! mode = "asynchronous"
//! seed = 7
//! refresh_rate = 10
//!
//! [models]
//! connectivity = "udg"
//! transmission = "random"
//!
//! [models.params]
//! udg_radius = 30.0
//! ```

use std::path::Path;

use derive_more::Display;
use meshsim_core::ConfigError;
use meshsim_logging::LogConfig;
use serde::{Deserialize, Serialize};

/// Scheduling mode
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Round-driven
    #[default]
    #[display("synchronous")]
    Synchronous,
    /// Event-driven
    #[display("asynchronous")]
    Asynchronous,
}

/// Top-level configuration of a simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub mode: Mode,
    /// Seed of the single random number generator of a run
    pub seed: u64,
    /// Rounds (synchronous) or events (asynchronous) per run when not given
    pub rounds: u64,
    /// Notify the host every `refresh_rate` rounds or events
    pub refresh_rate: u64,
    /// Allow `run` requests to be unbounded
    pub infinite_runs: bool,
    /// Exit the process when the termination predicate fires, even
    /// with an interactive host
    pub exit_on_termination: bool,
    /// Move nodes every round (synchronous mode only)
    pub mobility: bool,
    /// Evaluate interference between packets in the air
    pub interference: bool,
    /// Hand dropped packets back to their sender
    pub generate_nacks: bool,
    /// Ask the custom global to refill an empty event queue
    pub handle_empty_event_queue: bool,
    pub dimensions: Dimensions,
    pub models: ModelConfig,
    pub logging: LogConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Synchronous,
            seed: 0,
            rounds: 100,
            refresh_rate: 1,
            infinite_runs: false,
            exit_on_termination: false,
            mobility: false,
            interference: false,
            generate_nacks: false,
            handle_empty_event_queue: true,
            dimensions: Dimensions::default(),
            models: ModelConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl SimConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: SimConfig =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&input)
    }

    /// Check the combination of settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mobility && self.mode == Mode::Asynchronous {
            return Err(ConfigError::MobilityInAsynchronousMode);
        }
        if self.refresh_rate == 0 {
            return Err(ConfigError::ZeroRefreshRate);
        }
        self.dimensions.validate()?;
        self.models.params.validate()
    }

    pub fn is_synchronous(&self) -> bool {
        self.mode == Mode::Synchronous
    }
}

/// Extent of the deployment area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dimensions {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            x: 100.0,
            y: 100.0,
            z: 0.0,
        }
    }
}

impl Dimensions {
    fn validate(&self) -> Result<(), ConfigError> {
        require_finite(&[
            ("dimensions.x", self.x),
            ("dimensions.y", self.y),
            ("dimensions.z", self.z),
        ])?;
        if self.x <= 0.0 || self.y <= 0.0 || self.z < 0.0 {
            return Err(invalid(
                "dimensions",
                format!("extent must be positive, got {}x{}x{}", self.x, self.y, self.z),
            ));
        }
        Ok(())
    }
}

/// Registry names of the default models, plus their parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub mobility: String,
    pub connectivity: String,
    pub interference: String,
    pub reliability: String,
    pub transmission: String,
    pub distribution: String,
    pub params: ModelParams,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            mobility: "none".to_string(),
            connectivity: "udg".to_string(),
            interference: "none".to_string(),
            reliability: "reliable".to_string(),
            transmission: "constant".to_string(),
            distribution: "random".to_string(),
            params: ModelParams::default(),
        }
    }
}

/// Parameters read by the built-in models
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    /// Connection radius of the unit disk graph
    pub udg_radius: f64,
    /// Delay of the constant transmission model
    pub transmission_delay: f64,
    /// Bounds of the random transmission model
    pub min_delay: f64,
    pub max_delay: f64,
    /// Loss probability of the lossy reliability model
    pub drop_probability: f64,
    /// Speed bounds of the random waypoint model, in distance per round
    pub min_speed: f64,
    pub max_speed: f64,
    /// Rounds the random waypoint model waits at each waypoint
    pub pause_rounds: u32,
    /// Minimum signal to interference-plus-noise ratio for reception
    pub sinr_threshold: f64,
    /// Path loss exponent of the SINR model
    pub sinr_alpha: f64,
    /// Ambient noise of the SINR model
    pub sinr_noise: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            udg_radius: 25.0,
            transmission_delay: 1.0,
            min_delay: 0.5,
            max_delay: 2.0,
            drop_probability: 0.1,
            min_speed: 1.0,
            max_speed: 5.0,
            pause_rounds: 2,
            sinr_threshold: 1.2,
            sinr_alpha: 2.0,
            sinr_noise: 0.0,
        }
    }
}

impl ModelParams {
    fn validate(&self) -> Result<(), ConfigError> {
        require_finite(&[
            ("udg_radius", self.udg_radius),
            ("transmission_delay", self.transmission_delay),
            ("min_delay", self.min_delay),
            ("max_delay", self.max_delay),
            ("drop_probability", self.drop_probability),
            ("min_speed", self.min_speed),
            ("max_speed", self.max_speed),
            ("sinr_threshold", self.sinr_threshold),
            ("sinr_alpha", self.sinr_alpha),
            ("sinr_noise", self.sinr_noise),
        ])?;
        if self.udg_radius <= 0.0 {
            return Err(invalid("udg_radius", "must be positive"));
        }
        if self.transmission_delay < 0.0 {
            return Err(invalid("transmission_delay", "must not be negative"));
        }
        if self.min_delay < 0.0 || self.max_delay < self.min_delay {
            return Err(invalid("min_delay/max_delay", "need 0 <= min_delay <= max_delay"));
        }
        if !(0.0..=1.0).contains(&self.drop_probability) {
            return Err(invalid("drop_probability", "must lie in [0, 1]"));
        }
        if self.min_speed < 0.0 || self.max_speed < self.min_speed {
            return Err(invalid("min_speed/max_speed", "need 0 <= min_speed <= max_speed"));
        }
        if self.sinr_threshold <= 0.0 || self.sinr_alpha <= 0.0 || self.sinr_noise < 0.0 {
            return Err(invalid("sinr", "threshold and alpha must be positive, noise >= 0"));
        }
        Ok(())
    }
}

/// NaN and infinities slip through every range check below
fn require_finite(values: &[(&str, f64)]) -> Result<(), ConfigError> {
    match values.iter().find(|(_, value)| !value.is_finite()) {
        Some((name, value)) => Err(invalid(name, format!("must be finite, got {value}"))),
        None => Ok(()),
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        name: name.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.is_synchronous());
        assert_eq!(config.models.connectivity, "udg");
    }

    #[test]
    fn test_mobility_requires_synchronous_mode() {
        let config = SimConfig {
            mode: Mode::Asynchronous,
            mobility: true,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MobilityInAsynchronousMode)
        ));
    }

    #[test]
    fn test_zero_refresh_rate_rejected() {
        let config = SimConfig {
            refresh_rate: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroRefreshRate)));
    }

    #[test]
    fn test_from_toml_str() {
        let config = SimConfig::from_toml_str(
            r#"
            mode = "asynchronous"
            seed = 7
            refresh_rate = 10

            [models]
            reliability = "lossy"

            [models.params]
            drop_probability = 0.25

            [logging]
            default_level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, Mode::Asynchronous);
        assert_eq!(config.seed, 7);
        assert_eq!(config.refresh_rate, 10);
        assert_eq!(config.models.reliability, "lossy");
        assert_eq!(config.models.params.drop_probability, 0.25);
        // Untouched fields keep their defaults
        assert_eq!(config.models.connectivity, "udg");
        assert_eq!(config.logging.default_level, "debug");
        assert!(config.logging.console.enabled);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        assert!(matches!(
            SimConfig::from_toml_str("mode = \"sideways\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            SimConfig::from_toml_str("[models.params]\ndrop_probability = 2.0"),
            Err(ConfigError::InvalidParameter { .. })
        ));
    }
}
