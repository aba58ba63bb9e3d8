//! Configuration loading and model selection by name

use std::io::Write;
use std::sync::Arc;

use meshsim::{
    ConfigError, InteractiveExit, Mode, ModelRegistry, Node, NodeContext, NoopHost, Packet,
    Position, RunOutcome, Runtime, SimConfig, SimError, StepError, World,
};
use tempfile::NamedTempFile;

struct Idle;

impl Node for Idle {
    fn handle_messages(
        &mut self,
        _ctx: &mut NodeContext<'_>,
        _inbox: &[Packet],
    ) -> Result<(), StepError> {
        Ok(())
    }
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(
        r#"
        mode = "asynchronous"
        seed = 99
        generate_nacks = true

        [dimensions]
        x = 200.0
        y = 50.0

        [models]
        transmission = "random"

        [models.params]
        min_delay = 1.0
        max_delay = 3.0
        "#,
    );

    let config = SimConfig::from_file(file.path()).unwrap();
    assert_eq!(config.mode, Mode::Asynchronous);
    assert_eq!(config.seed, 99);
    assert!(config.generate_nacks);
    assert_eq!(config.dimensions.x, 200.0);
    assert_eq!(config.models.transmission, "random");
    assert_eq!(config.models.params.max_delay, 3.0);
    assert_eq!(config.rounds, 100);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = SimConfig::from_file(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn test_mobility_in_async_mode_rejected() {
    let file = write_config("mode = \"asynchronous\"\nmobility = true\n");
    assert!(matches!(
        SimConfig::from_file(file.path()),
        Err(ConfigError::MobilityInAsynchronousMode)
    ));
}

#[test]
fn test_unknown_model_rejected_by_world() {
    let mut config = SimConfig::default();
    config.models.connectivity = "telepathy".into();

    let err = World::new(config, ModelRegistry::with_builtins()).unwrap_err();
    assert_eq!(err.to_string(), "Unknown connectivity model: telepathy");
}

#[test]
fn test_unknown_distribution_fails_node_creation() {
    let mut registry = ModelRegistry::with_builtins();
    let mut config = SimConfig::default();
    config.models.distribution = "spiral".into();
    assert!(World::new(config.clone(), registry.clone()).is_err());

    // a registry that knows the name accepts the same config
    registry.register(meshsim::ModelKind::Distribution, "spiral", |config| {
        meshsim::AnyModel::Distribution(Box::new(meshsim::models::CircleDistribution::new(
            config.dimensions,
        )))
    });
    assert!(World::new(config, registry).is_ok());
}

#[test]
fn test_configured_mobility_moves_nodes() {
    let file = write_config(
        r#"
        mobility = true
        seed = 5

        [models]
        mobility = "random_waypoint"

        [models.params]
        min_speed = 2.0
        max_speed = 4.0
        pause_rounds = 0
        "#,
    );
    let config = SimConfig::from_file(file.path()).unwrap();
    let mut world = World::new(config, ModelRegistry::with_builtins()).unwrap();
    let created = world
        .create_nodes(4, |_| Box::new(Idle))
        .unwrap();
    let before: Vec<Position> = created
        .iter()
        .filter_map(|id| world.position(*id))
        .collect();

    let runtime = Runtime::new(
        world,
        Arc::new(NoopHost),
        Arc::new(InteractiveExit::default()),
    )
    .unwrap();
    let report = runtime.run_blocking(5, false).unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed);

    let after: Vec<Position> =
        runtime.with_world(|w| created.iter().filter_map(|id| w.position(*id)).collect());
    assert_eq!(before.len(), 4);
    assert_ne!(before, after);
}

fn rejected_parameter(toml: &str) -> String {
    match SimConfig::from_toml_str(toml) {
        Err(ConfigError::InvalidParameter { name, .. }) => name,
        other => panic!("expected an invalid parameter, got {other:?}"),
    }
}

#[test]
fn test_non_finite_model_params_rejected() {
    let cases = [
        ("udg_radius", "nan"),
        ("transmission_delay", "inf"),
        ("min_delay", "-inf"),
        ("max_delay", "inf"),
        ("drop_probability", "nan"),
        ("min_speed", "nan"),
        ("max_speed", "inf"),
        ("sinr_threshold", "inf"),
        ("sinr_alpha", "nan"),
        ("sinr_noise", "inf"),
    ];
    for (param, value) in cases {
        let toml = format!("[models.params]\n{param} = {value}\n");
        assert_eq!(rejected_parameter(&toml), param, "{param} = {value}");
    }
}

#[test]
fn test_non_finite_dimensions_rejected() {
    for (axis, value) in [("x", "inf"), ("y", "nan"), ("z", "inf")] {
        let toml = format!("[dimensions]\n{axis} = {value}\n");
        assert_eq!(rejected_parameter(&toml), format!("dimensions.{axis}"));
    }
}

#[test]
fn test_infinite_random_delay_never_reaches_nodes() {
    let file = write_config(
        r#"
        [models]
        transmission = "random"

        [models.params]
        max_delay = inf
        "#,
    );
    let err = SimConfig::from_file(file.path()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid parameter max_delay: must be finite, got inf"
    );
}

#[test]
fn test_config_error_is_fatal() {
    let err: SimError = ConfigError::ZeroRefreshRate.into();
    assert!(!err.is_recoverable());
}
