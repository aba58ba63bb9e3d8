//! Model registry
//!
//! Models are looked up by `(kind, name)`. The registry ships with the
//! built-in models; applications register their own factories under new
//! names before building a world. Factories receive the whole
//! [`SimConfig`] so they can read the deployment area and model parameters.

use std::collections::BTreeMap;
use std::sync::Arc;

use derive_more::Display;
use meshsim_core::{
    ConfigError, ConnectivityModel, DistributionModel, InterferenceModel, MobilityModel,
    ReliabilityModel, TransmissionModel,
};

use crate::config::SimConfig;
use crate::models::{
    CircleDistribution, ConstantDelay, GridDistribution, LineDistribution, LossyDelivery,
    NoInterference, NoMobility, NodeModels, RandomDelay, RandomDistribution, RandomWaypoint,
    ReliableDelivery, SinrInterference, StaticConnectivity, UnitDiskGraph,
};

/// The kinds of pluggable models
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModelKind {
    #[display("mobility")]
    Mobility,
    #[display("connectivity")]
    Connectivity,
    #[display("interference")]
    Interference,
    #[display("reliability")]
    Reliability,
    #[display("transmission")]
    Transmission,
    #[display("distribution")]
    Distribution,
}

/// A freshly built model of any kind
pub enum AnyModel {
    Mobility(Box<dyn MobilityModel>),
    Connectivity(Box<dyn ConnectivityModel>),
    Interference(Box<dyn InterferenceModel>),
    Reliability(Box<dyn ReliabilityModel>),
    Transmission(Box<dyn TransmissionModel>),
    Distribution(Box<dyn DistributionModel>),
}

impl AnyModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            AnyModel::Mobility(_) => ModelKind::Mobility,
            AnyModel::Connectivity(_) => ModelKind::Connectivity,
            AnyModel::Interference(_) => ModelKind::Interference,
            AnyModel::Reliability(_) => ModelKind::Reliability,
            AnyModel::Transmission(_) => ModelKind::Transmission,
            AnyModel::Distribution(_) => ModelKind::Distribution,
        }
    }
}

type Factory = Arc<dyn Fn(&SimConfig) -> AnyModel + Send + Sync>;

/// Factories for named models
#[derive(Clone)]
pub struct ModelRegistry {
    factories: BTreeMap<(ModelKind, String), Factory>,
}

macro_rules! typed_getter {
    ($fn_name:ident, $variant:ident, $trait:ident) => {
        pub fn $fn_name(
            &self,
            name: &str,
            config: &SimConfig,
        ) -> Result<Box<dyn $trait>, ConfigError> {
            match self.get(ModelKind::$variant, name, config)? {
                AnyModel::$variant(model) => Ok(model),
                _ => Err(ConfigError::ModelKindMismatch {
                    name: name.to_string(),
                    expected: ModelKind::$variant.to_string(),
                }),
            }
        }
    };
}

impl ModelRegistry {
    /// A registry without any models
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry holding every built-in model
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();

        registry.register(ModelKind::Mobility, "none", |_| {
            AnyModel::Mobility(Box::new(NoMobility))
        });
        registry.register(ModelKind::Mobility, "random_waypoint", |config| {
            let p = &config.models.params;
            AnyModel::Mobility(Box::new(RandomWaypoint::new(
                config.dimensions,
                p.min_speed,
                p.max_speed,
                p.pause_rounds,
            )))
        });

        registry.register(ModelKind::Connectivity, "udg", |config| {
            AnyModel::Connectivity(Box::new(UnitDiskGraph::new(config.models.params.udg_radius)))
        });
        registry.register(ModelKind::Connectivity, "static", |_| {
            AnyModel::Connectivity(Box::new(StaticConnectivity))
        });

        registry.register(ModelKind::Interference, "none", |_| {
            AnyModel::Interference(Box::new(NoInterference))
        });
        registry.register(ModelKind::Interference, "sinr", |config| {
            let p = &config.models.params;
            AnyModel::Interference(Box::new(SinrInterference::new(
                p.sinr_alpha,
                p.sinr_threshold,
                p.sinr_noise,
            )))
        });

        registry.register(ModelKind::Reliability, "reliable", |_| {
            AnyModel::Reliability(Box::new(ReliableDelivery))
        });
        registry.register(ModelKind::Reliability, "lossy", |config| {
            AnyModel::Reliability(Box::new(LossyDelivery::new(
                config.models.params.drop_probability,
            )))
        });

        registry.register(ModelKind::Transmission, "constant", |config| {
            AnyModel::Transmission(Box::new(ConstantDelay::new(
                config.models.params.transmission_delay,
            )))
        });
        registry.register(ModelKind::Transmission, "random", |config| {
            let p = &config.models.params;
            AnyModel::Transmission(Box::new(RandomDelay::new(p.min_delay, p.max_delay)))
        });

        registry.register(ModelKind::Distribution, "random", |config| {
            AnyModel::Distribution(Box::new(RandomDistribution::new(config.dimensions)))
        });
        registry.register(ModelKind::Distribution, "grid", |config| {
            AnyModel::Distribution(Box::new(GridDistribution::new(config.dimensions)))
        });
        registry.register(ModelKind::Distribution, "line", |config| {
            AnyModel::Distribution(Box::new(LineDistribution::new(config.dimensions)))
        });
        registry.register(ModelKind::Distribution, "circle", |config| {
            AnyModel::Distribution(Box::new(CircleDistribution::new(config.dimensions)))
        });

        registry
    }

    /// Register (or replace) the factory for `(kind, name)`
    pub fn register<F>(&mut self, kind: ModelKind, name: impl Into<String>, factory: F)
    where
        F: Fn(&SimConfig) -> AnyModel + Send + Sync + 'static,
    {
        self.factories.insert((kind, name.into()), Arc::new(factory));
    }

    /// Build a fresh model instance
    pub fn get(
        &self,
        kind: ModelKind,
        name: &str,
        config: &SimConfig,
    ) -> Result<AnyModel, ConfigError> {
        let factory = self
            .factories
            .get(&(kind, name.to_string()))
            .ok_or_else(|| ConfigError::UnknownModel {
                kind: kind.to_string(),
                name: name.to_string(),
            })?;
        Ok(factory(config))
    }

    pub fn contains(&self, kind: ModelKind, name: &str) -> bool {
        self.factories.contains_key(&(kind, name.to_string()))
    }

    /// Registered names of one kind, sorted
    pub fn names(&self, kind: ModelKind) -> Vec<&str> {
        self.factories
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, name)| name.as_str())
            .collect()
    }

    typed_getter!(mobility, Mobility, MobilityModel);
    typed_getter!(connectivity, Connectivity, ConnectivityModel);
    typed_getter!(interference, Interference, InterferenceModel);
    typed_getter!(reliability, Reliability, ReliabilityModel);
    typed_getter!(transmission, Transmission, TransmissionModel);
    typed_getter!(distribution, Distribution, DistributionModel);

    /// Per-node models named by the configuration
    pub fn node_models(&self, config: &SimConfig) -> Result<NodeModels, ConfigError> {
        let names = &config.models;
        Ok(NodeModels {
            mobility: self.mobility(&names.mobility, config)?,
            connectivity: self.connectivity(&names.connectivity, config)?,
            interference: self.interference(&names.interference, config)?,
            reliability: self.reliability(&names.reliability, config)?,
        })
    }

    /// Check that every model named by the configuration is registered
    pub fn validate(&self, config: &SimConfig) -> Result<(), ConfigError> {
        let names = &config.models;
        for (kind, name) in [
            (ModelKind::Mobility, &names.mobility),
            (ModelKind::Connectivity, &names.connectivity),
            (ModelKind::Interference, &names.interference),
            (ModelKind::Reliability, &names.reliability),
            (ModelKind::Transmission, &names.transmission),
            (ModelKind::Distribution, &names.distribution),
        ] {
            if !self.contains(kind, name) {
                return Err(ConfigError::UnknownModel {
                    kind: kind.to_string(),
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
