//! Built-in model implementations
//!
//! Each node carries its own mobility, connectivity, interference, and
//! reliability model instance. Transmission and distribution models are
//! shared by the whole world.

pub mod connectivity;
pub mod distribution;
pub mod interference;
pub mod mobility;
pub mod reliability;
pub mod transmission;

pub use connectivity::{StaticConnectivity, UnitDiskGraph};
pub use distribution::{
    CircleDistribution, GridDistribution, LineDistribution, RandomDistribution,
};
pub use interference::{NoInterference, SinrInterference};
pub use mobility::{NoMobility, RandomWaypoint};
pub use reliability::{LossyDelivery, ReliableDelivery};
pub use transmission::{ConstantDelay, RandomDelay};

use meshsim_core::{ConnectivityModel, InterferenceModel, MobilityModel, ReliabilityModel};

/// The per-node model instances
pub struct NodeModels {
    pub mobility: Box<dyn MobilityModel>,
    pub connectivity: Box<dyn ConnectivityModel>,
    pub interference: Box<dyn InterferenceModel>,
    pub reliability: Box<dyn ReliabilityModel>,
}

impl NodeModels {
    /// Static node with hand-made edges, reliable links, and no interference
    pub fn fixed() -> Self {
        Self {
            mobility: Box::new(NoMobility),
            connectivity: Box::new(StaticConnectivity),
            interference: Box::new(NoInterference),
            reliability: Box::new(ReliableDelivery),
        }
    }

    pub fn with_mobility(mut self, model: impl MobilityModel + 'static) -> Self {
        self.mobility = Box::new(model);
        self
    }

    pub fn with_connectivity(mut self, model: impl ConnectivityModel + 'static) -> Self {
        self.connectivity = Box::new(model);
        self
    }

    pub fn with_interference(mut self, model: impl InterferenceModel + 'static) -> Self {
        self.interference = Box::new(model);
        self
    }

    pub fn with_reliability(mut self, model: impl ReliabilityModel + 'static) -> Self {
        self.reliability = Box::new(model);
        self
    }
}

impl std::fmt::Debug for NodeModels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeModels").finish_non_exhaustive()
    }
}
