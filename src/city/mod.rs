//! City layer - buildings, construction, and the building registry

pub mod building;
pub mod construction;
pub mod registry;

pub use building::{Building, BuildingSnapshot, BuildingState, ContributionResult, DamageResult};
pub use construction::{
    calculate_infrastructure_support, calculate_site_contribution, calculate_upkeep_share,
    ConstructionSupport,
};
pub use registry::{BuildingEvent, BuildingRegistry};
