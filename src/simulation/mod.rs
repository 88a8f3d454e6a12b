//! Simulation systems - villager behavior, population coordination, the tick loop

pub mod behavior;
pub mod population;
pub mod tick;

pub use behavior::{update_villagers, AgentReport, BehaviorContext, PhoneView};
pub use population::{CollapseReason, EffectOutcome, Pickup, PopulationCoordinator, PopulationStats};
pub use tick::{CollapseReport, LifecycleHost, Simulation, SimulationEvent, SimulationSnapshot};
