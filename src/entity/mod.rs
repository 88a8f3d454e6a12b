pub mod villager;

pub use villager::{
    DestructiveMode, StateChange, VillagerArchetype, VillagerSnapshot, VillagerState,
    VillagerTarget,
};
