//! Building lifecycle
//!
//! ```text
//! UnderConstruction --progress >= requirement--> Completed
//! Completed <-> Declining <-> Ruined            (health bands, maintenance only)
//! any live state --damage / force_collapse-----> Destroyed (terminal)
//! ```

use crate::core::types::{BuildingId, Vec2};
use serde::{Deserialize, Serialize};

/// Health fraction at or above which a maintained building counts as Completed
pub const COMPLETED_HEALTH_FRACTION: f32 = 0.75;
/// Health fraction at or above which a maintained building counts as Declining
pub const DECLINING_HEALTH_FRACTION: f32 = 0.40;

/// Current state of a building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingState {
    /// Construction site - not yet usable
    UnderConstruction,
    /// Fully operational
    Completed,
    /// Standing, but upkeep is falling behind
    Declining,
    /// Barely standing
    Ruined,
    /// Gone for good
    Destroyed,
}

impl BuildingState {
    /// Completed, Declining or Ruined
    pub fn is_standing(&self) -> bool {
        matches!(
            self,
            BuildingState::Completed | BuildingState::Declining | BuildingState::Ruined
        )
    }

    pub fn is_destroyed(&self) -> bool {
        *self == BuildingState::Destroyed
    }

    /// Map a health fraction onto the post-completion bands
    pub fn from_health_fraction(fraction: f32) -> Self {
        if fraction >= COMPLETED_HEALTH_FRACTION {
            BuildingState::Completed
        } else if fraction >= DECLINING_HEALTH_FRACTION {
            BuildingState::Declining
        } else if fraction > 0.0 {
            BuildingState::Ruined
        } else {
            BuildingState::Destroyed
        }
    }
}

/// Result of a construction contribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContributionResult {
    /// Work contributed, building still under construction
    InProgress { contributed: f32 },
    /// Work contributed, building is now complete
    Completed { contributed: f32 },
    /// Building is not a construction site (complete or destroyed)
    NotUnderConstruction,
    /// Building not found
    NotFound,
}

/// Result of damage applied by a destructive villager
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageResult {
    /// Building still stands (or is still a site) with this much left
    Damaged { remaining: f32 },
    /// This hit destroyed the building
    Destroyed,
    /// Nothing left to damage
    AlreadyDestroyed,
    /// Building not found
    NotFound,
}

/// Presentation view of a single building
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingSnapshot {
    pub id: BuildingId,
    pub name: String,
    pub position: Vec2,
    pub state: BuildingState,
    pub construction_progress: f32,
    pub construction_requirement: f32,
    pub health: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct Building {
    pub id: BuildingId,
    pub name: String,
    pub position: Vec2,
    state: BuildingState,
    construction_requirement: f32,
    construction_progress: f32,
    /// Max health once completed; `None` when maintenance is off
    max_health: Option<f32>,
    health: Option<f32>,
    /// Received construction effort since the last maintenance pass
    tended: bool,
}

impl Building {
    /// A fresh construction site at zero progress
    pub fn new(
        id: BuildingId,
        name: String,
        position: Vec2,
        construction_requirement: f32,
        max_health: Option<f32>,
    ) -> Self {
        Self {
            id,
            name,
            position,
            state: BuildingState::UnderConstruction,
            construction_requirement: construction_requirement.max(0.0),
            construction_progress: 0.0,
            max_health: max_health.filter(|h| *h > 0.0),
            health: None,
            tended: false,
        }
    }

    pub fn state(&self) -> BuildingState {
        self.state
    }

    pub fn construction_progress(&self) -> f32 {
        self.construction_progress
    }

    pub fn construction_requirement(&self) -> f32 {
        self.construction_requirement
    }

    pub fn health(&self) -> Option<f32> {
        self.health
    }

    pub fn is_tended(&self) -> bool {
        self.tended
    }

    pub fn clear_tended(&mut self) {
        self.tended = false;
    }

    /// Fraction of construction done (0.0 to 1.0)
    pub fn progress_fraction(&self) -> f32 {
        if self.construction_requirement <= 0.0 {
            1.0
        } else {
            self.construction_progress / self.construction_requirement
        }
    }

    /// Add already-scaled construction effort
    pub fn add_construction_progress(&mut self, amount: f32) -> ContributionResult {
        if self.state != BuildingState::UnderConstruction {
            return ContributionResult::NotUnderConstruction;
        }

        let before = self.construction_progress;
        self.construction_progress =
            (self.construction_progress + amount).clamp(0.0, self.construction_requirement);
        let contributed = self.construction_progress - before;
        if amount > 0.0 {
            self.tended = true;
        }

        if self.construction_progress >= self.construction_requirement {
            self.construction_progress = self.construction_requirement;
            self.state = BuildingState::Completed;
            self.health = self.max_health;
            ContributionResult::Completed { contributed }
        } else {
            ContributionResult::InProgress { contributed }
        }
    }

    /// Neglect: a site loses progress, but never drops below zero or gets destroyed
    pub fn regress(&mut self, amount: f32) {
        if self.state != BuildingState::UnderConstruction || amount <= 0.0 {
            return;
        }
        self.construction_progress = (self.construction_progress - amount).max(0.0);
    }

    /// Tear the building down by `amount`
    ///
    /// Maintained buildings lose health; everything else loses construction
    /// progress. Reaching zero destroys the building.
    pub fn damage(&mut self, amount: f32) -> DamageResult {
        if self.state.is_destroyed() {
            return DamageResult::AlreadyDestroyed;
        }
        let amount = amount.max(0.0);

        let remaining = match (self.state.is_standing(), self.health, self.max_health) {
            (true, Some(health), Some(max_health)) => {
                let health = (health - amount).clamp(0.0, max_health);
                self.health = Some(health);
                self.state = BuildingState::from_health_fraction(health / max_health);
                health
            }
            _ => {
                self.construction_progress = (self.construction_progress - amount).max(0.0);
                if self.construction_progress <= 0.0 {
                    self.state = BuildingState::Destroyed;
                }
                self.construction_progress
            }
        };

        if self.state.is_destroyed() {
            self.construction_progress = 0.0;
            self.health = self.health.map(|_| 0.0);
            DamageResult::Destroyed
        } else {
            DamageResult::Damaged { remaining }
        }
    }

    /// Passive health decay plus upkeep for a maintained, standing building
    ///
    /// Returns the new state if the health band changed.
    pub fn apply_maintenance(&mut self, decay: f32, upkeep: f32) -> Option<BuildingState> {
        if !self.state.is_standing() {
            return None;
        }
        let (Some(health), Some(max_health)) = (self.health, self.max_health) else {
            return None;
        };

        let health = (health - decay.max(0.0) + upkeep.max(0.0)).clamp(0.0, max_health);
        self.health = Some(health);

        let new_state = BuildingState::from_health_fraction(health / max_health);
        if new_state != self.state {
            self.state = new_state;
            if new_state.is_destroyed() {
                self.construction_progress = 0.0;
            }
            Some(new_state)
        } else {
            None
        }
    }

    /// Destroy immediately from any live state
    pub fn force_collapse(&mut self) -> bool {
        if self.state.is_destroyed() {
            return false;
        }
        self.state = BuildingState::Destroyed;
        self.construction_progress = 0.0;
        self.health = self.health.map(|_| 0.0);
        true
    }

    pub fn snapshot(&self) -> BuildingSnapshot {
        BuildingSnapshot {
            id: self.id,
            name: self.name.clone(),
            position: self.position,
            state: self.state,
            construction_progress: self.construction_progress,
            construction_requirement: self.construction_requirement,
            health: self.health,
        }
    }
}
