//! Productivity economy - the global productivity scalar and its activity pools
//!
//! Productivity is `base * factor * bonus`, where the factor only ever
//! shrinks (one multiplicative step per phone landing) and the bonus comes
//! from how full the farming and infrastructure pools are. Each tick the
//! current productivity is split across the activities by their normalized
//! workforce allocation.

use crate::core::config::EconomyConfig;
use crate::economy::activity::{ActivityKind, ProductivityActivity};
use serde::{Deserialize, Serialize};

/// Productivity at or above this is Thriving
pub const THRIVING_THRESHOLD: f32 = 75.0;

/// Coarse productivity tier gating villager and building behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductivityBand {
    Thriving,
    Declining,
    Collapse,
}

impl ProductivityBand {
    pub fn from_productivity(productivity: f32) -> Self {
        if productivity >= THRIVING_THRESHOLD {
            ProductivityBand::Thriving
        } else if productivity > 0.0 {
            ProductivityBand::Declining
        } else {
            ProductivityBand::Collapse
        }
    }

    /// Scale applied to a villager's on-site work effort
    pub fn work_multiplier(&self) -> f32 {
        match self {
            ProductivityBand::Thriving => 1.0,
            ProductivityBand::Declining => 0.5,
            ProductivityBand::Collapse => 0.2,
        }
    }

    /// Scale applied to economy-driven construction effort
    pub fn construction_multiplier(&self) -> f32 {
        match self {
            ProductivityBand::Thriving => 1.2,
            ProductivityBand::Declining => 0.8,
            ProductivityBand::Collapse => 0.4,
        }
    }
}

/// Read-only view of the economy for presentation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomySnapshot {
    pub current_productivity: f32,
    pub productivity_factor: f32,
    pub band: ProductivityBand,
    pub construction_fill: f32,
    pub farming_fill: f32,
    pub infrastructure_fill: f32,
    pub disruptions: u32,
}

pub struct ProductivityEconomy {
    base_productivity: f32,
    starting_factor: f32,
    disruption_decay_factor: f32,
    farming_bonus_multiplier: f32,
    infrastructure_bonus_multiplier: f32,
    construction: ProductivityActivity,
    farming: ProductivityActivity,
    infrastructure: ProductivityActivity,
    productivity_factor: f32,
    current_productivity: f32,
    disruptions: u32,
}

impl ProductivityEconomy {
    pub fn new(config: &EconomyConfig) -> Self {
        let mut economy = Self {
            base_productivity: config.base_productivity.max(0.0),
            starting_factor: config.starting_factor.clamp(0.0, 1.0),
            disruption_decay_factor: config.disruption_decay_factor.clamp(0.0, 1.0),
            farming_bonus_multiplier: config.farming_bonus_multiplier,
            infrastructure_bonus_multiplier: config.infrastructure_bonus_multiplier,
            construction: ProductivityActivity::from_config(&config.construction),
            farming: ProductivityActivity::from_config(&config.farming),
            infrastructure: ProductivityActivity::from_config(&config.infrastructure),
            productivity_factor: 1.0,
            current_productivity: 0.0,
            disruptions: 0,
        };
        economy.reset();
        economy
    }

    /// Full reset: factor back to its starting value, pools refilled
    pub fn reset(&mut self) {
        self.productivity_factor = self.starting_factor;
        self.disruptions = 0;
        for kind in ActivityKind::ALL {
            self.activity_mut(kind).initialize();
        }
        self.update_productivity();
    }

    /// Distribute current productivity across activities and recompute it
    pub fn tick(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }

        let total_allocation: f32 = ActivityKind::ALL
            .iter()
            .map(|&kind| self.activity(kind).workforce_allocation)
            .sum();

        if total_allocation <= 0.0 || self.current_productivity <= 0.0 {
            // Nothing to distribute, only passive loss applies
            for kind in ActivityKind::ALL {
                self.activity_mut(kind).tick(0.0, dt);
            }
        } else {
            let current = self.current_productivity;
            for kind in ActivityKind::ALL {
                let activity = self.activity_mut(kind);
                let share = activity.workforce_allocation / total_allocation;
                activity.tick(current * share, dt);
            }
        }

        self.update_productivity();
    }

    /// A phone landed: shrink the productivity factor for good
    pub fn apply_disruption(&mut self) {
        self.productivity_factor =
            (self.productivity_factor * self.disruption_decay_factor).clamp(0.0, 1.0);
        self.disruptions += 1;
        self.update_productivity();
        tracing::debug!(
            factor = self.productivity_factor,
            productivity = self.current_productivity,
            "Productivity disrupted"
        );
    }

    /// Withdraw stored progress from an activity, returns amount actually consumed
    pub fn consume(&mut self, kind: ActivityKind, desired: f32) -> f32 {
        self.activity_mut(kind).consume(desired)
    }

    pub fn band(&self) -> ProductivityBand {
        ProductivityBand::from_productivity(self.current_productivity)
    }

    pub fn current_productivity(&self) -> f32 {
        self.current_productivity
    }

    pub fn productivity_factor(&self) -> f32 {
        self.productivity_factor
    }

    pub fn disruption_count(&self) -> u32 {
        self.disruptions
    }

    pub fn normalized_fill(&self, kind: ActivityKind) -> f32 {
        self.activity(kind).normalized_progress()
    }

    pub fn activity(&self, kind: ActivityKind) -> &ProductivityActivity {
        match kind {
            ActivityKind::Construction => &self.construction,
            ActivityKind::Farming => &self.farming,
            ActivityKind::Infrastructure => &self.infrastructure,
        }
    }

    pub fn activity_mut(&mut self, kind: ActivityKind) -> &mut ProductivityActivity {
        match kind {
            ActivityKind::Construction => &mut self.construction,
            ActivityKind::Farming => &mut self.farming,
            ActivityKind::Infrastructure => &mut self.infrastructure,
        }
    }

    pub fn snapshot(&self) -> EconomySnapshot {
        EconomySnapshot {
            current_productivity: self.current_productivity,
            productivity_factor: self.productivity_factor,
            band: self.band(),
            construction_fill: self.normalized_fill(ActivityKind::Construction),
            farming_fill: self.normalized_fill(ActivityKind::Farming),
            infrastructure_fill: self.normalized_fill(ActivityKind::Infrastructure),
            disruptions: self.disruptions,
        }
    }

    fn update_productivity(&mut self) {
        let multiplier = 1.0
            + self.farming_bonus_multiplier * self.farming.normalized_progress()
            + self.infrastructure_bonus_multiplier * self.infrastructure.normalized_progress();

        self.current_productivity =
            (self.base_productivity * self.productivity_factor * multiplier).max(0.0);
    }
}
