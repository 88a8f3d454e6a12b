//! Construction system - economy-driven effort and upkeep budgets
//!
//! All construction input is pre-scaled: callers hand over an amount that
//! already includes `dt`, and the building adds it directly. Villagers scale
//! their own effort; the economy's share is drawn from the activity pools
//! here.

use crate::core::config::BuildingConfig;
use crate::economy::{ActivityKind, ProductivityBand, ProductivityEconomy};

/// Everything the registry needs from the economy for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstructionSupport {
    /// Total construction effort available this tick (already scaled by dt)
    pub construction_effort: f32,
    /// Total upkeep available this tick (already scaled by dt)
    pub upkeep_effort: f32,
    /// 0.5 to 1.0, from the infrastructure pool fill
    pub infrastructure_support: f32,
    pub band: ProductivityBand,
}

impl ConstructionSupport {
    /// No economy help at all
    pub fn none(band: ProductivityBand) -> Self {
        Self {
            construction_effort: 0.0,
            upkeep_effort: 0.0,
            infrastructure_support: calculate_infrastructure_support(0.0),
            band,
        }
    }

    /// Withdraw this tick's budgets from the economy's pools
    pub fn draw(economy: &mut ProductivityEconomy, config: &BuildingConfig, dt: f32) -> Self {
        let band = economy.band();
        if dt <= 0.0 {
            return Self::none(band);
        }

        let infrastructure_support =
            calculate_infrastructure_support(economy.normalized_fill(ActivityKind::Infrastructure));

        let construction_effort = economy.consume(
            ActivityKind::Construction,
            config.economy_build_draw_per_second * dt,
        );

        let upkeep_effort = if config.maintenance.enabled {
            economy.consume(
                ActivityKind::Infrastructure,
                config.maintenance.upkeep_draw_per_second * dt,
            )
        } else {
            0.0
        };

        Self {
            construction_effort,
            upkeep_effort,
            infrastructure_support,
            band,
        }
    }
}

/// Infrastructure support multiplier
///
/// Formula: 0.5 + 0.5 * fill
/// - Empty pool => 0.5
/// - Half full  => 0.75
/// - Full pool  => 1.0
pub fn calculate_infrastructure_support(infrastructure_fill: f32) -> f32 {
    0.5 + 0.5 * infrastructure_fill.clamp(0.0, 1.0)
}

/// Economy effort landing on each construction site this tick
///
/// Formula: (total / sites) * band_multiplier * infrastructure_support
pub fn calculate_site_contribution(
    total_effort: f32,
    site_count: usize,
    band: ProductivityBand,
    infrastructure_support: f32,
) -> f32 {
    if site_count == 0 || total_effort <= 0.0 {
        return 0.0;
    }
    total_effort / site_count as f32 * band.construction_multiplier() * infrastructure_support
}

/// Upkeep landing on each standing building this tick
pub fn calculate_upkeep_share(
    total_upkeep: f32,
    standing_count: usize,
    infrastructure_support: f32,
) -> f32 {
    if standing_count == 0 || total_upkeep <= 0.0 {
        return 0.0;
    }
    total_upkeep / standing_count as f32 * infrastructure_support
}
