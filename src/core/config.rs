//! Simulation configuration with documented constants
//!
//! All tunable numbers are collected here, grouped by the component that
//! reads them. Every section deserializes from TOML with per-field defaults,
//! so a config file only needs to mention the values it changes.

use crate::core::error::{Result, SimError};
use crate::core::types::Vec2;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration handed to every component at construction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for the population RNG (speeds, work offsets, spawn spread)
    pub seed: u64,
    pub economy: EconomyConfig,
    pub buildings: BuildingConfig,
    pub villagers: VillagerConfig,
    pub population: PopulationConfig,
    pub phones: PhoneConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            economy: EconomyConfig::default(),
            buildings: BuildingConfig::default(),
            villagers: VillagerConfig::default(),
            population: PopulationConfig::default(),
            phones: PhoneConfig::default(),
        }
    }
}

// === ECONOMY ===

/// Settings for a single productivity activity pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    pub label: String,
    /// Relative share of total productivity; normalized across activities
    pub workforce_allocation: f32,
    /// Stored progress gained per unit of productivity per second
    pub efficiency_multiplier: f32,
    /// Upper bound for stored progress (an activity with cap <= 0 is inert)
    pub storage_cap: f32,
    /// Fraction of `storage_cap` the pool holds after a reset
    pub starting_fill_percent: f32,
    /// Stored progress lost every second regardless of input
    pub passive_loss_per_second: f32,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            label: "Activity".into(),
            workforce_allocation: 0.33,
            efficiency_multiplier: 1.0,
            storage_cap: 100.0,
            starting_fill_percent: 0.25,
            passive_loss_per_second: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Productivity at full factor with empty bonus pools
    pub base_productivity: f32,
    /// Productivity factor after a reset (0.0 to 1.0)
    pub starting_factor: f32,
    /// Multiplier applied to the productivity factor on every phone landing
    pub disruption_decay_factor: f32,
    pub construction: ActivityConfig,
    pub farming: ActivityConfig,
    pub infrastructure: ActivityConfig,
    /// How strongly a full farming pool boosts overall productivity
    pub farming_bonus_multiplier: f32,
    /// How strongly a full infrastructure pool boosts overall productivity
    pub infrastructure_bonus_multiplier: f32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            base_productivity: 100.0,
            starting_factor: 1.0,
            disruption_decay_factor: 0.9,
            construction: ActivityConfig {
                label: "Construction".into(),
                workforce_allocation: 0.4,
                efficiency_multiplier: 0.5,
                storage_cap: 120.0,
                starting_fill_percent: 0.3,
                passive_loss_per_second: 2.0,
            },
            farming: ActivityConfig {
                label: "Farming".into(),
                workforce_allocation: 0.3,
                efficiency_multiplier: 0.7,
                storage_cap: 100.0,
                starting_fill_percent: 0.4,
                passive_loss_per_second: 1.5,
            },
            infrastructure: ActivityConfig {
                label: "Infrastructure".into(),
                workforce_allocation: 0.3,
                efficiency_multiplier: 0.6,
                storage_cap: 100.0,
                starting_fill_percent: 0.5,
                passive_loss_per_second: 1.0,
            },
            farming_bonus_multiplier: 0.5,
            infrastructure_bonus_multiplier: 0.5,
        }
    }
}

// === BUILDINGS ===

/// Blueprint used by the spawn policy for new construction sites
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingTemplate {
    pub name: String,
    pub construction_requirement: f32,
}

impl Default for BuildingTemplate {
    fn default() -> Self {
        Self {
            name: "Structure".into(),
            construction_requirement: 100.0,
        }
    }
}

/// Post-completion upkeep model (health decays, upkeep restores it)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub enabled: bool,
    pub max_health: f32,
    pub health_decay_per_second: f32,
    /// Infrastructure pool drawn per second and shared across standing buildings
    pub upkeep_draw_per_second: f32,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_health: 100.0,
            health_decay_per_second: 1.0,
            upkeep_draw_per_second: 4.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingConfig {
    /// Template for spawned buildings; `None` disables spawning
    pub template: Option<BuildingTemplate>,
    /// Ordered spawn locations, cycled round-robin
    pub spawn_points: Vec<Vec2>,
    /// Buildings placed at reset, before the spawn policy runs
    pub initial_buildings: Vec<Vec2>,
    /// Minimum number of buildings kept under construction
    pub target_under_construction_count: usize,
    /// Progress lost per second by a site nobody worked on
    pub construction_decay_per_second: f32,
    /// Construction pool drawn per second and shared across construction sites
    pub economy_build_draw_per_second: f32,
    pub maintenance: MaintenanceConfig,
}

impl Default for BuildingConfig {
    fn default() -> Self {
        Self {
            template: Some(BuildingTemplate::default()),
            spawn_points: vec![
                Vec2::new(-4.0, -1.0),
                Vec2::new(0.0, -1.0),
                Vec2::new(4.0, -1.0),
            ],
            initial_buildings: Vec::new(),
            target_under_construction_count: 1,
            construction_decay_per_second: 0.5,
            economy_build_draw_per_second: 5.0,
            maintenance: MaintenanceConfig::default(),
        }
    }
}

// === VILLAGERS ===

/// How a working villager picks its construction site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetPolicy {
    /// Closest site by straight-line distance
    #[default]
    Nearest,
    /// First site in registry (left-to-right) order
    RegistryOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VillagerConfig {
    /// Average movement speed in world units per second
    pub base_move_speed: f32,
    /// Per-villager speed spread (+/-)
    pub move_speed_variation: f32,
    /// Floor for a randomized speed
    pub min_move_speed: f32,
    /// Distance at which a villager counts as arrived
    pub close_enough_distance: f32,
    /// Distance at which a violent villager reaches its victim
    pub attack_range: f32,
    /// Construction effort per second on site (also the demolition rate)
    pub work_effort_per_second: f32,
    /// Maximum horizontal offset from the building when working
    pub work_offset_distance: f32,
    /// Speed multiplier while in ShiftingAttention (< 1.0)
    pub shifting_attention_speed_multiplier: f32,
    pub target_policy: TargetPolicy,
    /// Keep villagers on the ground line
    pub lock_to_ground: bool,
    pub ground_y: f32,
}

impl Default for VillagerConfig {
    fn default() -> Self {
        Self {
            base_move_speed: 1.5,
            move_speed_variation: 0.75,
            min_move_speed: 0.1,
            close_enough_distance: 0.05,
            attack_range: 0.25,
            work_effort_per_second: 10.0,
            work_offset_distance: 0.3,
            shifting_attention_speed_multiplier: 0.6,
            target_policy: TargetPolicy::Nearest,
            lock_to_ground: true,
            ground_y: -1.0,
        }
    }
}

// === POPULATION ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub initial_villager_count: usize,
    pub spawn_area_center: Vec2,
    pub spawn_area_width: f32,
    /// Seconds between productivity-driven state refreshes
    pub state_update_interval: f32,
    /// Working villagers this close to a dropped phone stop and stare until it clears.
    /// Zero disables freezing.
    pub freeze_radius: f32,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            initial_villager_count: 20,
            spawn_area_center: Vec2::new(0.0, -1.0),
            spawn_area_width: 6.0,
            state_update_interval: 1.5,
            freeze_radius: 1.5,
        }
    }
}

// === PHONES ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhoneConfig {
    /// Seconds a phone stays before despawning on its own (<= 0 means forever)
    pub lifetime: f32,
    /// Seconds after a phone clears before another may drop
    pub cooldown: f32,
    /// Height above the drop point where the phone appears
    pub drop_height: f32,
    /// Fall speed in world units per second
    pub fall_speed: f32,
    /// Villagers pushed to Idle by a streaming phone
    pub streaming_idle_count: usize,
    /// Global speed multiplier applied by a mainstream phone
    pub mainstream_slow_factor: f32,
    /// Lowest global speed multiplier a mainstream phone can cause
    pub min_global_speed_multiplier: f32,
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            lifetime: 5.0,
            cooldown: 3.0,
            drop_height: 5.0,
            fall_speed: 4.0,
            streaming_idle_count: 3,
            mainstream_slow_factor: 0.5,
            min_global_speed_multiplier: 0.2,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a config from a TOML file
    pub fn load_from_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse and validate a config from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let economy = &self.economy;
        if !(0.0..=1.0).contains(&economy.starting_factor) {
            return Err(invalid(format!(
                "economy.starting_factor ({}) must be within [0, 1]",
                economy.starting_factor
            )));
        }
        if !(economy.disruption_decay_factor > 0.0 && economy.disruption_decay_factor < 1.0) {
            return Err(invalid(format!(
                "economy.disruption_decay_factor ({}) must be within (0, 1)",
                economy.disruption_decay_factor
            )));
        }
        if economy.base_productivity < 0.0 {
            return Err(invalid("economy.base_productivity must be non-negative".into()));
        }
        for activity in [&economy.construction, &economy.farming, &economy.infrastructure] {
            validate_activity(activity)?;
        }

        let buildings = &self.buildings;
        if let Some(template) = &buildings.template {
            if template.construction_requirement <= 0.0 {
                return Err(invalid(format!(
                    "buildings.template.construction_requirement ({}) must be positive",
                    template.construction_requirement
                )));
            }
        }
        if buildings.construction_decay_per_second < 0.0
            || buildings.economy_build_draw_per_second < 0.0
        {
            return Err(invalid("building rates must be non-negative".into()));
        }
        let maintenance = &buildings.maintenance;
        if maintenance.enabled && maintenance.max_health <= 0.0 {
            return Err(invalid("buildings.maintenance.max_health must be positive".into()));
        }

        let villagers = &self.villagers;
        // Spawning rolls ranges from these
        for (name, value) in [
            ("villagers.base_move_speed", villagers.base_move_speed),
            ("villagers.min_move_speed", villagers.min_move_speed),
            ("villagers.move_speed_variation", villagers.move_speed_variation),
            ("villagers.work_offset_distance", villagers.work_offset_distance),
            ("population.spawn_area_width", self.population.spawn_area_width),
            ("population.spawn_area_center.x", self.population.spawn_area_center.x),
        ] {
            if !value.is_finite() {
                return Err(invalid(format!("{name} ({value}) must be finite")));
            }
        }
        if villagers.min_move_speed <= 0.0 || villagers.move_speed_variation < 0.0 {
            return Err(invalid(
                "villagers.min_move_speed must be positive and move_speed_variation non-negative"
                    .into(),
            ));
        }
        if villagers.work_offset_distance < 0.0 || villagers.close_enough_distance <= 0.0 {
            return Err(invalid(
                "villagers.work_offset_distance must be non-negative and close_enough_distance positive"
                    .into(),
            ));
        }
        if !(villagers.shifting_attention_speed_multiplier > 0.0
            && villagers.shifting_attention_speed_multiplier < 1.0)
        {
            return Err(invalid(format!(
                "villagers.shifting_attention_speed_multiplier ({}) must be within (0, 1)",
                villagers.shifting_attention_speed_multiplier
            )));
        }

        let population = &self.population;
        if population.state_update_interval <= 0.0 {
            return Err(invalid("population.state_update_interval must be positive".into()));
        }
        if population.spawn_area_width < 0.0 || population.freeze_radius < 0.0 {
            return Err(invalid(
                "population.spawn_area_width and freeze_radius must be non-negative".into(),
            ));
        }

        let phones = &self.phones;
        if phones.cooldown < 0.0 || phones.drop_height < 0.0 || phones.fall_speed <= 0.0 {
            return Err(invalid(
                "phones.cooldown and drop_height must be non-negative, fall_speed positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&phones.mainstream_slow_factor)
            || !(0.0..=1.0).contains(&phones.min_global_speed_multiplier)
        {
            return Err(invalid(
                "phones.mainstream_slow_factor and min_global_speed_multiplier must be within [0, 1]"
                    .into(),
            ));
        }

        Ok(())
    }
}

fn validate_activity(activity: &ActivityConfig) -> Result<()> {
    if !(0.0..=1.0).contains(&activity.workforce_allocation) {
        return Err(invalid(format!(
            "{}: workforce_allocation ({}) must be within [0, 1]",
            activity.label, activity.workforce_allocation
        )));
    }
    if !(0.0..=1.0).contains(&activity.starting_fill_percent) {
        return Err(invalid(format!(
            "{}: starting_fill_percent ({}) must be within [0, 1]",
            activity.label, activity.starting_fill_percent
        )));
    }
    if activity.efficiency_multiplier < 0.0
        || activity.storage_cap < 0.0
        || activity.passive_loss_per_second < 0.0
    {
        return Err(invalid(format!(
            "{}: efficiency, storage cap and passive loss must be non-negative",
            activity.label
        )));
    }
    Ok(())
}

fn invalid(message: String) -> SimError {
    SimError::InvalidConfig(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml_keeps_defaults() {
        let config = SimulationConfig::parse_toml(
            r#"
            seed = 7

            [phones]
            cooldown = 1.0

            [villagers]
            target_policy = "registry_order"
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.phones.cooldown, 1.0);
        assert_eq!(config.villagers.target_policy, TargetPolicy::RegistryOrder);
        // Untouched sections keep their defaults
        assert_eq!(config.phones.lifetime, 5.0);
        assert_eq!(config.economy.construction.label, "Construction");
    }

    #[test]
    fn test_parse_spawn_points() {
        let config = SimulationConfig::parse_toml(
            r#"
            [buildings]
            spawn_points = [{ x = 1.0, y = -1.0 }, { x = 2.0, y = -1.0 }]
            "#,
        )
        .unwrap();
        assert_eq!(config.buildings.spawn_points.len(), 2);
        assert_eq!(config.buildings.spawn_points[1], Vec2::new(2.0, -1.0));
    }

    #[test]
    fn test_rejects_bad_decay_factor() {
        let mut config = SimulationConfig::default();
        config.economy.disruption_decay_factor = 1.0;
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_bad_activity() {
        let mut config = SimulationConfig::default();
        config.economy.farming.workforce_allocation = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Farming"));
    }

    #[test]
    fn test_rejects_non_finite_spawn_ranges() {
        let result = SimulationConfig::parse_toml(
            r#"
            [villagers]
            move_speed_variation = nan
            "#,
        );
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));

        let result = SimulationConfig::parse_toml(
            r#"
            [population]
            spawn_area_width = inf
            "#,
        );
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));

        let mut config = SimulationConfig::default();
        config.villagers.work_offset_distance = f32::INFINITY;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("work_offset_distance"));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let result = SimulationConfig::parse_toml("seed = \"not a number\"");
        assert!(matches!(result, Err(SimError::ConfigParse(_))));
    }
}
