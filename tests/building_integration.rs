//! Integration tests for the building registry
//!
//! These tests verify the building lifecycle and spawn policy:
//! - Construction progress clamps to the requirement and completes once
//! - Spawning cycles through the configured points
//! - Economy-driven construction through `ConstructionSupport`
//! - Destruction by damage and explicit collapse

use phonefall::city::{
    BuildingEvent, BuildingRegistry, BuildingState, ConstructionSupport, ContributionResult,
};
use phonefall::core::config::{BuildingConfig, BuildingTemplate, EconomyConfig, MaintenanceConfig};
use phonefall::core::types::Vec2;
use phonefall::economy::{ProductivityBand, ProductivityEconomy};

fn config() -> BuildingConfig {
    BuildingConfig {
        template: Some(BuildingTemplate {
            name: "House".into(),
            construction_requirement: 100.0,
        }),
        spawn_points: vec![Vec2::new(-4.0, -1.0), Vec2::new(0.0, -1.0), Vec2::new(4.0, -1.0)],
        economy_build_draw_per_second: 0.0,
        ..BuildingConfig::default()
    }
}

#[test]
fn test_progress_90_plus_20_completes_at_100() {
    let mut registry = BuildingRegistry::new(&config());
    registry.ensure_active_buildings();
    let id = registry.iter().next().unwrap().id;

    registry.add_construction_progress(id, 90.0);
    let result = registry.add_construction_progress(id, 20.0);

    assert!(matches!(result, ContributionResult::Completed { .. }));
    let building = registry.get(id).unwrap();
    assert_eq!(building.construction_progress(), 100.0);
    assert_eq!(building.state(), BuildingState::Completed);

    // Completion happens exactly once
    assert_eq!(
        registry.add_construction_progress(id, 20.0),
        ContributionResult::NotUnderConstruction
    );
    assert_eq!(registry.get(id).unwrap().state(), BuildingState::Completed);
}

#[test]
fn test_spawn_policy_round_robin() {
    let mut registry = BuildingRegistry::new(&config());
    let support = ConstructionSupport::none(ProductivityBand::Thriving);

    let mut positions = Vec::new();
    for _ in 0..5 {
        for event in registry.advance(0.1, &support) {
            if let BuildingEvent::Spawned { id, position } = event {
                positions.push(position.x);
                registry.add_construction_progress(id, 100.0);
            }
        }
    }

    assert_eq!(positions, vec![-4.0, 0.0, 4.0, -4.0, 0.0]);
    assert_eq!(registry.count_in_state(BuildingState::Completed), 5);
    assert_eq!(registry.under_construction_count(), 0);
}

#[test]
fn test_economy_builds_without_villagers() {
    let mut building_config = config();
    building_config.economy_build_draw_per_second = 5.0;
    let mut registry = BuildingRegistry::new(&building_config);
    let mut economy = ProductivityEconomy::new(&EconomyConfig::default());

    let mut completed = 0;
    for _ in 0..600 {
        economy.tick(0.1);
        let support = ConstructionSupport::draw(&mut economy, &building_config, 0.1);
        completed += registry
            .advance(0.1, &support)
            .iter()
            .filter(|e| matches!(e, BuildingEvent::Completed { .. }))
            .count();
    }

    assert!(completed >= 1, "economy effort alone should finish a site");
}

#[test]
fn test_neglected_site_never_goes_negative() {
    let mut building_config = config();
    building_config.construction_decay_per_second = 5.0;
    let mut registry = BuildingRegistry::new(&building_config);
    let support = ConstructionSupport::none(ProductivityBand::Thriving);
    registry.advance(0.1, &support);
    let id = registry.iter().next().unwrap().id;

    registry.add_construction_progress(id, 3.0);
    for _ in 0..20 {
        registry.advance(0.5, &support);
        let progress = registry.get(id).unwrap().construction_progress();
        assert!(progress >= 0.0);
    }
    assert_eq!(registry.get(id).unwrap().construction_progress(), 0.0);
    assert_eq!(registry.get(id).unwrap().state(), BuildingState::UnderConstruction);
}

#[test]
fn test_damage_and_collapse_reach_destroyed() {
    let mut registry = BuildingRegistry::new(&BuildingConfig {
        template: None,
        ..config()
    });
    let a = registry.place(Vec2::new(0.0, -1.0), "A".into(), 10.0);
    let b = registry.place(Vec2::new(2.0, -1.0), "B".into(), 10.0);
    registry.add_construction_progress(a, 10.0);

    registry.damage(a, 10.0);
    assert_eq!(registry.get(a).unwrap().state(), BuildingState::Destroyed);
    assert!(!registry.all_destroyed());

    assert!(registry.force_collapse(b));
    assert!(registry.all_destroyed());
    // Destroyed is terminal
    assert!(!registry.force_collapse(b));
}

#[test]
fn test_maintained_buildings_need_upkeep() {
    let mut building_config = config();
    building_config.target_under_construction_count = 0;
    building_config.maintenance = MaintenanceConfig {
        enabled: true,
        max_health: 100.0,
        health_decay_per_second: 5.0,
        upkeep_draw_per_second: 0.0,
    };
    let mut registry = BuildingRegistry::new(&building_config);
    let id = registry.place(Vec2::ZERO, "Hall".into(), 10.0);
    registry.add_construction_progress(id, 10.0);
    assert_eq!(registry.get(id).unwrap().health(), Some(100.0));

    let idle = ConstructionSupport::none(ProductivityBand::Thriving);
    let mut states = Vec::new();
    for _ in 0..25 {
        for event in registry.advance(1.0, &idle) {
            match event {
                BuildingEvent::StateChanged { to, .. } => states.push(to),
                BuildingEvent::Destroyed { .. } => states.push(BuildingState::Destroyed),
                _ => {}
            }
        }
    }

    assert_eq!(
        states,
        vec![BuildingState::Declining, BuildingState::Ruined, BuildingState::Destroyed]
    );
}
