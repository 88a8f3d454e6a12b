//! Integration tests for phone drops
//!
//! These tests verify the full drop -> land -> effect -> clear cycle:
//! - Cooldown and single-phone gating in the dispatcher
//! - Landing disrupts the economy and applies the type-specific effect
//! - Social media and gambling phones turn their collector destructive
//! - Tapping before landing applies nothing
//! - Clearing unfreezes villagers and restores global speed

use phonefall::core::error::SimError;
use phonefall::core::config::PhoneConfig;
use phonefall::core::types::Vec2;
use phonefall::core::SimulationConfig;
use phonefall::entity::{DestructiveMode, VillagerState};
use phonefall::phone::{ClearReason, PhoneDispatcher, PhoneEvent, PhoneType};
use phonefall::simulation::{Simulation, SimulationEvent};

const DT: f32 = 0.05;

/// Simulation with villagers at fixed x positions on the ground
fn village(xs: &[f32]) -> Simulation {
    let mut config = SimulationConfig::default();
    config.population.initial_villager_count = 0;
    config.villagers.move_speed_variation = 0.0;
    config.villagers.work_offset_distance = 0.0;

    let mut simulation = Simulation::new(config).unwrap();
    for &x in xs {
        simulation.population_mut().spawn_villager(Vec2::new(x, -1.0));
    }
    simulation
}

fn run(simulation: &mut Simulation, seconds: f32) -> Vec<SimulationEvent> {
    simulation.run_for(seconds, DT, &mut ())
}

fn landed(events: &[SimulationEvent]) -> bool {
    events
        .iter()
        .any(|e| matches!(e, SimulationEvent::Phone(PhoneEvent::Landed { .. })))
}

#[test]
fn test_cooldown_blocks_drops_for_three_seconds() {
    let mut phones = PhoneDispatcher::new(&PhoneConfig::default());
    phones.spawn_event(Vec2::ZERO, PhoneType::Streaming).unwrap();
    assert!(phones.tap_active().is_some());

    let mut elapsed = 0.0;
    while elapsed < 2.9 {
        assert!(matches!(
            phones.spawn_event(Vec2::ZERO, PhoneType::Streaming),
            Err(SimError::CoolingDown { .. })
        ));
        phones.advance(0.1);
        elapsed += 0.1;
    }

    phones.advance(0.2);
    assert!(phones.spawn_event(Vec2::ZERO, PhoneType::Streaming).is_ok());
}

#[test]
fn test_landing_disrupts_the_economy() {
    let mut simulation = village(&[0.0, 2.0, 4.0]);
    let factor_before = simulation.economy().productivity_factor();

    simulation.drop_phone(Vec2::new(8.0, 2.0), PhoneType::Mainstream).unwrap();
    let events = run(&mut simulation, 2.0);

    assert!(landed(&events));
    assert!((simulation.economy().productivity_factor() - factor_before * 0.9).abs() < 0.001);
    assert_eq!(simulation.economy().disruption_count(), 1);
}

#[test]
fn test_tap_before_landing_has_no_effect() {
    let mut simulation = village(&[0.0, 0.5, 1.0, 4.0]);

    let (_, responder) = simulation.drop_phone(Vec2::new(0.0, 4.0), PhoneType::SocialMedia).unwrap();
    assert!(responder.is_some());
    assert!(simulation.population().stats().frozen > 0);

    let events = simulation.tap_phone();
    assert!(matches!(
        events[0],
        SimulationEvent::Phone(PhoneEvent::Cleared { reason: ClearReason::Tapped, landed: false, .. })
    ));

    run(&mut simulation, 1.0);
    assert_eq!(simulation.economy().disruption_count(), 0);
    assert_eq!(simulation.population().count_in_state(VillagerState::Destructive), 0);
    assert_eq!(simulation.population().stats().frozen, 0);
    assert!(simulation.population().responder().is_none());
}

#[test]
fn test_responder_picks_up_and_becomes_addicted() {
    let mut simulation = village(&[1.0, 6.0]);
    let (_, responder) = simulation.drop_phone(Vec2::new(0.0, 3.0), PhoneType::Mainstream).unwrap();
    let responder = responder.unwrap();

    let events = run(&mut simulation, 5.0);

    assert!(events.contains(&SimulationEvent::PhoneAddicted { villager: responder }));
    assert!(events.iter().any(|e| matches!(
        e,
        SimulationEvent::Phone(PhoneEvent::Cleared { reason: ClearReason::PickedUp, .. })
    )));
    let villagers = simulation.population().villagers();
    let idx = villagers.index_of(responder).unwrap();
    assert_eq!(villagers.states[idx], VillagerState::PhoneAddiction);
    assert!(simulation.phones().active().is_none());
}

#[test]
fn test_social_media_phone_kills_exactly_once() {
    let mut simulation = village(&[0.0, 0.3, 5.0, 6.0]);
    let (_, responder) = simulation.drop_phone(Vec2::new(0.0, 5.0), PhoneType::SocialMedia).unwrap();

    let events = run(&mut simulation, 20.0);

    let kills = events
        .iter()
        .filter(|e| matches!(e, SimulationEvent::VillagerKilled { .. }))
        .count();
    assert_eq!(kills, 1);
    assert_eq!(simulation.population().total_count(), 3);

    // The attacker gave up and went idle for good
    let villagers = simulation.population().villagers();
    let attacker = villagers
        .iter_living()
        .find(|&idx| villagers.destructive_modes[idx] == Some(DestructiveMode::Violent))
        .unwrap();
    assert_eq!(Some(villagers.ids[attacker]), responder);
    assert_eq!(villagers.states[attacker], VillagerState::Idle);
    assert!(villagers.idle_locked[attacker]);
    assert!(villagers.has_acted[attacker]);
}

#[test]
fn test_responder_turns_violent_on_pickup() {
    let mut simulation = village(&[0.0, 0.3, 5.0]);
    let (phone, responder) = simulation.drop_phone(Vec2::new(0.0, 2.0), PhoneType::SocialMedia).unwrap();
    let responder = responder.unwrap();
    assert_eq!(responder, simulation.population().villagers().ids[0]);

    let events = run(&mut simulation, 10.0);

    let conversions: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            SimulationEvent::EffectApplied { phone: p, affected, .. } if *p == phone => Some(affected.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(conversions, vec![vec![responder]]);
    assert!(!events.contains(&SimulationEvent::PhoneAddicted { villager: responder }));

    let villagers = simulation.population().villagers();
    let idx = villagers.index_of(responder).unwrap();
    assert_eq!(villagers.destructive_modes[idx], Some(DestructiveMode::Violent));
    assert_eq!(simulation.population().count_in_state(VillagerState::PhoneAddiction), 0);
    let violent = villagers
        .iter_living()
        .filter(|&idx| villagers.destructive_modes[idx] == Some(DestructiveMode::Violent))
        .count();
    assert_eq!(violent, 1);
}

#[test]
fn test_unreached_gambling_phone_converts_responder_on_timeout() {
    let mut simulation = village(&[-30.0]);
    let (_, responder) = simulation.drop_phone(Vec2::new(30.0, 0.0), PhoneType::Gambling).unwrap();
    let responder = responder.unwrap();

    let events = run(&mut simulation, 2.0);
    assert!(landed(&events));
    // Waiting on a pick-up that never comes
    assert_eq!(simulation.population().count_in_state(VillagerState::Destructive), 0);

    let events = run(&mut simulation, 3.5);
    assert!(events.iter().any(|e| matches!(
        e,
        SimulationEvent::Phone(PhoneEvent::Cleared { reason: ClearReason::Timeout, .. })
    )));
    let villagers = simulation.population().villagers();
    let idx = villagers.index_of(responder).unwrap();
    assert_eq!(
        villagers.destructive_modes[idx],
        Some(DestructiveMode::StructureDestroyer)
    );
}

#[test]
fn test_streaming_phone_idles_three_villagers() {
    let mut simulation = village(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    simulation.drop_phone(Vec2::new(0.0, 1.0), PhoneType::Streaming).unwrap();

    let events = run(&mut simulation, 1.5);
    assert!(landed(&events));

    let affected = events
        .iter()
        .find_map(|e| match e {
            SimulationEvent::EffectApplied { affected, .. } => Some(affected.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(affected.len(), 3);

    // Locked idle survives every later band refresh
    run(&mut simulation, 6.0);
    let villagers = simulation.population().villagers();
    for id in affected {
        let idx = villagers.index_of(id).unwrap();
        assert_eq!(villagers.states[idx], VillagerState::Idle);
        assert!(villagers.idle_locked[idx]);
    }
}

#[test]
fn test_mainstream_phone_slows_until_cleared() {
    let mut simulation = village(&[10.0]);
    simulation.drop_phone(Vec2::new(-10.0, 0.0), PhoneType::Mainstream).unwrap();

    run(&mut simulation, 1.5);
    assert!((simulation.population().global_speed_multiplier() - 0.5).abs() < 0.001);

    simulation.tap_phone();
    assert_eq!(simulation.population().global_speed_multiplier(), 1.0);
}

#[test]
fn test_gambling_phone_destroys_buildings() {
    let mut simulation = village(&[-4.0, -3.5, 3.0]);
    let (_, responder) = simulation.drop_phone(Vec2::new(-4.0, 0.0), PhoneType::Gambling).unwrap();
    let responder = responder.unwrap();

    let events = run(&mut simulation, 30.0);

    let villagers = simulation.population().villagers();
    let idx = villagers.index_of(responder).unwrap();
    assert_eq!(
        villagers.destructive_modes[idx],
        Some(DestructiveMode::StructureDestroyer)
    );
    assert!(events.iter().any(|e| matches!(
        e,
        SimulationEvent::Building(phonefall::city::BuildingEvent::Destroyed { .. })
    )));
}

#[test]
fn test_timeout_after_lifetime() {
    // Nobody can reach the phone in time
    let mut simulation = village(&[-30.0]);
    simulation.drop_phone(Vec2::new(30.0, 0.0), PhoneType::Streaming).unwrap();

    let events = run(&mut simulation, 5.5);
    assert!(events.iter().any(|e| matches!(
        e,
        SimulationEvent::Phone(PhoneEvent::Cleared { reason: ClearReason::Timeout, landed: true, .. })
    )));
    assert!(!simulation.phones().can_spawn());
}
