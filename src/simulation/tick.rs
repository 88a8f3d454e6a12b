//! Simulation loop - owns every component and advances them in a fixed order

use crate::city::{BuildingEvent, BuildingRegistry, BuildingSnapshot, BuildingState, ConstructionSupport};
use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{PhoneId, Tick, VillagerId, Vec2};
use crate::economy::{EconomySnapshot, ProductivityBand, ProductivityEconomy};
use crate::entity::villager::{StateChange, VillagerSnapshot, VillagerState};
use crate::phone::{effect_for, Phone, PhoneDispatcher, PhoneEffect, PhoneEvent, PhoneType};
use crate::simulation::behavior::{update_villagers, AgentReport, BehaviorContext, PhoneView};
use crate::simulation::population::{CollapseReason, EffectOutcome, Pickup, PopulationCoordinator, PopulationStats};
use serde::{Deserialize, Serialize};

/// Events that occurred during a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimulationEvent {
    Building(BuildingEvent),
    Phone(PhoneEvent),
    /// A villager was picked to chase the phone
    ResponderAssigned {
        villager: VillagerId,
        phone: PhoneId,
    },
    /// A phone's effect hit the population, on landing or on pick-up
    EffectApplied {
        phone: PhoneId,
        effect: PhoneEffect,
        affected: Vec<VillagerId>,
        global_speed_multiplier: f32,
    },
    PhoneAddicted {
        villager: VillagerId,
    },
    VillagerKilled {
        attacker: VillagerId,
        victim: VillagerId,
    },
    VillagerStateChanged {
        villager: VillagerId,
        from: VillagerState,
        to: VillagerState,
    },
    Collapsed(CollapseReport),
}

impl From<StateChange> for SimulationEvent {
    fn from(change: StateChange) -> Self {
        SimulationEvent::VillagerStateChanged {
            villager: change.villager,
            from: change.from,
            to: change.to,
        }
    }
}

fn effect_applied(phone: PhoneId, outcome: EffectOutcome) -> SimulationEvent {
    SimulationEvent::EffectApplied {
        phone,
        effect: outcome.effect,
        affected: outcome.affected,
        global_speed_multiplier: outcome.global_speed_multiplier,
    }
}

/// Summary handed to the host when the run ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollapseReport {
    pub reason: CollapseReason,
    /// Simulated seconds from reset to collapse
    pub time_alive: f32,
    pub tick: Tick,
    pub survivors: usize,
    pub buildings_completed: usize,
}

/// Whoever runs the simulation and decides what happens after a collapse
pub trait LifecycleHost {
    /// Called exactly once per run
    fn on_collapse(&mut self, report: &CollapseReport);
}

impl LifecycleHost for () {
    fn on_collapse(&mut self, _report: &CollapseReport) {}
}

/// Full presentation state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub tick: Tick,
    pub time_alive: f32,
    pub economy: EconomySnapshot,
    pub buildings: Vec<BuildingSnapshot>,
    pub villagers: Vec<VillagerSnapshot>,
    pub population: PopulationStats,
    pub phone: Option<Phone>,
    pub phone_cooldown: f32,
    pub global_speed_multiplier: f32,
    pub collapse: Option<CollapseReport>,
}

pub struct Simulation {
    config: SimulationConfig,
    economy: ProductivityEconomy,
    buildings: BuildingRegistry,
    phones: PhoneDispatcher,
    population: PopulationCoordinator,
    current_tick: Tick,
    time_alive: f32,
    collapse: Option<CollapseReport>,
}

impl Simulation {
    /// Validate the config and start a fresh run
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let mut simulation = Self {
            economy: ProductivityEconomy::new(&config.economy),
            buildings: BuildingRegistry::new(&config.buildings),
            phones: PhoneDispatcher::new(&config.phones),
            population: PopulationCoordinator::new(&config),
            config,
            current_tick: 0,
            time_alive: 0.0,
            collapse: None,
        };
        simulation.reset_all();
        Ok(simulation)
    }

    /// Reinitialize every component for a new run
    pub fn reset_all(&mut self) {
        self.economy.reset();
        self.buildings.reset();
        self.phones.reset();
        self.population.reset();
        self.buildings.ensure_active_buildings();
        self.current_tick = 0;
        self.time_alive = 0.0;
        self.collapse = None;
        tracing::info!(
            villagers = self.population.total_count(),
            buildings = self.buildings.len(),
            "Simulation reset"
        );
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn economy(&self) -> &ProductivityEconomy {
        &self.economy
    }

    pub fn buildings(&self) -> &BuildingRegistry {
        &self.buildings
    }

    pub fn buildings_mut(&mut self) -> &mut BuildingRegistry {
        &mut self.buildings
    }

    pub fn phones(&self) -> &PhoneDispatcher {
        &self.phones
    }

    pub fn population(&self) -> &PopulationCoordinator {
        &self.population
    }

    pub fn population_mut(&mut self) -> &mut PopulationCoordinator {
        &mut self.population
    }

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    pub fn time_alive(&self) -> f32 {
        self.time_alive
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapse.is_some()
    }

    pub fn collapse_report(&self) -> Option<&CollapseReport> {
        self.collapse.as_ref()
    }

    /// Where a phone dropped at `position` comes to rest
    fn landing_point(&self, position: Vec2) -> Vec2 {
        let villagers = &self.config.villagers;
        if villagers.lock_to_ground {
            position.with_y(villagers.ground_y)
        } else {
            position
        }
    }

    /// Drop a phone; the only externally driven entry point
    pub fn drop_phone(&mut self, position: Vec2, phone_type: PhoneType) -> Result<(PhoneId, Option<VillagerId>)> {
        if self.is_collapsed() {
            return Err(SimError::Collapsed);
        }
        let landing_point = self.landing_point(position);
        let phone = self.phones.spawn_event(landing_point, phone_type)?;
        let responder = self.population.on_phone_dropped(phone, landing_point);
        Ok((phone, responder))
    }

    /// Dismiss the live phone early
    pub fn tap_phone(&mut self) -> Vec<SimulationEvent> {
        let Some(event) = self.phones.tap_active() else {
            return Vec::new();
        };
        let mut events = Vec::new();
        let band = self.economy.band();
        self.clear_phone(event, band, &mut events);
        events
    }

    /// Run one tick
    ///
    /// Order:
    /// 1. Economy (productivity distribution, band)
    /// 2. Buildings (economy effort, neglect, upkeep, spawning)
    /// 3. Villagers (movement, work, chasing, destruction), then compaction
    /// 4. Phone dispatcher and the population's reactions
    /// 5. Periodic band refresh
    /// 6. End condition
    pub fn advance(&mut self, dt: f32, host: &mut impl LifecycleHost) -> Vec<SimulationEvent> {
        let mut events = Vec::new();
        if self.is_collapsed() || dt <= 0.0 {
            return events;
        }
        self.current_tick += 1;
        self.time_alive += dt;

        self.economy.tick(dt);
        let band = self.economy.band();

        let support = ConstructionSupport::draw(&mut self.economy, &self.config.buildings, dt);
        events.extend(
            self.buildings
                .advance(dt, &support)
                .into_iter()
                .map(SimulationEvent::Building),
        );

        let ctx = BehaviorContext {
            config: &self.config.villagers,
            band,
            global_speed_multiplier: self.population.global_speed_multiplier(),
            phone: self.phones.active().map(PhoneView::from),
        };
        let reports = update_villagers(self.population.villagers_mut(), &mut self.buildings, &ctx, dt);
        for report in reports {
            self.handle_agent_report(report, band, &mut events);
        }
        self.population.compact();

        for event in self.phones.advance(dt) {
            self.handle_phone_event(event, band, &mut events);
        }

        events.extend(self.population.advance(dt, band).into_iter().map(SimulationEvent::from));

        if let Some(reason) = self.population.check_collapse(&self.buildings) {
            let report = CollapseReport {
                reason,
                time_alive: self.time_alive,
                tick: self.current_tick,
                survivors: self.population.total_count(),
                buildings_completed: self.buildings.count_in_state(BuildingState::Completed),
            };
            tracing::info!(?reason, time_alive = self.time_alive, tick = self.current_tick, "Society collapsed");
            host.on_collapse(&report);
            events.push(SimulationEvent::Collapsed(report.clone()));
            self.collapse = Some(report);
        }

        events
    }

    /// Run whole ticks of `dt` until `seconds` have elapsed or the run collapses
    pub fn run_for(&mut self, seconds: f32, dt: f32, host: &mut impl LifecycleHost) -> Vec<SimulationEvent> {
        let mut events = Vec::new();
        if dt <= 0.0 {
            return events;
        }
        let steps = (seconds / dt).round() as u64;
        for _ in 0..steps {
            if self.is_collapsed() {
                break;
            }
            events.extend(self.advance(dt, host));
        }
        events
    }

    fn handle_agent_report(
        &mut self,
        report: AgentReport,
        band: ProductivityBand,
        events: &mut Vec<SimulationEvent>,
    ) {
        match report {
            AgentReport::PickedUp { villager, phone } => {
                // Killed earlier in the same pass
                let Some(pickup) = self.population.on_phone_picked_up(villager, phone) else {
                    return;
                };
                match pickup {
                    Pickup::Addicted => events.push(SimulationEvent::PhoneAddicted { villager }),
                    Pickup::Converted(outcome) => events.push(effect_applied(phone, outcome)),
                }
                if let Some(cleared) = self.phones.pick_up(phone) {
                    self.clear_phone(cleared, band, events);
                }
            }
            AgentReport::Killed { attacker, victim } => {
                events.push(SimulationEvent::VillagerKilled { attacker, victim });
            }
            AgentReport::BuildingCompleted { building, .. } => {
                events.push(SimulationEvent::Building(BuildingEvent::Completed { id: building }));
            }
            AgentReport::BuildingDestroyed { building, .. } => {
                events.push(SimulationEvent::Building(BuildingEvent::Destroyed { id: building }));
            }
        }
    }

    fn handle_phone_event(
        &mut self,
        event: PhoneEvent,
        band: ProductivityBand,
        events: &mut Vec<SimulationEvent>,
    ) {
        match &event {
            PhoneEvent::Landed { phone, phone_type, position } => {
                self.economy.apply_disruption();
                events.push(SimulationEvent::Phone(event.clone()));

                let had_responder = self.population.responder();
                let responder = self.population.ensure_responder(*phone, *position);
                if let Some(villager) = responder.filter(|_| had_responder.is_none()) {
                    events.push(SimulationEvent::ResponderAssigned { villager, phone: *phone });
                }

                let effect = effect_for(*phone_type, &self.config.phones);
                if let Some(outcome) = self.population.on_phone_landed(*phone, effect, *position) {
                    events.push(effect_applied(*phone, outcome));
                }
            }
            PhoneEvent::Cleared { .. } => self.clear_phone(event.clone(), band, events),
        }
    }

    /// The phone is gone: settle any deferred effect, then release the population
    fn clear_phone(&mut self, event: PhoneEvent, band: ProductivityBand, events: &mut Vec<SimulationEvent>) {
        let PhoneEvent::Cleared { phone, .. } = event else {
            return;
        };
        events.push(SimulationEvent::Phone(event));
        if let Some(outcome) = self.population.resolve_pending_effect(phone) {
            events.push(effect_applied(phone, outcome));
        }
        events.extend(self.population.on_phone_cleared(band).into_iter().map(SimulationEvent::from));
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            tick: self.current_tick,
            time_alive: self.time_alive,
            economy: self.economy.snapshot(),
            buildings: self.buildings.snapshot(),
            villagers: self.population.snapshot(),
            population: self.population.stats(),
            phone: self.phones.active().cloned(),
            phone_cooldown: self.phones.cooldown_remaining(),
            global_speed_multiplier: self.population.global_speed_multiplier(),
            collapse: self.collapse.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingHost {
        collapses: Vec<CollapseReport>,
    }

    impl LifecycleHost for CountingHost {
        fn on_collapse(&mut self, report: &CollapseReport) {
            self.collapses.push(report.clone());
        }
    }

    fn small_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.population.initial_villager_count = 5;
        config
    }

    #[test]
    fn test_new_simulation_has_a_site() {
        let simulation = Simulation::new(small_config()).unwrap();
        assert_eq!(simulation.population().total_count(), 5);
        assert_eq!(simulation.buildings().under_construction_count(), 1);
        assert!(!simulation.is_collapsed());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = small_config();
        config.economy.starting_factor = 2.0;
        assert!(matches!(Simulation::new(config), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_villagers_complete_buildings() {
        let mut simulation = Simulation::new(small_config()).unwrap();
        let events = simulation.run_for(30.0, 0.1, &mut ());

        let completed = events
            .iter()
            .filter(|e| matches!(e, SimulationEvent::Building(BuildingEvent::Completed { .. })))
            .count();
        assert!(completed >= 1);
        assert!(simulation.buildings().count_in_state(BuildingState::Completed) >= 1);
        assert_eq!(simulation.current_tick(), 300);
    }

    #[test]
    fn test_drop_while_active_is_rejected() {
        let mut simulation = Simulation::new(small_config()).unwrap();
        simulation.drop_phone(Vec2::new(0.0, 3.0), PhoneType::Mainstream).unwrap();
        assert!(matches!(
            simulation.drop_phone(Vec2::ZERO, PhoneType::Mainstream),
            Err(SimError::PhoneActive)
        ));
    }

    #[test]
    fn test_phone_lands_on_ground() {
        let mut simulation = Simulation::new(small_config()).unwrap();
        simulation.drop_phone(Vec2::new(1.0, 3.0), PhoneType::Mainstream).unwrap();
        let phone = simulation.phones().active().unwrap();
        assert_eq!(phone.landing_point, Vec2::new(1.0, -1.0));
    }

    #[test]
    fn test_collapse_reported_once() {
        let mut config = small_config();
        config.population.initial_villager_count = 0;
        let mut simulation = Simulation::new(config).unwrap();
        let mut host = CountingHost::default();

        simulation.advance(0.1, &mut host);
        simulation.advance(0.1, &mut host);

        assert_eq!(host.collapses.len(), 1);
        assert_eq!(host.collapses[0].reason, CollapseReason::NoVillagers);
        assert!(simulation.advance(0.1, &mut host).is_empty());
        assert!(matches!(
            simulation.drop_phone(Vec2::ZERO, PhoneType::Streaming),
            Err(SimError::Collapsed)
        ));
    }

    #[test]
    fn test_reset_all_restores_initial_state() {
        let mut simulation = Simulation::new(small_config()).unwrap();
        simulation.drop_phone(Vec2::ZERO, PhoneType::Gambling).unwrap();
        simulation.run_for(10.0, 0.1, &mut ());

        simulation.reset_all();
        assert_eq!(simulation.current_tick(), 0);
        assert_eq!(simulation.time_alive(), 0.0);
        assert_eq!(simulation.population().total_count(), 5);
        assert_eq!(simulation.population().count_in_state(VillagerState::Working), 5);
        assert!(simulation.phones().active().is_none());
        assert!(simulation.phones().can_spawn());
        assert_eq!(simulation.economy().productivity_factor(), 1.0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let simulation = Simulation::new(small_config()).unwrap();
        let json = serde_json::to_string(&simulation.snapshot()).unwrap();
        assert!(json.contains("\"economy\""));
        assert!(json.contains("\"villagers\""));
    }
}
