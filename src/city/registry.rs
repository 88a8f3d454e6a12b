//! Building registry - owns every building and the spawn policy
//!
//! Buildings are kept in left-to-right order by x position. That order is
//! the "registration order" used for tie-breaks and by the registry-order
//! targeting policy. Destroyed buildings stay registered so the end
//! condition can see them.

use crate::city::building::{
    Building, BuildingSnapshot, BuildingState, ContributionResult, DamageResult,
};
use crate::city::construction::{
    calculate_site_contribution, calculate_upkeep_share, ConstructionSupport,
};
use crate::core::config::{BuildingConfig, BuildingTemplate, MaintenanceConfig, TargetPolicy};
use crate::core::types::{BuildingId, Vec2};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Something that happened to a building during a registry operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BuildingEvent {
    Spawned { id: BuildingId, position: Vec2 },
    Completed { id: BuildingId },
    StateChanged { id: BuildingId, from: BuildingState, to: BuildingState },
    Destroyed { id: BuildingId },
}

pub struct BuildingRegistry {
    buildings: Vec<Building>,
    template: Option<BuildingTemplate>,
    spawn_points: Vec<Vec2>,
    initial_buildings: Vec<Vec2>,
    target_under_construction_count: usize,
    construction_decay_per_second: f32,
    maintenance: MaintenanceConfig,
    next_spawn_index: usize,
    next_id: u64,
}

impl BuildingRegistry {
    pub fn new(config: &BuildingConfig) -> Self {
        let mut registry = Self {
            buildings: Vec::new(),
            template: config.template.clone(),
            spawn_points: config.spawn_points.clone(),
            initial_buildings: config.initial_buildings.clone(),
            target_under_construction_count: config.target_under_construction_count,
            construction_decay_per_second: config.construction_decay_per_second.max(0.0),
            maintenance: config.maintenance.clone(),
            next_spawn_index: 0,
            next_id: 1,
        };
        registry.reset();
        registry
    }

    /// Drop every building and re-place the initial layout
    pub fn reset(&mut self) {
        self.buildings.clear();
        self.next_spawn_index = 0;
        self.next_id = 1;

        let template = self.template.clone().unwrap_or_default();
        for position in self.initial_buildings.clone() {
            self.place(position, template.name.clone(), template.construction_requirement);
        }
    }

    /// Register a pre-placed construction site
    pub fn place(&mut self, position: Vec2, name: String, construction_requirement: f32) -> BuildingId {
        let id = BuildingId(self.next_id);
        self.next_id += 1;

        let max_health = self.maintenance.enabled.then_some(self.maintenance.max_health);
        let building = Building::new(id, name, position, construction_requirement, max_health);

        // Insert after any building at the same x so equal positions keep spawn order
        let index = self.buildings.partition_point(|b| b.position.x <= position.x);
        self.buildings.insert(index, building);

        tracing::debug!(%id, x = position.x, y = position.y, "Building registered");
        id
    }

    /// A template and at least one spawn point are both required
    pub fn can_spawn(&self) -> bool {
        self.template.is_some() && !self.spawn_points.is_empty()
    }

    /// Spawn a fresh construction site from the template at `at`
    pub fn spawn_building(&mut self, at: Vec2) -> Option<BuildingId> {
        let template = self.template.as_ref()?;
        let name = template.name.clone();
        let requirement = template.construction_requirement;
        Some(self.place(at, name, requirement))
    }

    /// Top up construction sites to the target count, cycling spawn points
    pub fn ensure_active_buildings(&mut self) -> Vec<BuildingEvent> {
        let mut events = Vec::new();
        let mut under_construction = self.under_construction_count();

        while under_construction < self.target_under_construction_count {
            if !self.can_spawn() {
                tracing::trace!("Spawn skipped: no template or spawn points");
                break;
            }

            let position = self.spawn_points[self.next_spawn_index % self.spawn_points.len()];
            self.next_spawn_index += 1;

            match self.spawn_building(position) {
                Some(id) => {
                    events.push(BuildingEvent::Spawned { id, position });
                    under_construction += 1;
                }
                None => break,
            }
        }

        events
    }

    /// Per-tick building pass: economy effort, neglect, upkeep, then spawning
    pub fn advance(&mut self, dt: f32, support: &ConstructionSupport) -> Vec<BuildingEvent> {
        let mut events = Vec::new();

        if dt > 0.0 {
            let per_site = calculate_site_contribution(
                support.construction_effort,
                self.under_construction_count(),
                support.band,
                support.infrastructure_support,
            );
            if per_site > 0.0 {
                for building in self
                    .buildings
                    .iter_mut()
                    .filter(|b| b.state() == BuildingState::UnderConstruction)
                {
                    if let ContributionResult::Completed { .. } =
                        building.add_construction_progress(per_site)
                    {
                        tracing::info!(id = %building.id, "Building completed by economy effort");
                        events.push(BuildingEvent::Completed { id: building.id });
                    }
                }
            }

            let regression = self.construction_decay_per_second * dt;
            for building in self.buildings.iter_mut() {
                if building.state() == BuildingState::UnderConstruction && !building.is_tended() {
                    building.regress(regression);
                }
            }

            if self.maintenance.enabled {
                events.extend(self.apply_maintenance(dt, support));
            }

            for building in self.buildings.iter_mut() {
                building.clear_tended();
            }
        }

        events.extend(self.ensure_active_buildings());
        events
    }

    fn apply_maintenance(&mut self, dt: f32, support: &ConstructionSupport) -> Vec<BuildingEvent> {
        let standing = self.buildings.iter().filter(|b| b.state().is_standing()).count();
        let upkeep = calculate_upkeep_share(
            support.upkeep_effort,
            standing,
            support.infrastructure_support,
        );
        let decay = self.maintenance.health_decay_per_second * dt;

        let mut events = Vec::new();
        for building in self.buildings.iter_mut() {
            let from = building.state();
            if let Some(to) = building.apply_maintenance(decay, upkeep) {
                if to.is_destroyed() {
                    tracing::info!(id = %building.id, "Building crumbled from neglect");
                    events.push(BuildingEvent::Destroyed { id: building.id });
                } else {
                    tracing::debug!(id = %building.id, ?from, ?to, "Building condition changed");
                    events.push(BuildingEvent::StateChanged { id: building.id, from, to });
                }
            }
        }
        events
    }

    /// Add pre-scaled construction effort to one building
    pub fn add_construction_progress(&mut self, id: BuildingId, amount: f32) -> ContributionResult {
        match self.get_mut(id) {
            Some(building) => building.add_construction_progress(amount),
            None => ContributionResult::NotFound,
        }
    }

    /// Damage one building
    pub fn damage(&mut self, id: BuildingId, amount: f32) -> DamageResult {
        match self.get_mut(id) {
            Some(building) => building.damage(amount),
            None => DamageResult::NotFound,
        }
    }

    /// Destroy a building outright; false if missing or already destroyed
    pub fn force_collapse(&mut self, id: BuildingId) -> bool {
        let collapsed = self.get_mut(id).map(|b| b.force_collapse()).unwrap_or(false);
        if collapsed {
            tracing::info!(%id, "Building collapsed");
        }
        collapsed
    }

    pub fn get(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id == id)
    }

    fn get_mut(&mut self, id: BuildingId) -> Option<&mut Building> {
        self.buildings.iter_mut().find(|b| b.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Building> {
        self.buildings.iter()
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    pub fn count_in_state(&self, state: BuildingState) -> usize {
        self.buildings.iter().filter(|b| b.state() == state).count()
    }

    pub fn under_construction_count(&self) -> usize {
        self.count_in_state(BuildingState::UnderConstruction)
    }

    /// True when at least one building exists and every one is destroyed
    pub fn all_destroyed(&self) -> bool {
        !self.buildings.is_empty() && self.buildings.iter().all(|b| b.state().is_destroyed())
    }

    /// Closest building matching `filter`; ties go to registry order
    pub fn nearest(&self, position: Vec2, filter: impl Fn(&Building) -> bool) -> Option<BuildingId> {
        self.buildings
            .iter()
            .filter(|b| filter(b))
            .min_by_key(|b| OrderedFloat(b.position.distance_squared(&position)))
            .map(|b| b.id)
    }

    /// Pick a construction site for a worker at `position`
    pub fn select_work_site(&self, position: Vec2, policy: TargetPolicy) -> Option<BuildingId> {
        let is_site = |b: &Building| b.state() == BuildingState::UnderConstruction;
        match policy {
            TargetPolicy::Nearest => self.nearest(position, is_site),
            TargetPolicy::RegistryOrder => self.buildings.iter().find(|b| is_site(b)).map(|b| b.id),
        }
    }

    pub fn snapshot(&self) -> Vec<BuildingSnapshot> {
        self.buildings.iter().map(Building::snapshot).collect()
    }
}
