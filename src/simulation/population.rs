//! Population coordinator
//!
//! Owns the villagers. Re-applies the productivity band on a fixed interval,
//! picks the phone responder, freezes bystanders and applies landing effects.

use crate::city::BuildingRegistry;
use crate::core::config::{PopulationConfig, SimulationConfig, VillagerConfig};
use crate::core::types::{PhoneId, VillagerId, Vec2};
use crate::economy::ProductivityBand;
use crate::entity::villager::{
    DestructiveMode, StateChange, VillagerArchetype, VillagerSnapshot, VillagerState,
};
use crate::phone::{apply_slowdown, PhoneEffect};
use ahash::AHashMap;
use ordered_float::OrderedFloat;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Why the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollapseReason {
    NoVillagers,
    AllDestructive,
    AllBuildingsDestroyed,
}

/// Aggregate counts for the HUD
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationStats {
    pub total: usize,
    pub working: usize,
    pub idle: usize,
    pub shifting_attention: usize,
    pub phone_addiction: usize,
    pub destructive: usize,
    /// Working or shifting attention
    pub active: usize,
    pub frozen: usize,
}

/// Result of a landed phone's effect
#[derive(Debug, Clone, PartialEq)]
pub struct EffectOutcome {
    pub effect: PhoneEffect,
    pub affected: Vec<VillagerId>,
    pub global_speed_multiplier: f32,
}

/// What picking up the phone did to the collector
#[derive(Debug, Clone, PartialEq)]
pub enum Pickup {
    Addicted,
    /// A deferred violent or destroyer effect turned the collector
    Converted(EffectOutcome),
}

/// A landed phone's conversion waiting on its responder
#[derive(Debug, Clone, Copy)]
struct PendingConversion {
    phone: PhoneId,
    effect: PhoneEffect,
    origin: Vec2,
}

/// Effects that turn a single villager destructive
fn converting_mode(effect: PhoneEffect) -> Option<DestructiveMode> {
    match effect {
        PhoneEffect::Violent => Some(DestructiveMode::Violent),
        PhoneEffect::StructureDestroyer => Some(DestructiveMode::StructureDestroyer),
        PhoneEffect::Binge { .. } | PhoneEffect::Slowdown { .. } => None,
    }
}

pub struct PopulationCoordinator {
    villagers: VillagerArchetype,
    villager_config: VillagerConfig,
    config: PopulationConfig,
    seed: u64,
    rng: ChaCha8Rng,
    refresh_timer: f32,
    global_speed_multiplier: f32,
    /// Phone the current responder and frozen villagers are waiting on
    active_phone: Option<PhoneId>,
    pending_conversion: Option<PendingConversion>,
    spawned_total: usize,
}

impl PopulationCoordinator {
    /// Empty population; call `reset` or `spawn_initial` to fill it
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            villagers: VillagerArchetype::new(),
            villager_config: config.villagers.clone(),
            config: config.population.clone(),
            seed: config.seed,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            refresh_timer: 0.0,
            global_speed_multiplier: 1.0,
            active_phone: None,
            pending_conversion: None,
            spawned_total: 0,
        }
    }

    /// Clear everything, reseed, and spawn the initial villagers
    pub fn reset(&mut self) {
        self.villagers.clear();
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.refresh_timer = 0.0;
        self.global_speed_multiplier = 1.0;
        self.active_phone = None;
        self.pending_conversion = None;
        self.spawned_total = 0;
        self.spawn_initial(self.config.initial_villager_count);
    }

    pub fn villagers(&self) -> &VillagerArchetype {
        &self.villagers
    }

    pub fn villagers_mut(&mut self) -> &mut VillagerArchetype {
        &mut self.villagers
    }

    pub fn global_speed_multiplier(&self) -> f32 {
        self.global_speed_multiplier
    }

    /// Spread `count` villagers across the spawn area
    pub fn spawn_initial(&mut self, count: usize) -> Vec<VillagerId> {
        let center = self.config.spawn_area_center;
        let half_width = self.config.spawn_area_width / 2.0;

        let ids: Vec<_> = (0..count)
            .map(|_| {
                let x = center.x + self.rng.gen_range(-half_width..=half_width);
                self.spawn_villager(Vec2::new(x, center.y))
            })
            .collect();

        tracing::info!(count, "Spawned initial villagers");
        ids
    }

    /// Register one villager with a rolled speed and work offset
    pub fn spawn_villager(&mut self, position: Vec2) -> VillagerId {
        let config = &self.villager_config;
        let variation = config.move_speed_variation;
        let speed = (config.base_move_speed + self.rng.gen_range(-variation..=variation))
            .max(config.min_move_speed);
        let offset = config.work_offset_distance;
        let work_offset = Vec2::new(self.rng.gen_range(-offset..=offset), 0.0);
        let position = if config.lock_to_ground {
            position.with_y(config.ground_y)
        } else {
            position
        };

        self.spawned_total += 1;
        let id = VillagerId::new();
        let name = format!("Villager {}", self.spawned_total);
        self.villagers.spawn(id, name, position, speed, work_offset);

        tracing::debug!(villager = %id, speed, "Villager spawned");
        id
    }

    /// Count down to the next band refresh and run it when due
    pub fn advance(&mut self, dt: f32, band: ProductivityBand) -> Vec<StateChange> {
        if dt <= 0.0 {
            return Vec::new();
        }
        self.refresh_timer += dt;
        if self.refresh_timer < self.config.state_update_interval {
            return Vec::new();
        }
        self.refresh_timer = 0.0;
        self.refresh_states(band)
    }

    /// Apply the band-driven transition to every villager
    pub fn refresh_states(&mut self, band: ProductivityBand) -> Vec<StateChange> {
        let living: Vec<usize> = self.villagers.iter_living().collect();
        let changes: Vec<StateChange> = living
            .into_iter()
            .filter_map(|idx| self.villagers.update_state_from_productivity(idx, band))
            .collect();

        if !changes.is_empty() {
            tracing::debug!(?band, changed = changes.len(), "Villager states refreshed");
        }
        changes
    }

    /// Nearest villager able to chase a phone; ties go to registration order
    pub fn select_responder(&self, position: Vec2) -> Option<VillagerId> {
        self.villagers
            .iter_living()
            .filter(|&idx| self.villagers.can_respond(idx))
            .min_by_key(|&idx| OrderedFloat(self.villagers.positions[idx].distance_squared(&position)))
            .map(|idx| self.villagers.ids[idx])
    }

    /// Current responder, if one is still assigned
    pub fn responder(&self) -> Option<VillagerId> {
        self.villagers
            .iter_living()
            .find(|&idx| self.villagers.responders[idx])
            .map(|idx| self.villagers.ids[idx])
    }

    /// A phone was dropped toward `landing_point`
    ///
    /// Picks the responder and freezes working villagers within
    /// `freeze_radius` of the landing point.
    pub fn on_phone_dropped(&mut self, phone: PhoneId, landing_point: Vec2) -> Option<VillagerId> {
        self.active_phone = Some(phone);
        let responder = self.assign_responder(phone, landing_point);

        let radius = self.config.freeze_radius;
        if radius > 0.0 {
            let to_freeze: Vec<usize> = self
                .villagers
                .iter_living()
                .filter(|&idx| {
                    !self.villagers.responders[idx]
                        && self.villagers.is_eligible(idx)
                        && self.villagers.is_working(idx)
                        && self.villagers.positions[idx].distance(&landing_point) <= radius
                })
                .collect();
            for &idx in &to_freeze {
                self.villagers.freeze(idx);
            }
            if !to_freeze.is_empty() {
                tracing::debug!(%phone, frozen = to_freeze.len(), "Bystanders frozen");
            }
        }

        responder
    }

    /// Keep a responder assigned; re-selects if the previous one is gone or lost
    pub fn ensure_responder(&mut self, phone: PhoneId, landing_point: Vec2) -> Option<VillagerId> {
        if let Some(existing) = self.responder() {
            return Some(existing);
        }
        self.assign_responder(phone, landing_point)
    }

    fn assign_responder(&mut self, phone: PhoneId, landing_point: Vec2) -> Option<VillagerId> {
        let Some(id) = self.select_responder(landing_point) else {
            tracing::debug!(%phone, "No villager available to respond");
            return None;
        };
        if let Some(idx) = self.villagers.index_of(id) {
            self.villagers.become_responder(idx, phone);
            tracing::debug!(%phone, villager = %id, "Responder assigned");
        }
        Some(id)
    }

    /// A phone landed at `origin`
    ///
    /// Violent and destroyer effects wait for the responder to pick the
    /// phone up and convert them then; with nobody responding they hit the
    /// nearest eligible villager right away. Returns `None` while deferred.
    pub fn on_phone_landed(&mut self, phone: PhoneId, effect: PhoneEffect, origin: Vec2) -> Option<EffectOutcome> {
        if converting_mode(effect).is_some() && self.responder().is_some() {
            tracing::debug!(%phone, ?effect, "Effect deferred to pick-up");
            self.pending_conversion = Some(PendingConversion { phone, effect, origin });
            return None;
        }
        Some(self.apply_effect(effect, origin))
    }

    /// Apply a phone's effect around `origin`
    ///
    /// Conversions land on the responder when one is assigned, otherwise on
    /// the nearest eligible villager. Binges leave the responder alone so
    /// someone can still pick the phone up.
    pub fn apply_effect(&mut self, effect: PhoneEffect, origin: Vec2) -> EffectOutcome {
        let mut affected = Vec::new();

        match effect {
            PhoneEffect::Violent | PhoneEffect::StructureDestroyer => {
                if let (Some(mode), Some(idx)) = (converting_mode(effect), self.conversion_target(origin)) {
                    self.villagers.make_destructive(idx, mode);
                    affected.push(self.villagers.ids[idx]);
                }
            }
            PhoneEffect::Binge { count } => {
                for idx in self.nearest_eligible(origin, count) {
                    self.villagers.lock_idle(idx);
                    affected.push(self.villagers.ids[idx]);
                }
            }
            PhoneEffect::Slowdown { factor, floor } => {
                self.global_speed_multiplier =
                    apply_slowdown(self.global_speed_multiplier, factor, floor);
            }
        }

        tracing::info!(?effect, affected = affected.len(), speed = self.global_speed_multiplier, "Phone effect applied");
        EffectOutcome {
            effect,
            affected,
            global_speed_multiplier: self.global_speed_multiplier,
        }
    }

    /// The responder if it is still eligible, otherwise the nearest eligible villager
    fn conversion_target(&self, origin: Vec2) -> Option<usize> {
        self.villagers
            .iter_living()
            .find(|&idx| self.villagers.responders[idx] && self.villagers.is_eligible(idx))
            .or_else(|| {
                self.villagers
                    .iter_living()
                    .filter(|&idx| self.villagers.is_eligible(idx))
                    .min_by_key(|&idx| OrderedFloat(self.villagers.positions[idx].distance_squared(&origin)))
            })
    }

    /// Up to `count` eligible non-responders, nearest first
    fn nearest_eligible(&self, origin: Vec2, count: usize) -> Vec<usize> {
        let mut candidates: Vec<usize> = self
            .villagers
            .iter_living()
            .filter(|&idx| self.villagers.is_eligible(idx) && !self.villagers.responders[idx])
            .collect();
        // Stable sort keeps registration order on ties
        candidates.sort_by_key(|&idx| OrderedFloat(self.villagers.positions[idx].distance_squared(&origin)));
        candidates.truncate(count);
        candidates
    }

    /// The responder picked `phone` up
    ///
    /// A deferred conversion for this phone turns the collector destructive;
    /// otherwise the collector becomes addicted. `None` if the villager is
    /// already dead.
    pub fn on_phone_picked_up(&mut self, villager: VillagerId, phone: PhoneId) -> Option<Pickup> {
        let idx = self.villagers.index_of(villager).filter(|&idx| self.villagers.alive[idx])?;
        tracing::info!(%villager, %phone, "Villager picked up the phone");

        let pending = self.take_pending(phone);
        let mode = pending.and_then(|pending| converting_mode(pending.effect).map(|mode| (pending.effect, mode)));
        match mode {
            Some((effect, mode)) => {
                self.villagers.make_destructive(idx, mode);
                tracing::info!(?effect, %villager, "Phone effect applied");
                Some(Pickup::Converted(EffectOutcome {
                    effect,
                    affected: vec![villager],
                    global_speed_multiplier: self.global_speed_multiplier,
                }))
            }
            None => {
                self.villagers.set_phone_addicted(idx);
                Some(Pickup::Addicted)
            }
        }
    }

    fn take_pending(&mut self, phone: PhoneId) -> Option<PendingConversion> {
        match self.pending_conversion {
            Some(pending) if pending.phone == phone => self.pending_conversion.take(),
            _ => None,
        }
    }

    /// Apply a deferred conversion whose phone went away without a pick-up
    pub fn resolve_pending_effect(&mut self, phone: PhoneId) -> Option<EffectOutcome> {
        let pending = self.take_pending(phone)?;
        Some(self.apply_effect(pending.effect, pending.origin))
    }

    /// The phone went away: unfreeze, release the responder, restore speed
    pub fn on_phone_cleared(&mut self, band: ProductivityBand) -> Vec<StateChange> {
        self.active_phone = None;
        self.pending_conversion = None;
        self.global_speed_multiplier = 1.0;

        let living: Vec<usize> = self.villagers.iter_living().collect();
        let mut changes = Vec::new();
        for idx in living {
            self.villagers.clear_responder(idx);
            if self.villagers.frozen[idx] {
                self.villagers.unfreeze(idx);
                changes.extend(self.villagers.update_state_from_productivity(idx, band));
            }
        }
        changes
    }

    pub fn active_phone(&self) -> Option<PhoneId> {
        self.active_phone
    }

    /// Drop villagers killed during the last pass
    pub fn compact(&mut self) -> usize {
        let removed = self.villagers.compact();
        if removed > 0 {
            tracing::debug!(removed, remaining = self.villagers.count(), "Population compacted");
        }
        removed
    }

    pub fn total_count(&self) -> usize {
        self.villagers.iter_living().count()
    }

    pub fn count_in_state(&self, state: VillagerState) -> usize {
        self.villagers
            .iter_living()
            .filter(|&idx| self.villagers.states[idx] == state)
            .count()
    }

    pub fn counts_by_state(&self) -> AHashMap<VillagerState, usize> {
        let mut counts = AHashMap::new();
        for idx in self.villagers.iter_living() {
            *counts.entry(self.villagers.states[idx]).or_insert(0) += 1;
        }
        counts
    }

    pub fn stats(&self) -> PopulationStats {
        let counts = self.counts_by_state();
        let count = |state| counts.get(&state).copied().unwrap_or(0);

        let working = count(VillagerState::Working);
        let shifting_attention = count(VillagerState::ShiftingAttention);
        PopulationStats {
            total: counts.values().sum(),
            working,
            idle: count(VillagerState::Idle),
            shifting_attention,
            phone_addiction: count(VillagerState::PhoneAddiction),
            destructive: count(VillagerState::Destructive),
            active: working + shifting_attention,
            frozen: self
                .villagers
                .iter_living()
                .filter(|&idx| self.villagers.frozen[idx])
                .count(),
        }
    }

    /// End condition
    pub fn check_collapse(&self, buildings: &BuildingRegistry) -> Option<CollapseReason> {
        let total = self.total_count();
        if total == 0 {
            return Some(CollapseReason::NoVillagers);
        }
        if self.count_in_state(VillagerState::Destructive) == total {
            return Some(CollapseReason::AllDestructive);
        }
        if buildings.all_destroyed() {
            return Some(CollapseReason::AllBuildingsDestroyed);
        }
        None
    }

    pub fn snapshot(&self) -> Vec<VillagerSnapshot> {
        self.villagers
            .iter_living()
            .map(|idx| self.villagers.snapshot(idx))
            .collect()
    }
}
