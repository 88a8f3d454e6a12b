//! Villager archetype with SoA layout
//!
//! ```text
//! Working <-> ShiftingAttention <-> Idle        (productivity band)
//!                                    Idle locked (collapse band, binge, after violence)
//! any non-lost --pick up phone--> PhoneAddiction (terminal)
//! any non-lost --phone effect---> Destructive    (Violent ends in locked Idle)
//! ```

use crate::core::config::VillagerConfig;
use crate::core::types::{BuildingId, PhoneId, VillagerId, Vec2};
use crate::economy::ProductivityBand;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VillagerState {
    Working,
    Idle,
    ShiftingAttention,
    PhoneAddiction,
    Destructive,
}

impl VillagerState {
    pub const ALL: [VillagerState; 5] = [
        VillagerState::Working,
        VillagerState::Idle,
        VillagerState::ShiftingAttention,
        VillagerState::PhoneAddiction,
        VillagerState::Destructive,
    ];

    /// Lost to a phone; band updates never touch these
    pub fn is_lost(&self) -> bool {
        matches!(self, VillagerState::PhoneAddiction | VillagerState::Destructive)
    }

    /// The state a productivity band pushes a villager toward
    pub fn for_band(band: ProductivityBand) -> Self {
        match band {
            ProductivityBand::Thriving => VillagerState::Working,
            ProductivityBand::Declining => VillagerState::ShiftingAttention,
            ProductivityBand::Collapse => VillagerState::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestructiveMode {
    /// Hunts down one villager, then gives up
    Violent,
    /// Tears buildings down one after another
    StructureDestroyer,
}

/// Non-owning reference to whatever the villager is heading for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VillagerTarget {
    #[default]
    None,
    Building(BuildingId),
    Phone(PhoneId),
    Victim(VillagerId),
}

/// A band-driven state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub villager: VillagerId,
    pub from: VillagerState,
    pub to: VillagerState,
}

/// Presentation view of a single villager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VillagerSnapshot {
    pub id: VillagerId,
    pub name: String,
    pub position: Vec2,
    pub state: VillagerState,
    pub target: VillagerTarget,
    pub destructive_mode: Option<DestructiveMode>,
    pub is_responder: bool,
    pub idle_locked: bool,
    pub frozen: bool,
}

/// Structure of Arrays for villagers
pub struct VillagerArchetype {
    pub ids: Vec<VillagerId>,
    pub names: Vec<String>,
    pub positions: Vec<Vec2>,
    pub states: Vec<VillagerState>,
    pub targets: Vec<VillagerTarget>,
    /// Base speed with the per-villager variation already rolled in
    pub move_speeds: Vec<f32>,
    /// Where around a building this villager stands to work
    pub work_offsets: Vec<Vec2>,
    pub responders: Vec<bool>,
    pub destructive_modes: Vec<Option<DestructiveMode>>,
    pub has_acted: Vec<bool>,
    pub idle_locked: Vec<bool>,
    pub frozen: Vec<bool>,
    pub alive: Vec<bool>,
}

impl VillagerArchetype {
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            names: Vec::new(),
            positions: Vec::new(),
            states: Vec::new(),
            targets: Vec::new(),
            move_speeds: Vec::new(),
            work_offsets: Vec::new(),
            responders: Vec::new(),
            destructive_modes: Vec::new(),
            has_acted: Vec::new(),
            idle_locked: Vec::new(),
            frozen: Vec::new(),
            alive: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Add a villager in the Working state, returns its index
    pub fn spawn(
        &mut self,
        id: VillagerId,
        name: String,
        position: Vec2,
        move_speed: f32,
        work_offset: Vec2,
    ) -> usize {
        self.ids.push(id);
        self.names.push(name);
        self.positions.push(position);
        self.states.push(VillagerState::Working);
        self.targets.push(VillagerTarget::None);
        self.move_speeds.push(move_speed);
        self.work_offsets.push(work_offset);
        self.responders.push(false);
        self.destructive_modes.push(None);
        self.has_acted.push(false);
        self.idle_locked.push(false);
        self.frozen.push(false);
        self.alive.push(true);
        self.ids.len() - 1
    }

    pub fn index_of(&self, id: VillagerId) -> Option<usize> {
        self.ids.iter().position(|&v| v == id)
    }

    pub fn iter_living(&self) -> impl Iterator<Item = usize> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, &alive)| alive)
            .map(|(i, _)| i)
    }

    /// Alive and not yet lost to a phone
    pub fn is_eligible(&self, idx: usize) -> bool {
        self.alive[idx] && !self.states[idx].is_lost()
    }

    /// Eligible, busy and not frozen
    pub fn can_respond(&self, idx: usize) -> bool {
        self.is_eligible(idx) && self.states[idx] != VillagerState::Idle && !self.frozen[idx]
    }

    pub fn is_working(&self, idx: usize) -> bool {
        matches!(
            self.states[idx],
            VillagerState::Working | VillagerState::ShiftingAttention
        )
    }

    /// Apply the band-driven transition
    ///
    /// Lost, locked, frozen and dead villagers are left alone. The collapse
    /// band sends a villager to Idle and locks it there.
    pub fn update_state_from_productivity(
        &mut self,
        idx: usize,
        band: ProductivityBand,
    ) -> Option<StateChange> {
        if !self.alive[idx] || self.states[idx].is_lost() || self.idle_locked[idx] || self.frozen[idx] {
            return None;
        }

        let from = self.states[idx];
        let to = VillagerState::for_band(band);
        if to == VillagerState::Idle {
            self.idle_locked[idx] = true;
            self.responders[idx] = false;
            self.targets[idx] = VillagerTarget::None;
        }
        if from == to {
            return None;
        }

        self.states[idx] = to;
        Some(StateChange {
            villager: self.ids[idx],
            from,
            to,
        })
    }

    /// Nothing left to build; an unlocked idle the band can still move
    pub fn go_idle(&mut self, idx: usize) {
        self.states[idx] = VillagerState::Idle;
        self.targets[idx] = VillagerTarget::None;
    }

    pub fn lock_idle(&mut self, idx: usize) {
        self.states[idx] = VillagerState::Idle;
        self.idle_locked[idx] = true;
        self.targets[idx] = VillagerTarget::None;
        self.responders[idx] = false;
        self.frozen[idx] = false;
    }

    pub fn become_responder(&mut self, idx: usize, phone: PhoneId) {
        self.responders[idx] = true;
        self.targets[idx] = VillagerTarget::Phone(phone);
    }

    pub fn clear_responder(&mut self, idx: usize) {
        if self.responders[idx] {
            self.responders[idx] = false;
            self.targets[idx] = VillagerTarget::None;
        }
    }

    /// Pause a working villager until the phone clears
    pub fn freeze(&mut self, idx: usize) {
        self.frozen[idx] = true;
        self.states[idx] = VillagerState::ShiftingAttention;
        self.targets[idx] = VillagerTarget::None;
    }

    pub fn unfreeze(&mut self, idx: usize) {
        self.frozen[idx] = false;
    }

    pub fn set_phone_addicted(&mut self, idx: usize) {
        self.states[idx] = VillagerState::PhoneAddiction;
        self.targets[idx] = VillagerTarget::None;
        self.responders[idx] = false;
        self.frozen[idx] = false;
        self.idle_locked[idx] = false;
    }

    pub fn make_destructive(&mut self, idx: usize, mode: DestructiveMode) {
        self.states[idx] = VillagerState::Destructive;
        self.destructive_modes[idx] = Some(mode);
        self.has_acted[idx] = false;
        self.targets[idx] = VillagerTarget::None;
        self.responders[idx] = false;
        self.frozen[idx] = false;
        self.idle_locked[idx] = false;
    }

    /// Mark dead; the slot is removed by `compact`
    pub fn kill(&mut self, idx: usize) {
        self.alive[idx] = false;
        self.responders[idx] = false;
        self.targets[idx] = VillagerTarget::None;
    }

    /// Drop dead villagers, returns how many were removed
    pub fn compact(&mut self) -> usize {
        let before = self.count();
        if self.alive.iter().all(|&alive| alive) {
            return 0;
        }

        let keep = std::mem::take(&mut self.alive);
        retain_by(&mut self.ids, &keep);
        retain_by(&mut self.names, &keep);
        retain_by(&mut self.positions, &keep);
        retain_by(&mut self.states, &keep);
        retain_by(&mut self.targets, &keep);
        retain_by(&mut self.move_speeds, &keep);
        retain_by(&mut self.work_offsets, &keep);
        retain_by(&mut self.responders, &keep);
        retain_by(&mut self.destructive_modes, &keep);
        retain_by(&mut self.has_acted, &keep);
        retain_by(&mut self.idle_locked, &keep);
        retain_by(&mut self.frozen, &keep);
        self.alive = vec![true; self.ids.len()];

        before - self.count()
    }

    /// Movement speed this tick
    ///
    /// Formula: move_speed * state_multiplier * global_multiplier
    pub fn effective_speed(&self, idx: usize, config: &VillagerConfig, global_multiplier: f32) -> f32 {
        let state_multiplier = if self.states[idx] == VillagerState::ShiftingAttention {
            config.shifting_attention_speed_multiplier
        } else {
            1.0
        };
        self.move_speeds[idx] * state_multiplier * global_multiplier
    }

    pub fn snapshot(&self, idx: usize) -> VillagerSnapshot {
        VillagerSnapshot {
            id: self.ids[idx],
            name: self.names[idx].clone(),
            position: self.positions[idx],
            state: self.states[idx],
            target: self.targets[idx],
            destructive_mode: self.destructive_modes[idx],
            is_responder: self.responders[idx],
            idle_locked: self.idle_locked[idx],
            frozen: self.frozen[idx],
        }
    }
}

impl Default for VillagerArchetype {
    fn default() -> Self {
        Self::new()
    }
}

fn retain_by<T>(values: &mut Vec<T>, keep: &[bool]) {
    let mut flags = keep.iter();
    values.retain(|_| flags.next().copied().unwrap_or(false));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archetype_with(count: usize) -> VillagerArchetype {
        let mut villagers = VillagerArchetype::new();
        for i in 0..count {
            villagers.spawn(
                VillagerId::new(),
                format!("Villager {}", i),
                Vec2::new(i as f32, -1.0),
                1.5,
                Vec2::ZERO,
            );
        }
        villagers
    }

    #[test]
    fn test_spawn_starts_working() {
        let villagers = archetype_with(1);
        assert_eq!(villagers.count(), 1);
        assert_eq!(villagers.states[0], VillagerState::Working);
        assert!(villagers.is_eligible(0));
        assert!(villagers.can_respond(0));
    }

    #[test]
    fn test_band_transitions() {
        let mut villagers = archetype_with(1);

        let change = villagers.update_state_from_productivity(0, ProductivityBand::Declining);
        assert_eq!(
            change.map(|c| (c.from, c.to)),
            Some((VillagerState::Working, VillagerState::ShiftingAttention))
        );
        assert!(villagers
            .update_state_from_productivity(0, ProductivityBand::Declining)
            .is_none());

        villagers.update_state_from_productivity(0, ProductivityBand::Thriving);
        assert_eq!(villagers.states[0], VillagerState::Working);
    }

    #[test]
    fn test_collapse_idle_is_sticky() {
        let mut villagers = archetype_with(1);
        villagers.update_state_from_productivity(0, ProductivityBand::Collapse);
        assert_eq!(villagers.states[0], VillagerState::Idle);
        assert!(villagers.idle_locked[0]);

        assert!(villagers
            .update_state_from_productivity(0, ProductivityBand::Thriving)
            .is_none());
        assert_eq!(villagers.states[0], VillagerState::Idle);
    }

    #[test]
    fn test_unlocked_idle_follows_band() {
        let mut villagers = archetype_with(1);
        villagers.go_idle(0);
        villagers.update_state_from_productivity(0, ProductivityBand::Thriving);
        assert_eq!(villagers.states[0], VillagerState::Working);
    }

    #[test]
    fn test_lost_villagers_ignore_band() {
        let mut villagers = archetype_with(2);
        villagers.set_phone_addicted(0);
        villagers.make_destructive(1, DestructiveMode::StructureDestroyer);

        for band in [
            ProductivityBand::Thriving,
            ProductivityBand::Declining,
            ProductivityBand::Collapse,
        ] {
            assert!(villagers.update_state_from_productivity(0, band).is_none());
            assert!(villagers.update_state_from_productivity(1, band).is_none());
        }
        assert_eq!(villagers.states[0], VillagerState::PhoneAddiction);
        assert_eq!(villagers.states[1], VillagerState::Destructive);
        assert!(!villagers.is_eligible(0));
        assert!(!villagers.is_eligible(1));
    }

    #[test]
    fn test_frozen_villager_holds_state() {
        let mut villagers = archetype_with(1);
        villagers.freeze(0);
        assert_eq!(villagers.states[0], VillagerState::ShiftingAttention);
        assert!(!villagers.can_respond(0));
        assert!(villagers
            .update_state_from_productivity(0, ProductivityBand::Thriving)
            .is_none());

        villagers.unfreeze(0);
        villagers.update_state_from_productivity(0, ProductivityBand::Thriving);
        assert_eq!(villagers.states[0], VillagerState::Working);
    }

    #[test]
    fn test_compact_removes_dead() {
        let mut villagers = archetype_with(4);
        let survivor = villagers.ids[2];
        villagers.kill(1);
        villagers.kill(3);
        assert_eq!(villagers.iter_living().count(), 2);

        assert_eq!(villagers.compact(), 2);
        assert_eq!(villagers.count(), 2);
        assert_eq!(villagers.index_of(survivor), Some(1));
        assert_eq!(villagers.alive.len(), 2);
        assert_eq!(villagers.names.len(), 2);
        assert_eq!(villagers.compact(), 0);
    }

    #[test]
    fn test_effective_speed() {
        let mut villagers = archetype_with(1);
        let config = VillagerConfig::default();
        assert!((villagers.effective_speed(0, &config, 1.0) - 1.5).abs() < 0.001);

        villagers.states[0] = VillagerState::ShiftingAttention;
        // 1.5 * 0.6 * 0.5
        assert!((villagers.effective_speed(0, &config, 0.5) - 0.45).abs() < 0.001);
    }
}
