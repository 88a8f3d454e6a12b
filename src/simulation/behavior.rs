//! Per-tick villager behavior: walking, building, chasing phones, destruction
//!
//! Runs over the villager archetype in index order. Kills only mark the
//! victim dead; the coordinator compacts after the pass, so a villager
//! killed earlier in the pass is simply skipped.

use crate::city::{BuildingRegistry, BuildingState, ContributionResult, DamageResult};
use crate::core::config::VillagerConfig;
use crate::core::types::{BuildingId, PhoneId, VillagerId, Vec2};
use crate::economy::ProductivityBand;
use crate::entity::villager::{DestructiveMode, VillagerArchetype, VillagerState, VillagerTarget};
use crate::phone::Phone;
use ordered_float::OrderedFloat;

/// What a villager can see of the live phone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhoneView {
    pub id: PhoneId,
    pub landing_point: Vec2,
    pub landed: bool,
}

impl From<&Phone> for PhoneView {
    fn from(phone: &Phone) -> Self {
        Self {
            id: phone.id,
            landing_point: phone.landing_point,
            landed: phone.has_landed(),
        }
    }
}

pub struct BehaviorContext<'a> {
    pub config: &'a VillagerConfig,
    pub band: ProductivityBand,
    pub global_speed_multiplier: f32,
    pub phone: Option<PhoneView>,
}

/// Things the rest of the simulation has to react to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AgentReport {
    /// The responder reached the landed phone
    PickedUp { villager: VillagerId, phone: PhoneId },
    Killed { attacker: VillagerId, victim: VillagerId },
    BuildingCompleted { villager: VillagerId, building: BuildingId },
    BuildingDestroyed { villager: VillagerId, building: BuildingId },
}

/// Advance every living villager by `dt`
pub fn update_villagers(
    villagers: &mut VillagerArchetype,
    buildings: &mut BuildingRegistry,
    ctx: &BehaviorContext,
    dt: f32,
) -> Vec<AgentReport> {
    let mut reports = Vec::new();
    if dt <= 0.0 {
        return reports;
    }

    for idx in 0..villagers.count() {
        if !villagers.alive[idx] {
            continue;
        }
        if ctx.config.lock_to_ground {
            villagers.positions[idx].y = ctx.config.ground_y;
        }
        if villagers.frozen[idx] {
            continue;
        }

        if villagers.responders[idx] {
            if let Some(report) = respond_to_phone(villagers, idx, ctx, dt) {
                reports.push(report);
            }
            if villagers.responders[idx] {
                continue;
            }
        }

        match villagers.states[idx] {
            VillagerState::Working | VillagerState::ShiftingAttention => {
                reports.extend(work(villagers, idx, buildings, ctx, dt));
            }
            VillagerState::Idle if !villagers.idle_locked[idx] => {
                reports.extend(work(villagers, idx, buildings, ctx, dt));
            }
            VillagerState::Destructive => match villagers.destructive_modes[idx] {
                Some(DestructiveMode::Violent) => {
                    reports.extend(hunt_victim(villagers, idx, ctx, dt));
                }
                Some(DestructiveMode::StructureDestroyer) => {
                    reports.extend(tear_down(villagers, idx, buildings, ctx, dt));
                }
                None => {}
            },
            // Locked idle and addicted villagers stand still
            VillagerState::Idle | VillagerState::PhoneAddiction => {}
        }
    }

    reports
}

/// Step toward `goal`; true once within `close_enough_distance`
fn step_towards(villagers: &mut VillagerArchetype, idx: usize, goal: Vec2, ctx: &BehaviorContext, dt: f32) -> bool {
    let goal = if ctx.config.lock_to_ground {
        goal.with_y(ctx.config.ground_y)
    } else {
        goal
    };
    let close_enough = ctx.config.close_enough_distance;

    if villagers.positions[idx].distance(&goal) <= close_enough {
        villagers.positions[idx] = goal;
        return true;
    }

    let speed = villagers.effective_speed(idx, ctx.config, ctx.global_speed_multiplier);
    let next = villagers.positions[idx].move_towards(goal, speed * dt);
    villagers.positions[idx] = next;

    if next.distance(&goal) <= close_enough {
        villagers.positions[idx] = goal;
        true
    } else {
        false
    }
}

fn respond_to_phone(
    villagers: &mut VillagerArchetype,
    idx: usize,
    ctx: &BehaviorContext,
    dt: f32,
) -> Option<AgentReport> {
    let phone = match (ctx.phone, villagers.targets[idx]) {
        (Some(phone), VillagerTarget::Phone(id)) if phone.id == id => phone,
        _ => {
            // Phone is gone; fall back to regular behavior
            villagers.clear_responder(idx);
            return None;
        }
    };

    let arrived = step_towards(villagers, idx, phone.landing_point, ctx, dt);
    if arrived && phone.landed {
        tracing::debug!(villager = %villagers.ids[idx], phone = %phone.id, "Responder reached phone");
        return Some(AgentReport::PickedUp {
            villager: villagers.ids[idx],
            phone: phone.id,
        });
    }
    None
}

fn current_site(villagers: &VillagerArchetype, idx: usize, buildings: &BuildingRegistry) -> Option<BuildingId> {
    match villagers.targets[idx] {
        VillagerTarget::Building(id) => buildings
            .get(id)
            .filter(|b| b.state() == BuildingState::UnderConstruction)
            .map(|b| b.id),
        _ => None,
    }
}

fn work(
    villagers: &mut VillagerArchetype,
    idx: usize,
    buildings: &mut BuildingRegistry,
    ctx: &BehaviorContext,
    dt: f32,
) -> Option<AgentReport> {
    let site = current_site(villagers, idx, buildings)
        .or_else(|| buildings.select_work_site(villagers.positions[idx], ctx.config.target_policy));

    let Some(site) = site else {
        if villagers.states[idx] != VillagerState::Idle {
            tracing::trace!(villager = %villagers.ids[idx], "No construction site, going idle");
            villagers.go_idle(idx);
        }
        return None;
    };
    villagers.targets[idx] = VillagerTarget::Building(site);

    let position = buildings.get(site)?.position;
    let goal = position + villagers.work_offsets[idx];
    if !step_towards(villagers, idx, goal, ctx, dt) {
        return None;
    }

    if villagers.states[idx] == VillagerState::Idle {
        villagers.update_state_from_productivity(idx, ctx.band);
    }

    let effort = ctx.config.work_effort_per_second * dt * ctx.band.work_multiplier();
    match buildings.add_construction_progress(site, effort) {
        ContributionResult::Completed { .. } => {
            villagers.targets[idx] = VillagerTarget::None;
            tracing::info!(villager = %villagers.ids[idx], building = %site, "Building completed");
            Some(AgentReport::BuildingCompleted {
                villager: villagers.ids[idx],
                building: site,
            })
        }
        ContributionResult::InProgress { .. } => None,
        ContributionResult::NotUnderConstruction | ContributionResult::NotFound => {
            villagers.targets[idx] = VillagerTarget::None;
            None
        }
    }
}

fn nearest_victim(villagers: &VillagerArchetype, idx: usize) -> Option<usize> {
    let origin = villagers.positions[idx];
    villagers
        .iter_living()
        .filter(|&other| other != idx && villagers.is_eligible(other))
        .min_by_key(|&other| OrderedFloat(villagers.positions[other].distance_squared(&origin)))
}

fn hunt_victim(
    villagers: &mut VillagerArchetype,
    idx: usize,
    ctx: &BehaviorContext,
    dt: f32,
) -> Option<AgentReport> {
    if villagers.has_acted[idx] {
        return None;
    }

    let victim = match villagers.targets[idx] {
        VillagerTarget::Victim(id) => villagers
            .index_of(id)
            .filter(|&v| v != idx && villagers.is_eligible(v)),
        _ => None,
    }
    .or_else(|| nearest_victim(villagers, idx));

    let Some(victim) = victim else {
        villagers.targets[idx] = VillagerTarget::None;
        return None;
    };
    villagers.targets[idx] = VillagerTarget::Victim(villagers.ids[victim]);

    let goal = villagers.positions[victim];
    step_towards(villagers, idx, goal, ctx, dt);
    if villagers.positions[idx].distance(&villagers.positions[victim]) > ctx.config.attack_range {
        return None;
    }

    let attacker = villagers.ids[idx];
    let victim_id = villagers.ids[victim];
    villagers.kill(victim);
    villagers.has_acted[idx] = true;
    villagers.lock_idle(idx);

    tracing::info!(%attacker, victim = %victim_id, "Villager killed");
    Some(AgentReport::Killed {
        attacker,
        victim: victim_id,
    })
}

fn tear_down(
    villagers: &mut VillagerArchetype,
    idx: usize,
    buildings: &mut BuildingRegistry,
    ctx: &BehaviorContext,
    dt: f32,
) -> Option<AgentReport> {
    let standing = |id: BuildingId, buildings: &BuildingRegistry| {
        buildings.get(id).filter(|b| !b.state().is_destroyed()).map(|b| b.id)
    };

    let target = match villagers.targets[idx] {
        VillagerTarget::Building(id) => standing(id, buildings),
        _ => None,
    }
    .or_else(|| buildings.nearest(villagers.positions[idx], |b| !b.state().is_destroyed()));

    let Some(target) = target else {
        villagers.targets[idx] = VillagerTarget::None;
        return None;
    };
    villagers.targets[idx] = VillagerTarget::Building(target);

    let position = buildings.get(target)?.position;
    if !step_towards(villagers, idx, position, ctx, dt) {
        return None;
    }

    let damage = ctx.config.work_effort_per_second * dt * ctx.band.work_multiplier();
    match buildings.damage(target, damage) {
        DamageResult::Destroyed => {
            villagers.targets[idx] = VillagerTarget::None;
            tracing::info!(villager = %villagers.ids[idx], building = %target, "Building destroyed");
            Some(AgentReport::BuildingDestroyed {
                villager: villagers.ids[idx],
                building: target,
            })
        }
        DamageResult::Damaged { .. } => None,
        DamageResult::AlreadyDestroyed | DamageResult::NotFound => {
            villagers.targets[idx] = VillagerTarget::None;
            None
        }
    }
}
