//! Phone dispatcher - one live phone at a time, gated by a cooldown
//!
//! ```text
//! none --spawn_event--> Falling --lands--> Landed
//!   ^                      |                  |
//!   |                tap / timeout    tap / timeout / pick_up
//!   +------ cooldown ------+------------------+
//! ```
//!
//! The dispatcher only tracks the phone. Reactions (economy disruption,
//! population effects, unfreezing) are driven by the events it returns.

use crate::core::config::PhoneConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{PhoneId, Vec2};
use crate::phone::event::{Phone, PhonePhase, PhoneType};
use serde::{Deserialize, Serialize};

/// Why a phone went away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClearReason {
    Tapped,
    Timeout,
    PickedUp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PhoneEvent {
    Landed {
        phone: PhoneId,
        phone_type: PhoneType,
        position: Vec2,
    },
    Cleared {
        phone: PhoneId,
        phone_type: PhoneType,
        reason: ClearReason,
        /// Whether the phone had landed before it went away
        landed: bool,
    },
}

pub struct PhoneDispatcher {
    config: PhoneConfig,
    active: Option<Phone>,
    cooldown_remaining: f32,
    next_id: u32,
}

impl PhoneDispatcher {
    pub fn new(config: &PhoneConfig) -> Self {
        Self {
            config: config.clone(),
            active: None,
            cooldown_remaining: 0.0,
            next_id: 1,
        }
    }

    pub fn reset(&mut self) {
        self.active = None;
        self.cooldown_remaining = 0.0;
        self.next_id = 1;
    }

    pub fn config(&self) -> &PhoneConfig {
        &self.config
    }

    pub fn active(&self) -> Option<&Phone> {
        self.active.as_ref()
    }

    pub fn cooldown_remaining(&self) -> f32 {
        self.cooldown_remaining
    }

    pub fn can_spawn(&self) -> bool {
        self.active.is_none() && self.cooldown_remaining <= 0.0
    }

    /// Drop a phone that will land at `position`
    pub fn spawn_event(&mut self, position: Vec2, phone_type: PhoneType) -> Result<PhoneId> {
        if self.active.is_some() {
            return Err(SimError::PhoneActive);
        }
        if self.cooldown_remaining > 0.0 {
            return Err(SimError::CoolingDown {
                remaining: self.cooldown_remaining,
            });
        }

        let id = PhoneId(self.next_id);
        self.next_id += 1;
        self.active = Some(Phone::new(
            id,
            phone_type,
            position,
            self.config.drop_height,
            self.config.lifetime,
        ));

        tracing::info!(phone = %id, %phone_type, x = position.x, y = position.y, "Phone dropped");
        Ok(id)
    }

    /// Dismiss the live phone early
    pub fn tap_active(&mut self) -> Option<PhoneEvent> {
        self.clear(ClearReason::Tapped)
    }

    /// The responder reached the landed phone
    pub fn pick_up(&mut self, id: PhoneId) -> Option<PhoneEvent> {
        let ready = matches!(&self.active, Some(phone) if phone.id == id && phone.has_landed());
        if !ready {
            tracing::trace!(phone = %id, "Pick-up ignored: phone not landed or already gone");
            return None;
        }
        self.clear(ClearReason::PickedUp)
    }

    /// Count down the cooldown, move the live phone, age it
    pub fn advance(&mut self, dt: f32) -> Vec<PhoneEvent> {
        let mut events = Vec::new();
        if dt <= 0.0 {
            return events;
        }

        let Some(phone) = self.active.as_mut() else {
            self.cooldown_remaining = (self.cooldown_remaining - dt).max(0.0);
            return events;
        };

        if phone.fall(self.config.fall_speed, dt) {
            tracing::debug!(phone = %phone.id, "Phone landed");
            events.push(PhoneEvent::Landed {
                phone: phone.id,
                phone_type: phone.phone_type,
                position: phone.landing_point,
            });
        }

        if phone.age(dt) {
            events.extend(self.clear(ClearReason::Timeout));
        }

        events
    }

    fn clear(&mut self, reason: ClearReason) -> Option<PhoneEvent> {
        let mut phone = self.active.take()?;
        let landed = phone.has_landed();
        phone.phase = PhonePhase::Disabled;
        self.cooldown_remaining = self.config.cooldown.max(0.0);

        tracing::info!(phone = %phone.id, ?reason, landed, "Phone cleared");
        Some(PhoneEvent::Cleared {
            phone: phone.id,
            phone_type: phone.phone_type,
            reason,
            landed,
        })
    }
}
