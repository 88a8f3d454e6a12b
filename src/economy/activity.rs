//! Productivity activity - a bounded pool that productivity flows into

use crate::core::config::ActivityConfig;
use serde::{Deserialize, Serialize};

/// The activities the economy distributes productivity across
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityKind {
    Construction,
    Farming,
    Infrastructure,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 3] = [
        ActivityKind::Construction,
        ActivityKind::Farming,
        ActivityKind::Infrastructure,
    ];
}

/// A single activity pool
///
/// `stored_progress` always stays within `[0, storage_cap]`. Each tick the
/// pool first loses `passive_loss_per_second * dt`, then gains
/// `productivity * efficiency_multiplier * dt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductivityActivity {
    pub label: String,
    pub workforce_allocation: f32,
    pub efficiency_multiplier: f32,
    pub storage_cap: f32,
    pub starting_fill_percent: f32,
    pub passive_loss_per_second: f32,
    stored_progress: f32,
}

impl ProductivityActivity {
    pub fn from_config(config: &ActivityConfig) -> Self {
        let mut activity = Self {
            label: config.label.clone(),
            workforce_allocation: config.workforce_allocation.clamp(0.0, 1.0),
            efficiency_multiplier: config.efficiency_multiplier.max(0.0),
            storage_cap: config.storage_cap.max(0.0),
            starting_fill_percent: config.starting_fill_percent,
            passive_loss_per_second: config.passive_loss_per_second.max(0.0),
            stored_progress: 0.0,
        };
        activity.initialize();
        activity
    }

    /// Refill to the starting level
    pub fn initialize(&mut self) {
        self.stored_progress = self.starting_fill_percent.clamp(0.0, 1.0) * self.storage_cap;
    }

    pub fn stored_progress(&self) -> f32 {
        self.stored_progress
    }

    /// Fill level (0.0 to 1.0); an inert pool reads as empty
    pub fn normalized_progress(&self) -> f32 {
        if self.storage_cap <= 0.0 {
            0.0
        } else {
            self.stored_progress / self.storage_cap
        }
    }

    /// Apply passive loss, then gain from the given productivity input
    pub fn tick(&mut self, productivity: f32, dt: f32) {
        if self.storage_cap <= 0.0 {
            return;
        }

        if self.passive_loss_per_second > 0.0 && dt > 0.0 {
            self.stored_progress = (self.stored_progress - self.passive_loss_per_second * dt).max(0.0);
        }

        if productivity <= 0.0 || dt <= 0.0 {
            return;
        }

        let gained = productivity * self.efficiency_multiplier * dt;
        self.stored_progress = (self.stored_progress + gained).clamp(0.0, self.storage_cap);
    }

    /// Withdraw up to `desired`, returns amount actually consumed
    pub fn consume(&mut self, desired: f32) -> f32 {
        if desired <= 0.0 || self.stored_progress <= 0.0 {
            return 0.0;
        }
        let consumed = desired.min(self.stored_progress);
        self.stored_progress -= consumed;
        consumed
    }

    #[cfg(test)]
    pub(crate) fn set_stored_progress(&mut self, value: f32) {
        self.stored_progress = value.clamp(0.0, self.storage_cap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(cap: f32, loss: f32, efficiency: f32) -> ProductivityActivity {
        ProductivityActivity::from_config(&ActivityConfig {
            label: "Test".into(),
            workforce_allocation: 1.0,
            efficiency_multiplier: efficiency,
            storage_cap: cap,
            starting_fill_percent: 0.0,
            passive_loss_per_second: loss,
        })
    }

    #[test]
    fn test_initialize_uses_starting_fill() {
        let activity = ProductivityActivity::from_config(&ActivityConfig {
            storage_cap: 120.0,
            starting_fill_percent: 0.25,
            ..ActivityConfig::default()
        });
        assert!((activity.stored_progress() - 30.0).abs() < 0.001);
        assert!((activity.normalized_progress() - 0.25).abs() < 0.001);
    }

    #[test]
    fn test_gain_is_clamped_to_cap() {
        let mut activity = pool(100.0, 0.0, 1.0);
        activity.tick(100.0, 1.0);
        assert!((activity.stored_progress() - 100.0).abs() < 0.001);

        activity.tick(100.0, 1.0);
        assert!((activity.stored_progress() - 100.0).abs() < 0.001);
    }

    #[test]
    fn test_loss_applies_before_gain() {
        let mut activity = pool(100.0, 5.0, 1.0);
        activity.set_stored_progress(2.0);

        // Loss floors at 0 first, then 10 is gained
        activity.tick(10.0, 1.0);
        assert!((activity.stored_progress() - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_passive_loss_without_input() {
        let mut activity = pool(100.0, 2.0, 1.0);
        activity.set_stored_progress(3.0);
        activity.tick(0.0, 1.0);
        assert!((activity.stored_progress() - 1.0).abs() < 0.001);
        activity.tick(0.0, 1.0);
        assert_eq!(activity.stored_progress(), 0.0);
    }

    #[test]
    fn test_consume_never_goes_negative() {
        let mut activity = pool(100.0, 0.0, 1.0);
        activity.set_stored_progress(30.0);

        assert!((activity.consume(20.0) - 20.0).abs() < 0.001);
        assert!((activity.consume(20.0) - 10.0).abs() < 0.001);
        assert_eq!(activity.consume(20.0), 0.0);
        assert_eq!(activity.consume(-5.0), 0.0);
        assert_eq!(activity.stored_progress(), 0.0);
    }

    #[test]
    fn test_zero_cap_is_inert() {
        let mut activity = pool(0.0, 1.0, 1.0);
        activity.tick(100.0, 1.0);
        assert_eq!(activity.stored_progress(), 0.0);
        assert_eq!(activity.normalized_progress(), 0.0);
    }
}
