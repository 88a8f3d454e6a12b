//! Phone type to population effect table

use crate::core::config::PhoneConfig;
use crate::phone::event::PhoneType;
use serde::{Deserialize, Serialize};

/// What a landed phone does to the population
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PhoneEffect {
    /// The collecting responder turns violent
    Violent,
    /// Nearest `count` eligible villagers go idle and stay idle
    Binge { count: usize },
    /// Global movement speed is multiplied by `factor`, never below `floor`
    Slowdown { factor: f32, floor: f32 },
    /// The collecting responder starts tearing buildings down
    StructureDestroyer,
}

/// The effect table
///
/// | Type        | Effect              |
/// |-------------|---------------------|
/// | SocialMedia | Violent             |
/// | Streaming   | Binge               |
/// | Mainstream  | Slowdown            |
/// | Gambling    | StructureDestroyer  |
pub fn effect_for(phone_type: PhoneType, config: &PhoneConfig) -> PhoneEffect {
    match phone_type {
        PhoneType::SocialMedia => PhoneEffect::Violent,
        PhoneType::Streaming => PhoneEffect::Binge {
            count: config.streaming_idle_count,
        },
        PhoneType::Mainstream => PhoneEffect::Slowdown {
            factor: config.mainstream_slow_factor,
            floor: config.min_global_speed_multiplier,
        },
        PhoneType::Gambling => PhoneEffect::StructureDestroyer,
    }
}

/// New global speed multiplier after a slowdown
///
/// Clamped to `[floor, 1.0]`, and only ever lowers the current value.
pub fn apply_slowdown(current: f32, factor: f32, floor: f32) -> f32 {
    let slowed = (current * factor).clamp(floor.clamp(0.0, 1.0), 1.0);
    slowed.min(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_table() {
        let config = PhoneConfig::default();
        assert_eq!(effect_for(PhoneType::SocialMedia, &config), PhoneEffect::Violent);
        assert_eq!(
            effect_for(PhoneType::Streaming, &config),
            PhoneEffect::Binge { count: 3 }
        );
        assert_eq!(
            effect_for(PhoneType::Mainstream, &config),
            PhoneEffect::Slowdown { factor: 0.5, floor: 0.2 }
        );
        assert_eq!(
            effect_for(PhoneType::Gambling, &config),
            PhoneEffect::StructureDestroyer
        );
    }

    #[test]
    fn test_slowdown_floor_and_direction() {
        assert!((apply_slowdown(1.0, 0.5, 0.2) - 0.5).abs() < 0.001);
        assert!((apply_slowdown(0.3, 0.5, 0.2) - 0.2).abs() < 0.001);
        // Already below the floor: left alone rather than sped up
        assert!((apply_slowdown(0.1, 0.5, 0.2) - 0.1).abs() < 0.001);
    }
}
