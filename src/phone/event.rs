//! A single dropped phone

use crate::core::error::SimError;
use crate::core::types::{PhoneId, Vec2};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What kind of phone was dropped; decides the landing effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhoneType {
    /// Type A, red
    SocialMedia,
    /// Type B, yellow
    Streaming,
    /// Type C, blue
    Mainstream,
    /// Type D, green
    Gambling,
}

impl PhoneType {
    pub const ALL: [PhoneType; 4] = [
        PhoneType::SocialMedia,
        PhoneType::Streaming,
        PhoneType::Mainstream,
        PhoneType::Gambling,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PhoneType::SocialMedia => "social",
            PhoneType::Streaming => "streaming",
            PhoneType::Mainstream => "mainstream",
            PhoneType::Gambling => "gambling",
        }
    }
}

impl std::fmt::Display for PhoneType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PhoneType {
    type Err = SimError;

    /// Accepts the label, the letter (a-d) or the color
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "social" | "socialmedia" | "a" | "red" => Ok(PhoneType::SocialMedia),
            "streaming" | "b" | "yellow" => Ok(PhoneType::Streaming),
            "mainstream" | "c" | "blue" => Ok(PhoneType::Mainstream),
            "gambling" | "d" | "green" => Ok(PhoneType::Gambling),
            other => Err(SimError::UnknownPhoneType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhonePhase {
    Falling,
    Landed,
    /// Removed; never observed on the live phone
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phone {
    pub id: PhoneId,
    pub phone_type: PhoneType,
    pub position: Vec2,
    pub landing_point: Vec2,
    pub phase: PhonePhase,
    /// `None` when the phone never times out
    pub lifetime_remaining: Option<f32>,
}

impl Phone {
    pub fn new(id: PhoneId, phone_type: PhoneType, landing_point: Vec2, drop_height: f32, lifetime: f32) -> Self {
        Self {
            id,
            phone_type,
            position: Vec2::new(landing_point.x, landing_point.y + drop_height.max(0.0)),
            landing_point,
            phase: PhonePhase::Falling,
            lifetime_remaining: (lifetime > 0.0).then_some(lifetime),
        }
    }

    pub fn has_landed(&self) -> bool {
        self.phase == PhonePhase::Landed
    }

    /// Move toward the landing point; true on the step that touches down
    pub fn fall(&mut self, fall_speed: f32, dt: f32) -> bool {
        if self.phase != PhonePhase::Falling {
            return false;
        }
        self.position = self.position.move_towards(self.landing_point, fall_speed * dt);
        if self.position == self.landing_point {
            self.phase = PhonePhase::Landed;
            true
        } else {
            false
        }
    }

    /// Count down the lifetime; true once it has run out
    pub fn age(&mut self, dt: f32) -> bool {
        match self.lifetime_remaining.as_mut() {
            Some(remaining) => {
                *remaining = (*remaining - dt).max(0.0);
                *remaining <= 0.0
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_type_parsing() {
        assert_eq!("A".parse::<PhoneType>().unwrap(), PhoneType::SocialMedia);
        assert_eq!("streaming".parse::<PhoneType>().unwrap(), PhoneType::Streaming);
        assert_eq!(" blue ".parse::<PhoneType>().unwrap(), PhoneType::Mainstream);
        assert_eq!("d".parse::<PhoneType>().unwrap(), PhoneType::Gambling);
        assert!("purple".parse::<PhoneType>().is_err());
    }

    #[test]
    fn test_phone_falls_and_lands() {
        let mut phone = Phone::new(PhoneId(1), PhoneType::Gambling, Vec2::new(2.0, -1.0), 4.0, 5.0);
        assert!((phone.position.y - 3.0).abs() < 0.001);

        assert!(!phone.fall(2.0, 1.0));
        assert!((phone.position.y - 1.0).abs() < 0.001);
        assert!(phone.fall(2.0, 1.5));
        assert!(phone.has_landed());
        assert_eq!(phone.position, phone.landing_point);
        // Already down
        assert!(!phone.fall(2.0, 1.0));
    }

    #[test]
    fn test_zero_height_lands_on_first_step() {
        let mut phone = Phone::new(PhoneId(1), PhoneType::Streaming, Vec2::ZERO, 0.0, 5.0);
        assert!(phone.fall(1.0, 0.016));
    }

    #[test]
    fn test_lifetime() {
        let mut phone = Phone::new(PhoneId(1), PhoneType::Mainstream, Vec2::ZERO, 1.0, 2.0);
        assert!(!phone.age(1.5));
        assert!(phone.age(0.5));

        let mut forever = Phone::new(PhoneId(2), PhoneType::Mainstream, Vec2::ZERO, 1.0, 0.0);
        assert!(!forever.age(1000.0));
    }
}
