//! Steel Dash - arcade tank shooter
//!
//! Core modules:
//! - `sim`: Frame-based simulation (movement, bullets, waves, pickups)
//! - `net`: Multiplayer reconciliation over a presence/event channel
//! - `platform`: Browser bridge (JS owns DOM, input, canvas and transport)
//! - `tuning`: Data-driven game balance

pub mod error;
pub mod highscores;
pub mod net;
pub mod palette;
pub mod platform;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use error::{GameError, Result};
pub use highscores::HighScores;
pub use palette::Palette;
pub use settings::{ControlScheme, Settings};
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Nominal frame rate of the host's animation callback
    pub const TICKS_PER_SECOND: u32 = 60;

    /// Hard cap on live particles; oldest are dropped first
    pub const MAX_PARTICLES: usize = 512;

    /// Bullet hitbox side length
    pub const BULLET_SIZE: f32 = 6.0;
    /// Default bullet lifetime in ticks
    pub const BULLET_LIFE_TICKS: u32 = 600;
    /// Bounce allowance for piercing bullets
    pub const PIERCING_MAX_BOUNCES: u32 = 4;

    /// Pickup side length
    pub const PICKUP_SIZE: f32 = 16.0;
}

/// Linear interpolation, exact at both endpoints
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Unit vector pointing along `angle` (radians, screen coordinates)
#[inline]
pub fn heading(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Angle of the vector from `from` to `to`
#[inline]
pub fn angle_between(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.y.atan2(d.x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_endpoints_are_exact() {
        assert_eq!(lerp(1.0, 1.6, 0.0), 1.0);
        assert_eq!(lerp(1.0, 1.6, 1.0), 1.6);
        assert_eq!(lerp(100.0, 80.0, 1.0), 80.0);
        assert!((lerp(0.0, 10.0, 0.5) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_heading_and_angle_between() {
        let v = heading(0.0);
        assert!((v.x - 1.0).abs() < 1e-6 && v.y.abs() < 1e-6);

        let a = angle_between(Vec2::new(0.0, 0.0), Vec2::new(0.0, 10.0));
        assert!((a - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }
}
