//! Deterministic simulation module
//!
//! All gameplay logic lives here:
//! - Fixed timestep only (one call per animation frame)
//! - Seeded RNG only
//! - Stable iteration order (entity vectors, never hash maps)
//! - No rendering or platform dependencies

pub mod collision;
pub mod rect;
pub mod snapshot;
pub mod state;
pub mod tick;
pub mod wave;

pub use collision::{AxisHits, WallResponse, move_with_obstacles};
pub use rect::Rect;
pub use snapshot::{HudSnapshot, RenderSnapshot, buff_summary};
pub use state::{
    Bullet, BulletOwner, Enemy, EnemyKind, GameEvent, GameMode, GamePhase, GameState, Obstacle,
    ObstacleKind, Particle, Pickup, PickupKind, Player, Tank, WaveStatus,
};
pub use tick::{Aim, DamageOutcome, TickInput, apply_damage, tick};
pub use wave::{Placement, WaveComposition, compose_wave, difficulty_for_wave, place_safely};
