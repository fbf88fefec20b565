//! Read-only views for the renderer and HUD
//!
//! The platform layer serialises these every frame; nothing here feeds back
//! into the simulation.

use glam::Vec2;
use serde::Serialize;

use super::rect::Rect;
use super::state::{
    BulletOwner, EnemyKind, GamePhase, GameState, ObstacleKind, PickupKind, PlayerTimers,
};
use crate::consts::TICKS_PER_SECOND;
use crate::net::Multiplayer;
use crate::palette::Palette;
use crate::tuning::MapStyle;

#[derive(Debug, Clone, Serialize)]
pub struct TankView {
    /// Top-left corner
    pub pos: Vec2,
    pub size: f32,
    pub angle: f32,
    pub health_fraction: f32,
    pub palette: Palette,
    /// Name tag for remote participants
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<EnemyKind>,
    /// Flashing while invulnerable
    pub blinking: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShotSide {
    Player,
    Enemy,
    Remote,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulletView {
    /// Centre
    pub pos: Vec2,
    pub size: f32,
    pub side: ShotSide,
    pub piercing: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PickupView {
    pub pos: Vec2,
    pub size: f32,
    pub kind: PickupKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticleView {
    pub pos: Vec2,
    pub size: f32,
    pub color: u32,
    /// Fade-out, 1 when fresh
    pub alpha: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObstacleView {
    pub rect: Rect,
    pub destructible: bool,
    /// Remaining hit points as a fraction, for breakable blocks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hp_fraction: Option<f32>,
}

/// Everything needed to draw one frame
#[derive(Debug, Clone, Serialize)]
pub struct RenderSnapshot {
    pub bounds: Rect,
    pub map: MapStyle,
    /// Absent once the run is over
    pub player: Option<TankView>,
    pub enemies: Vec<TankView>,
    pub remotes: Vec<TankView>,
    pub bullets: Vec<BulletView>,
    pub pickups: Vec<PickupView>,
    pub particles: Vec<ParticleView>,
    pub obstacles: Vec<ObstacleView>,
}

impl RenderSnapshot {
    pub fn capture(state: &GameState, net: Option<&Multiplayer>, palette: &Palette) -> Self {
        let player = (state.phase != GamePhase::GameOver).then(|| {
            let tank = &state.player.tank;
            TankView {
                pos: tank.pos,
                size: tank.size,
                angle: tank.angle,
                health_fraction: tank.health_fraction(),
                palette: *palette,
                label: None,
                kind: None,
                // Blink at ~7.5 Hz
                blinking: state.player.timers.invulnerable > 0 && (state.time_ticks / 4) % 2 == 0,
            }
        });

        let enemies = state
            .enemies
            .iter()
            .map(|e| TankView {
                pos: e.tank.pos,
                size: e.tank.size,
                angle: e.tank.angle,
                health_fraction: e.tank.health_fraction(),
                palette: Palette::ENEMY,
                label: None,
                kind: Some(e.kind),
                blinking: false,
            })
            .collect();

        let size = state.player.tank.size;
        let remotes = net
            .map(|n| {
                n.remotes()
                    .filter(|r| r.alive)
                    .map(|r| TankView {
                        pos: r.render,
                        size,
                        angle: r.angle,
                        health_fraction: (r.health / state.player.tank.max_health).clamp(0.0, 1.0),
                        palette: Palette::REMOTE,
                        label: Some(r.name.clone()),
                        kind: None,
                        blinking: false,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let bullets = state
            .bullets
            .iter()
            .map(|b| BulletView {
                pos: b.pos,
                size: b.size,
                side: match b.owner {
                    BulletOwner::Player => ShotSide::Player,
                    BulletOwner::Enemy => ShotSide::Enemy,
                    BulletOwner::Remote(_) => ShotSide::Remote,
                },
                piercing: b.piercing,
            })
            .collect();

        let pickups = state
            .pickups
            .iter()
            .map(|p| PickupView {
                pos: p.pos,
                size: p.size,
                kind: p.kind,
            })
            .collect();

        let particles = state
            .particles
            .iter()
            .map(|p| ParticleView {
                pos: p.pos,
                size: p.size,
                color: p.color,
                alpha: (p.life / p.max_life).clamp(0.0, 1.0),
            })
            .collect();

        let obstacles = state
            .obstacles
            .iter()
            .map(|o| ObstacleView {
                rect: o.rect,
                destructible: o.is_destructible(),
                hp_fraction: match o.kind {
                    ObstacleKind::Wall => None,
                    ObstacleKind::Destructible { hp, max_hp } => {
                        Some(if max_hp > 0.0 { (hp / max_hp).clamp(0.0, 1.0) } else { 0.0 })
                    }
                },
            })
            .collect();

        Self {
            bounds: state.bounds,
            map: state.map,
            player,
            enemies,
            remotes,
            bullets,
            pickups,
            particles,
            obstacles,
        }
    }
}

/// Label for the active buffs
pub fn buff_summary(timers: &PlayerTimers) -> &'static str {
    match (timers.rapid_fire > 0, timers.pierce > 0) {
        (true, true) => "Rapid + Pierce",
        (true, false) => "Rapid Fire",
        (false, true) => "Piercing",
        (false, false) => "None",
    }
}

/// HUD numbers
#[derive(Debug, Clone, Serialize)]
pub struct HudSnapshot {
    pub health_fraction: f32,
    pub lives: u32,
    pub score: u64,
    pub wave: u32,
    /// Ticks left before the next wave, while between waves
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_wave_in: Option<u32>,
    pub buffs: &'static str,
    pub pierce_seconds: f32,
    pub dash_ready: bool,
    pub mode: &'static str,
    pub phase: GamePhase,
    /// Online only
    pub opponents: usize,
    pub kills: u32,
}

impl HudSnapshot {
    pub fn capture(state: &GameState, net: Option<&Multiplayer>) -> Self {
        let timers = &state.player.timers;
        let next_wave_in = match state.wave.status {
            super::state::WaveStatus::Intermission { remaining } => Some(remaining),
            super::state::WaveStatus::Active => None,
        };
        Self {
            health_fraction: state.player.tank.health_fraction(),
            lives: state.player.lives,
            score: state.score,
            wave: state.wave.number,
            next_wave_in,
            buffs: buff_summary(timers),
            pierce_seconds: timers.pierce as f32 / TICKS_PER_SECOND as f32,
            dash_ready: timers.dash_cooldown == 0 && timers.dash_active == 0,
            mode: state.mode.label(),
            phase: state.phase,
            opponents: net.map(|n| n.remote_count()).unwrap_or(0),
            kills: net.map(|n| n.kills()).unwrap_or(0),
        }
    }
}
