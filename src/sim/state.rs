//! Game state and core simulation types
//!
//! `GameState` is the single owned aggregate for a run: created when a game
//! starts, mutated by `tick`, dropped on return to the menu.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::rect::Rect;
use super::wave;
use crate::consts::*;
use crate::heading;
use crate::tuning::{DifficultyParams, MapStyle, Tuning};

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Game is paused
    Paused,
    /// Run ended (lives exhausted or eliminated online)
    GameOver,
}

/// Solo wave survival or shared online arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GameMode {
    #[default]
    Solo,
    Online,
}

impl GameMode {
    pub fn label(&self) -> &'static str {
        match self {
            GameMode::Solo => "Solo",
            GameMode::Online => "Online",
        }
    }
}

/// Wave director state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveStatus {
    /// Enemies are on the field
    Active,
    /// Last enemy died; next wave spawns when the countdown hits zero
    Intermission { remaining: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveState {
    /// 1-based wave number
    pub number: u32,
    pub status: WaveStatus,
    /// Difficulty scalars in force for this wave
    pub difficulty: DifficultyParams,
}

/// Shared tank body: square hitbox anchored at its top-left corner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tank {
    pub pos: Vec2,
    pub size: f32,
    /// Facing (radians)
    pub angle: f32,
    pub health: f32,
    pub max_health: f32,
}

impl Tank {
    pub fn new(pos: Vec2, size: f32, max_health: f32) -> Self {
        Self {
            pos,
            size,
            angle: 0.0,
            health: max_health,
            max_health,
        }
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        Rect::square(self.pos, self.size)
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.pos + Vec2::splat(self.size / 2.0)
    }

    /// Subtract health, never below zero
    pub fn take_damage(&mut self, amount: f32) {
        self.health = (self.health - amount).clamp(0.0, self.max_health);
    }

    /// Add health, never above max
    pub fn heal(&mut self, amount: f32) {
        self.health = (self.health + amount).clamp(0.0, self.max_health);
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.health <= 0.0
    }

    pub fn health_fraction(&self) -> f32 {
        if self.max_health > 0.0 {
            self.health / self.max_health
        } else {
            0.0
        }
    }
}

/// Player countdowns, all in ticks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerTimers {
    pub fire_cooldown: u32,
    pub invulnerable: u32,
    pub dash_active: u32,
    pub dash_cooldown: u32,
    pub rapid_fire: u32,
    pub pierce: u32,
}

impl PlayerTimers {
    /// Advance every timer by one tick, floored at zero
    pub fn tick_down(&mut self) {
        self.fire_cooldown = self.fire_cooldown.saturating_sub(1);
        self.invulnerable = self.invulnerable.saturating_sub(1);
        self.dash_active = self.dash_active.saturating_sub(1);
        self.dash_cooldown = self.dash_cooldown.saturating_sub(1);
        self.rapid_fire = self.rapid_fire.saturating_sub(1);
        self.pierce = self.pierce.saturating_sub(1);
    }
}

/// The local player's tank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub tank: Tank,
    /// Movement speed (px/tick)
    pub speed: f32,
    pub lives: u32,
    /// Last applied movement intent (scaled, pre-speed)
    pub heading: Vec2,
    pub timers: PlayerTimers,
    /// Respawn position (top-left)
    pub spawn: Vec2,
}

impl Player {
    pub fn new(tuning: &Tuning) -> Self {
        let spawn = Vec2::new(tuning.world.width * 0.2, tuning.world.height * 0.5);
        Self {
            tank: Tank::new(spawn, tuning.player.size, tuning.player.max_health),
            speed: tuning.player.speed,
            lives: tuning.player.starting_lives,
            heading: Vec2::ZERO,
            timers: PlayerTimers {
                invulnerable: tuning.player.respawn_invulnerability,
                ..Default::default()
            },
            spawn,
        }
    }

    /// Rectangle the map generator must keep clear
    pub fn spawn_rect(&self) -> Rect {
        Rect::square(self.spawn, self.tank.size)
    }
}

/// Enemy classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    Light,
    Medium,
    Heavy,
}

impl EnemyKind {
    pub const ALL: [EnemyKind; 3] = [EnemyKind::Light, EnemyKind::Medium, EnemyKind::Heavy];
}

/// An AI-controlled tank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u32,
    pub kind: EnemyKind,
    pub tank: Tank,
    /// Patrol velocity (px/tick), reflected off walls and arena edges
    pub roam: Vec2,
    pub bullet_speed: f32,
    pub fire_delay: u32,
    pub fire_cooldown: u32,
    pub score_value: u32,
}

/// Who fired a bullet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulletOwner {
    /// Local player
    Player,
    /// Wave enemy
    Enemy,
    /// Another participant online (their participant id)
    Remote(String),
}

/// A projectile. `pos` is the centre of its small square hitbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bullet {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    pub owner: BulletOwner,
    /// Survives target hits and reflects off hard surfaces
    pub piercing: bool,
    pub bounces: u32,
    pub max_bounces: u32,
    /// Remaining lifetime in ticks
    pub life: u32,
    pub damage: f32,
    /// Shot record id in the shared room, if this bullet is networked
    #[serde(default)]
    pub net_id: Option<String>,
}

impl Bullet {
    /// Velocity is derived once from angle and speed
    pub fn new(
        id: u32,
        pos: Vec2,
        angle: f32,
        speed: f32,
        owner: BulletOwner,
        damage: f32,
    ) -> Self {
        Self::with_velocity(id, pos, heading(angle) * speed, owner, damage)
    }

    pub fn with_velocity(id: u32, pos: Vec2, vel: Vec2, owner: BulletOwner, damage: f32) -> Self {
        Self {
            id,
            pos,
            vel,
            size: BULLET_SIZE,
            owner,
            piercing: false,
            bounces: 0,
            max_bounces: 0,
            life: BULLET_LIFE_TICKS,
            damage,
            net_id: None,
        }
    }

    /// Enable piercing with the standard bounce allowance
    pub fn piercing(mut self) -> Self {
        self.piercing = true;
        self.max_bounces = PIERCING_MAX_BOUNCES;
        self
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        Rect::centered(self.pos, self.size)
    }

    pub fn is_enemy(&self) -> bool {
        matches!(self.owner, BulletOwner::Enemy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Indestructible wall
    Wall,
    /// Breakable block with a hit-point pool
    Destructible { hp: f32, max_hp: f32 },
}

/// Static rectangle placed at map generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,
    pub rect: Rect,
    pub kind: ObstacleKind,
}

impl Obstacle {
    pub fn is_destructible(&self) -> bool {
        matches!(self.kind, ObstacleKind::Destructible { .. })
    }
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupKind {
    Health,
    RapidFire,
    Pierce,
}

impl PickupKind {
    pub const ALL: [PickupKind; 3] = [
        PickupKind::Health,
        PickupKind::RapidFire,
        PickupKind::Pierce,
    ];
}

/// A pickup entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pickup {
    pub id: u32,
    pub kind: PickupKind,
    /// Top-left corner
    pub pos: Vec2,
    pub size: f32,
}

impl Pickup {
    pub fn rect(&self) -> Rect {
        Rect::square(self.pos, self.size)
    }
}

/// A particle for visual effects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Ticks left
    pub life: f32,
    pub max_life: f32,
    /// 0xRRGGBB
    pub color: u32,
    pub size: f32,
}

/// Notifications for the audio/HUD collaborators, drained once per frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    PlayerShot,
    EnemyShot,
    PlayerHit { amount: f32 },
    LifeLost { lives_left: u32 },
    EnemyDestroyed { kind: EnemyKind, score: u32 },
    ObstacleDestroyed { id: u32 },
    PickupCollected { kind: PickupKind },
    DashStarted,
    WaveStarted { wave: u32 },
    WaveCleared { wave: u32 },
    GameOver { score: u64, wave: u32 },
    /// Knocked out of the online room; `by` is the shooter, if known
    Eliminated { by: Option<String> },
    RemoteJoined { id: String, name: String },
    RemoteLeft { id: String },
    /// Every rival has left while we are still standing
    RoomCleared,
}

/// Particle colours
pub mod tint {
    pub const PLAYER_SHOT_HIT: u32 = 0xffd166;
    pub const PVP_HIT: u32 = 0x8ff0c9;
    pub const ENEMY_SHOT_HIT: u32 = 0xfbbf24;
    pub const ENEMY_WRECK: u32 = 0xfca5a5;
    pub const OBSTACLE_CHIP: u32 = 0xfbbf24;
    pub const OBSTACLE_RUBBLE: u32 = 0xfde68a;
}

/// Complete game state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub tuning: Tuning,
    pub mode: GameMode,
    pub map: MapStyle,
    pub phase: GamePhase,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub score: u64,
    pub wave: WaveState,
    /// Play area
    pub bounds: Rect,
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub bullets: Vec<Bullet>,
    pub pickups: Vec<Pickup>,
    pub obstacles: Vec<Obstacle>,
    /// Visual particles (not gameplay-affecting)
    pub particles: Vec<Particle>,
    /// Ticks until the next pickup spawn
    pub pickup_timer: u32,
    /// Events raised since the host last drained them
    pub events: Vec<GameEvent>,
    /// Gameplay RNG
    pub rng: Pcg32,
    /// Cosmetic RNG, kept separate so particles never shift gameplay rolls
    pub fx_rng: Pcg32,
    next_id: u32,
}

impl GameState {
    /// Create a new run: generate the map and, in solo mode, the first wave
    pub fn new(seed: u64, tuning: Tuning, mode: GameMode, map: MapStyle) -> Self {
        let player = Player::new(&tuning);
        let bounds = Rect::new(0.0, 0.0, tuning.world.width, tuning.world.height);
        let pickup_timer = tuning.pickups.first_spawn_ticks;
        let mut state = Self {
            seed,
            mode,
            map,
            phase: GamePhase::Playing,
            time_ticks: 0,
            score: 0,
            wave: WaveState {
                number: 1,
                status: WaveStatus::Active,
                difficulty: wave::difficulty_for_wave(1, &tuning.difficulty),
            },
            bounds,
            player,
            enemies: Vec::new(),
            bullets: Vec::new(),
            pickups: Vec::new(),
            obstacles: Vec::new(),
            particles: Vec::new(),
            pickup_timer,
            events: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
            fx_rng: Pcg32::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15),
            next_id: 1,
            tuning,
        };

        state.obstacles = wave::generate_obstacles(&mut state);
        if mode == GameMode::Solo {
            wave::start_wave(&mut state, 1);
        }
        log::info!(
            "New {} game on {} (seed {}, {} obstacles)",
            mode.label(),
            map.as_str(),
            seed,
            state.obstacles.len()
        );
        state
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Queue a notification for the host
    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Hand all queued events to the caller
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Drop every bullet fired by wave enemies
    pub fn clear_enemy_bullets(&mut self) {
        self.bullets.retain(|b| !b.is_enemy());
    }

    /// Rectangles of every obstacle, for movement/placement checks
    pub fn wall_rects(&self) -> Vec<Rect> {
        self.obstacles.iter().map(|o| o.rect).collect()
    }

    /// Burst of cosmetic particles around `at`
    pub fn emit_particles(&mut self, at: Vec2, count: usize, color: u32) {
        for _ in 0..count {
            if self.particles.len() >= MAX_PARTICLES {
                // Remove oldest particles to make room
                self.particles.remove(0);
            }
            let angle = self.fx_rng.random::<f32>() * std::f32::consts::TAU;
            let speed = self.fx_rng.random::<f32>() * 2.0;
            let life = 14.0 + self.fx_rng.random::<f32>() * 8.0;
            let size = 2.0 + self.fx_rng.random::<f32>() * 2.0;
            self.particles.push(Particle {
                pos: at,
                vel: heading(angle) * speed,
                life,
                max_life: 20.0,
                color,
                size,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_solo_game_spawns_first_wave() {
        let state = GameState::new(7, Tuning::default(), GameMode::Solo, MapStyle::City);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.wave.number, 1);
        assert!(!state.enemies.is_empty());
        assert!(state.enemies.len() <= 4);
        assert_eq!(state.player.tank.health, state.player.tank.max_health);
        assert!(state.player.timers.invulnerable > 0);
    }

    #[test]
    fn test_new_online_game_has_no_enemies() {
        let state = GameState::new(7, Tuning::default(), GameMode::Online, MapStyle::Forest);
        assert!(state.enemies.is_empty());
        assert_eq!(state.mode.label(), "Online");
    }

    #[test]
    fn test_tank_health_clamps() {
        let mut tank = Tank::new(Vec2::ZERO, 30.0, 100.0);
        tank.take_damage(250.0);
        assert_eq!(tank.health, 0.0);
        assert!(tank.is_destroyed());
        tank.heal(500.0);
        assert_eq!(tank.health, 100.0);
    }

    #[test]
    fn test_timers_floor_at_zero() {
        let mut timers = PlayerTimers {
            fire_cooldown: 1,
            invulnerable: 0,
            dash_active: 2,
            ..Default::default()
        };
        timers.tick_down();
        timers.tick_down();
        assert_eq!(timers.fire_cooldown, 0);
        assert_eq!(timers.invulnerable, 0);
        assert_eq!(timers.dash_active, 0);
    }

    #[test]
    fn test_bullet_velocity_from_angle() {
        let up = std::f32::consts::FRAC_PI_2;
        let b = Bullet::new(1, Vec2::new(10.0, 10.0), up, 5.0, BulletOwner::Player, 45.0);
        assert!(b.vel.x.abs() < 1e-5);
        assert!((b.vel.y - 5.0).abs() < 1e-5);
        assert!(!b.piercing);
        let p = b.piercing();
        assert_eq!(p.max_bounces, PIERCING_MAX_BOUNCES);
    }

    #[test]
    fn test_particle_cap() {
        let mut state = GameState::new(1, Tuning::default(), GameMode::Online, MapStyle::City);
        state.emit_particles(Vec2::new(100.0, 100.0), MAX_PARTICLES + 50, tint::PVP_HIT);
        assert_eq!(state.particles.len(), MAX_PARTICLES);
    }
}
