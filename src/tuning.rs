//! Data-driven game balance
//!
//! Every gameplay constant lives here so a JSON document can rebalance a build
//! without touching code. Missing sections fall back to the shipped defaults.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::sim::state::EnemyKind;

/// Enemy movement/fire scalars for one difficulty regime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyParams {
    /// Roam speed (px/tick) for a medium-template enemy
    pub enemy_speed: f32,
    /// Bullet speed (px/tick) for a medium-template enemy
    pub enemy_bullet_speed: f32,
    /// Ticks between shots for a medium-template enemy
    pub enemy_fire_delay: f32,
}

impl DifficultyParams {
    pub const VERY_SLOW: Self = Self::new(1.0, 2.0, 100.0);
    pub const EASY: Self = Self::new(1.6, 2.6, 80.0);
    pub const MEDIUM: Self = Self::new(2.4, 3.4, 60.0);
    pub const HARD: Self = Self::new(3.2, 4.2, 45.0);

    pub const fn new(enemy_speed: f32, enemy_bullet_speed: f32, enemy_fire_delay: f32) -> Self {
        Self {
            enemy_speed,
            enemy_bullet_speed,
            enemy_fire_delay,
        }
    }

    /// Interpolate all three scalars by the same fraction
    pub fn lerp(&self, to: &Self, t: f32) -> Self {
        Self {
            enemy_speed: crate::lerp(self.enemy_speed, to.enemy_speed, t),
            enemy_bullet_speed: crate::lerp(self.enemy_bullet_speed, to.enemy_bullet_speed, t),
            enemy_fire_delay: crate::lerp(self.enemy_fire_delay, to.enemy_fire_delay, t),
        }
    }
}

/// Base stats for one enemy class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyTemplate {
    pub speed: f32,
    pub bullet_speed: f32,
    pub fire_delay: f32,
    pub size: f32,
    pub hp: f32,
    pub score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTemplates {
    pub light: EnemyTemplate,
    pub medium: EnemyTemplate,
    pub heavy: EnemyTemplate,
}

impl Default for EnemyTemplates {
    fn default() -> Self {
        Self {
            light: EnemyTemplate {
                speed: 3.0,
                bullet_speed: 4.0,
                fire_delay: 55.0,
                size: 26.0,
                hp: 40.0,
                score: 15,
            },
            medium: EnemyTemplate {
                speed: 2.3,
                bullet_speed: 3.4,
                fire_delay: 60.0,
                size: 32.0,
                hp: 55.0,
                score: 20,
            },
            heavy: EnemyTemplate {
                speed: 1.6,
                bullet_speed: 3.0,
                fire_delay: 80.0,
                size: 36.0,
                hp: 90.0,
                score: 30,
            },
        }
    }
}

impl EnemyTemplates {
    pub fn get(&self, kind: EnemyKind) -> &EnemyTemplate {
        match kind {
            EnemyKind::Light => &self.light,
            EnemyKind::Medium => &self.medium,
            EnemyKind::Heavy => &self.heavy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldTuning {
    pub width: f32,
    pub height: f32,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 640.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub size: f32,
    /// Movement speed (px/tick)
    pub speed: f32,
    pub max_health: f32,
    pub starting_lives: u32,
    /// Invulnerability granted at game start and after losing a life
    pub respawn_invulnerability: u32,
    pub fire_cooldown: u32,
    pub rapid_fire_cooldown: u32,
    pub bullet_speed: f32,
    /// Damage a player bullet deals to an enemy
    pub bullet_damage: f32,
    /// Damage a player bullet deals to another participant online
    pub pvp_bullet_damage: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            size: 30.0,
            speed: 3.0,
            max_health: 100.0,
            starting_lives: 2,
            respawn_invulnerability: 60,
            fire_cooldown: 12,
            rapid_fire_cooldown: 6,
            bullet_speed: 5.0,
            bullet_damage: 45.0,
            pvp_bullet_damage: 20.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashTuning {
    pub duration: u32,
    pub cooldown: u32,
    pub speed_multiplier: f32,
    /// Extra invulnerability ticks past the end of the dash
    pub invulnerability_padding: u32,
}

impl Default for DashTuning {
    fn default() -> Self {
        Self {
            duration: 14,
            cooldown: 160,
            speed_multiplier: 2.4,
            invulnerability_padding: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageTuning {
    pub enemy_bullet: f32,
    pub collision: f32,
    /// Hit points a destructible obstacle loses per bullet
    pub obstacle_hit: f32,
}

impl Default for DamageTuning {
    fn default() -> Self {
        Self {
            enemy_bullet: 30.0,
            collision: 40.0,
            obstacle_hit: 35.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyTuning {
    pub very_slow: DifficultyParams,
    pub easy: DifficultyParams,
    pub medium: DifficultyParams,
    pub hard: DifficultyParams,
    /// Waves it takes to go from medium to hard after wave 5
    pub hard_ramp_waves: u32,
    /// Floor on any enemy's fire delay after scaling
    pub min_enemy_fire_delay: u32,
}

impl Default for DifficultyTuning {
    fn default() -> Self {
        Self {
            very_slow: DifficultyParams::VERY_SLOW,
            easy: DifficultyParams::EASY,
            medium: DifficultyParams::MEDIUM,
            hard: DifficultyParams::HARD,
            hard_ramp_waves: 4,
            min_enemy_fire_delay: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PickupTuning {
    pub first_spawn_ticks: u32,
    pub interval_ticks: u32,
    pub interval_jitter_ticks: u32,
    /// Minimum distance from every tank centre
    pub safe_distance: f32,
    pub placement_attempts: u32,
    pub heal: f32,
    pub buff_ticks: u32,
    /// Chance a destroyed enemy drops a pickup
    pub enemy_drop_chance: f64,
}

impl Default for PickupTuning {
    fn default() -> Self {
        Self {
            first_spawn_ticks: 240,
            interval_ticks: 360,
            interval_jitter_ticks: 180,
            safe_distance: 80.0,
            placement_attempts: 40,
            heal: 30.0,
            buff_ticks: 360,
            enemy_drop_chance: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveTuning {
    /// Pause between the last kill and the next wave
    pub intermission_ticks: u32,
    pub enemy_safe_distance: f32,
    pub placement_attempts: u32,
    /// Optional ceiling on enemies per wave (uncapped when absent)
    pub max_enemies: Option<u32>,
}

impl Default for WaveTuning {
    fn default() -> Self {
        Self {
            intermission_ticks: 150,
            enemy_safe_distance: 140.0,
            placement_attempts: 120,
            max_enemies: None,
        }
    }
}

/// Map layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapStyle {
    #[default]
    City,
    Forest,
    Desert,
    Maze,
}

impl MapStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapStyle::City => "City",
            MapStyle::Forest => "Forest",
            MapStyle::Desert => "Desert",
            MapStyle::Maze => "Maze",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "city" => Some(MapStyle::City),
            "forest" => Some(MapStyle::Forest),
            "desert" => Some(MapStyle::Desert),
            "maze" => Some(MapStyle::Maze),
            _ => None,
        }
    }
}

/// Scattered block obstacles, some destructible
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ObstacleStyle {
    pub count: u32,
    pub size_min: f32,
    pub size_max: f32,
    pub destructible_chance: f64,
    pub hp_min: f32,
    pub hp_max: f32,
}

/// Thin indestructible bars
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MazeStyle {
    pub bars: u32,
    pub length_min: f32,
    pub length_max: f32,
    pub thickness: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapTuning {
    pub city: ObstacleStyle,
    pub forest: ObstacleStyle,
    pub desert: ObstacleStyle,
    pub maze: MazeStyle,
    /// Clearance kept around the player spawn square
    pub spawn_buffer: f32,
    /// Side of the always-empty top-left corner
    pub corner_clearance: f32,
    /// Minimum gap between two obstacles
    pub obstacle_gap: f32,
}

impl Default for MapTuning {
    fn default() -> Self {
        Self {
            city: ObstacleStyle {
                count: 5,
                size_min: 60.0,
                size_max: 120.0,
                destructible_chance: 0.4,
                hp_min: 80.0,
                hp_max: 130.0,
            },
            forest: ObstacleStyle {
                count: 4,
                size_min: 70.0,
                size_max: 130.0,
                destructible_chance: 0.5,
                hp_min: 90.0,
                hp_max: 140.0,
            },
            desert: ObstacleStyle {
                count: 4,
                size_min: 70.0,
                size_max: 140.0,
                destructible_chance: 0.45,
                hp_min: 80.0,
                hp_max: 150.0,
            },
            maze: MazeStyle {
                bars: 7,
                length_min: 120.0,
                length_max: 220.0,
                thickness: 16.0,
            },
            spawn_buffer: 20.0,
            corner_clearance: 120.0,
            obstacle_gap: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetTuning {
    /// Cadence of local presence writes
    pub publish_interval_ms: f64,
    /// Remote presence older than this is evicted
    pub stale_after_ms: f64,
    /// Render-position smoothing factor per tick
    pub smoothing: f32,
}

impl Default for NetTuning {
    fn default() -> Self {
        Self {
            publish_interval_ms: 100.0,
            stale_after_ms: 20_000.0,
            smoothing: 0.18,
        }
    }
}

/// Complete balance sheet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub world: WorldTuning,
    pub player: PlayerTuning,
    pub dash: DashTuning,
    pub damage: DamageTuning,
    pub difficulty: DifficultyTuning,
    pub enemies: EnemyTemplates,
    pub pickups: PickupTuning,
    pub waves: WaveTuning,
    pub maps: MapTuning,
    pub net: NetTuning,
}

impl Tuning {
    /// Parse and validate a JSON tuning document
    pub fn from_json(json: &str) -> Result<Self> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<()> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> GameError {
            GameError::InvalidTuning {
                field,
                reason: reason.into(),
            }
        }

        let largest_tank = self
            .player
            .size
            .max(self.enemies.light.size)
            .max(self.enemies.medium.size)
            .max(self.enemies.heavy.size);
        if self.world.width <= largest_tank * 4.0 || self.world.height <= largest_tank * 4.0 {
            return Err(invalid("world", "arena too small for the tanks it holds"));
        }
        if self.player.max_health <= 0.0 {
            return Err(invalid("player.max_health", "must be positive"));
        }
        if self.player.size <= 0.0 || self.player.speed < 0.0 {
            return Err(invalid("player", "size must be positive and speed non-negative"));
        }
        let medium = &self.difficulty.medium;
        let medium = [
            medium.enemy_speed,
            medium.enemy_bullet_speed,
            medium.enemy_fire_delay,
        ];
        if medium.iter().any(|v| !(*v > 0.0)) {
            return Err(invalid("difficulty.medium", "enemy baselines must be positive"));
        }
        if self.difficulty.hard_ramp_waves == 0 {
            return Err(invalid("difficulty.hard_ramp_waves", "must be at least 1"));
        }
        if self.waves.placement_attempts == 0 || self.pickups.placement_attempts == 0 {
            return Err(invalid("placement_attempts", "must be at least 1"));
        }
        if !(self.net.smoothing > 0.0 && self.net.smoothing <= 1.0) {
            return Err(invalid("net.smoothing", "must be in (0, 1]"));
        }
        if self.net.publish_interval_ms <= 0.0 || self.net.stale_after_ms <= 0.0 {
            return Err(invalid("net", "intervals must be positive"));
        }
        for (field, style) in [
            ("maps.city", &self.maps.city),
            ("maps.forest", &self.maps.forest),
            ("maps.desert", &self.maps.desert),
        ] {
            if style.size_min <= 0.0 || style.size_max < style.size_min {
                return Err(invalid(field, "size range is empty"));
            }
            if style.hp_max < style.hp_min {
                return Err(invalid(field, "hp range is empty"));
            }
        }
        let maze = &self.maps.maze;
        if maze.length_max < maze.length_min || maze.thickness <= 0.0 {
            return Err(invalid("maps.maze", "bar dimensions are invalid"));
        }
        Ok(())
    }
}
