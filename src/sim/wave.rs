//! Wave & spawn director
//!
//! Difficulty ramp, per-wave enemy composition, bounded rejection-sampling
//! placement and the active/intermission state machine. Map generation lives
//! here as well since it shares the placement rules.

use glam::Vec2;
use rand::Rng;

use super::rect::Rect;
use super::state::{
    Enemy, EnemyKind, GameEvent, GameMode, GameState, Obstacle, ObstacleKind, Tank, WaveStatus,
};
use crate::heading;
use crate::tuning::{DifficultyParams, DifficultyTuning, MapStyle, MazeStyle, ObstacleStyle};

/// Uniform sample in `[lo, hi)`; degenerate ranges return `lo`
fn uniform<R: Rng>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    lo + rng.random::<f32>() * (hi - lo).max(0.0)
}

/// Three-segment ramp: very slow → easy over wave 1→2, easy → medium over
/// 2→5, medium → hard from 5 on, clamped at hard
pub fn difficulty_for_wave(wave: u32, tuning: &DifficultyTuning) -> DifficultyParams {
    let w = wave as f32;
    let segment = |start: f32, len: f32| ((w - start) / len).clamp(0.0, 1.0);
    if wave <= 2 {
        tuning.very_slow.lerp(&tuning.easy, segment(1.0, 1.0))
    } else if wave <= 5 {
        tuning.easy.lerp(&tuning.medium, segment(2.0, 3.0))
    } else {
        tuning
            .medium
            .lerp(&tuning.hard, segment(5.0, tuning.hard_ramp_waves.max(1) as f32))
    }
}

/// Enemy counts for one wave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveComposition {
    pub light: u32,
    pub medium: u32,
    pub heavy: u32,
}

impl WaveComposition {
    pub fn total(&self) -> u32 {
        self.light + self.medium + self.heavy
    }

    pub fn count(&self, kind: EnemyKind) -> u32 {
        match kind {
            EnemyKind::Light => self.light,
            EnemyKind::Medium => self.medium,
            EnemyKind::Heavy => self.heavy,
        }
    }
}

/// Counts for wave `n`, optionally capped
///
/// The cap keeps heavier classes first, so late waves stay dangerous.
pub fn compose_wave(n: u32, cap: Option<u32>) -> WaveComposition {
    let light = 2 + n;
    let medium = ((n + 1) / 2).max(1);
    let heavy = if n >= 3 { (n - 1) / 3 } else { 0 };

    match cap {
        None => WaveComposition {
            light,
            medium,
            heavy,
        },
        Some(cap) => {
            let heavy = heavy.min(cap);
            let medium = medium.min(cap - heavy);
            let light = light.min(cap - heavy - medium);
            WaveComposition {
                light,
                medium,
                heavy,
            }
        }
    }
}

/// Rejection-sampling parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Minimum centre distance from every keep-away point
    pub min_distance: f32,
    pub max_attempts: u32,
}

/// Everything a placement candidate must stay clear of
#[derive(Debug, Clone, Copy)]
pub struct Surroundings<'a> {
    pub bounds: Rect,
    pub walls: &'a [Rect],
    /// Rectangles already taken this cycle
    pub occupied: &'a [Rect],
    /// Centres the candidate's centre must keep `min_distance` from
    pub keep_away: &'a [Vec2],
}

/// Find a top-left position for a square of side `size`, or give up
///
/// Always returns within `max_attempts` samples.
pub fn place_safely<R: Rng>(
    rng: &mut R,
    size: f32,
    around: &Surroundings<'_>,
    placement: Placement,
) -> Option<Vec2> {
    let max_x = (around.bounds.width - size).max(0.0);
    let max_y = (around.bounds.height - size).max(0.0);
    for _ in 0..placement.max_attempts {
        let pos = Vec2::new(
            around.bounds.x + uniform(rng, 0.0, max_x),
            around.bounds.y + uniform(rng, 0.0, max_y),
        );
        let rect = Rect::square(pos, size);
        let centre = rect.center();
        let too_close = around
            .keep_away
            .iter()
            .any(|p| centre.distance(*p) < placement.min_distance);
        if too_close
            || around.walls.iter().any(|w| rect.overlaps(w))
            || around.occupied.iter().any(|o| rect.overlaps(o))
        {
            continue;
        }
        return Some(pos);
    }
    None
}

/// Build an enemy of `kind`, scaled by the current wave difficulty
///
/// Position is left at the origin; the caller places it.
pub fn create_enemy(state: &mut GameState, kind: EnemyKind) -> Enemy {
    let tpl = *state.tuning.enemies.get(kind);
    let base = state.tuning.difficulty.medium;
    let current = state.wave.difficulty;

    let speed = tpl.speed * current.enemy_speed / base.enemy_speed;
    let bullet_speed = tpl.bullet_speed * current.enemy_bullet_speed / base.enemy_bullet_speed;
    let fire_delay = (tpl.fire_delay * current.enemy_fire_delay / base.enemy_fire_delay)
        .round()
        .max(state.tuning.difficulty.min_enemy_fire_delay as f32) as u32;

    let roam_angle = state.rng.random::<f32>() * std::f32::consts::TAU;
    let fire_cooldown = state.rng.random_range(0..fire_delay.max(1));
    let id = state.next_entity_id();

    Enemy {
        id,
        kind,
        tank: Tank::new(Vec2::ZERO, tpl.size, tpl.hp),
        roam: heading(roam_angle) * speed,
        bullet_speed,
        fire_delay,
        fire_cooldown,
        score_value: tpl.score,
    }
}

/// Begin wave `n`: new difficulty, enemy bullets cleared, fresh enemies
///
/// Player bullets carry over. Enemies that cannot be placed are skipped.
pub fn start_wave(state: &mut GameState, n: u32) {
    state.wave.number = n;
    state.wave.status = WaveStatus::Active;
    state.wave.difficulty = difficulty_for_wave(n, &state.tuning.difficulty);
    state.clear_enemy_bullets();
    state.enemies.clear();

    let composition = compose_wave(n, state.tuning.waves.max_enemies);
    let walls = state.wall_rects();
    let placement = Placement {
        min_distance: state.tuning.waves.enemy_safe_distance,
        max_attempts: state.tuning.waves.placement_attempts,
    };
    let player_centre = state.player.tank.center();
    let mut skipped = 0;

    for kind in EnemyKind::ALL {
        for _ in 0..composition.count(kind) {
            let mut enemy = create_enemy(state, kind);
            let occupied: Vec<Rect> = state.enemies.iter().map(|e| e.tank.rect()).collect();
            let around = Surroundings {
                bounds: state.bounds,
                walls: &walls,
                occupied: &occupied,
                keep_away: &[player_centre],
            };
            match place_safely(&mut state.rng, enemy.tank.size, &around, placement) {
                Some(pos) => {
                    enemy.tank.pos = pos;
                    state.enemies.push(enemy);
                }
                None => skipped += 1,
            }
        }
    }

    if skipped > 0 {
        log::debug!("Wave {}: no room for {} of {} enemies", n, skipped, composition.total());
    }
    log::info!("Wave {} started with {} enemies", n, state.enemies.len());
    state.push_event(GameEvent::WaveStarted { wave: n });
}

/// Active → Intermission on the last kill, Intermission → next wave on expiry
///
/// Online rooms have no wave enemies, so the director idles.
pub fn handle_wave_progression(state: &mut GameState) {
    if state.mode == GameMode::Online {
        return;
    }
    match state.wave.status {
        WaveStatus::Active => {
            if state.enemies.is_empty() {
                let wave = state.wave.number;
                state.wave.status = WaveStatus::Intermission {
                    remaining: state.tuning.waves.intermission_ticks,
                };
                log::info!("Wave {} cleared", wave);
                state.push_event(GameEvent::WaveCleared { wave });
            }
        }
        WaveStatus::Intermission { remaining } => {
            if remaining <= 1 {
                start_wave(state, state.wave.number + 1);
            } else {
                state.wave.status = WaveStatus::Intermission {
                    remaining: remaining - 1,
                };
            }
        }
    }
}

/// Static map layout for the current style
///
/// Nothing overlaps the player's spawn (plus buffer), the top-left corner,
/// or another obstacle (plus gap). Gives up after a bounded number of tries.
pub fn generate_obstacles(state: &mut GameState) -> Vec<Obstacle> {
    let maps = state.tuning.maps.clone();
    let keep_clear = [
        state.player.spawn_rect().inflate(maps.spawn_buffer),
        Rect::new(
            state.bounds.x,
            state.bounds.y,
            maps.corner_clearance,
            maps.corner_clearance,
        ),
    ];

    let (target, attempts) = match state.map {
        MapStyle::Maze => (maps.maze.bars, maps.maze.bars * 15),
        style => {
            let count = obstacle_style(&maps, style).count;
            (count, count * 15)
        }
    };

    let mut obstacles: Vec<Obstacle> = Vec::new();
    for _ in 0..attempts {
        if obstacles.len() as u32 >= target {
            break;
        }
        let (rect, kind) = match state.map {
            MapStyle::Maze => maze_bar(&mut state.rng, &maps.maze, &state.bounds),
            style => block(&mut state.rng, obstacle_style(&maps, style), &state.bounds),
        };
        let blocked = keep_clear.iter().any(|r| rect.overlaps(r))
            || obstacles
                .iter()
                .any(|o| rect.inflate(maps.obstacle_gap).overlaps(&o.rect));
        if !blocked {
            let id = state.next_entity_id();
            obstacles.push(Obstacle { id, rect, kind });
        }
    }

    if (obstacles.len() as u32) < target {
        log::debug!(
            "Map {}: placed {} of {} obstacles",
            state.map.as_str(),
            obstacles.len(),
            target
        );
    }
    obstacles
}

fn obstacle_style(maps: &crate::tuning::MapTuning, style: MapStyle) -> &ObstacleStyle {
    match style {
        MapStyle::Forest => &maps.forest,
        MapStyle::Desert => &maps.desert,
        _ => &maps.city,
    }
}

fn block<R: Rng>(rng: &mut R, style: &ObstacleStyle, bounds: &Rect) -> (Rect, ObstacleKind) {
    let width = uniform(rng, style.size_min, style.size_max);
    let aspect = uniform(rng, 0.6, 1.4);
    let height = width * aspect;
    let x = bounds.x + uniform(rng, 0.0, bounds.width - width);
    let y = bounds.y + uniform(rng, 0.0, bounds.height - height);
    let kind = if rng.random_bool(style.destructible_chance.clamp(0.0, 1.0)) {
        let hp = uniform(rng, style.hp_min, style.hp_max).round();
        ObstacleKind::Destructible { hp, max_hp: hp }
    } else {
        ObstacleKind::Wall
    };
    (Rect::new(x, y, width, height), kind)
}

fn maze_bar<R: Rng>(rng: &mut R, style: &MazeStyle, bounds: &Rect) -> (Rect, ObstacleKind) {
    let length = uniform(rng, style.length_min, style.length_max);
    let (width, height) = if rng.random_bool(0.5) {
        (length, style.thickness)
    } else {
        (style.thickness, length)
    };
    let x = bounds.x + uniform(rng, 0.0, bounds.width - width);
    let y = bounds.y + uniform(rng, 0.0, bounds.height - height);
    (Rect::new(x, y, width, height), ObstacleKind::Wall)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_wave_one_composition() {
        let c = compose_wave(1, None);
        assert_eq!(c, WaveComposition { light: 3, medium: 1, heavy: 0 });
    }

    #[test]
    fn test_wave_six_composition() {
        let c = compose_wave(6, None);
        assert_eq!(c, WaveComposition { light: 8, medium: 3, heavy: 1 });
    }

    #[test]
    fn test_composition_never_shrinks() {
        let mut prev = compose_wave(1, None).total();
        for n in 2..40 {
            let total = compose_wave(n, None).total();
            assert!(total >= prev);
            prev = total;
        }
    }

    #[test]
    fn test_cap_keeps_heavies() {
        let c = compose_wave(10, Some(6));
        assert_eq!(c.total(), 6);
        assert_eq!(c.heavy, 3);
        assert_eq!(c.medium, 3);
        assert_eq!(c.light, 0);
    }

    #[test]
    fn test_difficulty_segment_boundaries() {
        let t = DifficultyTuning::default();
        assert_eq!(difficulty_for_wave(1, &t), DifficultyParams::VERY_SLOW);
        assert_eq!(difficulty_for_wave(2, &t), DifficultyParams::EASY);
        assert_eq!(difficulty_for_wave(5, &t), DifficultyParams::MEDIUM);
        assert_eq!(difficulty_for_wave(9, &t), DifficultyParams::HARD);
        assert_eq!(difficulty_for_wave(50, &t), DifficultyParams::HARD);
    }

    #[test]
    fn test_difficulty_midpoint() {
        let t = DifficultyTuning::default();
        let d = difficulty_for_wave(7, &t);
        assert!(d.enemy_speed > DifficultyParams::MEDIUM.enemy_speed);
        assert!(d.enemy_speed < DifficultyParams::HARD.enemy_speed);
        assert!(d.enemy_fire_delay < DifficultyParams::MEDIUM.enemy_fire_delay);
    }

    #[test]
    fn test_placement_gives_up_in_full_world() {
        let mut rng = Pcg32::seed_from_u64(3);
        let bounds = Rect::new(0.0, 0.0, 200.0, 200.0);
        let walls = [bounds];
        let around = Surroundings {
            bounds,
            walls: &walls,
            occupied: &[],
            keep_away: &[],
        };
        let placement = Placement {
            min_distance: 0.0,
            max_attempts: 50,
        };
        assert_eq!(place_safely(&mut rng, 20.0, &around, placement), None);
    }

    #[test]
    fn test_placement_respects_keep_away() {
        let mut rng = Pcg32::seed_from_u64(11);
        let bounds = Rect::new(0.0, 0.0, 400.0, 400.0);
        let player = Vec2::new(200.0, 200.0);
        let around = Surroundings {
            bounds,
            walls: &[],
            occupied: &[],
            keep_away: &[player],
        };
        let placement = Placement {
            min_distance: 120.0,
            max_attempts: 200,
        };
        for _ in 0..20 {
            let pos = place_safely(&mut rng, 20.0, &around, placement).unwrap();
            let rect = Rect::square(pos, 20.0);
            assert!(rect.center().distance(player) >= 120.0);
            assert!(bounds.contains_rect(&rect));
        }
    }

    #[test]
    fn test_wave_state_machine() {
        let mut state = GameState::new(5, Tuning::default(), GameMode::Solo, MapStyle::Desert);
        state.drain_events();
        state.enemies.clear();

        handle_wave_progression(&mut state);
        assert!(matches!(state.wave.status, WaveStatus::Intermission { remaining: 150 }));
        assert_eq!(state.drain_events(), vec![GameEvent::WaveCleared { wave: 1 }]);

        for _ in 0..149 {
            handle_wave_progression(&mut state);
        }
        assert_eq!(state.wave.number, 1);
        handle_wave_progression(&mut state);
        assert_eq!(state.wave.number, 2);
        assert_eq!(state.wave.status, WaveStatus::Active);
        assert_eq!(state.wave.difficulty, DifficultyParams::EASY);
        assert!(state.drain_events().contains(&GameEvent::WaveStarted { wave: 2 }));
    }

    #[test]
    fn test_start_wave_places_enemies_safely() {
        let mut state = GameState::new(21, Tuning::default(), GameMode::Solo, MapStyle::City);
        start_wave(&mut state, 6);
        let walls = state.wall_rects();
        let player = state.player.tank.center();
        assert!(state.enemies.len() <= 12);
        for (i, e) in state.enemies.iter().enumerate() {
            let rect = e.tank.rect();
            assert!(state.bounds.contains_rect(&rect));
            assert!(!walls.iter().any(|w| rect.overlaps(w)));
            assert!(rect.center().distance(player) >= 140.0);
            assert!(e.fire_cooldown < e.fire_delay);
            assert!(e.fire_delay >= 24);
            for other in &state.enemies[i + 1..] {
                assert!(!rect.overlaps(&other.tank.rect()));
            }
        }
    }

    #[test]
    fn test_start_wave_clears_only_enemy_bullets() {
        use crate::sim::state::{Bullet, BulletOwner};
        let mut state = GameState::new(2, Tuning::default(), GameMode::Solo, MapStyle::City);
        let (mine, theirs) = (Vec2::new(50.0, 50.0), Vec2::new(60.0, 50.0));
        state.bullets.push(Bullet::new(900, mine, 0.0, 5.0, BulletOwner::Player, 45.0));
        state.bullets.push(Bullet::new(901, theirs, 0.0, 3.0, BulletOwner::Enemy, 30.0));
        start_wave(&mut state, 2);
        assert_eq!(state.bullets.len(), 1);
        assert_eq!(state.bullets[0].owner, BulletOwner::Player);
    }

    #[test]
    fn test_obstacles_keep_spawn_and_corner_clear() {
        for map in [MapStyle::City, MapStyle::Forest, MapStyle::Desert, MapStyle::Maze] {
            for seed in 0..8 {
                let state = GameState::new(seed, Tuning::default(), GameMode::Online, map);
                let spawn = state.player.spawn_rect().inflate(20.0);
                let corner = Rect::new(0.0, 0.0, 120.0, 120.0);
                for (i, o) in state.obstacles.iter().enumerate() {
                    assert!(!o.rect.overlaps(&spawn));
                    assert!(!o.rect.overlaps(&corner));
                    assert!(state.bounds.contains_rect(&o.rect));
                    for other in &state.obstacles[i + 1..] {
                        assert!(!o.rect.overlaps(&other.rect));
                    }
                    if map == MapStyle::Maze {
                        assert!(!o.is_destructible());
                    }
                }
            }
        }
    }
}
