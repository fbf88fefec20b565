//! Fixed timestep simulation tick
//!
//! One call advances the run by exactly one frame. Step order is fixed and
//! later steps read what earlier steps wrote:
//!
//! 1. player movement (and dash)
//! 2. enemy AI
//! 3. timers
//! 4. aim, then fire
//! 5. bullets
//! 6. pickups
//! 7. particles
//! 8. wave progression
//! 9. tank contact damage
//! 10. multiplayer publish/ingest

use glam::Vec2;
use rand::Rng;
use serde::Deserialize;

use super::collision::{
    BoundsContact, WallResponse, bullet_hits_wall, bullet_vs_bounds, damage_obstacle,
    move_bouncing, move_with_obstacles, reflect_off_rect, register_bounce,
};
use super::rect::Rect;
use super::state::{
    Bullet, BulletOwner, GameEvent, GameMode, GamePhase, GameState, Pickup, PickupKind, tint,
};
use super::wave::{self, Placement, Surroundings};
use crate::angle_between;
use crate::consts::*;
use crate::net::Multiplayer;

/// How the player aims this tick
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Aim {
    /// Face a world-space point (desktop pointer)
    Pointer { x: f32, y: f32 },
    /// Face the movement direction; keep the last angle when idle (mobile)
    #[default]
    Movement,
}

/// Input commands for a single tick
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TickInput {
    /// Movement intent. Longer than 1 is normalised, shorter scales speed.
    pub move_dir: Vec2,
    pub aim: Aim,
    pub fire: bool,
    pub dash: bool,
    /// Pause toggle
    pub pause: bool,
    /// Wall clock (ms) for network cadence and staleness
    pub now_ms: f64,
}

/// Result of [`apply_damage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Invulnerable or already out of the game
    Ignored,
    Hurt,
    /// Lethal hit absorbed by a spare life
    LifeLost,
    /// Lethal hit with no lives left; the run is over
    Destroyed,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, mut net: Option<&mut Multiplayer>) {
    if input.pause {
        state.phase = match state.phase {
            GamePhase::Playing => GamePhase::Paused,
            GamePhase::Paused => GamePhase::Playing,
            GamePhase::GameOver => GamePhase::GameOver,
        };
    }

    match state.phase {
        GamePhase::Playing => {}
        GamePhase::Paused => {
            // Stay visible in the room while paused
            if let Some(net) = net {
                sync_network(state, net, input.now_ms);
            }
            return;
        }
        GamePhase::GameOver => return,
    }

    state.time_ticks += 1;
    let walls = state.wall_rects();

    // 1. Player movement
    if input.dash {
        start_dash(state);
    }
    let intent = movement_intent(input.move_dir);
    move_player(state, intent, &walls);

    // 2. Enemy AI
    update_enemies(state, &walls);

    // 3. Timers
    state.player.timers.tick_down();

    // 4. Aim, then fire along the new facing
    resolve_aim(state, input.aim, intent);
    if input.fire {
        try_fire(state, net.as_deref_mut(), input.now_ms);
    }

    // 5. Bullets
    if let Some(by) = update_bullets(state, net.as_deref_mut()) {
        end_run(state, net, by);
        return;
    }

    // 6. Pickups
    update_pickups(state, net.as_deref());

    // 7. Particles
    update_particles(state);

    // 8. Waves
    wave::handle_wave_progression(state);

    // 9. Tank contact
    if state.phase == GamePhase::Playing && tank_collisions(state) == DamageOutcome::Destroyed {
        end_run(state, net, None);
        return;
    }

    // 10. Multiplayer
    if let Some(net) = net {
        sync_network(state, net, input.now_ms);
    }
}

/// Online runs end by elimination: tell the room and pull our presence
fn end_run(state: &mut GameState, net: Option<&mut Multiplayer>, by: Option<String>) {
    if state.mode != GameMode::Online {
        return;
    }
    state.push_event(GameEvent::Eliminated { by: by.clone() });
    if let Some(net) = net {
        net.eliminate(state, by);
    }
}

fn sync_network(state: &mut GameState, net: &mut Multiplayer, now_ms: f64) {
    if let Err(err) = net.sync(state, now_ms) {
        log::warn!("Multiplayer step failed: {}", err);
    }
}

/// Clamp raw input to a unit-or-shorter vector
fn movement_intent(raw: Vec2) -> Vec2 {
    if !raw.is_finite() {
        return Vec2::ZERO;
    }
    if raw.length_squared() > 1.0 {
        raw.normalize()
    } else {
        raw
    }
}

fn move_player(state: &mut GameState, intent: Vec2, walls: &[Rect]) {
    let boost = if state.player.timers.dash_active > 0 {
        state.tuning.dash.speed_multiplier
    } else {
        1.0
    };
    let player = &mut state.player;
    player.heading = intent;
    let delta = intent * player.speed * boost;
    move_with_obstacles(
        &mut player.tank.pos,
        player.tank.size,
        delta,
        walls,
        &state.bounds,
        WallResponse::Slide,
    );
}

/// Begin a dash if it is off cooldown
pub fn start_dash(state: &mut GameState) -> bool {
    let dash = &state.tuning.dash;
    let timers = &mut state.player.timers;
    if timers.dash_cooldown > 0 || timers.dash_active > 0 {
        return false;
    }
    timers.dash_active = dash.duration;
    timers.dash_cooldown = dash.cooldown;
    timers.invulnerable = timers
        .invulnerable
        .max(dash.duration + dash.invulnerability_padding);
    state.push_event(GameEvent::DashStarted);
    true
}

fn update_enemies(state: &mut GameState, walls: &[Rect]) {
    let target = state.player.tank.center();
    let damage = state.tuning.damage.enemy_bullet;
    let mut shots = Vec::new();

    for enemy in &mut state.enemies {
        move_bouncing(
            &mut enemy.tank.pos,
            enemy.tank.size,
            &mut enemy.roam,
            walls,
            &state.bounds,
        );
        let centre = enemy.tank.center();
        enemy.tank.angle = angle_between(centre, target);

        if enemy.fire_cooldown > 0 {
            enemy.fire_cooldown -= 1;
        } else {
            shots.push((centre, enemy.tank.angle, enemy.bullet_speed));
            enemy.fire_cooldown = enemy.fire_delay;
        }
    }

    for (pos, angle, speed) in shots {
        let id = state.next_entity_id();
        state.bullets.push(Bullet::new(id, pos, angle, speed, BulletOwner::Enemy, damage));
        state.push_event(GameEvent::EnemyShot);
    }
}

fn resolve_aim(state: &mut GameState, aim: Aim, intent: Vec2) {
    let tank = &mut state.player.tank;
    match aim {
        Aim::Pointer { x, y } => {
            let target = Vec2::new(x, y);
            if target.is_finite() && target != tank.center() {
                tank.angle = angle_between(tank.center(), target);
            }
        }
        Aim::Movement => {
            if intent != Vec2::ZERO {
                tank.angle = intent.y.atan2(intent.x);
            }
        }
    }
}

/// Fire a player bullet if the gun is ready
pub fn try_fire(state: &mut GameState, net: Option<&mut Multiplayer>, now_ms: f64) -> bool {
    if state.player.timers.fire_cooldown > 0 {
        return false;
    }
    let tuning = &state.tuning.player;
    let speed = tuning.bullet_speed;
    let damage = tuning.bullet_damage;
    let cooldown = if state.player.timers.rapid_fire > 0 {
        tuning.rapid_fire_cooldown
    } else {
        tuning.fire_cooldown
    };

    let id = state.next_entity_id();
    let tank = &state.player.tank;
    let mut bullet = Bullet::new(id, tank.center(), tank.angle, speed, BulletOwner::Player, damage);
    if state.player.timers.pierce > 0 {
        bullet = bullet.piercing();
    }
    if let Some(net) = net {
        let pvp_damage = state.tuning.player.pvp_bullet_damage;
        bullet.net_id = Some(net.publish_shot(&bullet, pvp_damage, now_ms));
    }

    state.bullets.push(bullet);
    state.player.timers.fire_cooldown = cooldown;
    state.push_event(GameEvent::PlayerShot);
    true
}

/// Damage the local player, spending a life or ending the run on a lethal hit
pub fn apply_damage(state: &mut GameState, amount: f32) -> DamageOutcome {
    if state.phase == GamePhase::GameOver || state.player.timers.invulnerable > 0 {
        return DamageOutcome::Ignored;
    }

    state.player.tank.take_damage(amount);
    state.push_event(GameEvent::PlayerHit { amount });
    if !state.player.tank.is_destroyed() {
        return DamageOutcome::Hurt;
    }

    if state.player.lives > 0 {
        let player = &mut state.player;
        player.lives -= 1;
        player.tank.health = player.tank.max_health;
        player.tank.pos = player.spawn;
        player.timers.invulnerable = state.tuning.player.respawn_invulnerability;
        let lives_left = player.lives;
        state.clear_enemy_bullets();
        log::info!("Life lost, {} left", lives_left);
        state.push_event(GameEvent::LifeLost { lives_left });
        DamageOutcome::LifeLost
    } else {
        state.phase = GamePhase::GameOver;
        log::info!(
            "Game over: score {} on wave {}",
            state.score,
            state.wave.number
        );
        state.push_event(GameEvent::GameOver {
            score: state.score,
            wave: state.wave.number,
        });
        DamageOutcome::Destroyed
    }
}

/// Side effects gathered while bullets are detached from the state
#[derive(Debug, Default)]
struct BulletReport {
    remote_hits: Vec<(String, f32)>,
    /// Shot ids whose local bullet hit a remote, with the ticks it had left
    landed: Vec<(String, u32)>,
    retracted: Vec<String>,
    life_lost: bool,
    /// Set on a run-ending hit; inner value is the shooter, if remote
    killed_by: Option<Option<String>>,
}

fn update_bullets(state: &mut GameState, net: Option<&mut Multiplayer>) -> Option<Option<String>> {
    let remote_boxes = net
        .as_deref()
        .map(|n| n.remote_hitboxes(state.player.tank.size))
        .unwrap_or_default();

    let bullets = std::mem::take(&mut state.bullets);
    let mut survivors = Vec::with_capacity(bullets.len());
    let mut report = BulletReport::default();

    for mut bullet in bullets {
        if step_bullet(state, &mut bullet, &remote_boxes, &mut report) {
            survivors.push(bullet);
        } else if bullet.owner == BulletOwner::Player {
            if let Some(id) = bullet.net_id.take() {
                report.retracted.push(id);
            }
        }
    }

    // Anything fired during this step (none today) stays after the survivors
    survivors.append(&mut state.bullets);
    state.bullets = survivors;
    if report.life_lost {
        state.clear_enemy_bullets();
    }

    if let Some(net) = net {
        for (id, amount) in report.remote_hits {
            net.damage_remote(&id, amount);
        }
        for (id, ticks_left) in report.landed {
            net.shot_landed(id, ticks_left);
        }
        for id in report.retracted {
            net.retract_shot(&id);
        }
    }
    report.killed_by
}

/// Advance one bullet; false when it should be removed
fn step_bullet(
    state: &mut GameState,
    bullet: &mut Bullet,
    remote_boxes: &[(String, Rect)],
    report: &mut BulletReport,
) -> bool {
    bullet.life = bullet.life.saturating_sub(1);
    if bullet.life == 0 {
        return false;
    }

    let prev = bullet.pos;
    bullet.pos += bullet.vel;

    if bullet_vs_bounds(bullet, &state.bounds) == BoundsContact::Escaped {
        return false;
    }

    if let Some(index) = bullet_hits_wall(bullet, &state.obstacles) {
        if state.obstacles[index].is_destructible() {
            let hit = state.tuning.damage.obstacle_hit;
            state.emit_particles(bullet.pos, 6, tint::OBSTACLE_CHIP);
            if damage_obstacle(&mut state.obstacles[index], hit) {
                let obstacle = state.obstacles.remove(index);
                state.emit_particles(obstacle.rect.center(), 12, tint::OBSTACLE_RUBBLE);
                state.push_event(GameEvent::ObstacleDestroyed { id: obstacle.id });
            }
            return false;
        }
        if !bullet.piercing {
            return false;
        }
        let wall = state.obstacles[index].rect;
        reflect_off_rect(bullet, prev, &wall);
        return register_bounce(bullet);
    }

    match &bullet.owner {
        BulletOwner::Player => {
            if let Some(index) = state
                .enemies
                .iter()
                .position(|e| e.tank.rect().contains_point(bullet.pos))
            {
                let enemy = &mut state.enemies[index];
                enemy.tank.take_damage(bullet.damage);
                let destroyed = enemy.tank.is_destroyed();
                state.emit_particles(bullet.pos, 8, tint::PLAYER_SHOT_HIT);
                if destroyed {
                    destroy_enemy(state, index);
                }
                return bullet.piercing;
            }
            if let Some((id, _)) = remote_boxes
                .iter()
                .find(|(_, rect)| rect.contains_point(bullet.pos))
            {
                report.remote_hits.push((id.clone(), state.tuning.player.pvp_bullet_damage));
                state.emit_particles(bullet.pos, 8, tint::PVP_HIT);
                if bullet.piercing {
                    return true;
                }
                if let Some(id) = bullet.net_id.take() {
                    report.landed.push((id, bullet.life));
                }
                return false;
            }
        }
        BulletOwner::Enemy | BulletOwner::Remote(_) => {
            if state.player.tank.rect().contains_point(bullet.pos) {
                let color = if bullet.is_enemy() {
                    tint::ENEMY_SHOT_HIT
                } else {
                    tint::PVP_HIT
                };
                state.emit_particles(bullet.pos, 6, color);
                match apply_damage(state, bullet.damage) {
                    DamageOutcome::LifeLost => report.life_lost = true,
                    DamageOutcome::Destroyed => {
                        let shooter = match &bullet.owner {
                            BulletOwner::Remote(id) => Some(id.clone()),
                            _ => None,
                        };
                        report.killed_by = Some(shooter);
                    }
                    DamageOutcome::Hurt | DamageOutcome::Ignored => {}
                }
                return false;
            }
        }
    }
    true
}

/// Remove a dead enemy, score it, and maybe leave a pickup behind
fn destroy_enemy(state: &mut GameState, index: usize) {
    let enemy = state.enemies.remove(index);
    let centre = enemy.tank.center();
    state.score += u64::from(enemy.score_value);
    state.emit_particles(centre, 16, tint::ENEMY_WRECK);
    state.push_event(GameEvent::EnemyDestroyed {
        kind: enemy.kind,
        score: enemy.score_value,
    });

    let chance = state.tuning.pickups.enemy_drop_chance.clamp(0.0, 1.0);
    if state.rng.random_bool(chance) {
        let kind = random_pickup_kind(state);
        let pos = (centre - Vec2::splat(PICKUP_SIZE / 2.0)).clamp(
            Vec2::new(state.bounds.x, state.bounds.y),
            Vec2::new(state.bounds.right() - PICKUP_SIZE, state.bounds.bottom() - PICKUP_SIZE),
        );
        let id = state.next_entity_id();
        state.pickups.push(Pickup {
            id,
            kind,
            pos,
            size: PICKUP_SIZE,
        });
    }
}

fn random_pickup_kind(state: &mut GameState) -> PickupKind {
    PickupKind::ALL[state.rng.random_range(0..PickupKind::ALL.len())]
}

fn update_pickups(state: &mut GameState, net: Option<&Multiplayer>) {
    state.pickup_timer = state.pickup_timer.saturating_sub(1);
    if state.pickup_timer == 0 {
        spawn_pickup(state, net);
        let tuning = &state.tuning.pickups;
        let jitter = state.rng.random_range(0..tuning.interval_jitter_ticks.max(1));
        state.pickup_timer = tuning.interval_ticks + jitter;
    }

    let player_rect = state.player.tank.rect();
    let (taken, kept): (Vec<Pickup>, Vec<Pickup>) = std::mem::take(&mut state.pickups)
        .into_iter()
        .partition(|p| p.rect().overlaps(&player_rect));
    state.pickups = kept;
    for pickup in taken {
        apply_pickup(state, pickup.kind);
    }
}

/// Spawn one random pickup clear of walls and every tank; skipped if no room
pub fn spawn_pickup(state: &mut GameState, net: Option<&Multiplayer>) -> bool {
    let walls = state.wall_rects();
    let mut keep_away: Vec<Vec2> = state.enemies.iter().map(|e| e.tank.center()).collect();
    keep_away.push(state.player.tank.center());
    if let Some(net) = net {
        keep_away.extend(net.remote_centres(state.player.tank.size));
    }
    let occupied: Vec<Rect> = state.pickups.iter().map(|p| p.rect()).collect();
    let around = Surroundings {
        bounds: state.bounds,
        walls: &walls,
        occupied: &occupied,
        keep_away: &keep_away,
    };
    let placement = Placement {
        min_distance: state.tuning.pickups.safe_distance,
        max_attempts: state.tuning.pickups.placement_attempts,
    };

    let kind = random_pickup_kind(state);
    match wave::place_safely(&mut state.rng, PICKUP_SIZE, &around, placement) {
        Some(pos) => {
            let id = state.next_entity_id();
            state.pickups.push(Pickup {
                id,
                kind,
                pos,
                size: PICKUP_SIZE,
            });
            true
        }
        None => {
            log::debug!("No room for a pickup this cycle");
            false
        }
    }
}

/// Apply a collected pickup to the player
pub fn apply_pickup(state: &mut GameState, kind: PickupKind) {
    let tuning = &state.tuning.pickups;
    let player = &mut state.player;
    match kind {
        PickupKind::Health => {
            player.tank.heal(tuning.heal);
            player.lives += 1;
        }
        PickupKind::RapidFire => player.timers.rapid_fire = tuning.buff_ticks,
        PickupKind::Pierce => player.timers.pierce = tuning.buff_ticks,
    }
    state.push_event(GameEvent::PickupCollected { kind });
}

fn update_particles(state: &mut GameState) {
    for particle in state.particles.iter_mut() {
        particle.pos += particle.vel;
        particle.vel *= 0.96;
        particle.life -= 1.0;
    }
    state.particles.retain(|p| p.life > 0.0);
}

/// Contact damage from every enemy touching the player
fn tank_collisions(state: &mut GameState) -> DamageOutcome {
    let player_rect = state.player.tank.rect();
    let touching = state
        .enemies
        .iter()
        .filter(|e| e.tank.rect().overlaps(&player_rect))
        .count();
    let amount = state.tuning.damage.collision;
    let mut outcome = DamageOutcome::Ignored;
    for _ in 0..touching {
        outcome = apply_damage(state, amount);
        if outcome == DamageOutcome::Destroyed {
            break;
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Enemy, EnemyKind, Obstacle, ObstacleKind, Tank};
    use crate::tuning::{MapStyle, Tuning};
    use proptest::prelude::*;

    /// Online arena with no obstacles and no enemies
    fn empty_arena() -> GameState {
        let mut state = GameState::new(42, Tuning::default(), GameMode::Online, MapStyle::City);
        state.obstacles.clear();
        state.pickups.clear();
        state.pickup_timer = 10_000;
        state.player.timers.invulnerable = 0;
        state.drain_events();
        state
    }

    fn enemy_at(state: &mut GameState, pos: Vec2) -> Enemy {
        Enemy {
            id: state.next_entity_id(),
            kind: EnemyKind::Light,
            tank: Tank::new(pos, 26.0, 40.0),
            roam: Vec2::ZERO,
            bullet_speed: 4.0,
            fire_delay: 55,
            fire_cooldown: 10_000,
            score_value: 15,
        }
    }

    #[test]
    fn test_tick_pause() {
        let mut state = empty_arena();
        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut state, &pause, None);
        assert_eq!(state.phase, GamePhase::Paused);
        let before = state.time_ticks;
        tick(&mut state, &TickInput::default(), None);
        assert_eq!(state.time_ticks, before);

        tick(&mut state, &pause, None);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.time_ticks, before + 1);
    }

    #[test]
    fn test_bullet_advances_by_velocity() {
        let mut state = empty_arena();
        let angle = 0.7f32;
        let from = Vec2::new(400.0, 100.0);
        let bullet = Bullet::new(999, from, angle, 5.0, BulletOwner::Enemy, 30.0);
        let vel = bullet.vel;
        assert!((vel.x - angle.cos() * 5.0).abs() < 1e-5);
        assert!((vel.y - angle.sin() * 5.0).abs() < 1e-5);
        state.bullets.push(bullet);

        tick(&mut state, &TickInput::default(), None);
        let b = state.bullets.iter().find(|b| b.id == 999).unwrap();
        assert_eq!(b.pos, Vec2::new(400.0, 100.0) + vel);
        assert_eq!(b.vel, vel);
    }

    #[test]
    fn test_player_moves_and_normalises_diagonal() {
        let mut state = empty_arena();
        let start = state.player.tank.pos;
        let input = TickInput {
            move_dir: Vec2::new(1.0, 1.0),
            ..Default::default()
        };
        tick(&mut state, &input, None);
        let moved = state.player.tank.pos - start;
        assert!((moved.length() - state.player.speed).abs() < 1e-4);
        assert!((state.player.tank.angle - std::f32::consts::FRAC_PI_4).abs() < 1e-5);
    }

    #[test]
    fn test_pointer_aim_then_fire() {
        let mut state = empty_arena();
        let centre = state.player.tank.center();
        let input = TickInput {
            aim: Aim::Pointer {
                x: centre.x,
                y: centre.y + 100.0,
            },
            fire: true,
            ..Default::default()
        };
        tick(&mut state, &input, None);
        assert_eq!(state.bullets.len(), 1);
        let b = &state.bullets[0];
        assert!(b.vel.x.abs() < 1e-4);
        assert!(b.vel.y > 0.0);
        assert_eq!(state.player.timers.fire_cooldown, 12);
        assert!(state.drain_events().contains(&GameEvent::PlayerShot));

        // Cooldown blocks the next shot
        tick(&mut state, &input, None);
        assert_eq!(state.bullets.len(), 1);
    }

    #[test]
    fn test_rapid_fire_and_pierce_buffs() {
        let mut state = empty_arena();
        apply_pickup(&mut state, PickupKind::RapidFire);
        apply_pickup(&mut state, PickupKind::Pierce);
        assert!(try_fire(&mut state, None, 0.0));
        assert_eq!(state.player.timers.fire_cooldown, 6);
        assert!(state.bullets[0].piercing);
        assert_eq!(state.bullets[0].max_bounces, PIERCING_MAX_BOUNCES);
    }

    #[test]
    fn test_health_pickup_adds_life() {
        let mut state = empty_arena();
        state.player.tank.health = 90.0;
        let lives = state.player.lives;
        apply_pickup(&mut state, PickupKind::Health);
        assert_eq!(state.player.tank.health, 100.0);
        assert_eq!(state.player.lives, lives + 1);
    }

    #[test]
    fn test_pickup_consumed_on_overlap() {
        let mut state = empty_arena();
        let pos = state.player.tank.pos + Vec2::splat(4.0);
        state.pickups.push(Pickup {
            id: 500,
            kind: PickupKind::Pierce,
            pos,
            size: PICKUP_SIZE,
        });
        tick(&mut state, &TickInput::default(), None);
        assert!(state.pickups.is_empty());
        assert!(state.player.timers.pierce > 0);
    }

    #[test]
    fn test_dash() {
        let mut state = empty_arena();
        assert!(start_dash(&mut state));
        assert_eq!(state.player.timers.dash_active, 14);
        assert_eq!(state.player.timers.dash_cooldown, 160);
        assert_eq!(state.player.timers.invulnerable, 18);
        assert!(!start_dash(&mut state));

        let start = state.player.tank.pos;
        let input = TickInput {
            move_dir: Vec2::new(1.0, 0.0),
            ..Default::default()
        };
        tick(&mut state, &input, None);
        assert!((state.player.tank.pos.x - start.x - 3.0 * 2.4).abs() < 1e-4);
    }

    #[test]
    fn test_lethal_hit_spends_life() {
        let mut state = empty_arena();
        state.player.lives = 1;
        state.player.tank.health = 10.0;
        state.player.tank.pos += Vec2::new(50.0, 20.0);
        state
            .bullets
            .push(Bullet::new(700, Vec2::new(600.0, 50.0), 0.0, 3.0, BulletOwner::Enemy, 30.0));
        state
            .bullets
            .push(Bullet::new(701, Vec2::new(600.0, 90.0), 0.0, 5.0, BulletOwner::Player, 45.0));

        assert_eq!(apply_damage(&mut state, 30.0), DamageOutcome::LifeLost);
        assert_eq!(state.player.lives, 0);
        assert_eq!(state.player.tank.health, state.player.tank.max_health);
        assert_eq!(state.player.timers.invulnerable, 60);
        assert_eq!(state.player.tank.pos, state.player.spawn);
        assert!(state.bullets.iter().all(|b| !b.is_enemy()));
        assert_eq!(state.bullets.len(), 1);
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_last_life_ends_run() {
        let mut state = empty_arena();
        state.player.lives = 0;
        state.player.tank.health = 5.0;
        state.score = 120;
        assert_eq!(apply_damage(&mut state, 30.0), DamageOutcome::Destroyed);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(state.drain_events().contains(&GameEvent::GameOver { score: 120, wave: 1 }));

        // Terminal: nothing advances
        let ticks = state.time_ticks;
        tick(&mut state, &TickInput::default(), None);
        assert_eq!(state.time_ticks, ticks);
    }

    #[test]
    fn test_invulnerability_blocks_damage() {
        let mut state = empty_arena();
        state.player.timers.invulnerable = 5;
        assert_eq!(apply_damage(&mut state, 30.0), DamageOutcome::Ignored);
        assert_eq!(state.player.tank.health, 100.0);
    }

    #[test]
    fn test_player_bullet_kills_enemy() {
        let mut state = empty_arena();
        let enemy = enemy_at(&mut state, Vec2::new(600.0, 300.0));
        state.enemies.push(enemy);
        state.tuning.pickups.enemy_drop_chance = 1.0;
        // One step short of the enemy's left edge
        state
            .bullets
            .push(Bullet::new(800, Vec2::new(597.0, 310.0), 0.0, 5.0, BulletOwner::Player, 45.0));

        tick(&mut state, &TickInput::default(), None);
        assert!(state.enemies.is_empty());
        assert_eq!(state.score, 15);
        assert!(state.bullets.iter().all(|b| b.id != 800));
        assert_eq!(state.pickups.len(), 1);
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::EnemyDestroyed {
            kind: EnemyKind::Light,
            score: 15
        }));
    }

    #[test]
    fn test_piercing_bullet_passes_through_enemy() {
        let mut state = empty_arena();
        let mut enemy = enemy_at(&mut state, Vec2::new(600.0, 300.0));
        enemy.tank = Tank::new(enemy.tank.pos, 26.0, 500.0);
        state.enemies.push(enemy);
        let from = Vec2::new(597.0, 310.0);
        state.bullets.push(Bullet::new(801, from, 0.0, 5.0, BulletOwner::Player, 45.0).piercing());
        tick(&mut state, &TickInput::default(), None);
        assert!(state.bullets.iter().any(|b| b.id == 801));
        assert!(state.enemies[0].tank.health < 500.0);
    }

    #[test]
    fn test_destructible_obstacle_absorbs_bullets() {
        let mut state = empty_arena();
        state.obstacles.push(Obstacle {
            id: 77,
            rect: Rect::new(600.0, 300.0, 40.0, 40.0),
            kind: ObstacleKind::Destructible { hp: 35.0, max_hp: 35.0 },
        });
        let from = Vec2::new(595.0, 320.0);
        state.bullets.push(Bullet::new(802, from, 0.0, 5.0, BulletOwner::Player, 45.0).piercing());
        tick(&mut state, &TickInput::default(), None);
        assert!(state.bullets.is_empty());
        assert!(state.obstacles.is_empty());
        assert!(state.drain_events().contains(&GameEvent::ObstacleDestroyed { id: 77 }));
    }

    #[test]
    fn test_piercing_bullet_bounces_off_wall_until_allowance() {
        let mut state = empty_arena();
        state.obstacles.push(Obstacle {
            id: 78,
            rect: Rect::new(600.0, 300.0, 40.0, 40.0),
            kind: ObstacleKind::Wall,
        });
        let from = Vec2::new(595.0, 320.0);
        let mut bullet = Bullet::new(803, from, 0.0, 5.0, BulletOwner::Player, 45.0).piercing();
        bullet.bounces = PIERCING_MAX_BOUNCES - 1;
        state.bullets.push(bullet);

        tick(&mut state, &TickInput::default(), None);
        let b = state.bullets.iter().find(|b| b.id == 803).unwrap();
        assert_eq!(b.vel, Vec2::new(-5.0, 0.0));
        assert_eq!(b.bounces, PIERCING_MAX_BOUNCES);

        // Exhausted: the next would-be bounce removes it
        state.bullets[0].vel = Vec2::new(5.0, 0.0);
        tick(&mut state, &TickInput::default(), None);
        assert!(state.bullets.is_empty());
    }

    #[test]
    fn test_contact_damage() {
        let mut state = empty_arena();
        let pos = state.player.tank.pos + Vec2::new(10.0, 0.0);
        let enemy = enemy_at(&mut state, pos);
        state.enemies.push(enemy);
        tick(&mut state, &TickInput::default(), None);
        assert_eq!(state.player.tank.health, 60.0);
    }

    #[test]
    fn test_enemy_fires_when_cooldown_expires() {
        let mut state = empty_arena();
        let mut enemy = enemy_at(&mut state, Vec2::new(700.0, 100.0));
        enemy.fire_cooldown = 0;
        state.enemies.push(enemy);
        tick(&mut state, &TickInput::default(), None);
        assert_eq!(state.enemies[0].fire_cooldown, 55);
        assert_eq!(state.bullets.iter().filter(|b| b.is_enemy()).count(), 1);
        assert!(state.drain_events().contains(&GameEvent::EnemyShot));
    }

    #[test]
    fn test_pickup_timer_spawns() {
        let mut state = empty_arena();
        state.pickup_timer = 1;
        tick(&mut state, &TickInput::default(), None);
        assert_eq!(state.pickups.len(), 1);
        assert!(state.pickup_timer >= 360 && state.pickup_timer < 540);
        let p = &state.pickups[0];
        assert!(p.rect().center().distance(state.player.tank.center()) >= 80.0);
    }

    #[test]
    fn test_determinism() {
        let mut a = GameState::new(99, Tuning::default(), GameMode::Solo, MapStyle::Forest);
        let mut b = GameState::new(99, Tuning::default(), GameMode::Solo, MapStyle::Forest);
        let input = TickInput {
            move_dir: Vec2::new(0.3, -1.0),
            fire: true,
            ..Default::default()
        };
        for _ in 0..300 {
            tick(&mut a, &input, None);
            tick(&mut b, &input, None);
        }
        assert_eq!(a.time_ticks, b.time_ticks);
        assert_eq!(a.score, b.score);
        assert_eq!(a.enemies.len(), b.enemies.len());
        assert_eq!(a.player.tank.pos, b.player.tank.pos);
    }

    fn arb_input() -> impl Strategy<Value = TickInput> {
        (-1.5f32..1.5, -1.5f32..1.5, any::<bool>(), any::<bool>()).prop_map(|(x, y, fire, dash)| {
            TickInput {
                move_dir: Vec2::new(x, y),
                fire,
                dash,
                ..Default::default()
            }
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_tanks_stay_in_bounds_and_out_of_walls(
            seed in 0u64..1000,
            inputs in prop::collection::vec(arb_input(), 1..200),
        ) {
            let mut state = GameState::new(seed, Tuning::default(), GameMode::Solo, MapStyle::Maze);
            for input in &inputs {
                tick(&mut state, input, None);
                let walls = state.wall_rects();
                let tanks = std::iter::once(&state.player.tank)
                    .chain(state.enemies.iter().map(|e| &e.tank));
                for tank in tanks {
                    let rect = tank.rect();
                    prop_assert!(state.bounds.contains_rect(&rect));
                    prop_assert!(!walls.iter().any(|w| rect.overlaps(w)));
                    prop_assert!(tank.health >= 0.0 && tank.health <= tank.max_health);
                }
                if state.phase == GamePhase::GameOver {
                    break;
                }
            }
        }
    }
}
