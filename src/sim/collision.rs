//! Collision detection and response for axis-aligned tanks, walls and bullets
//!
//! Tanks move one axis at a time. A combined diagonal step checked only after
//! the move lets a square clip a wall corner or cross a thin bar; resolving X
//! then Y keeps every tank out of every wall and inside the arena.

use glam::Vec2;

use super::rect::Rect;
use super::state::{Bullet, Obstacle, ObstacleKind};

/// What a tank does when a step would put it inside a wall
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallResponse {
    /// Stop flush against the wall (player)
    Slide,
    /// Stay put on that axis; caller reverses its patrol velocity (enemies)
    Bounce,
}

/// Which axes were blocked during a move
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AxisHits {
    pub x: bool,
    pub y: bool,
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    X,
    Y,
}

impl Axis {
    fn get(self, v: Vec2) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
        }
    }

    fn set(self, v: &mut Vec2, value: f32) {
        match self {
            Axis::X => v.x = value,
            Axis::Y => v.y = value,
        }
    }

    /// (min, max) extent of a rectangle along this axis
    fn span(self, r: &Rect) -> (f32, f32) {
        match self {
            Axis::X => (r.x, r.right()),
            Axis::Y => (r.y, r.bottom()),
        }
    }
}

fn overlaps_any(rect: &Rect, walls: &[Rect]) -> bool {
    walls.iter().any(|w| rect.overlaps(w))
}

/// Move one axis; returns true when the step was blocked
fn step_axis(
    pos: &mut Vec2,
    size: f32,
    delta: f32,
    axis: Axis,
    walls: &[Rect],
    bounds: &Rect,
    response: WallResponse,
) -> bool {
    if delta == 0.0 {
        return false;
    }

    let (lo, hi) = axis.span(bounds);
    let max = (hi - size).max(lo);
    let mut candidate = *pos;
    let raw = axis.get(*pos) + delta;
    let out_of_bounds = raw < lo || raw > max;
    axis.set(&mut candidate, raw.clamp(lo, max));

    let hit = walls
        .iter()
        .find(|w| Rect::square(candidate, size).overlaps(w))
        .copied();

    match (response, hit) {
        (WallResponse::Bounce, Some(_)) => true,
        (WallResponse::Bounce, None) if out_of_bounds => true,
        (WallResponse::Slide, Some(wall)) => {
            let (wall_lo, wall_hi) = axis.span(&wall);
            let flush = if delta > 0.0 { wall_lo - size } else { wall_hi };
            axis.set(&mut candidate, flush);
            let fits = flush >= lo
                && flush <= max
                && !overlaps_any(&Rect::square(candidate, size), walls);
            if fits {
                *pos = candidate;
            }
            true
        }
        (_, None) => {
            *pos = candidate;
            out_of_bounds
        }
    }
}

/// Move a square of side `size` by `delta`, X first then Y
///
/// Guarantees the square neither overlaps a wall nor leaves `bounds`,
/// provided it satisfied both on entry.
pub fn move_with_obstacles(
    pos: &mut Vec2,
    size: f32,
    delta: Vec2,
    walls: &[Rect],
    bounds: &Rect,
    response: WallResponse,
) -> AxisHits {
    let x = step_axis(pos, size, delta.x, Axis::X, walls, bounds, response);
    let y = step_axis(pos, size, delta.y, Axis::Y, walls, bounds, response);
    AxisHits { x, y }
}

/// Patrol move: blocked axes reverse the matching roam component
pub fn move_bouncing(pos: &mut Vec2, size: f32, roam: &mut Vec2, walls: &[Rect], bounds: &Rect) {
    let hits = move_with_obstacles(pos, size, *roam, walls, bounds, WallResponse::Bounce);
    if hits.x {
        roam.x = -roam.x;
    }
    if hits.y {
        roam.y = -roam.y;
    }
}

/// Outcome of checking a bullet against the arena edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsContact {
    Inside,
    /// Piercing bullet reflected back in (bounce already counted)
    Bounced,
    /// Bullet must be removed
    Escaped,
}

/// Count one bounce; false once the allowance is exhausted
pub fn register_bounce(bullet: &mut Bullet) -> bool {
    bullet.bounces += 1;
    bullet.bounces <= bullet.max_bounces
}

/// Keep piercing bullets in play by reflecting off the arena edge
pub fn bullet_vs_bounds(bullet: &mut Bullet, bounds: &Rect) -> BoundsContact {
    let out_x = bullet.pos.x < bounds.x || bullet.pos.x > bounds.right();
    let out_y = bullet.pos.y < bounds.y || bullet.pos.y > bounds.bottom();
    if !out_x && !out_y {
        return BoundsContact::Inside;
    }
    if !bullet.piercing {
        return BoundsContact::Escaped;
    }
    if out_x {
        bullet.pos.x = bullet.pos.x.clamp(bounds.x, bounds.right());
        bullet.vel.x = -bullet.vel.x;
    }
    if out_y {
        bullet.pos.y = bullet.pos.y.clamp(bounds.y, bounds.bottom());
        bullet.vel.y = -bullet.vel.y;
    }
    if register_bounce(bullet) {
        BoundsContact::Bounced
    } else {
        BoundsContact::Escaped
    }
}

/// Index of the first obstacle the bullet's hitbox overlaps
pub fn bullet_hits_wall(bullet: &Bullet, obstacles: &[Obstacle]) -> Option<usize> {
    let rect = bullet.rect();
    obstacles.iter().position(|o| rect.overlaps(&o.rect))
}

/// Reflect the velocity component that carried the bullet into `wall`
/// and put it back where it was before this tick's move
pub fn reflect_off_rect(bullet: &mut Bullet, prev_pos: Vec2, wall: &Rect) {
    let x_only = Rect::centered(Vec2::new(prev_pos.x, bullet.pos.y), bullet.size);
    let y_only = Rect::centered(Vec2::new(bullet.pos.x, prev_pos.y), bullet.size);
    if !x_only.overlaps(wall) {
        bullet.vel.x = -bullet.vel.x;
    } else if !y_only.overlaps(wall) {
        bullet.vel.y = -bullet.vel.y;
    } else {
        bullet.vel = -bullet.vel;
    }
    bullet.pos = prev_pos;
}

/// Apply one hit to a destructible obstacle; true if it should be removed
pub fn damage_obstacle(obstacle: &mut Obstacle, amount: f32) -> bool {
    match &mut obstacle.kind {
        ObstacleKind::Wall => false,
        ObstacleKind::Destructible { hp, .. } => {
            *hp -= amount;
            *hp <= 0.0
        }
    }
}
