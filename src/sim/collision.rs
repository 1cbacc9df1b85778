//! Collision detection seam
//!
//! The simulation does not own geometry. Each tick it asks a
//! [`CollisionDetector`] for overlapping pairs and resolves them in the order
//! reported. [`CircleDetector`] is the reference implementation used by the
//! headless driver: every entity is a circle of a fixed radius.

use glam::Vec2;

use super::state::{EntityRef, GameState, ProjectileKind};
use crate::consts::*;
use crate::tuning::{EnemyKind, ObstacleKind};

/// One reported overlap
pub type Overlap = (EntityRef, EntityRef);

/// Source of per-tick overlap reports
pub trait CollisionDetector {
    fn detect(&mut self, state: &GameState) -> Vec<Overlap>;
}

/// Closures work as scripted detectors
impl<F> CollisionDetector for F
where
    F: FnMut(&GameState) -> Vec<Overlap>,
{
    fn detect(&mut self, state: &GameState) -> Vec<Overlap> {
        self(state)
    }
}

/// Reports nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCollisions;

impl CollisionDetector for NoCollisions {
    fn detect(&mut self, _state: &GameState) -> Vec<Overlap> {
        Vec::new()
    }
}

pub fn enemy_radius(kind: EnemyKind) -> f32 {
    match kind {
        EnemyKind::Small => 14.0,
        EnemyKind::Medium => 18.0,
        EnemyKind::Large => 26.0,
        EnemyKind::Sentinel => 18.0,
    }
}

pub fn obstacle_radius(kind: ObstacleKind) -> f32 {
    match kind {
        ObstacleKind::SmallAsteroid => 14.0,
        ObstacleKind::LargeAsteroid => 30.0,
        ObstacleKind::SpaceMine => 16.0,
    }
}

fn projectile_radius(kind: &ProjectileKind) -> f32 {
    match kind {
        ProjectileKind::HomingMissile { .. } => HOMING_RADIUS,
        _ => BULLET_RADIUS,
    }
}

#[inline]
fn overlaps(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    a.distance_squared(b) <= r * r
}

/// Circle-overlap detector over every pair combat cares about
#[derive(Debug, Clone, Copy, Default)]
pub struct CircleDetector;

impl CollisionDetector for CircleDetector {
    fn detect(&mut self, state: &GameState) -> Vec<Overlap> {
        let mut pairs = Vec::new();
        let boss = state.active_boss();

        for p in state.projectiles.iter().filter(|p| p.active) {
            let pr = projectile_radius(&p.kind);
            let shot = EntityRef::Projectile(p.id);

            if p.is_hostile() {
                if state.player.alive
                    && overlaps(p.pos, pr, state.player.pos, PLAYER_RADIUS)
                {
                    pairs.push((shot, EntityRef::Player));
                }
                continue;
            }

            for e in state.enemies.iter().filter(|e| e.active) {
                if overlaps(p.pos, pr, e.pos, enemy_radius(e.kind)) {
                    pairs.push((shot, EntityRef::Enemy(e.id)));
                }
            }
            if let Some(b) = boss {
                if overlaps(p.pos, pr, b.pos, BOSS_RADIUS) {
                    pairs.push((shot, EntityRef::Boss));
                }
            }
            for o in state.obstacles.iter().filter(|o| o.active) {
                if overlaps(p.pos, pr, o.pos, obstacle_radius(o.kind)) {
                    pairs.push((shot, EntityRef::Obstacle(o.id)));
                }
            }
        }

        if !state.player.alive {
            return pairs;
        }
        let player = state.player.pos;

        for e in state.enemies.iter().filter(|e| e.active) {
            if overlaps(player, PLAYER_RADIUS, e.pos, enemy_radius(e.kind)) {
                pairs.push((EntityRef::Player, EntityRef::Enemy(e.id)));
            }
        }
        for o in state.obstacles.iter().filter(|o| o.active) {
            if overlaps(player, PLAYER_RADIUS, o.pos, obstacle_radius(o.kind)) {
                pairs.push((EntityRef::Player, EntityRef::Obstacle(o.id)));
            }
        }
        if let Some(b) = boss {
            if overlaps(player, PLAYER_RADIUS, b.pos, BOSS_RADIUS) {
                pairs.push((EntityRef::Player, EntityRef::Boss));
            }
        }
        for u in state.power_ups.iter().filter(|u| u.active) {
            if overlaps(player, PLAYER_RADIUS, u.pos, POWERUP_RADIUS) {
                pairs.push((EntityRef::Player, EntityRef::PowerUp(u.id)));
            }
        }
        pairs
    }
}
