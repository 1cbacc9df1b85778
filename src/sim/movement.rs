//! Movement and targeting
//!
//! Per-pattern velocity updates, integration, off-screen culling and the
//! nearest-target search shared by homing missiles and the laser.

use glam::Vec2;
use rand::Rng;

use super::events::{GameEvent, SoundCue};
use super::state::{EntityRef, GameState, ProjectileKind};
use super::tick::TickInput;
use super::waves;
use crate::consts::*;
use crate::tuning::{MovementPattern, ObstacleKind};
use crate::{bearing, normalize_angle, velocity_from_angle};

/// Nearest active enemy or boss to `from`.
///
/// Linear scan with a strict `<`, enemies first then the boss, so equal
/// distances go to whichever was found first.
pub fn nearest_target(state: &GameState, from: Vec2) -> Option<(EntityRef, Vec2)> {
    let mut best: Option<(EntityRef, Vec2)> = None;
    let mut best_dist = f32::INFINITY;

    for enemy in state.enemies.iter().filter(|e| e.active) {
        let d = from.distance(enemy.pos);
        if d < best_dist {
            best_dist = d;
            best = Some((EntityRef::Enemy(enemy.id), enemy.pos));
        }
    }
    if let Some(boss) = state.active_boss() {
        if from.distance(boss.pos) < best_dist {
            best = Some((EntityRef::Boss, boss.pos));
        }
    }
    best
}

/// Turn `current` toward `target` by at most `max_turn`, snapping when within reach
pub fn steer_toward(current: f32, target: f32, max_turn: f32) -> f32 {
    let diff = normalize_angle(target - current);
    if diff > max_turn {
        current + max_turn
    } else if diff < -max_turn {
        current - max_turn
    } else {
        target
    }
}

/// Eight-way player movement, clamped inside the arena
pub fn update_player(state: &mut GameState, input: &TickInput, dt_s: f32) {
    let speed = state.tuning.player.speed;
    let arena = state.tuning.arena;
    let player = &mut state.player;
    if !player.alive {
        player.vel = Vec2::ZERO;
        return;
    }

    let mut vel = Vec2::ZERO;
    if input.move_left {
        vel.x = -speed;
    } else if input.move_right {
        vel.x = speed;
    }
    if input.move_up {
        vel.y = -speed;
    } else if input.move_down {
        vel.y = speed;
    }
    player.vel = vel;

    let pad = PLAYER_EDGE_PADDING;
    player.pos += vel * dt_s;
    player.pos.x = player.pos.x.clamp(pad, (arena.width - pad).max(pad));
    player.pos.y = player.pos.y.clamp(pad, (arena.height - pad).max(pad));
}

/// Apply movement patterns, fire enemy guns and retire escaped enemies
pub fn update_enemies(state: &mut GameState, dt_ms: f32) {
    let now = state.time_ms;
    let dt_s = dt_ms / 1000.0;
    let behaviour = state.tuning.enemy_behaviour;
    let arena = state.tuning.arena;
    let bullet_speed = state.tuning.projectiles.enemy_bullet_speed;
    let player = state.player_target();

    let mut shots = Vec::new();
    let mut escaped = Vec::new();

    for enemy in state.enemies.iter_mut().filter(|e| e.active) {
        enemy.move_timer_ms += dt_ms;
        match enemy.pattern {
            MovementPattern::Straight | MovementPattern::Strafe => {}
            MovementPattern::Zigzag => {
                if enemy.move_timer_ms > behaviour.zigzag_period_ms {
                    enemy.zigzag_dir = -enemy.zigzag_dir;
                    enemy.move_timer_ms = 0.0;
                }
                enemy.vel.x = enemy.zigzag_dir * behaviour.zigzag_speed;
            }
            MovementPattern::Dive => match player {
                Some(target) if enemy.move_timer_ms > behaviour.dive_interval_ms => {
                    enemy.vel = velocity_from_angle(
                        bearing(enemy.pos, target),
                        enemy.base_speed * behaviour.dive_speed_multiplier,
                    );
                    enemy.move_timer_ms = 0.0;
                }
                _ if enemy.move_timer_ms < behaviour.dive_recover_ms => {
                    enemy.vel.y = enemy.base_speed;
                }
                _ => {}
            },
        }
        enemy.pos += enemy.vel * dt_s;

        if now - enemy.last_shot_ms >= behaviour.shoot_cooldown_ms as f64
            && enemy.shoot_chance > 0.0
            && state.rng.random::<f32>() < enemy.shoot_chance
        {
            enemy.last_shot_ms = now;
            shots.push(enemy.pos + Vec2::new(0.0, 20.0));
        }

        if enemy.pos.y > arena.height + ENEMY_ESCAPE_MARGIN
            || enemy.pos.x < -ENEMY_ESCAPE_MARGIN
            || enemy.pos.x > arena.width + ENEMY_ESCAPE_MARGIN
        {
            enemy.active = false;
            escaped.push(enemy.id);
        }
    }

    for muzzle in shots {
        state.spawn_projectile(
            ProjectileKind::EnemyBullet,
            muzzle,
            Vec2::new(0.0, bullet_speed),
        );
        state.emit(GameEvent::Sound(SoundCue::EnemyShot));
    }
    for id in escaped {
        log::debug!("Enemy {} escaped", id);
        waves::enemy_escaped(state);
    }
}

/// Move bullets and missiles; steer missiles; cull anything spent or off-screen
pub fn update_projectiles(state: &mut GameState, dt_ms: f32) {
    let now = state.time_ms;
    let dt_s = dt_ms / 1000.0;
    let arena = state.tuning.arena;
    let cfg = state.tuning.projectiles;

    for i in 0..state.projectiles.len() {
        if !state.projectiles[i].active {
            continue;
        }
        if let ProjectileKind::HomingMissile {
            travel_angle,
            spawned_at_ms,
        } = state.projectiles[i].kind
        {
            let pos = state.projectiles[i].pos;
            let out_of_bounds = pos.x < -HOMING_CULL_MARGIN
                || pos.x > arena.width + HOMING_CULL_MARGIN
                || pos.y < -HOMING_CULL_MARGIN
                || pos.y > arena.height + HOMING_CULL_MARGIN;
            if now - spawned_at_ms >= cfg.homing_lifespan_ms as f64 || out_of_bounds {
                state.projectiles[i].active = false;
                continue;
            }

            let angle = match nearest_target(state, pos) {
                Some((_, target)) => {
                    steer_toward(travel_angle, bearing(pos, target), cfg.homing_turn_rate)
                }
                None => travel_angle,
            };
            let missile = &mut state.projectiles[i];
            missile.kind = ProjectileKind::HomingMissile {
                travel_angle: angle,
                spawned_at_ms,
            };
            missile.vel = velocity_from_angle(angle, cfg.homing_speed);
        }

        let p = &mut state.projectiles[i];
        p.pos += p.vel * dt_s;
        let m = BULLET_CULL_MARGIN;
        match p.kind {
            ProjectileKind::PlayerBullet | ProjectileKind::EnemyBullet => {
                if p.pos.y < -m
                    || p.pos.y > arena.height + m
                    || p.pos.x < -m
                    || p.pos.x > arena.width + m
                {
                    p.active = false;
                }
            }
            ProjectileKind::HomingMissile { .. } => {}
        }
    }
}

/// Drift, spin and bob obstacles; drop them once they fall off the bottom
pub fn update_obstacles(state: &mut GameState, dt_s: f32) {
    let height = state.tuning.arena.height;
    for o in state.obstacles.iter_mut().filter(|o| o.active) {
        match o.kind {
            ObstacleKind::SmallAsteroid => o.pos += o.vel * dt_s,
            ObstacleKind::LargeAsteroid => {
                o.rotation += o.spin * dt_s;
                o.pos += o.vel * dt_s;
            }
            ObstacleKind::SpaceMine => {
                o.bob_timer_s += dt_s;
                o.pos.x = o.base_x
                    + (o.bob_timer_s * MINE_BOB_FREQUENCY * std::f32::consts::PI).sin()
                        * MINE_BOB_AMPLITUDE;
                o.pos.y += o.vel.y * dt_s;
            }
        }
        // Falling off the bottom awards nothing
        if o.pos.y > height + OBSTACLE_CULL_MARGIN {
            o.active = false;
        }
    }
}

/// Drift power-up capsules downward
pub fn update_power_ups(state: &mut GameState, dt_s: f32) {
    let height = state.tuning.arena.height;
    for p in state.power_ups.iter_mut().filter(|p| p.active) {
        p.pos += p.vel * dt_s;
        if p.pos.y > height + POWERUP_CULL_MARGIN {
            p.active = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::Enemy;
    use crate::tuning::{EnemyKind, Tuning};
    use std::f32::consts::{FRAC_PI_2, PI};

    fn add_enemy(state: &mut GameState, kind: EnemyKind, pos: Vec2) -> u32 {
        let tuning = state.tuning.clone();
        let spec = tuning.difficulty.apply(tuning.enemy_spec(kind).expect("spec"), 1);
        let id = state.next_entity_id();
        let mut enemy = Enemy::new(id, &spec, pos, Vec2::new(0.0, spec.speed));
        enemy.shoot_chance = 0.0;
        state.enemies.push(enemy);
        id
    }

    #[test]
    fn test_steer_snaps_within_turn_rate() {
        assert_eq!(steer_toward(0.0, 0.03, 0.05), 0.03);
        assert!((steer_toward(0.0, 1.0, 0.05) - 0.05).abs() < 1e-6);
        assert!((steer_toward(0.0, -1.0, 0.05) + 0.05).abs() < 1e-6);
        // Shorter way round across the ±π seam
        assert_eq!(steer_toward(PI - 0.01, -PI + 0.01, 0.05), -PI + 0.01);
        assert!((steer_toward(PI - 0.01, -PI + 0.5, 0.05) - (PI + 0.04)).abs() < 1e-5);
    }

    #[test]
    fn test_nearest_target_prefers_first_on_tie() {
        let mut state = GameState::new(1);
        let a = add_enemy(&mut state, EnemyKind::Small, Vec2::new(100.0, 100.0));
        let _b = add_enemy(&mut state, EnemyKind::Small, Vec2::new(300.0, 100.0));
        let from = Vec2::new(200.0, 100.0);
        assert_eq!(nearest_target(&state, from).map(|t| t.0), Some(EntityRef::Enemy(a)));
    }

    #[test]
    fn test_nearest_target_skips_inactive() {
        let mut state = GameState::new(1);
        let a = add_enemy(&mut state, EnemyKind::Small, Vec2::new(10.0, 10.0));
        let b = add_enemy(&mut state, EnemyKind::Small, Vec2::new(300.0, 300.0));
        state.enemies[0].active = false;
        assert_eq!(
            nearest_target(&state, Vec2::ZERO).map(|t| t.0),
            Some(EntityRef::Enemy(b))
        );
        assert_ne!(a, b);
    }

    #[test]
    fn test_player_clamped_to_arena() {
        let mut state = GameState::new(1);
        state.player.pos = Vec2::new(25.0, 500.0);
        let input = TickInput {
            move_left: true,
            move_right: true,
            ..Default::default()
        };
        update_player(&mut state, &input, 1.0);
        assert_eq!(state.player.pos.x, PLAYER_EDGE_PADDING);
        assert_eq!(state.player.vel.x, -300.0);
    }

    #[test]
    fn test_zigzag_flips_every_period() {
        let mut state = GameState::new(1);
        add_enemy(&mut state, EnemyKind::Medium, Vec2::new(400.0, 100.0));
        update_enemies(&mut state, 100.0);
        assert_eq!(state.enemies[0].vel.x, 100.0);
        for _ in 0..5 {
            update_enemies(&mut state, 100.0);
        }
        // 600 ms accumulated: flipped once
        assert_eq!(state.enemies[0].vel.x, -100.0);
    }

    #[test]
    fn test_dive_toward_player_after_interval() {
        let mut state = GameState::new(1);
        add_enemy(&mut state, EnemyKind::Large, Vec2::new(400.0, 100.0));
        state.enemies[0].move_timer_ms = 3000.0;
        update_enemies(&mut state, 16.0);
        let e = &state.enemies[0];
        assert!((e.vel.length() - 150.0).abs() < 1e-2);
        assert!((bearing(Vec2::ZERO, e.vel) - FRAC_PI_2).abs() < 1e-4);
        assert_eq!(e.move_timer_ms, 0.0);
    }

    #[test]
    fn test_dive_without_player_falls_straight() {
        let mut state = GameState::new(1);
        state.player.alive = false;
        add_enemy(&mut state, EnemyKind::Large, Vec2::new(400.0, 100.0));
        state.enemies[0].vel = Vec2::new(0.0, 10.0);
        update_enemies(&mut state, 100.0);
        assert_eq!(state.enemies[0].vel, Vec2::new(0.0, 75.0));
    }

    #[test]
    fn test_dive_keeps_sideways_drift_while_recovering() {
        let mut state = GameState::new(1);
        add_enemy(&mut state, EnemyKind::Large, Vec2::new(100.0, 100.0));
        state.enemies[0].move_timer_ms = 3000.0;
        update_enemies(&mut state, 16.0);
        let dive = state.enemies[0].vel;
        assert!(dive.x > 0.0);

        for _ in 0..10 {
            update_enemies(&mut state, 16.0);
            let e = &state.enemies[0];
            assert_eq!(e.vel.x, dive.x);
            assert_eq!(e.vel.y, 75.0);
        }
        // Past the recovery window the velocity is left alone
        state.enemies[0].move_timer_ms = 600.0;
        update_enemies(&mut state, 16.0);
        assert_eq!(state.enemies[0].vel, Vec2::new(dive.x, 75.0));
    }

    #[test]
    fn test_escape_counts_toward_wave() {
        let mut state = GameState::new(1);
        waves::begin_session(&mut state);
        for _ in 0..5 {
            waves::spawn_enemy(&mut state);
        }
        for e in state.enemies.iter_mut() {
            e.pos.y = 700.0;
            e.shoot_chance = 0.0;
        }
        update_enemies(&mut state, 16.0);
        assert_eq!(state.waves.enemies_escaped, 5);
        assert!(!state.waves.wave_active);
        // Escapes award nothing except the completion bonus
        assert_eq!(state.score.score(), 100);
        assert_eq!(state.score.combo(), 0);
    }

    #[test]
    fn test_homing_missile_expires_after_lifespan() {
        let mut tuning = Tuning::default();
        tuning.arena.height = 4000.0;
        let mut state = GameState::with_tuning(1, tuning, 0);
        state.spawn_projectile(
            ProjectileKind::HomingMissile {
                travel_angle: -FRAC_PI_2,
                spawned_at_ms: 0.0,
            },
            Vec2::new(400.0, 3000.0),
            Vec2::new(0.0, -200.0),
        );
        for _ in 0..49 {
            state.time_ms += 100.0;
            update_projectiles(&mut state, 100.0);
        }
        assert!(state.projectiles[0].active);
        state.time_ms += 100.0;
        update_projectiles(&mut state, 100.0);
        assert!(!state.projectiles[0].active);
    }

    #[test]
    fn test_homing_missile_turns_toward_target() {
        let mut state = GameState::new(1);
        add_enemy(&mut state, EnemyKind::Small, Vec2::new(600.0, 300.0));
        state.spawn_projectile(
            ProjectileKind::HomingMissile {
                travel_angle: -FRAC_PI_2,
                spawned_at_ms: 0.0,
            },
            Vec2::new(400.0, 300.0),
            Vec2::new(0.0, -200.0),
        );
        update_projectiles(&mut state, 16.0);
        let missile = &state.projectiles[0];
        match missile.kind {
            ProjectileKind::HomingMissile { travel_angle, .. } => {
                assert!((travel_angle - (-FRAC_PI_2 + 0.05)).abs() < 1e-5);
            }
            _ => panic!("expected missile"),
        }
        assert!((missile.vel.length() - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_power_up_culled_below_arena() {
        let mut state = GameState::new(1);
        state.spawn_power_up(crate::tuning::PowerUpKind::Shield, Vec2::new(100.0, 649.0));
        update_power_ups(&mut state, 0.1);
        assert!(!state.power_ups[0].active);
    }
}
