//! Combat resolution
//!
//! Damage, deaths, pickups and player weapons. Every death runs through a
//! claim on the entity's active flag, so overlapping reports in one tick
//! cannot award or count a kill twice.

use glam::Vec2;
use rand::Rng;
use rand::seq::IndexedRandom;

use super::events::{GameEvent, SoundCue};
use super::movement::nearest_target;
use super::state::{
    ActivePowerUp, Damageable, EntityId, EntityRef, GameState, ProjectileKind,
};
use super::timers::{TimerHandle, TimerTask};
use super::{boss, waves};
use crate::consts::*;
use crate::tuning::{EnemyKind, PowerUpKind};

/// Result of applying damage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Target missing or already dead
    Ignored,
    Damaged,
    Killed,
}

/// Decrement health and raise the flash. Returns the outcome and any stale flash timer.
fn strike<D: Damageable>(target: &mut D, amount: i32) -> (HitOutcome, Option<TimerHandle>) {
    if !target.is_active() {
        return (HitOutcome::Ignored, None);
    }
    target.health_mut().take(amount);
    let flash = target.flash_mut();
    flash.on = true;
    let stale = flash.timer.take();
    if target.health().is_depleted() {
        target.deactivate();
        (HitOutcome::Killed, stale)
    } else {
        (HitOutcome::Damaged, stale)
    }
}

/// Take the death of a live entity. False if it was already dead.
fn claim<D: Damageable>(target: &mut D) -> bool {
    if target.is_active() {
        target.deactivate();
        true
    } else {
        false
    }
}

/// Apply `amount` damage to an enemy, the boss or an obstacle
pub fn apply_damage(state: &mut GameState, target: EntityRef, amount: i32) -> HitOutcome {
    let (outcome, stale) = match target {
        EntityRef::Enemy(id) => match state.enemies.iter_mut().find(|e| e.id == id) {
            Some(e) => strike(e, amount),
            None => return HitOutcome::Ignored,
        },
        EntityRef::Boss => match state.boss.as_mut() {
            Some(b) => strike(b, amount),
            None => return HitOutcome::Ignored,
        },
        EntityRef::Obstacle(id) => match state.obstacles.iter_mut().find(|o| o.id == id) {
            Some(o) => strike(o, amount),
            None => return HitOutcome::Ignored,
        },
        _ => return HitOutcome::Ignored,
    };
    if outcome == HitOutcome::Ignored {
        return outcome;
    }
    if let Some(handle) = stale {
        state.timers.cancel(handle);
    }

    if outcome == HitOutcome::Damaged {
        let flash_ms = if target == EntityRef::Boss { BOSS_FLASH_MS } else { FLASH_MS };
        let now = state.time_ms;
        let handle = state.timers.schedule(now, flash_ms, TimerTask::FlashRevert(target));
        if let Some(flash) = flash_of(state, target) {
            flash.timer = Some(handle);
        }
    }

    if target == EntityRef::Boss && outcome == HitOutcome::Damaged {
        let tuning = &state.tuning;
        if let Some(phase) = state.boss.as_mut().and_then(|b| b.refresh_phase(tuning)) {
            boss::announce_phase(state, phase);
        }
    }

    if outcome == HitOutcome::Killed {
        match target {
            EntityRef::Enemy(id) => enemy_died(state, id),
            EntityRef::Boss => boss_died(state),
            EntityRef::Obstacle(id) => obstacle_died(state, id),
            _ => {}
        }
    }
    outcome
}

fn flash_of(state: &mut GameState, target: EntityRef) -> Option<&mut super::state::Flash> {
    match target {
        EntityRef::Enemy(id) => state.enemy_mut(id).map(|e| &mut e.flash),
        EntityRef::Boss => state.boss.as_mut().map(|b| &mut b.flash),
        EntityRef::Obstacle(id) => state.obstacle_mut(id).map(|o| &mut o.flash),
        _ => None,
    }
}

/// Damage flash timer ran out
pub fn revert_flash(state: &mut GameState, target: EntityRef) {
    if let Some(flash) = flash_of(state, target) {
        flash.on = false;
        flash.timer = None;
    }
}

/// Destroy an entity outright (contact kills). Idempotent.
pub fn kill(state: &mut GameState, target: EntityRef) -> bool {
    let claimed = match target {
        EntityRef::Enemy(id) => state.enemy_mut(id).is_some_and(claim),
        EntityRef::Boss => state.boss.as_mut().is_some_and(claim),
        EntityRef::Obstacle(id) => state.obstacle_mut(id).is_some_and(claim),
        _ => false,
    };
    if !claimed {
        return false;
    }
    match target {
        EntityRef::Enemy(id) => enemy_died(state, id),
        EntityRef::Boss => boss_died(state),
        EntityRef::Obstacle(id) => obstacle_died(state, id),
        _ => {}
    }
    true
}

fn enemy_died(state: &mut GameState, id: EntityId) {
    let Some((pos, score, kind)) = state
        .enemies
        .iter()
        .find(|e| e.id == id)
        .map(|e| (e.pos, e.score, e.kind))
    else {
        return;
    };

    state.score.increase_combo();
    let points = state.score.add_score(score);
    let mult = state.score.multiplier();
    let text = if mult > 1 {
        format!("+{} x{}", points, mult)
    } else {
        format!("+{}", points)
    };
    state.floating_text(pos, text, COLOR_SCORE);
    if kind == EnemyKind::Large {
        state.shake(200.0, 0.02);
    }
    state.emit(GameEvent::Sound(SoundCue::Explosion));
    state.emit_score();

    waves::enemy_destroyed(state);
    roll_power_up_drop(state, pos);
}

fn boss_died(state: &mut GameState) {
    let Some((pos, score, wave)) = state.boss.as_ref().map(|b| (b.pos, b.score, b.wave)) else {
        return;
    };

    state.score.increase_combo();
    let points = state.score.add_score(score);
    state.floating_text(pos, format!("+{}", points), COLOR_SCORE);
    state.floating_text(pos - Vec2::new(0.0, 40.0), "BOSS DEFEATED!", COLOR_INFO);
    state.shake(500.0, 0.05);
    state.emit(GameEvent::Sound(SoundCue::Explosion));
    state.emit(GameEvent::Sound(SoundCue::StopMusic));
    state.emit_score();

    // Guaranteed drop
    if let Some(&kind) = PowerUpKind::ALL.choose(&mut state.rng) {
        state.spawn_power_up(kind, pos);
    }

    let signal = state.waves.boss_defeated(&state.tuning.waves);
    waves::apply_signal(state, signal);

    if let Some(handle) = state.boss.take().and_then(|b| b.flash.timer) {
        state.timers.cancel(handle);
    }
    let now = state.time_ms;
    let delay = state.tuning.waves.victory_delay_ms;
    state.timers.schedule(now, delay, TimerTask::ShowVictory);
    log::info!("Boss for wave {} destroyed", wave);
}

fn obstacle_died(state: &mut GameState, id: EntityId) {
    let Some((pos, score)) = state
        .obstacles
        .iter()
        .find(|o| o.id == id)
        .map(|o| (o.pos, o.score))
    else {
        return;
    };
    // Score, but no combo
    let points = state.score.add_score(score);
    state.floating_text(pos, format!("+{}", points), COLOR_SCORE);
    state.emit(GameEvent::Sound(SoundCue::Explosion));
    state.emit_score();
}

/// Drop a random power-up with the configured chance
pub fn roll_power_up_drop(state: &mut GameState, pos: Vec2) {
    if state.rng.random::<f32>() >= state.tuning.power_ups.drop_chance {
        return;
    }
    if let Some(&kind) = PowerUpKind::ALL.choose(&mut state.rng) {
        log::debug!("Dropped {:?}", kind);
        state.spawn_power_up(kind, pos);
    }
}

/// One hit on the player: god mode ignores it, a shield absorbs it, otherwise a life goes
pub fn player_take_damage(state: &mut GameState) {
    if !state.player.alive || state.player.god_mode {
        return;
    }
    if state.player.has_shield() {
        clear_power_up(state);
        return;
    }

    state.player.lives = state.player.lives.saturating_sub(1);
    let lives = state.player.lives;
    state.emit(GameEvent::LivesChanged { lives });
    state.emit(GameEvent::Sound(SoundCue::Hit));
    state.shake(300.0, 0.03);

    if lives == 0 {
        player_died(state);
    }
}

fn player_died(state: &mut GameState) {
    if !state.player.alive {
        return;
    }
    state.player.alive = false;
    state.player.vel = Vec2::ZERO;
    clear_power_up(state);
    state.emit(GameEvent::Sound(SoundCue::StopMusic));
    state.emit(GameEvent::Sound(SoundCue::PlayerDestroyed));

    let now = state.time_ms;
    let delay = state.tuning.waves.game_over_delay_ms;
    state.timers.schedule(now, delay, TimerTask::ShowGameOver);
    log::info!(
        "Player destroyed on wave {} with score {}",
        state.waves.current_wave,
        state.score.score()
    );
}

/// Replace any held power-up with `kind` and start its duration
pub fn activate_power_up(state: &mut GameState, kind: PowerUpKind) {
    clear_power_up(state);
    let now = state.time_ms;
    let duration = state.tuning.power_ups.duration_ms;
    let timer = state.timers.schedule(now, duration, TimerTask::PowerUpExpire);
    state.player.shot_counter = 0;
    state.player.power_up = Some(ActivePowerUp {
        kind,
        expires_at_ms: now + duration as f64,
        timer,
    });
    state.emit(GameEvent::PowerUpChanged { active: Some(kind) });
}

/// Drop the held power-up (expiry, shield break, death)
pub fn clear_power_up(state: &mut GameState) {
    state.player.laser_accumulator = 0.0;
    if let Some(held) = state.player.power_up.take() {
        state.timers.cancel(held.timer);
        state.emit(GameEvent::PowerUpChanged { active: None });
    }
}

/// Player touched a power-up capsule
pub fn collect_power_up(state: &mut GameState, id: EntityId) -> bool {
    if !state.player.alive {
        return false;
    }
    let Some(power_up) = state.power_ups.iter_mut().find(|p| p.id == id && p.active) else {
        return false;
    };
    power_up.active = false;
    let (kind, pos) = (power_up.kind, power_up.pos);

    state.score.add_flat_score(state.tuning.power_ups.pickup_score);
    activate_power_up(state, kind);
    let color = if kind == PowerUpKind::Overclock { COLOR_ALERT } else { COLOR_INFO };
    state.floating_text(pos, format!("+{}", kind.label()), color);
    state.emit(GameEvent::Sound(SoundCue::PowerUp));
    state.emit_score();
    true
}

/// Resolve one overlap reported by the collision detector. Order of the pair does not matter.
pub fn resolve_overlap(state: &mut GameState, a: EntityRef, b: EntityRef) {
    use EntityRef::*;

    match (a, b) {
        (Projectile(p), target @ (Enemy(_) | Boss | Obstacle(_)))
        | (target @ (Enemy(_) | Boss | Obstacle(_)), Projectile(p)) => {
            bullet_hits(state, p, target);
        }
        (Projectile(p), Player) | (Player, Projectile(p)) => {
            let hostile = state.projectile(p).is_some_and(|b| b.active && b.is_hostile());
            if hostile && state.player.alive {
                deactivate_projectile(state, p);
                player_take_damage(state);
            }
        }
        (Player, Enemy(id)) | (Enemy(id), Player) => {
            if state.player.alive && state.position_of(Enemy(id)).is_some() {
                player_take_damage(state);
                kill(state, Enemy(id));
            }
        }
        (Player, Obstacle(id)) | (Obstacle(id), Player) => {
            if state.player.alive && state.position_of(Obstacle(id)).is_some() {
                player_take_damage(state);
                kill(state, Obstacle(id));
            }
        }
        (Player, Boss) | (Boss, Player) => {
            if state.player.alive && state.active_boss().is_some() {
                player_take_damage(state);
            }
        }
        (Player, PowerUp(id)) | (PowerUp(id), Player) => {
            collect_power_up(state, id);
        }
        _ => {}
    }
}

fn bullet_hits(state: &mut GameState, projectile: EntityId, target: EntityRef) {
    let Some(bullet) = state.projectile(projectile).filter(|b| b.active && !b.is_hostile()) else {
        return;
    };
    let damage = bullet.damage();
    if state.position_of(target).is_none() {
        return;
    }
    deactivate_projectile(state, projectile);
    state.emit(GameEvent::Sound(SoundCue::Hit));
    apply_damage(state, target, damage);
}

fn deactivate_projectile(state: &mut GameState, id: EntityId) {
    if let Some(p) = state.projectiles.iter_mut().find(|p| p.id == id) {
        p.active = false;
    }
}

/// Discrete player shots, gated by fire rate. The laser replaces them.
pub fn fire_player_weapons(state: &mut GameState, fire: bool) {
    let player = &state.player;
    let held = player.power_up_kind();
    if !fire || !player.alive || held == Some(PowerUpKind::LaserBeam) {
        return;
    }
    let now = state.time_ms;
    if now <= player.next_fire_ms {
        return;
    }

    let cfg = state.tuning.projectiles;
    let base_rate = state.tuning.player.fire_rate_ms;
    let rate = if held.is_some_and(|k| k.is_rapid()) { base_rate / 2.0 } else { base_rate };
    state.player.next_fire_ms = now + rate as f64;

    let origin = state.player.pos;
    let up = Vec2::new(0.0, -cfg.bullet_speed);
    let bullet = ProjectileKind::PlayerBullet;
    match held {
        Some(PowerUpKind::SpreadShot) | Some(PowerUpKind::Overclock) => {
            state.spawn_projectile(bullet, origin + Vec2::new(0.0, -20.0), up);
            state.spawn_projectile(
                bullet,
                origin + Vec2::new(-15.0, -15.0),
                up + Vec2::new(-cfg.spread_side_vx, 0.0),
            );
            state.spawn_projectile(
                bullet,
                origin + Vec2::new(15.0, -15.0),
                up + Vec2::new(cfg.spread_side_vx, 0.0),
            );
        }
        Some(PowerUpKind::HomingMissile) => {
            state.spawn_projectile(bullet, origin + Vec2::new(0.0, -20.0), up);
            state.player.shot_counter += 1;
            if state.player.shot_counter >= cfg.homing_fire_interval {
                state.player.shot_counter = 0;
                state.spawn_projectile(
                    ProjectileKind::HomingMissile {
                        travel_angle: -std::f32::consts::FRAC_PI_2,
                        spawned_at_ms: now,
                    },
                    origin + Vec2::new(0.0, -20.0),
                    Vec2::new(0.0, -cfg.homing_speed),
                );
            }
        }
        Some(PowerUpKind::BackShooter) => {
            state.spawn_projectile(bullet, origin + Vec2::new(0.0, -20.0), up);
            state.spawn_projectile(bullet, origin + Vec2::new(0.0, 20.0), -up);
        }
        _ => {
            state.spawn_projectile(bullet, origin + Vec2::new(0.0, -20.0), up);
        }
    }
    state.emit(GameEvent::Sound(SoundCue::PlayerShot));
}

/// Continuous laser damage on the nearest target while fire is held
pub fn update_laser(state: &mut GameState, fire: bool, dt_ms: f32) {
    if !fire
        || !state.player.alive
        || state.player.power_up_kind() != Some(PowerUpKind::LaserBeam)
    {
        return;
    }
    let from = state.player.pos;
    let Some((target, to)) = nearest_target(state, from) else {
        return;
    };
    state.emit(GameEvent::LaserBeam { from, to });

    state.player.laser_accumulator += state.tuning.projectiles.laser_dps * dt_ms / 1000.0;
    if state.player.laser_accumulator >= 1.0 {
        let damage = state.player.laser_accumulator.floor();
        state.player.laser_accumulator -= damage;
        apply_damage(state, target, damage as i32);
    }
}
