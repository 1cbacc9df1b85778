//! Boss phase state machine, movement and firing patterns

use std::f32::consts::FRAC_PI_2;

use glam::Vec2;

use super::events::{GameEvent, SoundCue};
use super::state::{Boss, Flash, GameState, Health, ProjectileKind};
use super::timers::TimerTask;
use super::waves;
use crate::consts::*;
use crate::error::SpawnError;
use crate::tuning::{AttackPattern, Tuning};
use crate::{bearing, velocity_from_angle};

/// Phase for a health fraction: ≤25% is 3, ≤50% is 2, otherwise 1
pub fn phase_for_health(fraction: f32) -> u8 {
    if fraction <= 0.25 {
        3
    } else if fraction <= 0.5 {
        2
    } else {
        1
    }
}

impl Boss {
    /// A boss for `wave`, parked above the arena and about to descend
    pub fn new(wave: u32, tuning: &Tuning) -> Result<Self, SpawnError> {
        let health = tuning.boss.health_for_wave(wave);
        if health <= 0 {
            return Err(SpawnError::InvalidBossHealth { wave, health });
        }
        Ok(Self {
            wave,
            pos: Vec2::new(tuning.arena.width / 2.0, -80.0),
            vel: Vec2::new(0.0, BOSS_ENTRY_SPEED),
            health: Health::new(health),
            active: true,
            score: tuning.boss.score,
            base_speed: tuning.boss.speed,
            phase: 1,
            phase_config: *tuning.boss_phase(1),
            entered_arena: false,
            target_y: BOSS_ARENA_Y,
            move_dir: 1.0,
            last_shot_ms: 0.0,
            diving: false,
            dive_timer_ms: 0.0,
            dive_return_y: BOSS_ARENA_Y,
            returning: false,
            flash: Flash::default(),
        })
    }

    /// Recompute the phase from health. Returns the new phase on a transition.
    pub fn refresh_phase(&mut self, tuning: &Tuning) -> Option<u8> {
        let phase = phase_for_health(self.health.fraction());
        if phase == self.phase {
            return None;
        }
        self.phase = phase;
        self.phase_config = *tuning.boss_phase(phase);
        Some(phase)
    }

    fn speed(&self) -> f32 {
        self.base_speed * self.phase_config.speed_multiplier
    }

    /// Bounce between the arena insets at `speed`
    fn patrol(&mut self, speed: f32, width: f32) {
        if self.pos.x > width - BOSS_EDGE_INSET {
            self.move_dir = -1.0;
        } else if self.pos.x < BOSS_EDGE_INSET {
            self.move_dir = 1.0;
        }
        self.vel.x = self.move_dir * speed;
    }
}

/// Phase-change cue: shake, banner text and sound
pub fn announce_phase(state: &mut GameState, phase: u8) {
    let pos = state.boss.as_ref().map_or(Vec2::ZERO, |b| b.pos);
    log::info!("Boss entered phase {}", phase);
    state.shake(300.0, 0.03);
    state.floating_text(pos - Vec2::new(0.0, 60.0), format!("PHASE {}!", phase), COLOR_ALERT);
    state.emit(GameEvent::BossPhaseChanged { phase });
    state.emit(GameEvent::Sound(SoundCue::BossPhase));
}

/// Warning sequence that precedes the boss
pub fn begin_warning(state: &mut GameState, wave: u32) {
    let center = Vec2::new(state.tuning.arena.width / 2.0, state.tuning.arena.height / 2.0);
    state.emit(GameEvent::Sound(SoundCue::BossWarning));
    state.shake(2000.0, 0.008);
    state.banner("WARNING");
    state.floating_text(center, "BOSS APPROACHING...", COLOR_ALERT);

    let now = state.time_ms;
    let delay = state.tuning.waves.boss_spawn_delay_ms;
    state.timers.schedule(now, delay, TimerTask::SpawnBoss { wave });
}

/// Put the boss on the field
pub fn spawn_boss(state: &mut GameState, wave: u32) -> Result<(), SpawnError> {
    if state.active_boss().is_some() {
        return Err(SpawnError::BossAlreadyActive);
    }
    let boss = Boss::new(wave, &state.tuning)?;
    let health = boss.health.max;
    state.boss = Some(boss);
    state.waves.boss_spawned();
    state.emit(GameEvent::BossSpawned { wave, health });
    log::info!("Boss spawned for wave {} with {} HP", wave, health);
    Ok(())
}

/// Spawn the boss, recovering the scheduler if that fails
pub fn spawn_boss_or_recover(state: &mut GameState, wave: u32) {
    match spawn_boss(state, wave) {
        Ok(()) => {}
        Err(SpawnError::BossAlreadyActive) => {
            log::warn!("Ignoring boss spawn for wave {}: boss already active", wave);
        }
        Err(err) => {
            log::error!("Boss spawn failed: {}", err);
            if let Some(signal) = state.waves.boss_spawn_failed(&state.tuning.waves) {
                waves::apply_signal(state, signal);
            }
        }
    }
}

/// Move and fire the boss for one tick
pub fn update_boss(state: &mut GameState, dt_ms: f32) {
    let now = state.time_ms;
    let player = state.player_target();
    let width = state.tuning.arena.width;
    let height = state.tuning.arena.height;
    let cfg = state.tuning.boss.clone();

    let Some(boss) = state.boss.as_mut().filter(|b| b.active) else {
        return;
    };
    let dt_s = dt_ms / 1000.0;

    if !boss.entered_arena {
        boss.pos += boss.vel * dt_s;
        if boss.pos.y >= boss.target_y {
            boss.entered_arena = true;
            boss.vel = Vec2::ZERO;
        }
        return;
    }

    let speed = boss.speed();
    match boss.phase_config.pattern {
        AttackPattern::SideToSide => {
            boss.patrol(speed, width);
            boss.vel.y = 0.0;
            boss.pos += boss.vel * dt_s;
        }
        AttackPattern::Spread => {
            boss.patrol(speed, width);
            boss.vel.y = 0.0;
            boss.pos.x += boss.vel.x * dt_s;
            boss.pos.y = boss.target_y + (now as f32 * cfg.bob_rate).sin() * cfg.bob_amplitude;
        }
        AttackPattern::Aggressive => {
            boss.dive_timer_ms += dt_ms;
            if boss.diving {
                if boss.pos.y > height * cfg.dive_depth_fraction
                    || boss.dive_timer_ms > cfg.dive_duration_ms
                {
                    boss.diving = false;
                    boss.returning = true;
                    boss.dive_timer_ms = 0.0;
                    let home = Vec2::new(width / 2.0, boss.dive_return_y);
                    boss.vel = velocity_from_angle(bearing(boss.pos, home), speed);
                }
            } else {
                boss.patrol(speed, width);
                boss.vel.y = 0.0;
                if boss.returning {
                    if boss.pos.y > boss.dive_return_y {
                        boss.vel.y = -speed;
                    } else {
                        boss.pos.y = boss.dive_return_y;
                        boss.returning = false;
                    }
                }
                if boss.dive_timer_ms > cfg.dive_interval_ms {
                    if let Some(target) = player {
                        boss.diving = true;
                        boss.returning = false;
                        boss.dive_timer_ms = 0.0;
                        boss.dive_return_y = boss.pos.y;
                        boss.vel = velocity_from_angle(
                            bearing(boss.pos, target),
                            speed * cfg.dive_speed_multiplier,
                        );
                    }
                }
            }
            boss.pos += boss.vel * dt_s;
        }
    }

    if now - boss.last_shot_ms < boss.phase_config.shoot_cooldown_ms as f64 {
        return;
    }
    boss.last_shot_ms = now;
    let muzzle = boss.pos + Vec2::new(0.0, BOSS_MUZZLE_OFFSET);
    let pattern = boss.phase_config.pattern;

    let volley: Vec<Vec2> = match pattern {
        AttackPattern::SideToSide => {
            let angle = player.map_or(FRAC_PI_2, |p| bearing(muzzle, p));
            vec![velocity_from_angle(angle, cfg.aimed_bullet_speed)]
        }
        AttackPattern::Spread => fan(&[-30.0, 0.0, 30.0], cfg.spread_bullet_speed),
        AttackPattern::Aggressive => {
            fan(&[-40.0, -20.0, 0.0, 20.0, 40.0], cfg.aggressive_bullet_speed)
        }
    };
    for vel in volley {
        state.spawn_projectile(ProjectileKind::EnemyBullet, muzzle, vel);
    }
    state.emit(GameEvent::Sound(SoundCue::EnemyShot));
}

/// Velocities fanned around straight down by the given degree offsets
fn fan(offsets_deg: &[f32], speed: f32) -> Vec<Vec2> {
    offsets_deg
        .iter()
        .map(|d| velocity_from_angle((90.0 + d).to_radians(), speed))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::GameState;

    fn entered_boss(state: &mut GameState, wave: u32) {
        spawn_boss(state, wave).expect("boss spawns");
        let boss = state.boss.as_mut().expect("boss");
        boss.entered_arena = true;
        boss.pos = Vec2::new(400.0, BOSS_ARENA_Y);
        boss.vel = Vec2::ZERO;
    }

    #[test]
    fn test_phase_thresholds() {
        assert_eq!(phase_for_health(1.0), 1);
        assert_eq!(phase_for_health(0.51), 1);
        assert_eq!(phase_for_health(0.5), 2);
        assert_eq!(phase_for_health(0.26), 2);
        assert_eq!(phase_for_health(0.25), 3);
        assert_eq!(phase_for_health(0.24), 3);
        assert_eq!(phase_for_health(0.0), 3);
    }

    #[test]
    fn test_refresh_phase_swaps_config_once() {
        let tuning = Tuning::default();
        let mut boss = Boss::new(5, &tuning).expect("boss");
        assert_eq!(boss.health.max, 55);

        boss.health.current = 28;
        assert_eq!(boss.refresh_phase(&tuning), None);

        boss.health.current = 27;
        assert_eq!(boss.refresh_phase(&tuning), Some(2));
        assert_eq!(boss.phase_config.pattern, AttackPattern::Spread);
        assert_eq!(boss.phase_config.shoot_cooldown_ms, 800.0);
        assert_eq!(boss.refresh_phase(&tuning), None);

        boss.health.current = 13;
        assert_eq!(boss.refresh_phase(&tuning), Some(3));
        assert_eq!(boss.phase_config.pattern, AttackPattern::Aggressive);
    }

    #[test]
    fn test_invalid_boss_health_is_rejected() {
        let mut tuning = Tuning::default();
        tuning.boss.base_health = -100;
        assert_eq!(
            Boss::new(5, &tuning).err(),
            Some(SpawnError::InvalidBossHealth { wave: 5, health: -75 })
        );
    }

    #[test]
    fn test_second_spawn_rejected() {
        let mut state = GameState::new(1);
        spawn_boss(&mut state, 5).expect("first spawn");
        assert_eq!(spawn_boss(&mut state, 5), Err(SpawnError::BossAlreadyActive));
    }

    #[test]
    fn test_boss_descends_before_fighting() {
        let mut state = GameState::new(1);
        spawn_boss(&mut state, 5).expect("spawn");
        state.time_ms = 10_000.0;
        update_boss(&mut state, 100.0);
        let boss = state.boss.as_ref().expect("boss");
        assert!(!boss.entered_arena);
        assert!((boss.pos.y - (-74.0)).abs() < 1e-3);
        assert!(state.projectiles.is_empty());
    }

    #[test]
    fn test_phase_one_fires_aimed_shot_on_cooldown() {
        let mut state = GameState::new(1);
        entered_boss(&mut state, 5);
        state.time_ms = 5000.0;

        update_boss(&mut state, 16.0);
        assert_eq!(state.projectiles.len(), 1);
        let shot = &state.projectiles[0];
        let to_player = (state.player.pos - shot.pos).normalize();
        assert!(shot.vel.normalize().dot(to_player) > 0.999);

        state.time_ms += 1199.0;
        update_boss(&mut state, 16.0);
        assert_eq!(state.projectiles.len(), 1);

        state.time_ms += 1.0;
        update_boss(&mut state, 16.0);
        assert_eq!(state.projectiles.len(), 2);
    }

    #[test]
    fn test_side_to_side_turns_at_edges() {
        let mut state = GameState::new(1);
        entered_boss(&mut state, 5);
        {
            let boss = state.boss.as_mut().expect("boss");
            boss.pos.x = 730.0;
            boss.move_dir = 1.0;
        }
        update_boss(&mut state, 16.0);
        let boss = state.boss.as_ref().expect("boss");
        assert_eq!(boss.move_dir, -1.0);
        assert_eq!(boss.vel.x, -90.0);
        assert!(boss.pos.x < 730.0);
        assert_eq!(boss.pos.y, BOSS_ARENA_Y);

        state.boss.as_mut().expect("boss").pos.x = 70.0;
        update_boss(&mut state, 16.0);
        let boss = state.boss.as_ref().expect("boss");
        assert_eq!(boss.move_dir, 1.0);
        assert_eq!(boss.vel.x, 90.0);

        // Inside the lane the heading is kept
        state.boss.as_mut().expect("boss").pos.x = 400.0;
        update_boss(&mut state, 16.0);
        assert_eq!(state.boss.as_ref().expect("boss").move_dir, 1.0);
    }

    #[test]
    fn test_spread_phase_bobs_with_time() {
        let mut state = GameState::new(1);
        entered_boss(&mut state, 5);
        let tuning = state.tuning.clone();
        {
            let boss = state.boss.as_mut().expect("boss");
            boss.health.current = 27;
            assert_eq!(boss.refresh_phase(&tuning), Some(2));
        }

        state.time_ms = 1000.0;
        update_boss(&mut state, 16.0);
        let boss = state.boss.as_ref().expect("boss");
        let expected = BOSS_ARENA_Y + (1000.0f32 * 0.003).sin() * 30.0;
        assert!((boss.pos.y - expected).abs() < 1e-3);
        // Phase two patrols faster
        assert!((boss.vel.x.abs() - 108.0).abs() < 1e-3);

        state.time_ms = 1500.0;
        update_boss(&mut state, 16.0);
        let boss = state.boss.as_ref().expect("boss");
        let expected = BOSS_ARENA_Y + (1500.0f32 * 0.003).sin() * 30.0;
        assert!((boss.pos.y - expected).abs() < 1e-3);
    }

    #[test]
    fn test_phase_three_fires_five_way_spread() {
        let mut state = GameState::new(1);
        entered_boss(&mut state, 5);
        let tuning = state.tuning.clone();
        let boss = state.boss.as_mut().expect("boss");
        boss.health.current = 5;
        boss.refresh_phase(&tuning);
        state.time_ms = 5000.0;

        update_boss(&mut state, 16.0);
        assert_eq!(state.projectiles.len(), 5);
        assert!(state.projectiles.iter().all(|p| p.vel.y > 0.0));
        let center = state
            .projectiles
            .iter()
            .find(|p| p.vel.x.abs() < 1e-3)
            .expect("center bullet");
        assert!((center.vel.y - 280.0).abs() < 1e-3);
    }

    #[test]
    fn test_aggressive_dive_and_return() {
        let mut state = GameState::new(1);
        entered_boss(&mut state, 5);
        let tuning = state.tuning.clone();
        {
            let boss = state.boss.as_mut().expect("boss");
            boss.health.current = 5;
            boss.refresh_phase(&tuning);
            boss.dive_timer_ms = 4000.0;
        }
        state.time_ms = 1.0;
        update_boss(&mut state, 16.0);
        let boss = state.boss.as_ref().expect("boss");
        assert!(boss.diving);
        assert!(boss.vel.y > 0.0);

        // Dive ends by duration at the latest
        for _ in 0..100 {
            state.time_ms += 16.0;
            update_boss(&mut state, 16.0);
        }
        let boss = state.boss.as_ref().expect("boss");
        assert!(!boss.diving);
        assert!(boss.pos.y <= state.tuning.arena.height * 0.6 + 10.0);
    }
}
