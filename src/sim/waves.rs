//! Wave and spawn scheduler
//!
//! [`WaveScheduler`] is a pure state machine over wave counters. It returns
//! [`WaveSignal`]s instead of reaching into the rest of the game; the glue
//! functions below apply those signals to a [`GameState`] (banners, bonuses,
//! follow-up timers) and drive enemy/obstacle spawn cadence.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::events::GameEvent;
use super::state::{Enemy, GameState, Obstacle};
use super::timers::TimerTask;
use crate::tuning::{
    band_for_wave, EffectiveEnemySpec, MovementPattern, ObstacleKind, ObstacleTypeSpec, Tuning,
    WaveConfig,
};

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WavePhase {
    /// No wave started yet (new session or continuing from a stored wave)
    Idle,
    /// Regular wave spawning and fighting
    Active,
    /// Regular wave cleared, waiting to start the next
    Complete,
    /// Boss wave started, boss not on the field yet
    BossWave,
    BossActive,
    /// Boss killed; progression stops until the session continues
    BossDefeated,
}

/// What a scheduler transition asks the game to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveSignal {
    RegularWaveStarted { wave: u32, enemies: u32 },
    BossWaveStarted { wave: u32 },
    WaveCompleted { wave: u32, bonus: u64 },
    BossDefeated { wave: u32, bonus: u64 },
}

/// Wave counters and flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveScheduler {
    pub current_wave: u32,
    pub enemies_in_wave: u32,
    pub enemies_spawned: u32,
    pub enemies_remaining: u32,
    pub enemies_escaped: u32,
    pub wave_active: bool,
    pub wave_paused: bool,
    pub boss_active: bool,
    pub phase: WavePhase,
}

impl Default for WaveScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl WaveScheduler {
    pub fn new() -> Self {
        Self {
            current_wave: 0,
            enemies_in_wave: 0,
            enemies_spawned: 0,
            enemies_remaining: 0,
            enemies_escaped: 0,
            wave_active: false,
            wave_paused: false,
            boss_active: false,
            phase: WavePhase::Idle,
        }
    }

    /// Fresh scheduler whose next wave is `wave + 1`
    pub fn continuing_from(wave: u32) -> Self {
        Self {
            current_wave: wave,
            ..Self::new()
        }
    }

    /// Advance the wave counter and set up the new wave
    pub fn start_next_wave(&mut self, cfg: &WaveConfig) -> WaveSignal {
        self.current_wave += 1;
        self.wave_active = true;
        self.wave_paused = false;
        self.boss_active = false;
        let wave = self.current_wave;

        if is_boss_wave(cfg, wave) {
            self.boss_active = true;
            self.enemies_in_wave = 0;
            self.enemies_spawned = 0;
            self.enemies_remaining = 0;
            self.enemies_escaped = 0;
            self.phase = WavePhase::BossWave;
            return WaveSignal::BossWaveStarted { wave };
        }

        self.enemies_in_wave = enemies_for_wave(cfg, wave);
        self.enemies_spawned = 0;
        self.enemies_remaining = self.enemies_in_wave;
        self.enemies_escaped = 0;
        self.phase = WavePhase::Active;
        WaveSignal::RegularWaveStarted {
            wave,
            enemies: self.enemies_in_wave,
        }
    }

    pub fn should_spawn_enemy(&self) -> bool {
        self.wave_active
            && !self.wave_paused
            && !self.boss_active
            && self.enemies_spawned < self.enemies_in_wave
    }

    pub fn enemy_spawned(&mut self) {
        if self.enemies_spawned < self.enemies_in_wave {
            self.enemies_spawned += 1;
        }
    }

    pub fn enemy_destroyed(&mut self, cfg: &WaveConfig) -> Option<WaveSignal> {
        self.enemies_remaining = self.enemies_remaining.saturating_sub(1);
        self.check_wave_complete(cfg)
    }

    /// Escapes count toward completion like kills
    pub fn enemy_escaped(&mut self, cfg: &WaveConfig) -> Option<WaveSignal> {
        self.enemies_escaped += 1;
        self.check_wave_complete(cfg)
    }

    pub fn enemies_destroyed(&self) -> u32 {
        self.enemies_in_wave - self.enemies_remaining
    }

    /// Complete the wave once every enemy was spawned and dealt with.
    /// Boss waves only complete through [`Self::boss_defeated`].
    pub fn check_wave_complete(&mut self, cfg: &WaveConfig) -> Option<WaveSignal> {
        if self.boss_active || !self.wave_active {
            return None;
        }
        let dealt_with = self.enemies_destroyed() + self.enemies_escaped;
        if dealt_with >= self.enemies_in_wave && self.enemies_spawned >= self.enemies_in_wave {
            self.wave_active = false;
            self.wave_paused = true;
            self.phase = WavePhase::Complete;
            return Some(WaveSignal::WaveCompleted {
                wave: self.current_wave,
                bonus: cfg.completion_bonus,
            });
        }
        None
    }

    pub fn boss_spawned(&mut self) {
        self.phase = WavePhase::BossActive;
    }

    /// The boss never appeared: drop the gate so the wave can still finish
    pub fn boss_spawn_failed(&mut self, cfg: &WaveConfig) -> Option<WaveSignal> {
        self.boss_active = false;
        self.check_wave_complete(cfg)
    }

    pub fn boss_defeated(&mut self, cfg: &WaveConfig) -> WaveSignal {
        self.boss_active = false;
        self.wave_active = false;
        self.wave_paused = true;
        self.phase = WavePhase::BossDefeated;
        WaveSignal::BossDefeated {
            wave: self.current_wave,
            bonus: cfg.completion_bonus * cfg.boss_bonus_multiplier,
        }
    }
}

pub fn is_boss_wave(cfg: &WaveConfig, wave: u32) -> bool {
    wave > 0 && cfg.boss_wave_interval > 0 && wave % cfg.boss_wave_interval == 0
}

/// `min(starting + (wave-1) × increase, max)`
pub fn enemies_for_wave(cfg: &WaveConfig, wave: u32) -> u32 {
    let grown = cfg.starting_enemies + wave.saturating_sub(1) * cfg.enemy_increase_per_wave;
    grown.min(cfg.max_enemies_per_wave)
}

/// Delay between enemy spawns; tightens each wave down to a floor
pub fn enemy_spawn_interval_ms(cfg: &WaveConfig, wave: u32) -> f32 {
    let steps = wave.saturating_sub(1) as f32;
    let stepped = cfg.enemy_spawn_interval_ms - steps * cfg.enemy_spawn_interval_step_ms;
    stepped.max(cfg.min_enemy_spawn_interval_ms)
}

/// Difficulty-scaled enemy type for `wave` given a roll in [0, 1)
pub fn enemy_for_wave(tuning: &Tuning, wave: u32, roll: f32) -> Option<EffectiveEnemySpec> {
    let kind = band_for_wave(&tuning.enemy_bands, wave)?.pick(roll)?;
    let base = tuning.enemy_spec(kind)?;
    Some(tuning.difficulty.apply(base, wave))
}

/// Obstacle type for `wave` given a roll in [0, 1); none before obstacles start
pub fn obstacle_for_wave(tuning: &Tuning, wave: u32, roll: f32) -> Option<ObstacleTypeSpec> {
    let kind = band_for_wave(&tuning.obstacle_bands, wave)?.pick(roll)?;
    tuning.obstacle_spec(kind).copied()
}

/// Obstacle cadence for `wave`; none before obstacles start
pub fn obstacle_interval_ms(tuning: &Tuning, wave: u32) -> Option<f32> {
    tuning
        .obstacle_intervals
        .iter()
        .filter(|i| i.from_wave <= wave)
        .max_by_key(|i| i.from_wave)
        .map(|i| i.interval_ms)
}

/// Uniform value in [lo, hi), or `lo` when the range is empty
pub(crate) fn random_between(rng: &mut impl Rng, lo: f32, hi: f32) -> f32 {
    if hi > lo { rng.random_range(lo..hi) } else { lo }
}

/// Start the first wave of a session (or the wave after a continue point)
pub fn begin_session(state: &mut GameState) {
    state.next_enemy_spawn_ms = state.time_ms + state.tuning.waves.initial_spawn_delay_ms as f64;
    state.last_obstacle_spawn_ms = state.time_ms;
    begin_next_wave(state);
}

pub fn begin_next_wave(state: &mut GameState) {
    let signal = state.waves.start_next_wave(&state.tuning.waves);
    apply_signal(state, signal);
}

/// Apply the game-side effects of a scheduler transition
pub fn apply_signal(state: &mut GameState, signal: WaveSignal) {
    let cfg = state.tuning.waves;
    match signal {
        WaveSignal::RegularWaveStarted { wave, enemies } => {
            log::info!("Wave {} started with {} enemies", wave, enemies);
            state.banner(format!("Wave {}", wave));
            state.emit(GameEvent::WaveChanged { wave });
        }
        WaveSignal::BossWaveStarted { wave } => {
            log::info!("Boss wave {} started", wave);
            state.banner(format!("BOSS WAVE {}", wave));
            state.emit(GameEvent::WaveChanged { wave });
            let now = state.time_ms;
            state.timers.schedule(
                now,
                cfg.boss_warning_delay_ms,
                TimerTask::BeginBossWarning { wave },
            );
        }
        WaveSignal::WaveCompleted { wave, bonus } => {
            log::info!(
                "Wave {} complete: {} destroyed, {} escaped",
                wave,
                state.waves.enemies_destroyed(),
                state.waves.enemies_escaped
            );
            state.score.add_score(bonus);
            state.emit_score();
            state.banner(format!("Wave {} Complete!\n+{} Bonus", wave, bonus));
            let now = state.time_ms;
            state
                .timers
                .schedule(now, cfg.delay_between_waves_ms, TimerTask::StartNextWave);
        }
        WaveSignal::BossDefeated { wave, bonus } => {
            log::info!("Boss defeated on wave {}", wave);
            state.score.add_score(bonus);
            state.emit_score();
            state.banner(format!("Boss Defeated!\n+{} Bonus", bonus));
        }
    }
}

pub fn enemy_destroyed(state: &mut GameState) {
    if let Some(signal) = state.waves.enemy_destroyed(&state.tuning.waves) {
        apply_signal(state, signal);
    }
}

pub fn enemy_escaped(state: &mut GameState) {
    if let Some(signal) = state.waves.enemy_escaped(&state.tuning.waves) {
        apply_signal(state, signal);
    }
}

pub fn check_completion(state: &mut GameState) {
    if let Some(signal) = state.waves.check_wave_complete(&state.tuning.waves) {
        apply_signal(state, signal);
    }
}

/// Spawn enemies and obstacles when their cadence allows
pub fn update_spawns(state: &mut GameState) {
    let now = state.time_ms;
    let wave = state.waves.current_wave;

    if state.waves.should_spawn_enemy() && now > state.next_enemy_spawn_ms {
        spawn_enemy(state);
        state.next_enemy_spawn_ms =
            now + enemy_spawn_interval_ms(&state.tuning.waves, wave) as f64;
    }

    if !state.waves.boss_active {
        if let Some(interval) = obstacle_interval_ms(&state.tuning, wave) {
            if now > state.last_obstacle_spawn_ms + interval as f64 {
                spawn_obstacle(state);
                state.last_obstacle_spawn_ms = now;
            }
        }
    }
}

/// Spawn one enemy of the current wave's mix
pub fn spawn_enemy(state: &mut GameState) {
    let wave = state.waves.current_wave;
    let roll = state.rng.random::<f32>();
    let Some(spec) = enemy_for_wave(&state.tuning, wave, roll) else {
        // Count the slot as used and gone so the wave can still complete
        log::error!("No enemy type available for wave {}", wave);
        state.waves.enemy_spawned();
        enemy_escaped(state);
        return;
    };

    let width = state.tuning.arena.width;
    let (pos, vel) = if spec.pattern == MovementPattern::Strafe {
        let from_left = state.rng.random_bool(0.5);
        let x = if from_left { -30.0 } else { width + 30.0 };
        let y = random_between(&mut state.rng, 50.0, 200.0);
        let dir = if from_left { 1.0 } else { -1.0 };
        let drop = spec.speed * state.tuning.enemy_behaviour.strafe_drop_fraction;
        (Vec2::new(x, y), Vec2::new(dir * spec.speed, drop))
    } else {
        let x = random_between(&mut state.rng, 50.0, width - 50.0);
        (Vec2::new(x, -50.0), Vec2::new(0.0, spec.speed))
    };

    let id = state.next_entity_id();
    let mut enemy = Enemy::new(id, &spec, pos, vel);
    enemy.last_shot_ms = state.time_ms;
    log::debug!("Spawned {:?} enemy {} at ({:.0}, {:.0})", spec.kind, id, pos.x, pos.y);
    state.enemies.push(enemy);
    state.waves.enemy_spawned();
}

/// Spawn one obstacle of the current wave's mix
pub fn spawn_obstacle(state: &mut GameState) {
    use crate::consts::{LARGE_ASTEROID_MAX_SPIN, SMALL_ASTEROID_DRIFT};

    let wave = state.waves.current_wave;
    let roll = state.rng.random::<f32>();
    let Some(spec) = obstacle_for_wave(&state.tuning, wave, roll) else {
        return;
    };

    let width = state.tuning.arena.width;
    let x = random_between(&mut state.rng, 60.0, width - 60.0);
    let speed = random_between(&mut state.rng, spec.speed_min, spec.speed_max);
    let id = state.next_entity_id();
    let mut obstacle = Obstacle::new(id, &spec, Vec2::new(x, -40.0), speed);

    match spec.kind {
        ObstacleKind::SmallAsteroid => {
            obstacle.vel.x =
                random_between(&mut state.rng, -SMALL_ASTEROID_DRIFT, SMALL_ASTEROID_DRIFT);
        }
        ObstacleKind::LargeAsteroid => {
            obstacle.spin =
                random_between(&mut state.rng, -LARGE_ASTEROID_MAX_SPIN, LARGE_ASTEROID_MAX_SPIN);
        }
        ObstacleKind::SpaceMine => {}
    }

    log::debug!("Spawned {:?} obstacle {} at x={:.0}", spec.kind, id, x);
    state.obstacles.push(obstacle);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::{EnemyKind, WaveConfig};

    fn cfg() -> WaveConfig {
        WaveConfig::default()
    }

    #[test]
    fn test_enemy_quota_grows_and_caps() {
        let c = cfg();
        assert_eq!(enemies_for_wave(&c, 1), 5);
        assert_eq!(enemies_for_wave(&c, 2), 7);
        assert_eq!(enemies_for_wave(&c, 8), 19);
        assert_eq!(enemies_for_wave(&c, 9), 20);
        assert_eq!(enemies_for_wave(&c, 30), 20);
    }

    #[test]
    fn test_regular_wave_lifecycle() {
        let c = cfg();
        let mut w = WaveScheduler::new();
        assert_eq!(
            w.start_next_wave(&c),
            WaveSignal::RegularWaveStarted { wave: 1, enemies: 5 }
        );
        assert_eq!(w.enemies_remaining, 5);

        for _ in 0..5 {
            assert!(w.should_spawn_enemy());
            w.enemy_spawned();
        }
        assert!(!w.should_spawn_enemy());
        w.enemy_spawned();
        assert_eq!(w.enemies_spawned, 5);

        for _ in 0..3 {
            assert_eq!(w.enemy_destroyed(&c), None);
        }
        assert_eq!(w.enemy_escaped(&c), None);
        assert_eq!(
            w.enemy_destroyed(&c),
            Some(WaveSignal::WaveCompleted { wave: 1, bonus: 100 })
        );
        assert!(!w.wave_active);
        assert!(w.wave_paused);
        assert_eq!(w.phase, WavePhase::Complete);

        // Already complete: no second signal
        assert_eq!(w.check_wave_complete(&c), None);
    }

    #[test]
    fn test_wave_not_complete_until_all_spawned() {
        let c = cfg();
        let mut w = WaveScheduler::new();
        w.start_next_wave(&c);
        w.enemy_spawned();
        // One kill out of five with only one spawned
        assert_eq!(w.enemy_destroyed(&c), None);
        assert!(w.wave_active);
    }

    #[test]
    fn test_boss_wave_gates_spawns_and_completion() {
        let c = cfg();
        let mut w = WaveScheduler::continuing_from(4);
        assert_eq!(w.start_next_wave(&c), WaveSignal::BossWaveStarted { wave: 5 });
        assert!(w.boss_active);
        assert!(!w.should_spawn_enemy());
        assert_eq!(w.check_wave_complete(&c), None);

        w.boss_spawned();
        assert_eq!(
            w.boss_defeated(&c),
            WaveSignal::BossDefeated { wave: 5, bonus: 500 }
        );
        assert!(!w.boss_active && !w.wave_active && w.wave_paused);
        assert_eq!(w.phase, WavePhase::BossDefeated);
    }

    #[test]
    fn test_failed_boss_spawn_does_not_stall() {
        let c = cfg();
        let mut w = WaveScheduler::continuing_from(9);
        w.start_next_wave(&c);
        assert_eq!(
            w.boss_spawn_failed(&c),
            Some(WaveSignal::WaveCompleted { wave: 10, bonus: 100 })
        );
    }

    #[test]
    fn test_spawn_interval_floor() {
        let c = cfg();
        assert_eq!(enemy_spawn_interval_ms(&c, 1), 1500.0);
        assert_eq!(enemy_spawn_interval_ms(&c, 11), 1000.0);
        assert_eq!(enemy_spawn_interval_ms(&c, 100), 600.0);
    }

    #[test]
    fn test_enemy_mix_by_wave() {
        let t = Tuning::default();
        assert_eq!(enemy_for_wave(&t, 2, 0.99).map(|e| e.kind), Some(EnemyKind::Small));
        assert_eq!(enemy_for_wave(&t, 4, 0.7).map(|e| e.kind), Some(EnemyKind::Medium));
        assert_eq!(enemy_for_wave(&t, 6, 0.8).map(|e| e.kind), Some(EnemyKind::Large));
    }

    #[test]
    fn test_obstacle_cadence_by_wave() {
        let t = Tuning::default();
        assert_eq!(obstacle_interval_ms(&t, 2), None);
        assert_eq!(obstacle_interval_ms(&t, 3), Some(3000.0));
        assert_eq!(obstacle_interval_ms(&t, 4), Some(3000.0));
        assert_eq!(obstacle_interval_ms(&t, 6), Some(2000.0));
        assert_eq!(obstacle_interval_ms(&t, 12), Some(1500.0));
        assert!(obstacle_for_wave(&t, 2, 0.5).is_none());
        assert_eq!(
            obstacle_for_wave(&t, 8, 0.95).map(|o| o.kind),
            Some(ObstacleKind::SpaceMine)
        );
    }

    #[test]
    fn test_no_obstacles_while_boss_active() {
        let mut state = GameState::new(3);
        state.waves = WaveScheduler::continuing_from(4);
        begin_next_wave(&mut state);
        assert_eq!(state.waves.current_wave, 5);
        assert!(state.waves.boss_active);

        state.time_ms = 10_000.0;
        update_spawns(&mut state);
        assert!(state.obstacles.is_empty());
        assert!(state.enemies.is_empty());

        state.waves.boss_active = false;
        update_spawns(&mut state);
        assert_eq!(state.obstacles.len(), 1);
    }

    #[test]
    fn test_spawn_enemy_registers_with_scheduler() {
        let mut state = GameState::new(3);
        begin_session(&mut state);
        spawn_enemy(&mut state);
        assert_eq!(state.enemies.len(), 1);
        assert_eq!(state.waves.enemies_spawned, 1);
        let e = &state.enemies[0];
        assert_eq!(e.pos.y, -50.0);
        assert!(e.pos.x >= 50.0 && e.pos.x < 750.0);
    }

    #[test]
    fn test_strafer_enters_from_side() {
        let mut tuning = Tuning::default();
        tuning.enemy_bands = vec![crate::tuning::WaveBand {
            from_wave: 1,
            weights: vec![crate::tuning::BandWeight {
                kind: EnemyKind::Sentinel,
                weight: 1.0,
            }],
        }];
        let mut state = GameState::with_tuning(11, tuning, 0);
        begin_session(&mut state);
        spawn_enemy(&mut state);
        let e = &state.enemies[0];
        assert!(e.pos.x == -30.0 || e.pos.x == 830.0);
        assert!(e.pos.y >= 50.0 && e.pos.y < 200.0);
        assert_eq!(e.vel.x.signum(), if e.pos.x < 0.0 { 1.0 } else { -1.0 });
    }
}
