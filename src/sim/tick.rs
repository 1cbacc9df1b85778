//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically.

use super::collision::CollisionDetector;
use super::events::{GameEvent, SessionSummary};
use super::state::{EntityRef, GamePhase, GameState};
use super::timers::TimerTask;
use super::waves::{self, WavePhase, WaveScheduler};
use super::{boss, combat, movement};
use crate::consts::*;
use crate::highscores::HighScoreStore;
use crate::settings::Settings;
use crate::tuning::Tuning;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickInput {
    pub move_left: bool,
    pub move_right: bool,
    pub move_up: bool,
    pub move_down: bool,
    /// Fire held (also drives the laser)
    pub fire: bool,
    /// Debug: toggle invulnerability
    pub toggle_god_mode: bool,
    /// Pause toggle
    pub pause: bool,
    /// Demo mode - AI flies the ship
    pub autopilot: bool,
}

/// Advance the game state by `dt_ms`
///
/// Per tick: timers, combo decay, movement and firing, collision resolution,
/// then wave completion and spawning. Deaths resolved from this tick's
/// overlaps are seen by the same tick's completion check.
pub fn tick(
    state: &mut GameState,
    input: &TickInput,
    dt_ms: f32,
    detector: &mut dyn CollisionDetector,
) {
    // Handle pause toggle
    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.phase = GamePhase::Paused;
                log::debug!("Paused at {:.0} ms", state.time_ms);
                return;
            }
            GamePhase::Paused => state.phase = GamePhase::Playing,
            _ => {}
        }
    }

    // Don't tick if paused or the session has ended
    if state.phase != GamePhase::Playing {
        return;
    }

    if state.waves.phase == WavePhase::Idle {
        waves::begin_session(state);
    }

    state.time_ms += dt_ms as f64;

    let mut input = input.clone();
    if input.autopilot {
        autopilot(state, &mut input);
    }

    if input.toggle_god_mode {
        state.player.god_mode = !state.player.god_mode;
        let text = if state.player.god_mode { "GOD MODE ON" } else { "GOD MODE OFF" };
        let pos = state.player.pos;
        state.floating_text(pos, text, COLOR_GOOD);
        log::info!("{}", text);
    }

    run_timers(state);
    if state.phase != GamePhase::Playing {
        return;
    }

    if state.score.update(dt_ms) {
        state.emit_score();
    }

    let dt_s = dt_ms / 1000.0;
    movement::update_player(state, &input, dt_s);
    combat::fire_player_weapons(state, input.fire);
    combat::update_laser(state, input.fire, dt_ms);
    movement::update_enemies(state, dt_ms);
    boss::update_boss(state, dt_ms);
    movement::update_projectiles(state, dt_ms);
    movement::update_obstacles(state, dt_s);
    movement::update_power_ups(state, dt_s);

    for (a, b) in detector.detect(state) {
        combat::resolve_overlap(state, a, b);
    }

    waves::check_completion(state);
    waves::update_spawns(state);

    remove_inactive(state);
    state.normalize_order();
}

/// Fire every due timer. Stops once the session leaves `Playing`.
fn run_timers(state: &mut GameState) {
    while state.phase == GamePhase::Playing {
        let Some(task) = state.timers.pop_due(state.time_ms) else {
            break;
        };
        match task {
            TimerTask::StartNextWave => waves::begin_next_wave(state),
            TimerTask::BeginBossWarning { wave } => boss::begin_warning(state, wave),
            TimerTask::SpawnBoss { wave } => boss::spawn_boss_or_recover(state, wave),
            TimerTask::FlashRevert(target) => combat::revert_flash(state, target),
            TimerTask::PowerUpExpire => {
                log::debug!("Power-up expired");
                combat::clear_power_up(state);
            }
            TimerTask::ShowGameOver => end_session(state, GamePhase::GameOver),
            TimerTask::ShowVictory => end_session(state, GamePhase::Victory),
        }
    }
}

fn end_session(state: &mut GameState, phase: GamePhase) {
    state.phase = phase;
    let summary = SessionSummary {
        score: state.score.score(),
        wave: state.waves.current_wave,
        high_score: state.score.high_score(),
        is_new_high_score: state.score.is_new_high_score(),
    };
    log::info!(
        "{:?}: score {} on wave {} (high score {})",
        phase,
        summary.score,
        summary.wave,
        summary.high_score
    );
    match phase {
        GamePhase::Victory => state.emit(GameEvent::Victory(summary)),
        _ => state.emit(GameEvent::GameOver(summary)),
    }
}

/// Drop dead entities along with any flash timers still bound to them
fn remove_inactive(state: &mut GameState) {
    let removed: Vec<EntityRef> = state
        .enemies
        .iter()
        .filter(|e| !e.active)
        .map(|e| EntityRef::Enemy(e.id))
        .chain(
            state
                .obstacles
                .iter()
                .filter(|o| !o.active)
                .map(|o| EntityRef::Obstacle(o.id)),
        )
        .collect();
    if !removed.is_empty() {
        state.timers.cancel_where(
            |task| matches!(task, TimerTask::FlashRevert(target) if removed.contains(target)),
        );
    }

    state.enemies.retain(|e| e.active);
    state.obstacles.retain(|o| o.active);
    state.projectiles.retain(|p| p.active);
    state.power_ups.retain(|p| p.active);
}

/// Demo pilot: hold fire, chase the nearest target horizontally and sidestep
/// hostile bullets about to land.
fn autopilot(state: &GameState, input: &mut TickInput) {
    let pos = state.player.pos;
    input.fire = true;
    input.move_left = false;
    input.move_right = false;
    input.move_up = false;
    input.move_down = false;

    let threat = state
        .projectiles
        .iter()
        .filter(|p| p.active && p.is_hostile())
        .filter(|p| p.pos.y < pos.y && pos.y - p.pos.y < 80.0)
        .find(|p| (p.pos.x - pos.x).abs() < 30.0);
    if let Some(bullet) = threat {
        if bullet.pos.x >= pos.x {
            input.move_left = true;
        } else {
            input.move_right = true;
        }
        return;
    }

    let pickup = state
        .power_ups
        .iter()
        .filter(|p| p.active)
        .map(|p| p.pos)
        .min_by(|a, b| {
            a.distance(pos)
                .partial_cmp(&b.distance(pos))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    let goal = pickup.or_else(|| movement::nearest_target(state, pos).map(|(_, p)| p));

    if let Some(goal) = goal {
        if goal.x < pos.x - 10.0 {
            input.move_left = true;
        } else if goal.x > pos.x + 10.0 {
            input.move_right = true;
        }
    }
}

/// A session with its collaborators: the high score store and settings.
///
/// Loads the high score on creation, persists it whenever it changes, and
/// applies presentation preferences to the outbound event stream.
pub struct Simulation {
    state: GameState,
    tuning: Tuning,
    store: Box<dyn HighScoreStore>,
    settings: Settings,
    accumulator: f32,
}

impl Simulation {
    pub fn new(
        seed: u64,
        tuning: Tuning,
        store: Box<dyn HighScoreStore>,
        settings: Settings,
    ) -> Self {
        let high_score = load_high_score(store.as_ref());
        Self {
            state: GameState::with_tuning(seed, tuning.clone(), high_score),
            tuning,
            store,
            settings,
            accumulator: 0.0,
        }
    }

    /// Fresh session with a new seed
    pub fn reset(&mut self, seed: u64) {
        let high_score = load_high_score(self.store.as_ref());
        self.state = GameState::with_tuning(seed, self.tuning.clone(), high_score);
        self.accumulator = 0.0;
        log::info!("New session (seed {})", seed);
    }

    /// Fresh session (score 0, full lives) whose next wave is `wave + 1`
    pub fn continue_from_wave(&mut self, wave: u32) {
        let seed = self.state.seed.wrapping_add(wave as u64);
        self.reset(seed);
        self.state.waves = WaveScheduler::continuing_from(wave);
        log::info!("Continuing from wave {}", wave);
    }

    /// Advance one step of `dt_ms`
    pub fn tick(&mut self, input: &TickInput, dt_ms: f32, detector: &mut dyn CollisionDetector) {
        if input.toggle_god_mode && !self.settings.debug_keys {
            let input = TickInput {
                toggle_god_mode: false,
                ..input.clone()
            };
            tick(&mut self.state, &input, dt_ms, detector);
        } else {
            tick(&mut self.state, input, dt_ms, detector);
        }

        if let Some(high_score) = self.state.score.take_high_score_update() {
            if let Err(err) = self.store.save(high_score) {
                log::warn!("Failed to save high score: {}", err);
            }
        }
    }

    /// Advance by wall-clock `elapsed_ms` in fixed steps. Returns the steps run.
    ///
    /// One-shot inputs (pause, god mode) apply to the first step only.
    pub fn advance(
        &mut self,
        input: &TickInput,
        elapsed_ms: f32,
        detector: &mut dyn CollisionDetector,
    ) -> u32 {
        self.accumulator += elapsed_ms;
        let mut steps = 0;
        while self.accumulator >= SIM_DT_MS && steps < MAX_SUBSTEPS {
            if steps == 0 {
                self.tick(input, SIM_DT_MS, detector);
            } else {
                let held = TickInput {
                    pause: false,
                    toggle_god_mode: false,
                    ..input.clone()
                };
                self.tick(&held, SIM_DT_MS, detector);
            }
            self.accumulator -= SIM_DT_MS;
            steps += 1;
        }
        // Drop the backlog rather than spiral
        if steps == MAX_SUBSTEPS {
            self.accumulator = 0.0;
        }
        steps
    }

    /// Take the events produced since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        let mut events = std::mem::take(&mut self.state.events);
        if !self.settings.effective_screen_shake() {
            events.retain(|e| !e.is_shake());
        }
        events
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Mutable access for drivers that script the field
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn store(&self) -> &dyn HighScoreStore {
        self.store.as_ref()
    }
}

fn load_high_score(store: &dyn HighScoreStore) -> u64 {
    store.load().unwrap_or_else(|err| {
        log::warn!("Failed to load high score, starting from 0: {}", err);
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highscores::MemoryStore;
    use crate::sim::collision::NoCollisions;

    fn step(state: &mut GameState, input: &TickInput) {
        tick(state, input, SIM_DT_MS, &mut NoCollisions);
    }

    fn sim_with(settings: Settings, high_score: u64) -> Simulation {
        Simulation::new(
            1,
            Tuning::default(),
            Box::new(MemoryStore::new(high_score)),
            settings,
        )
    }

    #[test]
    fn test_first_tick_starts_wave_one() {
        let mut state = GameState::new(12345);
        assert_eq!(state.waves.phase, WavePhase::Idle);
        step(&mut state, &TickInput::default());
        assert_eq!(state.waves.current_wave, 1);
        assert_eq!(state.waves.enemies_in_wave, 5);
        assert!(state
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::Banner { text } if text == "Wave 1")));
    }

    #[test]
    fn test_tick_pause() {
        let mut state = GameState::new(12345);
        step(&mut state, &TickInput::default());
        let t = state.time_ms;

        let input = TickInput {
            pause: true,
            ..Default::default()
        };
        step(&mut state, &input);
        assert_eq!(state.phase, GamePhase::Paused);
        step(&mut state, &TickInput::default());
        assert_eq!(state.time_ms, t);

        // Unpause
        step(&mut state, &input);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.time_ms > t);
    }

    #[test]
    fn test_first_enemy_after_initial_delay() {
        let mut state = GameState::new(7);
        let idle = TickInput::default();
        while state.time_ms < 1900.0 {
            step(&mut state, &idle);
        }
        assert!(state.enemies.is_empty());
        while state.time_ms < 2100.0 {
            step(&mut state, &idle);
        }
        assert_eq!(state.enemies.len(), 1);
        assert_eq!(state.waves.enemies_spawned, 1);
    }

    #[test]
    fn test_god_mode_toggle() {
        let mut state = GameState::new(1);
        let toggle = TickInput {
            toggle_god_mode: true,
            ..Default::default()
        };
        step(&mut state, &toggle);
        assert!(state.player.god_mode);
        step(&mut state, &toggle);
        assert!(!state.player.god_mode);
    }

    #[test]
    fn test_removed_entities_leave_no_flash_timers() {
        let mut state = GameState::new(1);
        step(&mut state, &TickInput::default());
        waves::spawn_enemy(&mut state);
        waves::spawn_enemy(&mut state);
        let dead = state.enemies[0].id;
        let alive = state.enemies[1].id;
        let now = state.time_ms;
        state
            .timers
            .schedule(now, 100.0, TimerTask::FlashRevert(EntityRef::Enemy(dead)));
        state
            .timers
            .schedule(now, 100.0, TimerTask::FlashRevert(EntityRef::Enemy(alive)));
        state.enemies[0].active = false;

        remove_inactive(&mut state);
        assert_eq!(state.enemies.len(), 1);
        assert!(!state
            .timers
            .any(|t| *t == TimerTask::FlashRevert(EntityRef::Enemy(dead))));
        assert!(state
            .timers
            .any(|t| *t == TimerTask::FlashRevert(EntityRef::Enemy(alive))));
    }

    #[test]
    fn test_god_mode_honoured_with_default_settings() {
        let mut sim = sim_with(Settings::default(), 0);
        let toggle = TickInput {
            toggle_god_mode: true,
            ..Default::default()
        };
        sim.tick(&toggle, SIM_DT_MS, &mut NoCollisions);
        assert!(sim.state().player.god_mode);
    }

    #[test]
    fn test_power_up_expires() {
        let mut state = GameState::new(1);
        step(&mut state, &TickInput::default());
        combat::activate_power_up(&mut state, crate::tuning::PowerUpKind::RapidFire);
        let idle = TickInput::default();
        let until = state.time_ms + 8000.0 + SIM_DT_MS as f64;
        while state.time_ms < until {
            step(&mut state, &idle);
        }
        assert!(state.player.power_up.is_none());
    }

    #[test]
    fn test_determinism() {
        // Two states with same seed should produce identical results
        let mut state1 = GameState::new(99999);
        let mut state2 = GameState::new(99999);
        let input = TickInput {
            autopilot: true,
            ..Default::default()
        };

        for _ in 0..600 {
            step(&mut state1, &input);
            step(&mut state2, &input);
        }

        assert_eq!(state1.time_ms, state2.time_ms);
        assert_eq!(state1.enemies.len(), state2.enemies.len());
        assert_eq!(state1.projectiles.len(), state2.projectiles.len());
        assert_eq!(state1.score.score(), state2.score.score());
        assert_eq!(state1.player.pos, state2.player.pos);
    }

    #[test]
    fn test_shake_filtered_by_settings() {
        let settings = Settings {
            screen_shake: false,
            ..Default::default()
        };
        let mut sim = sim_with(settings, 0);
        sim.tick(&TickInput::default(), SIM_DT_MS, &mut NoCollisions);
        sim.state_mut().shake(100.0, 0.1);
        let events = sim.drain_events();
        assert!(!events.is_empty());
        assert!(events.iter().all(|e| !e.is_shake()));
        assert!(sim.drain_events().is_empty());
    }

    #[test]
    fn test_god_mode_needs_debug_keys() {
        let settings = Settings {
            debug_keys: false,
            ..Default::default()
        };
        let mut sim = sim_with(settings, 0);
        let toggle = TickInput {
            toggle_god_mode: true,
            ..Default::default()
        };
        sim.tick(&toggle, SIM_DT_MS, &mut NoCollisions);
        assert!(!sim.state().player.god_mode);
    }

    #[test]
    fn test_advance_caps_substeps() {
        let mut sim = sim_with(Settings::default(), 0);
        let input = TickInput::default();
        assert_eq!(sim.advance(&input, SIM_DT_MS * 2.5, &mut NoCollisions), 2);
        assert_eq!(sim.advance(&input, 10_000.0, &mut NoCollisions), MAX_SUBSTEPS);
        assert_eq!(sim.advance(&input, 1.0, &mut NoCollisions), 0);
    }

    #[test]
    fn test_high_score_persisted() {
        let mut sim = sim_with(Settings::default(), 40);
        assert_eq!(sim.state().score.high_score(), 40);
        sim.tick(&TickInput::default(), SIM_DT_MS, &mut NoCollisions);
        sim.state_mut().score.add_score(100);
        sim.tick(&TickInput::default(), SIM_DT_MS, &mut NoCollisions);
        assert_eq!(sim.store().load().ok(), Some(100));
    }

    #[test]
    fn test_continue_from_wave() {
        let mut sim = Simulation::new(
            3,
            Tuning::default(),
            Box::new(MemoryStore::default()),
            Settings::default(),
        );
        sim.state_mut().score.add_score(900);
        sim.continue_from_wave(5);
        assert_eq!(sim.state().score.score(), 0);
        assert_eq!(sim.state().player.lives, 3);
        sim.tick(&TickInput::default(), SIM_DT_MS, &mut NoCollisions);
        assert_eq!(sim.state().waves.current_wave, 6);
        assert_eq!(sim.state().waves.enemies_in_wave, 15);
    }
}
