//! Game state and entity model
//!
//! All state the simulation reads or writes lives here, owned by [`GameState`].

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::events::GameEvent;
use super::score::ScoreState;
use super::timers::{TimerHandle, TimerQueue};
use super::waves::WaveScheduler;
use crate::tuning::{
    BossPhaseConfig, EffectiveEnemySpec, EnemyKind, MovementPattern, ObstacleKind,
    ObstacleTypeSpec, PowerUpKind, Tuning,
};

pub type EntityId = u32;

/// Stable reference to any entity (used by collision reports and timers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    Player,
    Enemy(EntityId),
    /// There is at most one boss
    Boss,
    Obstacle(EntityId),
    Projectile(EntityId),
    PowerUp(EntityId),
}

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    Paused,
    /// Player died and the game-over screen is up
    GameOver,
    /// Boss defeated and the victory screen is up
    Victory,
}

/// Integer hit points. `current` never rises above `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Health {
    pub fn new(max: i32) -> Self {
        Self { current: max, max }
    }

    pub fn take(&mut self, amount: i32) {
        self.current -= amount.max(0);
    }

    pub fn is_depleted(&self) -> bool {
        self.current <= 0
    }

    /// current / max (0 if max is not positive)
    pub fn fraction(&self) -> f32 {
        if self.max <= 0 {
            return 0.0;
        }
        self.current as f32 / self.max as f32
    }
}

/// Damage tint with its pending revert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub on: bool,
    pub timer: Option<TimerHandle>,
}

/// Anything that has hit points and dies exactly once
pub trait Damageable {
    fn health(&self) -> &Health;
    fn health_mut(&mut self) -> &mut Health;
    fn is_active(&self) -> bool;
    fn deactivate(&mut self);
    fn flash_mut(&mut self) -> &mut Flash;
}

macro_rules! impl_damageable {
    ($($ty:ty),*) => {
        $(impl Damageable for $ty {
            fn health(&self) -> &Health {
                &self.health
            }
            fn health_mut(&mut self) -> &mut Health {
                &mut self.health
            }
            fn is_active(&self) -> bool {
                self.active
            }
            fn deactivate(&mut self) {
                self.active = false;
            }
            fn flash_mut(&mut self) -> &mut Flash {
                &mut self.flash
            }
        })*
    };
}

/// A timed (or shield) power-up currently held by the player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivePowerUp {
    pub kind: PowerUpKind,
    pub expires_at_ms: f64,
    pub timer: TimerHandle,
}

/// The player's ship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub pos: Vec2,
    pub vel: Vec2,
    pub lives: u32,
    /// Goes false once and never back
    pub alive: bool,
    pub power_up: Option<ActivePowerUp>,
    /// Counts shots toward the next homing missile
    pub shot_counter: u32,
    /// Fractional laser damage carried between ticks
    pub laser_accumulator: f32,
    pub god_mode: bool,
    /// Earliest time the next shot may fire (exclusive)
    pub next_fire_ms: f64,
}

impl Player {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            pos: Vec2::new(tuning.player.start_x, tuning.player.start_y),
            vel: Vec2::ZERO,
            lives: tuning.player.lives,
            alive: true,
            power_up: None,
            shot_counter: 0,
            laser_accumulator: 0.0,
            god_mode: false,
            next_fire_ms: 0.0,
        }
    }

    pub fn power_up_kind(&self) -> Option<PowerUpKind> {
        self.power_up.map(|p| p.kind)
    }

    pub fn has_shield(&self) -> bool {
        self.power_up_kind() == Some(PowerUpKind::Shield)
    }
}

/// A regular enemy ship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: EntityId,
    pub kind: EnemyKind,
    pub pattern: MovementPattern,
    pub pos: Vec2,
    pub vel: Vec2,
    pub health: Health,
    pub active: bool,
    pub base_speed: f32,
    pub score: u64,
    pub shoot_chance: f32,
    /// Drives zigzag flips and dive cycles
    pub move_timer_ms: f32,
    pub zigzag_dir: f32,
    pub last_shot_ms: f64,
    pub flash: Flash,
}

impl Enemy {
    pub fn new(id: EntityId, spec: &EffectiveEnemySpec, pos: Vec2, vel: Vec2) -> Self {
        Self {
            id,
            kind: spec.kind,
            pattern: spec.pattern,
            pos,
            vel,
            health: Health::new(spec.health),
            active: true,
            base_speed: spec.speed,
            score: spec.score,
            shoot_chance: spec.shoot_chance,
            move_timer_ms: 0.0,
            zigzag_dir: 1.0,
            last_shot_ms: 0.0,
            flash: Flash::default(),
        }
    }
}

/// The boss. Phase is derived from health and only recomputed on damage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boss {
    pub wave: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub health: Health,
    pub active: bool,
    pub score: u64,
    pub base_speed: f32,
    pub phase: u8,
    pub phase_config: BossPhaseConfig,
    pub entered_arena: bool,
    /// Cruising height after entry
    pub target_y: f32,
    pub move_dir: f32,
    pub last_shot_ms: f64,
    pub diving: bool,
    pub dive_timer_ms: f32,
    pub dive_return_y: f32,
    /// Climbing back to `dive_return_y` after a dive
    pub returning: bool,
    pub flash: Flash,
}

/// An asteroid or mine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: EntityId,
    pub kind: ObstacleKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub health: Health,
    pub active: bool,
    pub score: u64,
    /// Spin in radians per second (large asteroids)
    pub spin: f32,
    pub rotation: f32,
    /// Mines bob around their spawn column
    pub base_x: f32,
    pub bob_timer_s: f32,
    pub flash: Flash,
}

impl Obstacle {
    pub fn new(id: EntityId, spec: &ObstacleTypeSpec, pos: Vec2, speed: f32) -> Self {
        Self {
            id,
            kind: spec.kind,
            pos,
            vel: Vec2::new(0.0, speed),
            health: Health::new(spec.health),
            active: true,
            score: spec.score,
            spin: 0.0,
            rotation: 0.0,
            base_x: pos.x,
            bob_timer_s: 0.0,
            flash: Flash::default(),
        }
    }
}

impl_damageable!(Enemy, Boss, Obstacle);

/// Projectile behaviours
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProjectileKind {
    PlayerBullet,
    /// Enemy and boss bullets
    EnemyBullet,
    HomingMissile { travel_angle: f32, spawned_at_ms: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: EntityId,
    pub kind: ProjectileKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub active: bool,
}

impl Projectile {
    /// Damage dealt on hit
    pub fn damage(&self) -> i32 {
        1
    }

    pub fn is_hostile(&self) -> bool {
        matches!(self.kind, ProjectileKind::EnemyBullet)
    }
}

/// A power-up capsule drifting down the screen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUp {
    pub id: EntityId,
    pub kind: PowerUpKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub active: bool,
}

/// Complete simulation context
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub tuning: Tuning,
    /// Simulated time since the session began
    pub time_ms: f64,
    pub phase: GamePhase,
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub boss: Option<Boss>,
    pub obstacles: Vec<Obstacle>,
    pub projectiles: Vec<Projectile>,
    pub power_ups: Vec<PowerUp>,
    pub waves: WaveScheduler,
    pub score: ScoreState,
    pub timers: TimerQueue,
    /// Pending outbound events, drained by the frontend
    pub events: Vec<GameEvent>,
    /// Enemies may spawn once time passes this
    pub next_enemy_spawn_ms: f64,
    pub last_obstacle_spawn_ms: f64,
    next_id: EntityId,
}

impl GameState {
    /// Create a new game state with default tuning and no stored high score
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, Tuning::default(), 0)
    }

    pub fn with_tuning(seed: u64, tuning: Tuning, high_score: u64) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            player: Player::new(&tuning),
            score: ScoreState::new(high_score, tuning.combo_window_ms),
            tuning,
            time_ms: 0.0,
            phase: GamePhase::Playing,
            enemies: Vec::new(),
            boss: None,
            obstacles: Vec::new(),
            projectiles: Vec::new(),
            power_ups: Vec::new(),
            waves: WaveScheduler::new(),
            timers: TimerQueue::new(),
            events: Vec::new(),
            next_enemy_spawn_ms: 0.0,
            last_obstacle_spawn_ms: 0.0,
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn banner(&mut self, text: impl Into<String>) {
        self.emit(GameEvent::Banner { text: text.into() });
    }

    pub fn floating_text(&mut self, pos: Vec2, text: impl Into<String>, color: u32) {
        self.emit(GameEvent::FloatingText {
            pos,
            text: text.into(),
            color,
        });
    }

    pub fn shake(&mut self, duration_ms: f32, intensity: f32) {
        self.emit(GameEvent::CameraShake {
            duration_ms,
            intensity,
        });
    }

    pub fn emit_score(&mut self) {
        self.emit(GameEvent::ScoreChanged {
            score: self.score.score(),
            high_score: self.score.high_score(),
            combo: self.score.combo(),
            multiplier: self.score.multiplier(),
        });
    }

    pub fn spawn_projectile(&mut self, kind: ProjectileKind, pos: Vec2, vel: Vec2) -> EntityId {
        let id = self.next_entity_id();
        self.projectiles.push(Projectile {
            id,
            kind,
            pos,
            vel,
            active: true,
        });
        id
    }

    pub fn spawn_power_up(&mut self, kind: PowerUpKind, pos: Vec2) -> EntityId {
        let id = self.next_entity_id();
        let drift = self.tuning.power_ups.drift_speed;
        self.power_ups.push(PowerUp {
            id,
            kind,
            pos,
            vel: Vec2::new(0.0, drift),
            active: true,
        });
        id
    }

    /// Position of the player if it can still be targeted
    pub fn player_target(&self) -> Option<Vec2> {
        self.player.alive.then_some(self.player.pos)
    }

    pub fn enemy_mut(&mut self, id: EntityId) -> Option<&mut Enemy> {
        self.enemies.iter_mut().find(|e| e.id == id)
    }

    pub fn obstacle_mut(&mut self, id: EntityId) -> Option<&mut Obstacle> {
        self.obstacles.iter_mut().find(|o| o.id == id)
    }

    pub fn projectile(&self, id: EntityId) -> Option<&Projectile> {
        self.projectiles.iter().find(|p| p.id == id)
    }

    pub fn active_boss(&self) -> Option<&Boss> {
        self.boss.as_ref().filter(|b| b.active)
    }

    /// Position of a live entity
    pub fn position_of(&self, entity: EntityRef) -> Option<Vec2> {
        match entity {
            EntityRef::Player => self.player_target(),
            EntityRef::Enemy(id) => self
                .enemies
                .iter()
                .find(|e| e.id == id && e.active)
                .map(|e| e.pos),
            EntityRef::Boss => self.active_boss().map(|b| b.pos),
            EntityRef::Obstacle(id) => self
                .obstacles
                .iter()
                .find(|o| o.id == id && o.active)
                .map(|o| o.pos),
            EntityRef::Projectile(id) => self
                .projectiles
                .iter()
                .find(|p| p.id == id && p.active)
                .map(|p| p.pos),
            EntityRef::PowerUp(id) => self
                .power_ups
                .iter()
                .find(|p| p.id == id && p.active)
                .map(|p| p.pos),
        }
    }

    /// Ensure collections are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.enemies.sort_by_key(|e| e.id);
        self.obstacles.sort_by_key(|o| o.id);
        self.projectiles.sort_by_key(|p| p.id);
        self.power_ups.sort_by_key(|p| p.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_fraction() {
        let mut h = Health::new(40);
        h.take(20);
        assert_eq!(h.fraction(), 0.5);
        h.take(-5);
        assert_eq!(h.current, 20);
        h.take(25);
        assert!(h.is_depleted());
    }

    #[test]
    fn test_new_state_defaults() {
        let state = GameState::new(7);
        assert_eq!(state.player.lives, 3);
        assert!(state.player.alive);
        assert_eq!(state.player.pos, Vec2::new(400.0, 520.0));
        assert_eq!(state.waves.current_wave, 0);
        assert!(state.boss.is_none());
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_entity_ids_are_unique() {
        let mut state = GameState::new(7);
        let a = state.next_entity_id();
        let b = state.next_entity_id();
        assert_ne!(a, b);
    }
}
