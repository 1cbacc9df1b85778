//! Data-driven game balance
//!
//! Every balance table the simulation reads lives in [`Tuning`]. The defaults
//! reproduce the shipped game; a JSON document may override any subset.

use serde::{Deserialize, Serialize};

use crate::error::TuningError;

/// Arena dimensions (screen space, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

/// Player ship parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub speed: f32,
    pub lives: u32,
    /// Milliseconds between shots
    pub fire_rate_ms: f32,
    pub start_x: f32,
    pub start_y: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed: 300.0,
            lives: 3,
            fire_rate_ms: 300.0,
            start_x: 400.0,
            start_y: 520.0,
        }
    }
}

/// Projectile speeds, homing and laser parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileConfig {
    pub bullet_speed: f32,
    pub enemy_bullet_speed: f32,
    /// Horizontal speed of the side bullets in a spread volley
    pub spread_side_vx: f32,
    pub homing_speed: f32,
    /// Maximum heading change per tick (radians)
    pub homing_turn_rate: f32,
    pub homing_lifespan_ms: f32,
    /// A homing missile joins every Nth shot
    pub homing_fire_interval: u32,
    /// Continuous laser damage in HP per second
    pub laser_dps: f32,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            bullet_speed: 400.0,
            enemy_bullet_speed: 300.0,
            spread_side_vx: 50.0,
            homing_speed: 200.0,
            homing_turn_rate: 0.05,
            homing_lifespan_ms: 5000.0,
            homing_fire_interval: 3,
            laser_dps: 2.0,
        }
    }
}

/// Enemy classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    Small,
    Medium,
    Large,
    Sentinel,
}

/// Per-type movement pattern tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementPattern {
    Straight,
    Zigzag,
    Dive,
    /// Enters from a side edge and crosses the arena
    Strafe,
}

/// Static description of an enemy type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyTypeSpec {
    pub kind: EnemyKind,
    pub health: i32,
    pub speed: f32,
    pub score: u64,
    /// Probability of firing on each shot check
    pub shoot_chance: f32,
    pub pattern: MovementPattern,
}

/// An enemy type after per-wave difficulty scaling (derived, never stored in tables)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveEnemySpec {
    pub kind: EnemyKind,
    pub health: i32,
    pub speed: f32,
    pub score: u64,
    pub shoot_chance: f32,
    pub pattern: MovementPattern,
}

/// Timing constants for enemy movement and shooting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyBehaviour {
    pub shoot_cooldown_ms: f32,
    pub zigzag_period_ms: f32,
    pub zigzag_speed: f32,
    pub dive_interval_ms: f32,
    pub dive_speed_multiplier: f32,
    /// After a dive cycle restarts, fly straight down for this long
    pub dive_recover_ms: f32,
    /// Fraction of base speed a strafer drifts downward while crossing
    pub strafe_drop_fraction: f32,
}

impl Default for EnemyBehaviour {
    fn default() -> Self {
        Self {
            shoot_cooldown_ms: 2000.0,
            zigzag_period_ms: 500.0,
            zigzag_speed: 100.0,
            dive_interval_ms: 3000.0,
            dive_speed_multiplier: 2.0,
            dive_recover_ms: 500.0,
            strafe_drop_fraction: 0.25,
        }
    }
}

/// Obstacle classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    SmallAsteroid,
    LargeAsteroid,
    SpaceMine,
}

/// Static description of an obstacle type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleTypeSpec {
    pub kind: ObstacleKind,
    pub health: i32,
    pub speed_min: f32,
    pub speed_max: f32,
    pub score: u64,
}

/// One weighted entry in a wave band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandWeight<K> {
    pub kind: K,
    pub weight: f32,
}

/// Weighted type selection that applies from `from_wave` until a later band takes over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveBand<K> {
    pub from_wave: u32,
    pub weights: Vec<BandWeight<K>>,
}

impl<K: Copy> WaveBand<K> {
    /// Pick a kind using cumulative thresholds over `roll` in [0, 1)
    pub fn pick(&self, roll: f32) -> Option<K> {
        let total: f32 = self.weights.iter().map(|w| w.weight).sum();
        let target = roll * total;
        let mut acc = 0.0;
        for w in &self.weights {
            acc += w.weight;
            if target < acc {
                return Some(w.kind);
            }
        }
        self.weights.last().map(|w| w.kind)
    }
}

/// The band in force for `wave`: the one with the highest `from_wave <= wave`
pub fn band_for_wave<K>(bands: &[WaveBand<K>], wave: u32) -> Option<&WaveBand<K>> {
    bands
        .iter()
        .filter(|b| b.from_wave <= wave)
        .max_by_key(|b| b.from_wave)
}

/// Obstacle spawn cadence from a given wave onward
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleInterval {
    pub from_wave: u32,
    pub interval_ms: f32,
}

/// Boss attack/movement pattern per phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackPattern {
    SideToSide,
    Spread,
    Aggressive,
}

/// Behaviour swapped in when the boss enters a phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BossPhaseConfig {
    pub speed_multiplier: f32,
    pub shoot_cooldown_ms: f32,
    pub pattern: AttackPattern,
}

/// Boss parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossConfig {
    pub base_health: i32,
    pub health_per_wave: i32,
    pub speed: f32,
    pub score: u64,
    /// Phase 1, 2 and 3 in order
    pub phases: [BossPhaseConfig; 3],
    pub aimed_bullet_speed: f32,
    pub spread_bullet_speed: f32,
    pub aggressive_bullet_speed: f32,
    pub bob_amplitude: f32,
    /// Bob phase advances this many radians per millisecond of absolute time
    pub bob_rate: f32,
    pub dive_interval_ms: f32,
    pub dive_duration_ms: f32,
    /// Dive ends once the boss passes this fraction of the arena height
    pub dive_depth_fraction: f32,
    pub dive_speed_multiplier: f32,
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            base_health: 30,
            health_per_wave: 5,
            speed: 90.0,
            score: 500,
            phases: [
                BossPhaseConfig {
                    speed_multiplier: 1.0,
                    shoot_cooldown_ms: 1200.0,
                    pattern: AttackPattern::SideToSide,
                },
                BossPhaseConfig {
                    speed_multiplier: 1.2,
                    shoot_cooldown_ms: 800.0,
                    pattern: AttackPattern::Spread,
                },
                BossPhaseConfig {
                    speed_multiplier: 1.5,
                    shoot_cooldown_ms: 500.0,
                    pattern: AttackPattern::Aggressive,
                },
            ],
            aimed_bullet_speed: 300.0,
            spread_bullet_speed: 250.0,
            aggressive_bullet_speed: 280.0,
            bob_amplitude: 30.0,
            bob_rate: 0.003,
            dive_interval_ms: 4000.0,
            dive_duration_ms: 1500.0,
            dive_depth_fraction: 0.6,
            dive_speed_multiplier: 1.5,
        }
    }
}

impl BossConfig {
    /// Wave-scaled boss health: `base + wave * per_wave`
    pub fn health_for_wave(&self, wave: u32) -> i32 {
        self.base_health + wave as i32 * self.health_per_wave
    }
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    SpreadShot,
    RapidFire,
    Shield,
    HomingMissile,
    LaserBeam,
    BackShooter,
    Overclock,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 7] = [
        PowerUpKind::SpreadShot,
        PowerUpKind::RapidFire,
        PowerUpKind::Shield,
        PowerUpKind::HomingMissile,
        PowerUpKind::LaserBeam,
        PowerUpKind::BackShooter,
        PowerUpKind::Overclock,
    ];

    /// HUD label
    pub fn label(&self) -> &'static str {
        match self {
            PowerUpKind::SpreadShot => "SPREAD SHOT",
            PowerUpKind::RapidFire => "RAPID FIRE",
            PowerUpKind::Shield => "SHIELD",
            PowerUpKind::HomingMissile => "HOMING MISSILE",
            PowerUpKind::LaserBeam => "LASER BEAM",
            PowerUpKind::BackShooter => "BACK SHOOTER",
            PowerUpKind::Overclock => "OVERCLOCK",
        }
    }

    /// Fires at half the normal interval
    pub fn is_rapid(&self) -> bool {
        matches!(self, PowerUpKind::RapidFire | PowerUpKind::Overclock)
    }
}

/// Power-up constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUpConfig {
    pub duration_ms: f32,
    pub drift_speed: f32,
    pub drop_chance: f32,
    /// Flat pickup award, never multiplied by combo
    pub pickup_score: u64,
}

impl Default for PowerUpConfig {
    fn default() -> Self {
        Self {
            duration_ms: 8000.0,
            drift_speed: 80.0,
            drop_chance: 0.15,
            pickup_score: 25,
        }
    }
}

/// Wave progression and timing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    pub starting_enemies: u32,
    pub enemy_increase_per_wave: u32,
    pub max_enemies_per_wave: u32,
    pub delay_between_waves_ms: f32,
    pub completion_bonus: u64,
    pub boss_wave_interval: u32,
    pub boss_bonus_multiplier: u64,
    /// Delay from boss-wave start to the warning sequence
    pub boss_warning_delay_ms: f32,
    /// Length of the warning sequence before the boss appears
    pub boss_spawn_delay_ms: f32,
    pub initial_spawn_delay_ms: f32,
    pub enemy_spawn_interval_ms: f32,
    pub enemy_spawn_interval_step_ms: f32,
    pub min_enemy_spawn_interval_ms: f32,
    pub game_over_delay_ms: f32,
    pub victory_delay_ms: f32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            starting_enemies: 5,
            enemy_increase_per_wave: 2,
            max_enemies_per_wave: 20,
            delay_between_waves_ms: 2000.0,
            completion_bonus: 100,
            boss_wave_interval: 5,
            boss_bonus_multiplier: 5,
            boss_warning_delay_ms: 1500.0,
            boss_spawn_delay_ms: 3000.0,
            initial_spawn_delay_ms: 2000.0,
            enemy_spawn_interval_ms: 1500.0,
            enemy_spawn_interval_step_ms: 50.0,
            min_enemy_spawn_interval_ms: 600.0,
            game_over_delay_ms: 1000.0,
            victory_delay_ms: 2000.0,
        }
    }
}

/// Per-wave difficulty curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyScaling {
    pub speed_increase_per_wave: f32,
    pub max_speed_multiplier: f32,
    pub shoot_chance_increase_per_wave: f32,
    pub max_shoot_chance_bonus: f32,
    pub max_shoot_chance: f32,
}

impl Default for DifficultyScaling {
    fn default() -> Self {
        Self {
            speed_increase_per_wave: 0.05,
            max_speed_multiplier: 2.0,
            shoot_chance_increase_per_wave: 0.03,
            max_shoot_chance_bonus: 0.3,
            max_shoot_chance: 0.95,
        }
    }
}

impl DifficultyScaling {
    /// Scale a base enemy type for `wave`
    pub fn apply(&self, base: &EnemyTypeSpec, wave: u32) -> EffectiveEnemySpec {
        let steps = wave.saturating_sub(1) as f32;
        let speed_mult =
            (1.0 + steps * self.speed_increase_per_wave).min(self.max_speed_multiplier);
        let shoot_bonus =
            (steps * self.shoot_chance_increase_per_wave).min(self.max_shoot_chance_bonus);

        EffectiveEnemySpec {
            kind: base.kind,
            health: base.health,
            speed: (base.speed * speed_mult).round(),
            score: base.score,
            shoot_chance: (base.shoot_chance + shoot_bonus).min(self.max_shoot_chance),
            pattern: base.pattern,
        }
    }
}

/// Complete balance data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub arena: Arena,
    pub player: PlayerConfig,
    pub projectiles: ProjectileConfig,
    pub enemies: Vec<EnemyTypeSpec>,
    pub enemy_behaviour: EnemyBehaviour,
    pub enemy_bands: Vec<WaveBand<EnemyKind>>,
    pub obstacles: Vec<ObstacleTypeSpec>,
    pub obstacle_bands: Vec<WaveBand<ObstacleKind>>,
    pub obstacle_intervals: Vec<ObstacleInterval>,
    pub boss: BossConfig,
    pub power_ups: PowerUpConfig,
    pub waves: WaveConfig,
    pub difficulty: DifficultyScaling,
    /// Combo survives this long without a qualifying kill
    pub combo_window_ms: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        use EnemyKind::*;
        use ObstacleKind::*;

        Self {
            arena: Arena::default(),
            player: PlayerConfig::default(),
            projectiles: ProjectileConfig::default(),
            enemies: vec![
                EnemyTypeSpec {
                    kind: Small,
                    health: 1,
                    speed: 150.0,
                    score: 50,
                    shoot_chance: 0.0,
                    pattern: MovementPattern::Straight,
                },
                EnemyTypeSpec {
                    kind: Medium,
                    health: 2,
                    speed: 110.0,
                    score: 100,
                    shoot_chance: 0.5,
                    pattern: MovementPattern::Zigzag,
                },
                EnemyTypeSpec {
                    kind: Large,
                    health: 5,
                    speed: 75.0,
                    score: 200,
                    shoot_chance: 0.7,
                    pattern: MovementPattern::Dive,
                },
                EnemyTypeSpec {
                    kind: Sentinel,
                    health: 3,
                    speed: 120.0,
                    score: 150,
                    shoot_chance: 0.6,
                    pattern: MovementPattern::Strafe,
                },
            ],
            enemy_behaviour: EnemyBehaviour::default(),
            enemy_bands: vec![
                band(1, &[(Small, 1.0)]),
                band(3, &[(Small, 0.6), (Medium, 0.4)]),
                band(6, &[(Small, 0.4), (Medium, 0.35), (Large, 0.25)]),
            ],
            obstacles: vec![
                ObstacleTypeSpec {
                    kind: SmallAsteroid,
                    health: 1,
                    speed_min: 100.0,
                    speed_max: 140.0,
                    score: 15,
                },
                ObstacleTypeSpec {
                    kind: LargeAsteroid,
                    health: 3,
                    speed_min: 60.0,
                    speed_max: 80.0,
                    score: 30,
                },
                ObstacleTypeSpec {
                    kind: SpaceMine,
                    health: 2,
                    speed_min: 65.0,
                    speed_max: 75.0,
                    score: 40,
                },
            ],
            obstacle_bands: vec![
                band(3, &[(SmallAsteroid, 1.0)]),
                band(5, &[(SmallAsteroid, 0.6), (LargeAsteroid, 0.4)]),
                band(
                    7,
                    &[(SmallAsteroid, 0.4), (LargeAsteroid, 0.3), (SpaceMine, 0.3)],
                ),
            ],
            obstacle_intervals: vec![
                ObstacleInterval {
                    from_wave: 3,
                    interval_ms: 3000.0,
                },
                ObstacleInterval {
                    from_wave: 5,
                    interval_ms: 2000.0,
                },
                ObstacleInterval {
                    from_wave: 7,
                    interval_ms: 1500.0,
                },
            ],
            boss: BossConfig::default(),
            power_ups: PowerUpConfig::default(),
            waves: WaveConfig::default(),
            difficulty: DifficultyScaling::default(),
            combo_window_ms: 3000.0,
        }
    }
}

fn band<K: Copy>(from_wave: u32, weights: &[(K, f32)]) -> WaveBand<K> {
    WaveBand {
        from_wave,
        weights: weights
            .iter()
            .map(|&(kind, weight)| BandWeight { kind, weight })
            .collect(),
    }
}

impl Tuning {
    /// Parse and validate a (possibly partial) JSON tuning document
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Look up the base spec for an enemy kind
    pub fn enemy_spec(&self, kind: EnemyKind) -> Option<&EnemyTypeSpec> {
        self.enemies.iter().find(|e| e.kind == kind)
    }

    /// Look up the spec for an obstacle kind
    pub fn obstacle_spec(&self, kind: ObstacleKind) -> Option<&ObstacleTypeSpec> {
        self.obstacles.iter().find(|o| o.kind == kind)
    }

    /// Phase configuration for phase number 1..=3
    pub fn boss_phase(&self, phase: u8) -> &BossPhaseConfig {
        let idx = (phase.clamp(1, 3) - 1) as usize;
        &self.boss.phases[idx]
    }

    /// Check every value the simulation relies on for progress
    pub fn validate(&self) -> Result<(), TuningError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> TuningError {
            TuningError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        if self.arena.width <= 0.0 || self.arena.height <= 0.0 {
            return Err(invalid("arena", "dimensions must be positive"));
        }
        // A wave with no enemies would never see a destroy/escape and never complete
        if self.waves.starting_enemies == 0 || self.waves.max_enemies_per_wave == 0 {
            return Err(invalid("waves", "every regular wave needs at least one enemy"));
        }
        if self.waves.boss_wave_interval == 0 {
            return Err(invalid("waves.boss_wave_interval", "must be at least 1"));
        }
        if self.combo_window_ms <= 0.0 {
            return Err(invalid("combo_window_ms", "must be positive"));
        }
        if self.boss.base_health <= 0 {
            return Err(invalid("boss.base_health", "must be positive"));
        }
        if self.boss.phases.iter().any(|p| p.shoot_cooldown_ms <= 0.0) {
            return Err(invalid("boss.phases", "shoot cooldowns must be positive"));
        }
        if self.projectiles.homing_fire_interval == 0 {
            return Err(invalid("projectiles.homing_fire_interval", "must be at least 1"));
        }
        if band_for_wave(&self.enemy_bands, 1).is_none() {
            return Err(invalid("enemy_bands", "no band covers wave 1"));
        }
        for b in &self.enemy_bands {
            if b.weights.is_empty() || b.weights.iter().any(|w| w.weight < 0.0) {
                return Err(invalid(
                    "enemy_bands",
                    format!("bad weights from wave {}", b.from_wave),
                ));
            }
            if let Some(w) = b.weights.iter().find(|w| self.enemy_spec(w.kind).is_none()) {
                return Err(invalid("enemy_bands", format!("{:?} has no enemy spec", w.kind)));
            }
        }
        for b in &self.obstacle_bands {
            if b.weights.is_empty() || b.weights.iter().any(|w| w.weight < 0.0) {
                return Err(invalid(
                    "obstacle_bands",
                    format!("bad weights from wave {}", b.from_wave),
                ));
            }
            if let Some(w) = b.weights.iter().find(|w| self.obstacle_spec(w.kind).is_none()) {
                return Err(invalid("obstacle_bands", format!("{:?} has no obstacle spec", w.kind)));
            }
        }
        if self.obstacles.iter().any(|o| o.speed_min > o.speed_max) {
            return Err(invalid("obstacles", "speed_min exceeds speed_max"));
        }
        Ok(())
    }
}
