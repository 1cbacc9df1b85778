//! Star Shooter - simulation core for a vertical arcade shooter
//!
//! Core modules:
//! - `sim`: Deterministic simulation (waves, boss phases, combat, scoring)
//! - `tuning`: Data-driven game balance
//! - `highscores`: High score persistence
//! - `settings`: Presentation preferences applied to outbound events
//!
//! Rendering, audio and input polling live outside this crate. They feed a
//! [`sim::TickInput`] and collision reports in, and consume [`sim::GameEvent`]s
//! and the read-only [`sim::GameState`].

pub mod error;
pub mod highscores;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use error::{SpawnError, StoreError, TuningError};
pub use highscores::{HighScoreStore, JsonFileStore, MemoryStore};
pub use settings::Settings;
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep used by the headless driver (60 Hz)
    pub const SIM_DT_MS: f32 = 1000.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Margin past the arena edge before a player bullet is discarded
    pub const BULLET_CULL_MARGIN: f32 = 10.0;
    /// Margin past the arena edge before a homing missile self-destructs
    pub const HOMING_CULL_MARGIN: f32 = 20.0;
    /// Margin below the arena before an enemy counts as escaped
    pub const ENEMY_ESCAPE_MARGIN: f32 = 50.0;
    /// Margin below the arena before a power-up is discarded
    pub const POWERUP_CULL_MARGIN: f32 = 50.0;
    /// Margin below the arena before an obstacle is discarded
    pub const OBSTACLE_CULL_MARGIN: f32 = 60.0;

    /// Player is kept this far inside the arena edges
    pub const PLAYER_EDGE_PADDING: f32 = 20.0;
    /// Boss bounces between this inset and `width - inset`
    pub const BOSS_EDGE_INSET: f32 = 80.0;
    /// Boss settles at this height after entering
    pub const BOSS_ARENA_Y: f32 = 80.0;
    /// Boss descent speed while entering the arena
    pub const BOSS_ENTRY_SPEED: f32 = 60.0;
    /// Boss bullets leave from this offset below its centre
    pub const BOSS_MUZZLE_OFFSET: f32 = 40.0;

    /// Small asteroids drift sideways up to this speed
    pub const SMALL_ASTEROID_DRIFT: f32 = 30.0;
    /// Large asteroid spin range (rad/s)
    pub const LARGE_ASTEROID_MAX_SPIN: f32 = 1.0;
    /// Space mine horizontal bob
    pub const MINE_BOB_AMPLITUDE: f32 = 40.0;
    pub const MINE_BOB_FREQUENCY: f32 = 2.0;

    /// Collision radii used by the reference circle detector
    pub const PLAYER_RADIUS: f32 = 16.0;
    pub const BOSS_RADIUS: f32 = 60.0;
    pub const BULLET_RADIUS: f32 = 4.0;
    pub const HOMING_RADIUS: f32 = 6.0;
    pub const POWERUP_RADIUS: f32 = 14.0;

    /// Damage flash duration for enemies and obstacles (ms)
    pub const FLASH_MS: f32 = 100.0;
    /// Damage flash duration for the boss (ms)
    pub const BOSS_FLASH_MS: f32 = 80.0;

    /// Text colours for floating text
    pub const COLOR_SCORE: u32 = 0xffff00;
    pub const COLOR_INFO: u32 = 0x00ffff;
    pub const COLOR_ALERT: u32 = 0xff4444;
    pub const COLOR_GOOD: u32 = 0x00ff00;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Bearing from `from` to `to` in screen space (y grows downward)
#[inline]
pub fn bearing(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.y.atan2(d.x)
}

/// Velocity of magnitude `speed` along `angle`
#[inline]
pub fn velocity_from_angle(angle: f32, speed: f32) -> Vec2 {
    Vec2::new(angle.cos() * speed, angle.sin() * speed)
}
