//! Outbound presentation events
//!
//! The simulation never draws or plays anything. It queues these and the
//! frontend drains them after each tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::tuning::PowerUpKind;

/// Sound cues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    PlayerShot,
    EnemyShot,
    Hit,
    Explosion,
    PowerUp,
    BossWarning,
    BossPhase,
    PlayerDestroyed,
    /// Stop background music (player death, boss kill)
    StopMusic,
}

/// Final numbers carried into the game-over and victory screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub score: u64,
    pub wave: u32,
    pub high_score: u64,
    pub is_new_high_score: bool,
}

/// Events emitted during simulation (for audio, HUD and effects)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Large centred message (wave start, wave complete, boss warning)
    Banner { text: String },
    /// Short-lived text at a world position
    FloatingText { pos: Vec2, text: String, color: u32 },
    CameraShake { duration_ms: f32, intensity: f32 },
    ScoreChanged { score: u64, high_score: u64, combo: u32, multiplier: u32 },
    LivesChanged { lives: u32 },
    PowerUpChanged { active: Option<PowerUpKind> },
    WaveChanged { wave: u32 },
    BossSpawned { wave: u32, health: i32 },
    BossPhaseChanged { phase: u8 },
    /// Laser beam from the player to a target this tick
    LaserBeam { from: Vec2, to: Vec2 },
    Sound(SoundCue),
    GameOver(SessionSummary),
    Victory(SessionSummary),
}

impl GameEvent {
    /// Camera shake events are optional presentation and may be filtered
    pub fn is_shake(&self) -> bool {
        matches!(self, GameEvent::CameraShake { .. })
    }
}
