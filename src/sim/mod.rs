//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering, audio or platform dependencies

pub mod boss;
pub mod collision;
pub mod combat;
pub mod events;
pub mod movement;
pub mod score;
pub mod state;
pub mod tick;
pub mod timers;
pub mod waves;

pub use collision::{CircleDetector, CollisionDetector, NoCollisions, Overlap};
pub use combat::HitOutcome;
pub use events::{GameEvent, SessionSummary, SoundCue};
pub use score::{ScoreState, combo_multiplier};
pub use state::{
    Boss, Enemy, EntityId, EntityRef, GamePhase, GameState, Obstacle, Player, PowerUp, Projectile,
    ProjectileKind,
};
pub use tick::{Simulation, TickInput, tick};
pub use timers::{TimerHandle, TimerQueue, TimerTask};
pub use waves::{WavePhase, WaveScheduler, WaveSignal};
