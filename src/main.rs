//! Star Shooter headless driver
//!
//! Runs one autopilot session at a fixed 60 Hz step and prints the result.
//!
//! Usage: `star-shooter [seed] [tuning.json]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use star_shooter::consts::SIM_DT_MS;
    use star_shooter::sim::{CircleDetector, GameEvent, GamePhase, Simulation, TickInput};
    use star_shooter::{JsonFileStore, Settings, Tuning};

    /// Simulated time cap for one session
    const MAX_SESSION_MS: f64 = 10.0 * 60.0 * 1000.0;

    env_logger::init();
    log::info!("Star Shooter (headless) starting...");

    let mut args = std::env::args().skip(1);
    let seed = args
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0x5eed);

    let tuning = match args.next() {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(json) => Tuning::from_json(&json).unwrap_or_else(|err| {
                log::error!("{}; using default tuning", err);
                Tuning::default()
            }),
            Err(err) => {
                log::error!("Failed to read {}: {}; using default tuning", path, err);
                Tuning::default()
            }
        },
        None => Tuning::default(),
    };

    let data_dir = std::env::temp_dir();
    let settings = Settings::load(data_dir.join("star_shooter_settings.json"));
    let store = JsonFileStore::new(data_dir.join("star_shooter_scores.json"));
    let mut sim = Simulation::new(seed, tuning, Box::new(store), settings);

    let input = TickInput {
        autopilot: true,
        ..Default::default()
    };
    let mut detector = CircleDetector;

    while sim.state().time_ms < MAX_SESSION_MS {
        sim.tick(&input, SIM_DT_MS, &mut detector);

        for event in sim.drain_events() {
            match event {
                GameEvent::Banner { text } => log::info!("[banner] {}", text.replace('\n', " ")),
                GameEvent::BossPhaseChanged { phase } => log::info!("[boss] phase {}", phase),
                GameEvent::GameOver(summary) | GameEvent::Victory(summary) => {
                    println!(
                        "score {}  wave {}  high score {}{}",
                        summary.score,
                        summary.wave,
                        summary.high_score,
                        if summary.is_new_high_score { "  (new!)" } else { "" }
                    );
                }
                _ => {}
            }
        }

        if matches!(sim.state().phase, GamePhase::GameOver | GamePhase::Victory) {
            break;
        }
    }

    let state = sim.state();
    log::info!(
        "Session ended in {:?} after {:.1}s (seed {})",
        state.phase,
        state.time_ms / 1000.0,
        seed
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {}
