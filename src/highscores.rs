//! High score persistence
//!
//! The simulation keeps the live high score in [`crate::sim::ScoreState`];
//! a [`HighScoreStore`] only loads it at session start and saves it when it
//! changes. Store failures are logged by the caller and never stop play.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Key the high score is stored under
pub const HIGH_SCORE_KEY: &str = "star_shooter_high_score";

/// Persistence collaborator for the single best score
pub trait HighScoreStore {
    /// Stored high score, or 0 when nothing has been saved yet
    fn load(&self) -> Result<u64, StoreError>;
    fn save(&mut self, high_score: u64) -> Result<(), StoreError>;
}

/// Keeps the high score in memory (tests, demos)
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    high_score: u64,
}

impl MemoryStore {
    pub fn new(high_score: u64) -> Self {
        Self { high_score }
    }
}

impl HighScoreStore for MemoryStore {
    fn load(&self) -> Result<u64, StoreError> {
        Ok(self.high_score)
    }

    fn save(&mut self, high_score: u64) -> Result<(), StoreError> {
        self.high_score = high_score;
        Ok(())
    }
}

/// JSON document of string keys, shared with other values a front end may keep
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<BTreeMap<String, serde_json::Value>, StoreError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.display().to_string(),
                    source,
                });
            }
        };
        serde_json::from_str(&json).map_err(|source| StoreError::Json {
            path: self.path.display().to_string(),
            source,
        })
    }
}

impl HighScoreStore for JsonFileStore {
    fn load(&self) -> Result<u64, StoreError> {
        let doc = self.read_document()?;
        let high_score = doc.get(HIGH_SCORE_KEY).and_then(|v| v.as_u64()).unwrap_or(0);
        log::info!("Loaded high score {} from {}", high_score, self.path.display());
        Ok(high_score)
    }

    fn save(&mut self, high_score: u64) -> Result<(), StoreError> {
        let mut doc = self.read_document()?;
        doc.insert(HIGH_SCORE_KEY.to_string(), high_score.into());
        let path = self.path.display().to_string();
        let json = serde_json::to_string_pretty(&doc).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&self.path, json).map_err(|source| StoreError::Io { path, source })?;
        log::debug!("High score {} saved", high_score);
        Ok(())
    }
}
