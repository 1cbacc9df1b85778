//! Game settings and preferences
//!
//! Presentation preferences applied to the outbound event stream. Persisted
//! as JSON next to the high score file; failures fall back to defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Screen shake on explosions/impacts
    pub screen_shake: bool,
    /// Reduced motion (suppresses shake)
    pub reduced_motion: bool,
    /// Enable debug keys (god mode toggle), on unless turned off
    pub debug_keys: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            screen_shake: true,
            reduced_motion: false,
            debug_keys: true,
        }
    }
}

impl Settings {
    /// Effective screen shake (respects reduced_motion)
    pub fn effective_screen_shake(&self) -> bool {
        self.screen_shake && !self.reduced_motion
    }

    /// Load settings from `path`, using defaults if missing or unreadable
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(Some(settings)) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Ok(None) => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(err) => {
                log::warn!("{}; using default settings", err);
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Option<Self>, StoreError> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|source| StoreError::Json {
                path: path.display().to_string(),
                source,
            })
    }

    /// Save settings to `path`. Failures are logged.
    pub fn save(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let result = serde_json::to_string_pretty(self)
            .map_err(|source| StoreError::Json {
                path: path.display().to_string(),
                source,
            })
            .and_then(|json| {
                fs::write(path, json).map_err(|source| StoreError::Io {
                    path: path.display().to_string(),
                    source,
                })
            });
        match result {
            Ok(()) => log::info!("Settings saved"),
            Err(err) => log::warn!("Failed to save settings: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduced_motion_disables_shake() {
        let settings = Settings {
            reduced_motion: true,
            ..Default::default()
        };
        assert!(settings.screen_shake);
        assert!(!settings.effective_screen_shake());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"screen_shake": false}"#).expect("json");
        assert!(!settings.screen_shake);
        assert!(settings.debug_keys);
        assert!(!settings.reduced_motion);
    }

    #[test]
    fn test_load_falls_back_on_bad_file() {
        let path = std::env::temp_dir()
            .join(format!("star_shooter_settings_{}.json", std::process::id()));
        fs::write(&path, "{").expect("write");
        assert_eq!(Settings::load(&path), Settings::default());

        let custom = Settings {
            screen_shake: false,
            ..Default::default()
        };
        custom.save(&path);
        assert_eq!(Settings::load(&path), custom);
        let _ = fs::remove_file(&path);
    }
}
