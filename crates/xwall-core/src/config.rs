use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auto_pause::AutoPauseToggles;

pub const MIN_MONITOR_INTERVAL: f64 = 0.5;
pub const MAX_MONITOR_INTERVAL: f64 = 5.0;
pub const MONITOR_INTERVAL_STEP: f64 = 0.5;
const DEFAULT_MONITOR_INTERVAL: f64 = 1.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no per-user config directory available")]
    NoConfigDir,
    #[error("cannot access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Persisted user preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_muted: bool,
    pub enable_bounce: bool,
    pub auto_pause_on_fullscreen: bool,
    pub auto_pause_in_background: bool,
    pub launch_with_app: bool,
    pub join_all_spaces: bool,
    /// Seconds between monitor ticks.
    pub monitor_interval: f64,
    pub launch_at_login: bool,
    /// Absolute path of the last loaded video, empty when none.
    pub last_video_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_muted: true,
            enable_bounce: true,
            auto_pause_on_fullscreen: true,
            auto_pause_in_background: true,
            launch_with_app: true,
            join_all_spaces: true,
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            launch_at_login: false,
            last_video_path: String::new(),
        }
    }
}

impl Settings {
    pub fn auto_pause(&self) -> AutoPauseToggles {
        AutoPauseToggles {
            on_fullscreen: self.auto_pause_on_fullscreen,
            in_background: self.auto_pause_in_background,
        }
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs_f64(snap_interval(self.monitor_interval))
    }

    pub fn last_video(&self) -> Option<&Path> {
        if self.last_video_path.is_empty() {
            None
        } else {
            Some(Path::new(&self.last_video_path))
        }
    }

    /// Brings hand-edited values back into their allowed ranges.
    pub fn normalize(&mut self) {
        self.monitor_interval = snap_interval(self.monitor_interval);
    }
}

/// Clamps to 0.5–5.0 and snaps to the nearest half second.
pub fn snap_interval(seconds: f64) -> f64 {
    if !seconds.is_finite() {
        return DEFAULT_MONITOR_INTERVAL;
    }
    let clamped = seconds.clamp(MIN_MONITOR_INTERVAL, MAX_MONITOR_INTERVAL);
    (clamped / MONITOR_INTERVAL_STEP).round() * MONITOR_INTERVAL_STEP
}

/// Owns the settings and their file. Every mutation is written through.
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
    modified: Option<SystemTime>,
}

impl SettingsStore {
    /// `<config_dir>/xwall/settings.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("xwall").join("settings.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Loads the file, or starts from defaults when it is missing or broken.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::load(&path) {
            Ok(store) => store,
            Err(err) => {
                warn!("settings at {} unusable, using defaults: {err}", path.display());
                Self {
                    path,
                    settings: Settings::default(),
                    modified: None,
                }
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("no settings at {}, starting from defaults", path.display());
            return Ok(Self {
                path: path.to_path_buf(),
                settings: Settings::default(),
                modified: None,
            });
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings: Settings = toml::from_str(&contents)?;
        settings.normalize();
        Ok(Self {
            path: path.to_path_buf(),
            settings,
            modified: modified_time(path),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Applies `change` in memory and persists the result. The in-memory
    /// value is kept even when writing fails.
    pub fn update<F>(&mut self, change: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut Settings),
    {
        change(&mut self.settings);
        self.settings.normalize();
        self.save()
    }

    pub fn save(&mut self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let contents = toml::to_string_pretty(&self.settings)?;
        fs::write(&self.path, contents).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.modified = modified_time(&self.path);
        debug!("settings saved to {}", self.path.display());
        Ok(())
    }

    /// Reloads when the file changed on disk since the last load or save.
    /// Returns the previous settings when a reload happened. A file that
    /// fails to parse keeps the current settings until it changes again.
    pub fn reload_if_changed(&mut self) -> Result<Option<Settings>, ConfigError> {
        let current = modified_time(&self.path);
        if current.is_none() || current == self.modified {
            return Ok(None);
        }
        // A broken edit is reported once, not on every poll.
        self.modified = current;
        let reloaded = Self::load(&self.path)?;
        let previous = std::mem::replace(&mut self.settings, reloaded.settings);
        self.modified = reloaded.modified;
        info!("settings reloaded from {}", self.path.display());
        Ok(Some(previous))
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}
