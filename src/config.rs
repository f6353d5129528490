//! Persisted player settings and the paths they live at.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const APP_DIR: &str = "tui-karaoke";
const SETTINGS_FILE: &str = "settings.json";
const LOG_FILE: &str = "player.log";
const MIN_INTERVAL_MS: u64 = 5;

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join(LOG_FILE)
}

pub fn settings_path() -> PathBuf {
    config_dir().join(SETTINGS_FILE)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: String,
    pub progress_interval_ms: u64,
    pub lyric_interval_ms: u64,
    pub input_poll_ms: u64,
    pub shuffle: bool,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            theme: "Default".into(),
            progress_interval_ms: 100,
            lyric_interval_ms: 20,
            input_poll_ms: 100,
            shuffle: false,
            log_level: "info".into(),
        }
    }
}

impl Settings {
    pub fn progress_interval(&self) -> Duration {
        clamp_interval(self.progress_interval_ms)
    }

    pub fn lyric_interval(&self) -> Duration {
        clamp_interval(self.lyric_interval_ms)
    }

    pub fn input_poll(&self) -> Duration {
        clamp_interval(self.input_poll_ms)
    }
}

fn clamp_interval(ms: u64) -> Duration {
    Duration::from_millis(ms.max(MIN_INTERVAL_MS))
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings from `path`. A missing file means defaults; an unreadable or
/// malformed one is an error the caller can report once logging is up.
pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Settings::default()),
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_settings(path: &Path, settings: &Settings) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)
}
