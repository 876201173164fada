use crate::app_dirs::AppDirs;
use crate::difficulty::Difficulty;
use crate::progress::DEFAULT_MAX_HISTORY;
use crate::selector::DEFAULT_WEAKEST_COUNT;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_USER: &str = "local";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub difficulty: Difficulty,
    pub max_history: usize,
    pub weakest_count: usize,
    pub user_id: String,
    pub db_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            max_history: DEFAULT_MAX_HISTORY,
            weakest_count: DEFAULT_WEAKEST_COUNT,
            user_id: DEFAULT_USER.to_string(),
            db_path: None,
        }
    }
}

impl Config {
    /// Configured database path, else the per-user state directory.
    pub fn resolved_db_path(&self) -> Option<PathBuf> {
        self.db_path.clone().or_else(AppDirs::db_path)
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("morse-coach.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Missing or unreadable files give the defaults.
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("ignoring config at {}: {e}", self.path.display());
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, data)
    }
}
