use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "morse-coach";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/morse-coach/progress.db`, else the platform data dir.
    pub fn db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join(APP_NAME);
            Some(state_dir.join("progress.db"))
        } else {
            ProjectDirs::from("", "", APP_NAME)
                .map(|proj_dirs| proj_dirs.data_local_dir().join("progress.db"))
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|pd| pd.config_dir().join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_app_scoped() {
        if let Some(db) = AppDirs::db_path() {
            assert!(db.to_string_lossy().contains(APP_NAME));
            assert!(db.ends_with("progress.db"));
        }
        if let Some(cfg) = AppDirs::config_path() {
            assert!(cfg.ends_with("config.json"));
        }
    }
}
