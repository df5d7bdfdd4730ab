use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Where the `preferences` and `stats` records live.
    pub fn data_dir() -> PathBuf {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "typomaster") {
            proj_dirs.data_dir().to_path_buf()
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("typomaster")
        } else {
            PathBuf::from("typomaster_data")
        }
    }

    pub fn log_path(data_dir: &std::path::Path) -> PathBuf {
        data_dir.join("typomaster.log")
    }
}
