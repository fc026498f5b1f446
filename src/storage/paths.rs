//! Application paths for config and cache.

use directories::ProjectDirs;
use std::path::PathBuf;

/// Application paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Configuration directory.
    pub config: PathBuf,
    /// Cache directory.
    pub cache: PathBuf,
}

impl AppPaths {
    /// Create paths for the activity-store application.
    #[must_use]
    pub fn new() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("dev", "activity-store", "activity-store") {
            Self {
                config: proj_dirs.config_dir().to_path_buf(),
                cache: proj_dirs.cache_dir().to_path_buf(),
            }
        } else {
            // Fallback to home directory
            let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            Self {
                config: home.join(".config/activity-store"),
                cache: home.join(".cache/activity-store"),
            }
        }
    }

    /// Path to the optional TOML config file.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }

    /// Root directory of the activity caches.
    #[must_use]
    pub fn store_root(&self) -> PathBuf {
        self.cache.join("store")
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

/// Module-level function for accessing dirs crate.
mod dirs {
    use std::path::PathBuf;

    pub fn home_dir() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_paths_live_under_base_dirs() {
        let paths = AppPaths::new();
        assert!(paths.config_file().starts_with(&paths.config));
        assert!(paths.store_root().starts_with(&paths.cache));
        assert_eq!(paths.config_file().file_name().unwrap(), "config.toml");
    }
}
