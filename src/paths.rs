/// Platform-specific locations for the collection, lock files and config
///
/// Base directories come from `dirs` (XDG on Linux, Known Folders on Windows, standard
/// directories on macOS). `SECTION_RAG_HOME` replaces the per-user data directory, which
/// keeps CI runs and tests out of the real profile.
use std::path::PathBuf;

const APP_DIR_NAME: &str = "section-rag";

/// Environment variable overriding the application data directory
pub const HOME_ENV: &str = "SECTION_RAG_HOME";

fn home_override() -> Option<PathBuf> {
    std::env::var_os(HOME_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Platform-agnostic path utilities
pub struct PlatformPaths;

impl PlatformPaths {
    /// Per-user data directory, or `.` when the platform has none
    pub fn data_dir() -> PathBuf {
        dirs::data_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Per-user config directory, or `.` when the platform has none
    pub fn config_dir() -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Returns: `$SECTION_RAG_HOME` or {data_dir}/section-rag
    pub fn project_data_dir() -> PathBuf {
        home_override().unwrap_or_else(|| Self::data_dir().join(APP_DIR_NAME))
    }

    /// Returns: {config_dir}/section-rag
    pub fn project_config_dir() -> PathBuf {
        Self::config_dir().join(APP_DIR_NAME)
    }

    /// Returns: {project_data_dir}/lancedb
    pub fn default_lancedb_path() -> PathBuf {
        Self::project_data_dir().join("lancedb")
    }

    /// Lock files live under the machine-local data directory, since flock does not
    /// travel with roaming profiles.
    ///
    /// Returns: `$SECTION_RAG_HOME/locks` or {data_local_dir}/section-rag/locks
    pub fn default_lock_dir() -> PathBuf {
        home_override()
            .unwrap_or_else(|| {
                dirs::data_local_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(APP_DIR_NAME)
            })
            .join("locks")
    }

    /// Returns: {config_dir}/section-rag/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::project_config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_dirs_not_empty() {
        assert!(!PlatformPaths::data_dir().as_os_str().is_empty());
        assert!(!PlatformPaths::config_dir().as_os_str().is_empty());
    }

    #[test]
    fn test_config_dir_is_under_platform_dir() {
        let config_dir = PlatformPaths::config_dir();
        assert!(PlatformPaths::project_config_dir().starts_with(&config_dir));
        assert!(PlatformPaths::default_config_path().ends_with("section-rag/config.toml"));
    }

    #[test]
    fn test_default_leaf_names() {
        assert!(PlatformPaths::default_lancedb_path().ends_with("lancedb"));
        assert!(PlatformPaths::default_lock_dir().ends_with("locks"));
    }

    #[test]
    fn test_data_paths_name_the_app_without_override() {
        if home_override().is_some() {
            return;
        }
        for path in [
            PlatformPaths::default_lancedb_path(),
            PlatformPaths::default_lock_dir(),
        ] {
            assert!(
                path.to_string_lossy().contains("section-rag"),
                "Path {:?} should contain 'section-rag'",
                path
            );
        }
    }
}
