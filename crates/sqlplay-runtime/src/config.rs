use crate::toolkit::Toolkit;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlplay_types::Dialect;
use std::path::{Path, PathBuf};

/// Resolve the data directory based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. SQLPLAY_PATH environment variable (with tilde expansion)
/// 3. XDG data directory
/// 4. ~/.sqlplay
pub fn resolve_data_dir(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("SQLPLAY_PATH") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("sqlplay"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".sqlplay"));
    }

    Err(Error::Config(
        "Could not determine data directory: no HOME directory or XDG data directory found"
            .to_string(),
    ))
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

fn default_environment() -> String {
    "development".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Prefix of persisted image names (`<environment>-playgrounds-<tag>`).
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_dialect: Option<Dialect>,

    /// Fixed toolkit seed for reproducible runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolkit_seed: Option<u64>,

    /// Where persisted images live; `<data dir>/images` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            default_dialect: None,
            toolkit_seed: None,
            storage_dir: None,
        }
    }
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join("config.toml")
    }

    pub fn storage_dir_in(&self, data_dir: &Path) -> PathBuf {
        match &self.storage_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => data_dir.join(dir),
            None => data_dir.join("images"),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.default_dialect.unwrap_or(Dialect::Sqlite)
    }

    /// Toolkit for a run; `seed` overrides the configured seed.
    pub fn toolkit(&self, seed: Option<u64>) -> Toolkit {
        match seed.or(self.toolkit_seed) {
            Some(seed) => Toolkit::seeded(seed),
            None => Toolkit::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.environment, "development");
        assert_eq!(config.dialect(), Dialect::Sqlite);
    }

    #[test]
    fn test_config_file_round_trip() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = Config::path_in(temp_dir.path());

        let config = Config {
            environment: "test".to_string(),
            default_dialect: Some(Dialect::Postgresql),
            toolkit_seed: Some(42),
            storage_dir: Some(PathBuf::from("db")),
        };
        std::fs::write(&config_path, toml::to_string_pretty(&config).unwrap())?;

        let loaded = Config::load_from(&config_path)?;
        assert_eq!(loaded, config);
        assert_eq!(loaded.storage_dir_in(temp_dir.path()), temp_dir.path().join("db"));

        Ok(())
    }

    #[test]
    fn test_partial_file_uses_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = Config::path_in(temp_dir.path());
        std::fs::write(&config_path, "default_dialect = \"postgresql\"\n")?;

        let config = Config::load_from(&config_path)?;
        assert_eq!(config.environment, "development");
        assert_eq!(config.dialect(), Dialect::Postgresql);
        assert_eq!(config.storage_dir_in(temp_dir.path()), temp_dir.path().join("images"));

        Ok(())
    }

    #[test]
    fn test_load_nonexistent_returns_default() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config = Config::load_from(&temp_dir.path().join("nonexistent.toml"))?;
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Config::path_in(temp_dir.path());
        std::fs::write(&config_path, "environment = [").unwrap();

        assert!(matches!(Config::load_from(&config_path), Err(Error::Config(_))));
    }

    #[test]
    fn test_explicit_data_dir_wins() {
        let path = resolve_data_dir(Some("/tmp/sqlplay-explicit")).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/sqlplay-explicit"));
    }
}
