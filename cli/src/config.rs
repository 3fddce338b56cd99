use anyhow::{Context, Result};
use cutsistent_core::calendar::DayBoundary;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User-editable settings stored in `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Username used when `--user` is not given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Which clock decides where one day ends: `local`, `utc`, or an offset like `+05:30`.
    pub day_boundary: DayBoundary,
}

impl Settings {
    /// Read settings from `path`. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }
}

pub struct Config {
    pub db_path: PathBuf,
    pub config_path: PathBuf,
    pub settings: Settings,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("", "", "cutsistent")
            .context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("cutsistent.db");
        let config_path = proj_dirs.config_dir().join("config.toml");
        let settings = Settings::from_file(&config_path)?;
        tracing::debug!(
            db = %db_path.display(),
            config = %config_path.display(),
            day_boundary = %settings.day_boundary,
            "loaded config"
        );

        Ok(Config {
            db_path,
            config_path,
            settings,
        })
    }

    /// Remember `username` as the default profile.
    pub fn set_default_user(&mut self, username: &str) -> Result<()> {
        self.settings.user = Some(username.to_string());
        self.settings.save_to_file(&self.config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::from_file(&dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.day_boundary, DayBoundary::Local);
    }

    #[test]
    fn test_parse_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "user = \"alice\"\nday_boundary = \"+05:30\"\n").unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.user.as_deref(), Some("alice"));
        assert_eq!(settings.day_boundary, DayBoundary::Fixed(5 * 3600 + 30 * 60));
    }

    #[test]
    fn test_invalid_boundary_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "day_boundary = \"mars\"\n").unwrap();
        assert!(Settings::from_file(&path).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let settings = Settings {
            user: Some("bob".to_string()),
            day_boundary: DayBoundary::Utc,
        };
        settings.save_to_file(&path).unwrap();
        assert_eq!(Settings::from_file(&path).unwrap(), settings);
    }
}
