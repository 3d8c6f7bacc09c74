use crate::settings::config::LoaderSettings;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const SETTINGS_FILE_NAME: &str = "gsfloader.toml";

/// Settings for one loaded module. They are read once when the bridge is
/// constructed and never change afterwards; editing the file takes effect on
/// the next process start.
#[derive(Debug, Clone)]
pub struct SettingsManager {
    settings_path: PathBuf,
    settings: LoaderSettings,
}

impl SettingsManager {
    /// Load `gsfloader.toml` from the module directory, with relative paths
    /// anchored to that directory.
    pub fn from_module_dir(root: &Path) -> Result<Self> {
        let mut manager = Self::from_path(root.join(SETTINGS_FILE_NAME))?;
        manager.settings = manager.settings.resolve_paths(root);
        Ok(manager)
    }

    /// Create a settings manager from a specific path. A missing file yields
    /// the defaults; nothing is written next to the game files.
    pub fn from_path(path: PathBuf) -> Result<Self> {
        let settings = Self::load_from_file_with_backup(&path)?;
        Ok(Self {
            settings_path: path,
            settings,
        })
    }

    /// Load settings from a TOML file with backup on parse failure
    fn load_from_file_with_backup(path: &Path) -> Result<LoaderSettings> {
        if !path.exists() {
            return Ok(LoaderSettings::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {path:?}"))?;

        match toml::from_str(&contents) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                // Move corrupted file to backup
                let backup_path = path.with_extension("toml.backup");
                warn!(
                    "Settings at {:?} are invalid ({}), moving them to {:?}",
                    path, e, backup_path
                );
                fs::rename(path, &backup_path).with_context(|| {
                    format!("Failed to backup corrupted settings to {backup_path:?}")
                })?;

                Ok(LoaderSettings::default())
            }
        }
    }

    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    pub fn into_settings(self) -> LoaderSettings {
        self.settings
    }

    /// Get the settings file path
    pub fn path(&self) -> &Path {
        &self.settings_path
    }
}
