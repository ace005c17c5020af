//! Settings manager for loading, saving, and sharing player settings

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use super::ToolSettings;

/// Shared settings manager type
pub type SharedSettings = Arc<RwLock<SettingsManager>>;

/// Settings persistence errors
#[derive(Debug, Clone, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialize(String),
}

/// Owns the player settings and their file
pub struct SettingsManager {
    settings: ToolSettings,
    settings_path: PathBuf,
    dirty: bool,
}

impl SettingsManager {
    /// Load from the OS config directory, falling back to defaults
    pub fn new() -> Self {
        Self::with_path(Self::default_path())
    }

    /// Load from a specific file, falling back to defaults
    pub fn with_path(settings_path: PathBuf) -> Self {
        let settings = Self::load_from_path(&settings_path).unwrap_or_else(|| {
            tracing::info!("No settings file found, using defaults");
            ToolSettings::default()
        });

        Self {
            settings,
            settings_path,
            dirty: false,
        }
    }

    fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sightline")
            .join("settings.ron")
    }

    fn load_from_path(path: &Path) -> Option<ToolSettings> {
        let content = std::fs::read_to_string(path).ok()?;
        match ron::from_str(&content) {
            Ok(settings) => {
                tracing::info!("Loaded settings from {:?}", path);
                Some(settings)
            }
            Err(e) => {
                tracing::warn!("Failed to parse settings file: {}", e);
                None
            }
        }
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    /// Mutable access, marks the settings as dirty
    pub fn settings_mut(&mut self) -> &mut ToolSettings {
        self.dirty = true;
        &mut self.settings
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write to disk if anything changed
    pub fn save(&mut self) -> Result<(), SettingsError> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = self.settings_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io(e.to_string()))?;
        }

        let content = ron::ser::to_string_pretty(&self.settings, ron::ser::PrettyConfig::default())
            .map_err(|e| SettingsError::Serialize(e.to_string()))?;

        std::fs::write(&self.settings_path, &content)
            .map_err(|e| SettingsError::Io(e.to_string()))?;

        tracing::info!("Saved settings to {:?}", self.settings_path);
        self.dirty = false;
        Ok(())
    }

    pub fn reset_to_defaults(&mut self) {
        self.settings = ToolSettings::default();
        self.dirty = true;
    }

    pub fn settings_file_path(&self) -> &Path {
        &self.settings_path
    }
}

impl Default for SettingsManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a shared settings manager backed by the OS config directory
pub fn create_shared_settings() -> SharedSettings {
    Arc::new(RwLock::new(SettingsManager::new()))
}
