use std::path::PathBuf;

use crate::domain::{AppConfig, TranscriptionError};

/// Port for configuration persistence.
pub trait ConfigStore: Send + Sync {
    /// Load the configuration, creating defaults when none exists.
    fn load(&self) -> Result<AppConfig, TranscriptionError>;

    /// Persist the configuration.
    fn save(&self, config: &AppConfig) -> Result<(), TranscriptionError>;

    /// Path to the configuration file.
    fn config_path(&self) -> PathBuf;

    /// Application data directory.
    fn data_dir(&self) -> PathBuf;

    /// Log directory.
    fn logs_dir(&self) -> PathBuf;

    /// Default directory for downloaded model assets.
    fn models_dir(&self) -> PathBuf;
}
