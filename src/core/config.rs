/*
 * Manages application configuration: currently the print settings (whether
 * blank pages are added for double-sided printing). Settings persist as one
 * small JSON document in the application data directory; a missing or
 * unreadable document yields the defaults, so configuration never blocks
 * startup.
 *
 * It uses a trait-based approach (`ConfigManagerOperations`) to allow mock
 * implementations for testing. The concrete implementation
 * (`CoreConfigManager`) handles the file system interaction.
 */
use crate::core::path_utils;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

const SETTINGS_FILENAME: &str = "settings.json";

fn default_pad_for_duplex() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintSettings {
    /// Add a blank page after odd-page documents so the next document
    /// starts on a fresh sheet when printing double-sided.
    #[serde(default = "default_pad_for_duplex")]
    pub pad_for_duplex: bool,
}

impl Default for PrintSettings {
    fn default() -> Self {
        PrintSettings {
            pad_for_duplex: true,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Serde(serde_json::Error),
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Serde(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Configuration I/O error: {e}"),
            ConfigError::Serde(e) => write!(f, "Configuration serialization error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Serde(e) => Some(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

pub trait ConfigManagerOperations: Send + Sync {
    fn load_print_settings(&self) -> PrintSettings;
    fn save_print_settings(&self, settings: &PrintSettings) -> Result<()>;
}

pub struct CoreConfigManager {
    data_dir: PathBuf,
}

impl CoreConfigManager {
    pub fn new(data_dir: PathBuf) -> Self {
        CoreConfigManager { data_dir }
    }

    fn settings_file_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILENAME)
    }
}

impl ConfigManagerOperations for CoreConfigManager {
    /*
     * Loads the settings document, falling back to defaults when it is
     * missing or unreadable. A malformed document is logged and replaced by
     * defaults on the next save.
     */
    fn load_print_settings(&self) -> PrintSettings {
        let file_path = self.settings_file_path();
        if !file_path.exists() {
            log::debug!("CoreConfigManager: No settings at {file_path:?}, using defaults.");
            return PrintSettings::default();
        }
        let file = match File::open(&file_path) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("CoreConfigManager: Cannot open {file_path:?}: {e}");
                return PrintSettings::default();
            }
        };
        match serde_json::from_reader(BufReader::new(file)) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("CoreConfigManager: Malformed settings {file_path:?} ({e}), using defaults.");
                PrintSettings::default()
            }
        }
    }

    fn save_print_settings(&self, settings: &PrintSettings) -> Result<()> {
        let file_path = self.settings_file_path();
        let bytes = serde_json::to_vec_pretty(settings)?;
        path_utils::write_atomically(&file_path, &bytes)?;
        log::debug!("CoreConfigManager: Saved settings to {file_path:?}.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_settings_yields_defaults() {
        let dir = tempdir().unwrap();
        let manager = CoreConfigManager::new(dir.path().to_path_buf());

        let settings = manager.load_print_settings();

        assert!(settings.pad_for_duplex, "duplex padding defaults on");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let manager = CoreConfigManager::new(dir.path().to_path_buf());
        let settings = PrintSettings {
            pad_for_duplex: false,
        };

        manager.save_print_settings(&settings).unwrap();

        assert_eq!(manager.load_print_settings(), settings);
    }

    #[test]
    fn test_malformed_settings_yield_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILENAME), b"]]").unwrap();
        let manager = CoreConfigManager::new(dir.path().to_path_buf());

        assert_eq!(manager.load_print_settings(), PrintSettings::default());
    }

    #[test]
    fn test_missing_field_defaults_on() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILENAME), b"{}").unwrap();
        let manager = CoreConfigManager::new(dir.path().to_path_buf());

        assert!(manager.load_print_settings().pad_for_duplex);
    }
}
