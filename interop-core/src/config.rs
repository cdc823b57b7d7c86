use std::path::Path;

use fs_err as fs;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainConverter, DEFAULT_TZONE};
use crate::registry::OnConflict;
use crate::types::{MarshalError, Result};

pub const CONFIG_FILE_NAME: &str = "interop.toml";

fn default_converters() -> Vec<DomainConverter> {
    DomainConverter::ALL.to_vec()
}

fn default_tzone() -> String {
    DEFAULT_TZONE.to_string()
}

/// Registry configuration, stored in `interop.toml`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Domain converters registered on top of the built-ins, in order.
    #[serde(default = "default_converters")]
    pub converters: Vec<DomainConverter>,
    /// What to do when a converter is registered twice for the same type
    #[serde(default)]
    pub on_conflict: OnConflict,
    /// Written by datetime and xts lifts when the value has no time zone
    #[serde(default = "default_tzone")]
    pub default_tzone: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            converters: default_converters(),
            on_conflict: OnConflict::default(),
            default_tzone: default_tzone(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| MarshalError::from(e).with_context(format!("failed to parse {}", path.display())))?;
        Ok(config)
    }

    pub fn save(&self, directory: impl AsRef<Path>) -> Result<()> {
        let config_path = directory.as_ref().join(CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(&self)?;
        fs::write(&config_path, content)?;
        log::info!("Configuration saved to {}", config_path.display());
        Ok(())
    }

    /// Walk up from `current_directory` looking for `interop.toml`.
    pub fn find(current_directory: impl AsRef<Path>) -> Option<Result<Self>> {
        for dir in current_directory.as_ref().ancestors() {
            let config_path = dir.join(CONFIG_FILE_NAME);
            log::debug!("Looking for config at {}", config_path.display());
            if config_path.is_file() {
                return Some(Config::load(&config_path));
            }
        }
        log::debug!("No {} found", CONFIG_FILE_NAME);
        None
    }
}
