use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Named set of sync options from the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Profile {
    pub source: Option<String>,
    pub destination: Option<String>,
    pub bidirectional: Option<bool>,
    pub checksum: Option<bool>,
    pub quiet: Option<bool>,
    pub verbose: Option<u8>,
    pub log_file: Option<String>,
}

/// Settings for `--serve`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    pub bind: String,
    pub port: u16,
    pub web_root: Option<String>,
    pub log_file: String,
    pub checksum: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
            web_root: None,
            log_file: "sync.log".to_string(),
            checksum: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub profiles: BTreeMap<String, Profile>,
    pub server: ServerSettings,
}

impl Config {
    /// `~/.config/dirsync/config.toml`
    pub fn config_path() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or_else(|| {
            SyncError::Config("Cannot determine config directory (HOME not set)".to_string())
        })?;
        Ok(base.join("dirsync").join("config.toml"))
    }

    /// Load the user config; a missing file is an empty config
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text)
                .map_err(|e| SyncError::Config(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {}", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(SyncError::Config(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn list_profiles(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    pub fn get_profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Profile rendered back as TOML for `--show-profile`
    pub fn show_profile(&self, name: &str) -> Option<String> {
        let profile = self.profiles.get(name)?;
        let body = toml::to_string_pretty(profile).ok()?;
        Some(format!("[profiles.{}]\n{}", name, body))
    }
}
