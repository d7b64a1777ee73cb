mod validation;

pub use validation::*;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::provider::{RequestParameters, PASSWORD_ATTRIBUTE};

/// Maximum size for a config file (1 MB).
pub const MAX_CONFIG_FILE_BYTES: u64 = 1024 * 1024;

/// Top-level cpclient configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// The account to address and how to ask for it.
    #[serde(default)]
    pub request: RequestParameters,
    /// Attributes fetched when none are given on the command line.
    #[serde(default = "default_attributes")]
    pub attributes: Vec<String>,
}

fn default_attributes() -> Vec<String> {
    vec![PASSWORD_ATTRIBUTE.to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request: RequestParameters::default(),
            attributes: default_attributes(),
        }
    }
}

impl Config {
    /// Load configuration from file, environment, and defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let explicit = path.map(PathBuf::from);
        let config_path = explicit.clone().or_else(find_config_file);

        let mut config = match config_path {
            Some(path) if path.exists() => {
                info!("Loading config from {}", path.display());
                load_config_file(&path)?
            }
            Some(path) if explicit.is_some() => {
                bail!("Config file '{}' does not exist", path.display());
            }
            _ => {
                info!("No config file found, using defaults");
                Config::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Write default configuration to a file.
    pub fn write_default(path: &str) -> Result<()> {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config)?;
        std::fs::write(path, json)
            .with_context(|| format!("Cannot write config file '{path}'"))?;
        Ok(())
    }

    /// Apply environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(app_id) = lookup("CPCLIENT_APP_ID") {
            self.request.app_id = app_id;
        }

        if let Some(safe) = lookup("CPCLIENT_SAFE") {
            self.request.safe = safe;
        }

        if let Some(folder) = lookup("CPCLIENT_FOLDER") {
            self.request.folder = Some(folder).filter(|f| !f.is_empty());
        }

        if let Some(object) = lookup("CPCLIENT_OBJECT") {
            self.request.object = object;
        }

        if let Some(reason) = lookup("CPCLIENT_REASON") {
            self.request.reason = Some(reason).filter(|r| !r.is_empty());
        }

        if let Some(attrs) = lookup("CPCLIENT_ATTRIBUTES") {
            let attrs: Vec<String> = attrs
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(String::from)
                .collect();
            if !attrs.is_empty() {
                self.attributes = attrs;
            }
        }
    }
}

/// Find the configuration file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    let candidates = [
        PathBuf::from("cpclient.json"),
        PathBuf::from("cpclient.yaml"),
        PathBuf::from("cpclient.yml"),
        PathBuf::from("cpclient.toml"),
    ];

    for path in &candidates {
        if path.exists() {
            return Some(path.clone());
        }
    }

    // Check home directory
    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".cpclient").join("config.json");
        if home_config.exists() {
            return Some(home_config);
        }
    }

    None
}

/// Load configuration from a file path.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Cannot stat config file '{}'", path.display()))?;
    if metadata.len() > MAX_CONFIG_FILE_BYTES {
        bail!(
            "Config file '{}' is {} bytes, exceeds limit of {} bytes",
            path.display(),
            metadata.len(),
            MAX_CONFIG_FILE_BYTES,
        );
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read config file '{}'", path.display()))?;

    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        _ => {
            // Try JSON5 first, then regular JSON
            json5::from_str(&content).or_else(|_| {
                serde_json::from_str(&content).map_err(|e| json5::Error::Message {
                    msg: e.to_string(),
                    location: None,
                })
            })?
        }
    };

    Ok(config)
}
