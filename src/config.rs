//! Engine configuration
//!
//! Behavior knobs that template authors may want to set per project,
//! loadable from TOML.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading or parsing an engine config
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read engine config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse engine config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Default configuration document
const DEFAULT_CONFIG: &str = r#"
# Registered custom parameter callbacks fire for every registered tag,
# even when the caller supplied no value for it. Set to false to only
# fire for tags present in the argument map.
inject-registered-params = true

# Attribute names whose values are HTML-attribute-escaped when composed.
sensitive-attributes = ["href", "src", "action", "formaction", "style"]

# File extensions the directory finder indexes as template sources.
template-extensions = ["toml"]
"#;

/// Tunable engine behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Whether registered custom parameter callbacks fire for tags absent
    /// from the argument map
    #[serde(default = "default_inject")]
    pub inject_registered_params: bool,
    /// Attribute names whose values get HTML-attribute escaping
    #[serde(default = "default_sensitive")]
    pub sensitive_attributes: Vec<String>,
    /// Extensions of files considered template sources
    #[serde(default = "default_extensions")]
    pub template_extensions: Vec<String>,
}

fn default_inject() -> bool {
    true
}

fn default_sensitive() -> Vec<String> {
    ["href", "src", "action", "formaction", "style"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_extensions() -> Vec<String> {
    vec!["toml".to_string()]
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_str(DEFAULT_CONFIG).expect("Default engine config should be valid TOML")
    }
}
