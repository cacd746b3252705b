//! Configuration loading.
//!
//! The on-disk format is picked from the file extension; JSON configs may
//! carry `//` comments. Parsing is split from file I/O so tests and the
//! SIGHUP reload path can feed raw text through [`parse_config`] directly.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::Config;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON, with `//` and `/* */` comments tolerated.
    Json,
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("json") | Some("jsonc") => Ok(ConfigFormat::Json),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            _ => Err(ConfigError::UnknownFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    fn name(self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration loading/validation error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config is not valid {format}: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    #[error("unrecognized config format: {path} (expected .json, .jsonc, .yaml, .yml or .toml)")]
    UnknownFormat { path: PathBuf },

    #[error("validation: {0}")]
    Validation(String),
}

impl ConfigError {
    fn parse<E: fmt::Display>(format: ConfigFormat, err: E) -> Self {
        ConfigError::Parse {
            format: format.name(),
            message: err.to_string(),
        }
    }
}

/// Load a [`Config`] from a file, picking the format from its extension.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&raw, format)
}

/// Parse a [`Config`] from raw text in the given format.
pub fn parse_config(raw: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    match format {
        ConfigFormat::Json => {
            let stripped = json_comments::StripComments::new(raw.as_bytes());
            serde_json::from_reader(stripped).map_err(|e| ConfigError::parse(format, e))
        }
        ConfigFormat::Yaml => serde_yaml::from_str(raw).map_err(|e| ConfigError::parse(format, e)),
        ConfigFormat::Toml => toml::from_str(raw).map_err(|e| ConfigError::parse(format, e)),
    }
}
