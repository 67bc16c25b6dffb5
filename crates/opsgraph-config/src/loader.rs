//! Configuration loading utilities

use crate::Config;
use opsgraph_common::{LogFormat, OpsGraphError, Result as OpsGraphResult};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "OPSGRAPH_CONFIG_PATH";

/// Files checked, in order, when no explicit path is given.
pub const DEFAULT_CONFIG_FILES: [&str; 3] = ["opsgraph.yaml", "opsgraph.yml", "opsgraph.toml"];

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error when reading configuration file
    #[error("Failed to read configuration file '{}': {source}", .path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parsing error
    #[error("Failed to parse YAML configuration: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("Failed to parse TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Environment variable parsing error
    #[error("Failed to parse environment variable '{var}': {message}")]
    EnvParseError { var: String, message: String },

    /// Semantic validation failed after loading
    #[error("Configuration validation failed: {0}")]
    ValidationError(#[source] OpsGraphError),
}

impl From<ConfigError> for OpsGraphError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ValidationError(inner) => inner,
            other => OpsGraphError::config_with_source("configuration could not be loaded", other),
        }
    }
}

/// Configuration loader for the application
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML or TOML file with environment overrides.
    ///
    /// Files ending in `.toml` are parsed as TOML, anything else as YAML.
    pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(path, &content)?;
        debug!(path = %path.display(), "Parsed configuration file");

        Self::apply_overrides(&mut config, |key| env::var(key).ok())?;
        config.validate().map_err(ConfigError::ValidationError)?;

        Ok(config)
    }

    /// Load configuration from the environment and well-known files.
    ///
    /// `OPSGRAPH_CONFIG_PATH` wins, then the first existing default file in
    /// the working directory, then built-in defaults.
    pub fn load() -> OpsGraphResult<Config> {
        if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            info!(path = %config_path, "Loading configuration from {CONFIG_PATH_ENV}");
            return Ok(Self::load_config(&config_path)?);
        }

        if let Some(found) = DEFAULT_CONFIG_FILES.iter().map(Path::new).find(|p| p.exists()) {
            info!(path = %found.display(), "Loading configuration file");
            return Ok(Self::load_config(found)?);
        }

        info!("No configuration file found, using defaults");
        Self::from_defaults(|key| env::var(key).ok())
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> OpsGraphResult<Config> {
        Ok(Self::load_config(path)?)
    }

    /// Built-in defaults with overrides resolved through `lookup`.
    pub fn from_defaults<F>(lookup: F) -> OpsGraphResult<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        Self::apply_overrides(&mut config, lookup)?;
        config.validate()?;
        Ok(config)
    }

    fn parse(path: &Path, content: &str) -> Result<Config, ConfigError> {
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        if is_toml {
            Ok(toml::from_str(content)?)
        } else {
            Ok(serde_yaml::from_str(content)?)
        }
    }

    /// Apply `OPSGRAPH_*` overrides resolved through `lookup`.
    pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(input) = lookup("OPSGRAPH_INPUT_FILE") {
            config.paths.input_file = PathBuf::from(input);
        }

        if let Some(output) = lookup("OPSGRAPH_OUTPUT_DIR") {
            config.paths.output_dir = PathBuf::from(output);
        }

        if let Some(level) = lookup("OPSGRAPH_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Some(format) = lookup("OPSGRAPH_LOG_FORMAT") {
            config.logging.format = match format.trim().to_ascii_lowercase().as_str() {
                "pretty" => LogFormat::Pretty,
                "compact" => LogFormat::Compact,
                "json" => LogFormat::Json,
                other => {
                    return Err(ConfigError::EnvParseError {
                        var: "OPSGRAPH_LOG_FORMAT".to_string(),
                        message: format!("unknown log format '{other}'"),
                    })
                }
            };
        }

        if let Some(file) = lookup("OPSGRAPH_LOG_FILE") {
            config.logging.file_path = Some(file).filter(|f| !f.trim().is_empty());
        }

        if let Some(width) = lookup("OPSGRAPH_FIGURE_WIDTH") {
            config.style.width = parse_var("OPSGRAPH_FIGURE_WIDTH", &width)?;
        }

        if let Some(height) = lookup("OPSGRAPH_FIGURE_HEIGHT") {
            config.style.height = parse_var("OPSGRAPH_FIGURE_HEIGHT", &height)?;
        }

        Ok(())
    }
}

fn parse_var(var: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::EnvParseError {
        var: var.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = Config::default();
        ConfigLoader::apply_overrides(
            &mut config,
            lookup_from(&[
                ("OPSGRAPH_INPUT_FILE", "/tmp/week.xlsx"),
                ("OPSGRAPH_OUTPUT_DIR", "/tmp/out"),
                ("OPSGRAPH_LOG_LEVEL", "debug"),
                ("OPSGRAPH_LOG_FORMAT", "JSON"),
            ]),
        )
        .unwrap();

        assert_eq!(config.paths.input_file, PathBuf::from("/tmp/week.xlsx"));
        assert_eq!(config.paths.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_bad_override_is_reported() {
        let mut config = Config::default();
        let err = ConfigLoader::apply_overrides(
            &mut config,
            lookup_from(&[("OPSGRAPH_FIGURE_WIDTH", "wide")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EnvParseError { ref var, .. } if var == "OPSGRAPH_FIGURE_WIDTH"));

        let err = ConfigLoader::apply_overrides(
            &mut config,
            lookup_from(&[("OPSGRAPH_LOG_FORMAT", "xml")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("xml"));
    }

    #[test]
    fn test_from_defaults_validates() {
        let config = ConfigLoader::from_defaults(lookup_from(&[])).unwrap();
        assert_eq!(config, Config::default());

        let result = ConfigLoader::from_defaults(lookup_from(&[("OPSGRAPH_FIGURE_HEIGHT", "0")]));
        assert!(matches!(result, Err(OpsGraphError::Validation { .. })));
    }
}
