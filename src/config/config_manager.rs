//! Configuration loading using the `config` crate.
//!
//! Sources are layered in the order they are added, later ones overriding
//! earlier ones:
//! - Configuration files (TOML, YAML, JSON)
//! - Direct override values
//! - Environment variables, always applied last
//!
//! Environment variables use the prefix (default `AUTH_FILTER`) followed by
//! `_`, with `__` separating nested keys:
//!
//! ```text
//! AUTH_FILTER_AUTH_TYPE=digest
//! AUTH_FILTER_REALM=testrealm@host.com
//! AUTH_FILTER_UNPROTECTED_METHODS=OPTIONS,HEAD
//! AUTH_FILTER_NONCE__TTL_SECONDS=120
//! ```

use super::FilterConfig;
use crate::errors::{AuthError, Result};
use config::{Config, Environment, File, FileFormat};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "AUTH_FILTER";

/// Loaded configuration.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: Config,
    sources: Vec<String>,
    env_prefix: String,
}

/// Builder collecting configuration sources.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    /// Configuration sources in order of priority (later sources override earlier ones)
    sources: Vec<ConfigSource>,
    env_prefix: String,
}

/// A configuration source.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Configuration file (path, format, required)
    File {
        path: String,
        format: FileFormat,
        required: bool,
    },

    /// Direct configuration values
    Values(HashMap<String, config::Value>),
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Set the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Add a configuration file, detecting the format from its extension.
    pub fn add_file<P: AsRef<Path>>(mut self, path: P, required: bool) -> Self {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let format = Self::detect_format(&path_str);

        self.sources.push(ConfigSource::File {
            path: path_str,
            format,
            required,
        });
        self
    }

    /// Add a configuration file with explicit format.
    pub fn add_file_with_format<P: AsRef<Path>>(
        mut self,
        path: P,
        format: FileFormat,
        required: bool,
    ) -> Self {
        self.sources.push(ConfigSource::File {
            path: path.as_ref().to_string_lossy().to_string(),
            format,
            required,
        });
        self
    }

    /// Add direct configuration values.
    pub fn add_values(mut self, values: HashMap<String, config::Value>) -> Self {
        self.sources.push(ConfigSource::Values(values));
        self
    }

    pub fn build(self) -> Result<ConfigManager> {
        let mut config = Config::builder();
        let mut sources = Vec::new();

        for source in self.sources {
            match source {
                ConfigSource::File {
                    path,
                    format,
                    required,
                } => {
                    config = config.add_source(File::new(&path, format).required(required));
                    sources.push(path);
                }
                ConfigSource::Values(values) => {
                    for (key, value) in values {
                        config = config.set_override(&key, value).map_err(|e| {
                            AuthError::config(format!("Failed to set override: {e}"))
                        })?;
                    }
                    sources.push("values:override".to_string());
                }
            }
        }

        config = config.add_source(
            Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("unprotected_methods")
                .try_parsing(true),
        );
        sources.push(format!("env:{}", self.env_prefix));

        let built_config = config
            .build()
            .map_err(|e| AuthError::config(format!("Failed to build configuration: {e}")))?;

        Ok(ConfigManager {
            config: built_config,
            sources,
            env_prefix: self.env_prefix,
        })
    }

    fn detect_format(path: &str) -> FileFormat {
        let path = Path::new(path);
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => FileFormat::Toml,
        }
    }
}

impl ConfigManager {
    /// Configuration from the environment alone.
    pub fn from_env() -> Result<Self> {
        ConfigBuilder::new().build()
    }

    /// Configuration from `path` overlaid with the environment.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        ConfigBuilder::new().add_file(path, true).build()
    }

    /// Deserialize and validate the filter configuration.
    pub fn filter_config(&self) -> Result<FilterConfig> {
        let filter_config: FilterConfig = self.config.clone().try_deserialize()?;
        filter_config.validate()?;
        Ok(filter_config)
    }

    /// Deserialize a single key or section.
    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        Ok(self.config.get::<T>(key)?)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.config.get::<config::Value>(key).is_ok()
    }

    /// Sources in the order they were applied.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::AuthType;

    #[test]
    fn test_defaults_without_sources() {
        let manager = ConfigBuilder::new()
            .with_env_prefix("AUTH_FILTER_UNIT_DEFAULTS")
            .build()
            .unwrap();
        let config = manager.filter_config().unwrap();

        assert_eq!(config.auth_type, AuthType::Digest);
        assert_eq!(config.realm_name(), crate::config::DEFAULT_REALM);
        assert_eq!(manager.sources(), ["env:AUTH_FILTER_UNIT_DEFAULTS"]);
    }

    #[test]
    fn test_override_values() {
        let mut values = HashMap::new();
        values.insert("auth_type".to_string(), config::Value::from("BASIC"));
        values.insert("realm".to_string(), config::Value::from("Shop"));
        values.insert("nonce.ttl_seconds".to_string(), config::Value::from(60i64));

        let manager = ConfigBuilder::new()
            .with_env_prefix("AUTH_FILTER_UNIT_VALUES")
            .add_values(values)
            .build()
            .unwrap();
        let config = manager.filter_config().unwrap();

        assert_eq!(config.auth_type, AuthType::Basic);
        assert_eq!(config.realm.as_deref(), Some("Shop"));
        assert_eq!(config.nonce.ttl_seconds, 60);
        assert!(manager.has_key("realm"));
        assert_eq!(manager.get::<String>("realm").unwrap(), "Shop");
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let mut values = HashMap::new();
        values.insert("nonce.ttl_seconds".to_string(), config::Value::from(0i64));

        let manager = ConfigBuilder::new()
            .with_env_prefix("AUTH_FILTER_UNIT_INVALID")
            .add_values(values)
            .build()
            .unwrap();
        assert!(matches!(
            manager.filter_config(),
            Err(AuthError::Configuration { .. })
        ));
    }

    #[test]
    fn test_missing_required_file() {
        let result = ConfigManager::from_file("/nonexistent/auth-filter.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_detect_format() {
        assert!(matches!(ConfigBuilder::detect_format("a.yml"), FileFormat::Yaml));
        assert!(matches!(ConfigBuilder::detect_format("a.json"), FileFormat::Json));
        assert!(matches!(ConfigBuilder::detect_format("a.conf"), FileFormat::Toml));
    }
}
