//! Service configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML file, then `ADVISOR_*` environment variables. Command-line flags are
//! applied on top by the binary.

use std::path::{Path, PathBuf};

use advisor_core::UnknownCategoryPolicy;
use config::{Config, Environment, File, FileFormat, Map};
use serde::Deserialize;

use crate::errors::ServiceError;

/// Environment variable prefix (`ADVISOR_PORT`, `ADVISOR_ARTIFACT_DIR`, ...)
pub const ENV_PREFIX: &str = "ADVISOR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownCategoryMode {
    #[default]
    Reject,
    Sentinel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub artifact_dir: PathBuf,
    pub unknown_category: UnknownCategoryMode,
    /// Code substituted for unknown categories in `sentinel` mode
    pub sentinel_value: i64,
    /// Load artifacts at startup instead of on the first request
    pub preload: bool,
    /// Empty means any origin
    pub allowed_origins: Vec<String>,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            artifact_dir: PathBuf::from("models"),
            unknown_category: UnknownCategoryMode::Reject,
            sentinel_value: 0,
            preload: true,
            allowed_origins: Vec::new(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl ServiceConfig {
    /// Load from an optional file and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ServiceError> {
        Self::load_with_env(path, None)
    }

    /// Load with an explicit environment map instead of the process environment
    pub fn load_with_env(path: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self, ServiceError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ServiceError::Config(format!(
                    "configuration file {} not found",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("allowed_origins")
                .source(env),
        );

        let config: ServiceConfig = builder
            .build()
            .and_then(|c| c.try_deserialize::<ServiceConfig>())
            .map_err(|e| ServiceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.host.is_empty() || self.host.chars().any(char::is_whitespace) {
            return Err(ServiceError::Config(format!("invalid host {:?}", self.host)));
        }
        if self.log_level.trim().is_empty() {
            return Err(ServiceError::Config("log_level must not be empty".to_string()));
        }
        Ok(())
    }

    /// `host:port` as passed to the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn policy(&self) -> UnknownCategoryPolicy {
        match self.unknown_category {
            UnknownCategoryMode::Reject => UnknownCategoryPolicy::Reject,
            UnknownCategoryMode::Sentinel => UnknownCategoryPolicy::Sentinel(self.sentinel_value),
        }
    }
}
