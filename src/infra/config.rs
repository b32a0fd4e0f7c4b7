//! Configuration management.
//!
//! TOML-backed settings for the SVT issuer and the validator front end.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::algorithms::JwsAlgorithm;
use crate::infra::error::{SigValError, SigValResult};

/// Issuer and validation preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigValConfiguration {
    /// Issuer identity placed in the SVT `iss` claim
    pub issuer_id: String,

    /// JWS algorithm name used for issued SVTs (e.g. "RS256")
    pub jws_algorithm: String,

    /// Inject a basic-validation claim when a result has no policy outcome
    pub default_basic_validation: bool,

    /// Validity of issued SVTs in seconds; 0 means no `exp` claim
    pub svt_validity_seconds: u64,

    /// Whether the CLI prints results as JSON
    pub json_output: bool,
}

impl Default for SigValConfiguration {
    fn default() -> Self {
        Self {
            issuer_id: "urn:pades-sigval:local".to_string(),
            jws_algorithm: "RS256".to_string(),
            default_basic_validation: true,
            svt_validity_seconds: 0,
            json_output: false,
        }
    }
}

impl SigValConfiguration {
    /// Resolve the configured JWS algorithm against the registry.
    pub fn jws_algorithm(&self) -> SigValResult<JwsAlgorithm> {
        JwsAlgorithm::from_name(&self.jws_algorithm)
    }
}

/// Configuration manager for handling config files.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manager over the default per-user path.
    pub fn new() -> SigValResult<Self> {
        Ok(Self {
            config_path: Self::default_config_path()?,
        })
    }

    /// Manager over an explicit path.
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Default configuration file path.
    pub fn default_config_path() -> SigValResult<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join("pades-sigval").join("config.toml"))
        } else {
            Ok(PathBuf::from("pades-sigval-config.toml"))
        }
    }

    /// Load configuration, writing defaults when the file does not exist.
    pub fn load_or_create_default(&self) -> SigValResult<SigValConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::info!(
                "configuration file not found, creating default: {}",
                self.config_path.display()
            );
            let default_config = SigValConfiguration::default();
            self.save(&default_config)?;
            Ok(default_config)
        }
    }

    /// Load configuration from file.
    pub fn load(&self) -> SigValResult<SigValConfiguration> {
        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            SigValError::Configuration(format!(
                "failed to read config file {}: {e}",
                self.config_path.display()
            ))
        })?;
        let config: SigValConfiguration = toml::from_str(&content)
            .map_err(|e| SigValError::Configuration(format!("failed to parse config file: {e}")))?;
        self.validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self, config: &SigValConfiguration) -> SigValResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SigValError::Configuration(format!(
                    "failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let content = toml::to_string_pretty(config)
            .map_err(|e| SigValError::Configuration(format!("failed to serialize config: {e}")))?;
        fs::write(&self.config_path, content).map_err(|e| {
            SigValError::Configuration(format!(
                "failed to write config file {}: {e}",
                self.config_path.display()
            ))
        })
    }

    fn validate_config(&self, config: &SigValConfiguration) -> SigValResult<()> {
        config.jws_algorithm().map_err(|_| {
            SigValError::Configuration(format!(
                "unsupported JWS algorithm: {}",
                config.jws_algorithm
            ))
        })?;
        if config.issuer_id.is_empty() {
            return Err(SigValError::Configuration(
                "issuer_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}
