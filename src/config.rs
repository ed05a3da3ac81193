//! Configuration resolution for geoprofile
//!
//! Resolution priority per setting group: environment variable → TOML config
//! file → compiled default. The compiled defaults are the documented policy
//! values, so a bare deployment needs no config file at all.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the config file (overrides the default path)
pub const CONFIG_PATH_ENV: &str = "GEOPROFILE_CONFIG";

/// Environment variable overriding the listen port
pub const PORT_ENV: &str = "GEOPROFILE_PORT";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub server: ServerConfig,
    pub scoring: ScoringConfig,
    pub cache: CacheConfig,
    pub providers: ProviderConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5731,
        }
    }
}

/// Confidence scoring policy
///
/// `confidence = clamp(completeness * completeness_weight
///                     + avg_reliability * 100 * reliability_weight
///                     - fallback_count * fallback_penalty, 0, 100)`
///
/// The blend is monotone in successful-source count and in average
/// reliability for any non-negative coefficients, so changing these values
/// never inverts the ordering of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub completeness_weight: f32,
    pub reliability_weight: f32,
    /// Subtracted once per category that fell back to synthetic data
    pub fallback_penalty: f32,
    /// Fixed confidence assigned to a fully synthetic field
    pub fallback_confidence: u8,
    /// Reliability weight attributed to a cache hit
    pub cache_reliability_weight: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            completeness_weight: 0.7,
            reliability_weight: 0.3,
            fallback_penalty: 5.0,
            fallback_confidence: 40,
            cache_reliability_weight: 0.85,
        }
    }
}

/// Geographic result cache policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_seconds: u64,
    /// Two coordinates within this Euclidean degree distance share an entry
    /// (~1 km at the equator for the default 0.01)
    pub epsilon_degrees: f64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 24 * 60 * 60,
            epsilon_degrees: 0.01,
            max_entries: 256,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Endpoints for the concrete open-data adapters
///
/// The Socrata crime source has no universal endpoint: the domain and
/// dataset id identify one city's open-data portal, so the crime adapter is
/// only registered when both are configured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub socrata_domain: Option<String>,
    pub socrata_dataset: Option<String>,
    pub socrata_app_token: Option<String>,
}

impl EngineConfig {
    /// Load configuration with ENV → TOML → default resolution
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_file_path() {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "Loading TOML config");
                Self::from_file(&path)?
            }
            Some(path) => {
                info!(path = %path.display(), "No config file found, using defaults");
                Self::default()
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                Self::default()
            }
        };

        // ENV overrides beat the file
        if let Ok(port) = std::env::var(PORT_ENV) {
            match port.parse::<u16>() {
                Ok(port) => config.server.port = port,
                Err(_) => warn!(value = %port, "Ignoring unparseable {}", PORT_ENV),
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)
            .map_err(|e| EngineError::Configuration(format!("parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the scorer cannot honor
    pub fn validate(&self) -> Result<()> {
        let s = &self.scoring;
        if s.completeness_weight < 0.0 || s.reliability_weight < 0.0 || s.fallback_penalty < 0.0 {
            return Err(EngineError::Configuration(
                "scoring coefficients must be non-negative".to_string(),
            ));
        }
        if s.fallback_confidence > 100 {
            return Err(EngineError::Configuration(
                "fallback_confidence must be 0-100".to_string(),
            ));
        }
        if self.cache.epsilon_degrees <= 0.0 {
            return Err(EngineError::Configuration(
                "cache epsilon_degrees must be positive".to_string(),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(EngineError::Configuration(
                "cache max_entries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Config file path: `$GEOPROFILE_CONFIG`, else the per-user config dir
    fn config_file_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|d| d.join("geoprofile").join("geoprofile.toml"))
    }
}
