//! Shelf Configuration - service and engine settings as operator-tunable TOML values
//!
//! Each section implements `Default` with the values in [`super::defaults`],
//! so a missing file or a partial file behaves exactly like the built-in setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults;
use crate::engine::{EngineParams, FindingPolicy};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "SHELF_CONFIG";
/// Environment variable overriding `server.addr`.
pub const SERVER_ADDR_ENV_VAR: &str = "SHELF_SERVER_ADDR";
/// Environment variable overriding `provider.api_key`.
pub const API_KEY_ENV_VAR: &str = "SHELF_PROVIDER_API_KEY";

const LOCAL_CONFIG_FILE: &str = "shelf_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a shelf-compliance deployment.
///
/// Load with `ShelfConfig::load()` which searches:
/// 1. `$SHELF_CONFIG` env var
/// 2. `./shelf_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShelfConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Detection provider access
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Planogram table location
    #[serde(default)]
    pub reference: ReferenceConfig,

    /// Tray clustering tuning
    #[serde(default)]
    pub clustering: ClusteringConfig,

    /// Finding classification policy
    #[serde(default)]
    pub findings: FindingsConfig,
}

impl ShelfConfig {
    /// Load configuration using the standard search order, then apply
    /// environment overrides.
    pub fn load() -> Self {
        let mut config = Self::search();
        config.apply_env_overrides();
        config
    }

    fn search() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded shelf config from SHELF_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from SHELF_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "SHELF_CONFIG points to non-existent file, falling back");
            }
        }

        // 2. Check ./shelf_config.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded shelf config from ./shelf_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./shelf_config.toml, using defaults");
                }
            }
        }

        // 3. Defaults
        info!("No shelf_config.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values taken from the process environment.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var(SERVER_ADDR_ENV_VAR) {
            self.server.addr = addr;
        }
        if let Ok(key) = std::env::var(API_KEY_ENV_VAR) {
            self.provider.api_key = key;
        }
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all values for internal consistency.
    ///
    /// Every violation is collected so operators see the full list at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.server.addr.trim().is_empty() {
            errors.push("server.addr must not be empty".to_string());
        }
        if self.server.max_upload_bytes == 0 {
            errors.push("server.max_upload_bytes must be > 0".to_string());
        }

        let conf = self.provider.confidence;
        if !(0.0..=1.0).contains(&conf) {
            errors.push(format!("provider.confidence ({conf}) must be within [0, 1]"));
        }
        if self.provider.timeout_secs == 0 {
            errors.push("provider.timeout_secs must be > 0".to_string());
        }
        if self.provider.api_url.trim().is_empty() {
            errors.push("provider.api_url must not be empty".to_string());
        }

        if self.reference.path.as_os_str().is_empty() {
            errors.push("reference.path must not be empty".to_string());
        }

        let c = &self.clustering;
        if !(c.vertical_scale.is_finite() && c.vertical_scale > 0.0) {
            errors.push(format!(
                "clustering.vertical_scale ({}) must be a positive number",
                c.vertical_scale
            ));
        }
        if c.n_init == 0 {
            errors.push("clustering.n_init must be > 0".to_string());
        }
        if c.max_iterations == 0 {
            errors.push("clustering.max_iterations must be > 0".to_string());
        }
        if !(c.tolerance.is_finite() && c.tolerance >= 0.0) {
            errors.push(format!("clustering.tolerance ({}) must be >= 0", c.tolerance));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Engine parameters derived from the clustering and findings sections.
    pub fn engine_params(&self) -> EngineParams {
        EngineParams {
            vertical_scale: self.clustering.vertical_scale,
            seed: self.clustering.seed,
            n_init: self.clustering.n_init,
            max_iterations: self.clustering.max_iterations,
            tolerance: self.clustering.tolerance,
            policy: self.findings.policy,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Sections
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    ///
    /// Can be overridden by `SHELF_SERVER_ADDR` env var or `--addr` CLI flag.
    #[serde(default = "default_server_addr")]
    pub addr: String,

    /// Maximum request body size (bytes)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Origins allowed to call the API cross-origin. Empty = same-origin only.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_server_addr() -> String {
    defaults::DEFAULT_SERVER_ADDR.to_string()
}

const fn default_max_upload_bytes() -> usize {
    defaults::DEFAULT_MAX_UPLOAD_BYTES
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
            max_upload_bytes: default_max_upload_bytes(),
            cors_origins: Vec::new(),
        }
    }
}

/// Detection provider (inference workflow) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub workspace: String,
    #[serde(default)]
    pub workflow_id: String,
    /// Prefer `SHELF_PROVIDER_API_KEY` over storing the key in the file
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// Minimum detector confidence forwarded to the workflow
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    defaults::DEFAULT_PROVIDER_URL.to_string()
}

const fn default_confidence() -> f64 {
    defaults::DEFAULT_CONFIDENCE
}

const fn default_timeout_secs() -> u64 {
    defaults::PROVIDER_TIMEOUT_SECS
}

impl ProviderConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether enough is set to reach the remote workflow.
    pub fn is_configured(&self) -> bool {
        !self.workspace.is_empty() && !self.workflow_id.is_empty() && !self.api_key.is_empty()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            workspace: String::new(),
            workflow_id: String::new(),
            api_key: String::new(),
            confidence: default_confidence(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Planogram table location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    #[serde(default = "default_reference_path")]
    pub path: PathBuf,
}

fn default_reference_path() -> PathBuf {
    PathBuf::from(defaults::DEFAULT_REFERENCE_PATH)
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            path: default_reference_path(),
        }
    }
}

/// Tray clustering parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_vertical_scale")]
    pub vertical_scale: f64,
    #[serde(default = "default_n_init")]
    pub n_init: usize,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

const fn default_seed() -> u64 {
    defaults::DEFAULT_KMEANS_SEED
}
const fn default_vertical_scale() -> f64 {
    defaults::DEFAULT_VERTICAL_SCALE
}
const fn default_n_init() -> usize {
    defaults::DEFAULT_KMEANS_RESTARTS
}
const fn default_max_iterations() -> usize {
    defaults::DEFAULT_KMEANS_MAX_ITERATIONS
}
const fn default_tolerance() -> f64 {
    defaults::DEFAULT_KMEANS_TOLERANCE
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            vertical_scale: default_vertical_scale(),
            n_init: default_n_init(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
        }
    }
}

/// Finding classification policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindingsConfig {
    #[serde(default)]
    pub policy: FindingPolicy,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_validates() {
        let config = ShelfConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.addr, "0.0.0.0:5000");
        assert_eq!(config.clustering.seed, 42);
        assert_eq!(config.findings.policy, FindingPolicy::Exclusive);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ShelfConfig = toml::from_str(
            r#"
            [provider]
            workspace = "yolotest1"
            workflow_id = "shelfdetection"
            confidence = 0.25

            [findings]
            policy = "compatible"
            "#,
        )
        .unwrap();

        assert_eq!(config.provider.workspace, "yolotest1");
        assert!((config.provider.confidence - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.provider.timeout_secs, defaults::PROVIDER_TIMEOUT_SECS);
        assert_eq!(config.clustering.n_init, defaults::DEFAULT_KMEANS_RESTARTS);
        assert_eq!(config.findings.policy, FindingPolicy::Compatible);
    }

    #[test]
    fn test_example_config_parses() {
        let config: ShelfConfig =
            toml::from_str(include_str!("../../shelf_config.example.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.cors_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.engine_params(), EngineParams::default());
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = ShelfConfig::default();
        config.provider.confidence = 1.5;
        config.provider.timeout_secs = 0;
        config.clustering.vertical_scale = 0.0;
        config.clustering.n_init = 0;

        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 4, "unexpected errors: {errors:?}");
                assert!(errors.iter().any(|e| e.contains("provider.confidence")));
                assert!(errors.iter().any(|e| e.contains("vertical_scale")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[clustering]\nmax_iterations = 0").unwrap();

        let err = ShelfConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_from_file_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\naddr = ").unwrap();

        let err = ShelfConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(..)));
        assert!(err.to_string().contains("Config parse error"));
    }

    #[test]
    fn test_api_key_not_written_back() {
        let mut config = ShelfConfig::default();
        config.provider.api_key = "secret".to_string();
        let toml = config.to_toml().unwrap();
        assert!(!toml.contains("secret"));
    }

    #[test]
    fn test_engine_params_follow_config() {
        let mut config = ShelfConfig::default();
        config.clustering.seed = 7;
        config.clustering.vertical_scale = 50.0;
        let params = config.engine_params();
        assert_eq!(params.seed, 7);
        assert!((params.vertical_scale - 50.0).abs() < f64::EPSILON);
    }
}
