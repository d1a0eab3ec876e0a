//! Configuration module for Relist.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Relist.
///
/// Every section is optional in the YAML file; missing sections and
/// fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub handoff: HandoffConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
}

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the Relist backend, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

/// Progress and pairing polling cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Milliseconds between job progress queries.
    pub job_interval_ms: u64,
    /// Milliseconds between pairing status queries.
    pub pairing_interval_ms: u64,
}

/// Session handoff (login detection and cookie extraction) settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandoffConfig {
    /// Marketplace domain whose cookies are extracted.
    pub marketplace_domain: String,
    /// Minimum number of cookies for a session to be considered valid.
    pub min_cookies: usize,
    /// URL path prefixes that indicate a completed login.
    pub post_login_paths: Vec<String>,
    /// URL substrings that indicate the user is still on a login page.
    pub login_markers: Vec<String>,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

/// Credential settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Keyring account holding the bearer token. `None` until the user
    /// runs `relist auth login`.
    pub account: Option<String>,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Write the configuration as YAML to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/relist/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("relist")
            .join("config.yaml")
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl PollingConfig {
    pub fn job_interval(&self) -> Duration {
        Duration::from_millis(self.job_interval_ms)
    }

    pub fn pairing_interval(&self) -> Duration {
        Duration::from_millis(self.pairing_interval_ms)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            job_interval_ms: 2000,
            pairing_interval_ms: 3000,
        }
    }
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            marketplace_domain: "poshmark.com".to_string(),
            min_cookies: 3,
            post_login_paths: vec!["/feed".to_string(), "/closet".to_string()],
            login_markers: vec!["/login".to_string()],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"polling.job_interval_ms"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- api ---
        match url::Url::parse(&self.api.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::new(
                "api.base_url",
                format!("unsupported scheme: {}", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new(
                "api.base_url",
                format!("invalid URL: {e}"),
            )),
        }
        if self.api.request_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "api.request_timeout_secs",
                "must be greater than 0",
            ));
        }

        // --- polling ---
        if self.polling.job_interval_ms == 0 {
            errors.push(ValidationError::new(
                "polling.job_interval_ms",
                "must be greater than 0",
            ));
        }
        if self.polling.pairing_interval_ms == 0 {
            errors.push(ValidationError::new(
                "polling.pairing_interval_ms",
                "must be greater than 0",
            ));
        }

        // --- handoff ---
        if self.handoff.marketplace_domain.trim().is_empty() {
            errors.push(ValidationError::new(
                "handoff.marketplace_domain",
                "must not be empty",
            ));
        }
        if self.handoff.min_cookies == 0 {
            errors.push(ValidationError::new(
                "handoff.min_cookies",
                "must be greater than 0",
            ));
        }
        if self.handoff.post_login_paths.is_empty() {
            errors.push(ValidationError::new(
                "handoff.post_login_paths",
                "must list at least one path",
            ));
        }
        for path in &self.handoff.post_login_paths {
            if !path.starts_with('/') {
                errors.push(ValidationError::new(
                    "handoff.post_login_paths",
                    format!("path must start with '/': {path}"),
                ));
            }
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError::new(
                "logging.level",
                format!(
                    "invalid level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        // --- auth ---
        if let Some(account) = &self.auth.account {
            if account.trim().is_empty() {
                errors.push(ValidationError::new("auth.account", "must not be blank"));
            }
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use relist_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .api_base_url("https://relist.example.com")
///     .polling_job_interval_ms(1000)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- api ---

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api.base_url = url.into();
        self
    }

    pub fn api_request_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.api.request_timeout_secs = seconds;
        self
    }

    // --- polling ---

    pub fn polling_job_interval_ms(mut self, ms: u64) -> Self {
        self.config.polling.job_interval_ms = ms;
        self
    }

    pub fn polling_pairing_interval_ms(mut self, ms: u64) -> Self {
        self.config.polling.pairing_interval_ms = ms;
        self
    }

    // --- handoff ---

    pub fn handoff_marketplace_domain(mut self, domain: impl Into<String>) -> Self {
        self.config.handoff.marketplace_domain = domain.into();
        self
    }

    pub fn handoff_min_cookies(mut self, n: usize) -> Self {
        self.config.handoff.min_cookies = n;
        self
    }

    pub fn handoff_post_login_paths(mut self, paths: Vec<String>) -> Self {
        self.config.handoff.post_login_paths = paths;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- auth ---

    pub fn auth_account(mut self, account: impl Into<String>) -> Self {
        self.config.auth.account = Some(account.into());
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
