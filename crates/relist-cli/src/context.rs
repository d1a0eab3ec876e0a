//! Shared command context: configuration, credentials and wiring
//!
//! Every subcommand receives an [`AppContext`]; it knows where the config
//! lives and how to build the backend client and orchestrator from it.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use relist_api::{auth::KeyringTokenStorage, ApiClient, BackendProvider};
use relist_core::config::Config;
use relist_engine::Orchestrator;
use tracing::debug;

/// Keyring account used when `auth.account` is not configured
pub const DEFAULT_ACCOUNT: &str = "default";

pub struct AppContext {
    pub config: Config,
    pub config_path: PathBuf,
}

impl AppContext {
    /// Loads the config from `path` or the default location
    ///
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = path.unwrap_or_else(Config::default_path);
        let config = if config_path.exists() {
            Config::load(&config_path)
                .with_context(|| format!("Failed to load {}", config_path.display()))?
        } else {
            debug!(path = %config_path.display(), "No config file, using defaults");
            Config::default()
        };
        Ok(Self {
            config,
            config_path,
        })
    }

    /// Keyring account holding the bearer token
    pub fn account(&self) -> &str {
        self.config
            .auth
            .account
            .as_deref()
            .unwrap_or(DEFAULT_ACCOUNT)
    }

    /// Bearer token from the keyring, if the user logged in
    pub fn token(&self) -> Result<Option<String>> {
        let stored = KeyringTokenStorage::load(self.account())
            .context("Failed to read credentials from keyring")?;
        Ok(stored.map(|t| t.access_token))
    }

    /// Backend client carrying the stored token
    ///
    /// Without a token the client still works for anonymous endpoints;
    /// authenticated calls fail before any request is sent.
    pub fn client(&self) -> Result<ApiClient> {
        let token = self.token()?;
        ApiClient::new(&self.config.api, token).context("Failed to build HTTP client")
    }

    pub fn provider(&self) -> Result<Arc<BackendProvider>> {
        Ok(Arc::new(BackendProvider::new(self.client()?)))
    }

    /// Orchestrator wired to the backend with the configured intervals
    pub fn orchestrator(&self) -> Result<Orchestrator> {
        let provider = self.provider()?;
        Ok(Orchestrator::new(provider.clone(), provider.clone(), provider)
            .with_polling(&self.config.polling))
    }
}
