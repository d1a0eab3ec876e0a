//! Auth commands - credentials and extension pairing
//!
//! Provides the `relist auth` CLI subcommands which:
//! 1. `login`  - Stores a backend bearer token in the system keyring.
//! 2. `logout` - Removes the stored token.
//! 3. `status` - Reports whether a token is stored and whether the
//!    backend accepts it.
//! 4. `pair`   - Issues a pairing code for the browser extension and
//!    waits until the extension delivers cookies or the code expires.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;
use relist_api::auth::{KeyringTokenStorage, StoredToken};
use relist_core::{
    domain::{ApiErrorKind, Marketplace},
    ports::IMarketplaceConnector,
};
use tracing::info;

use crate::{
    context::AppContext,
    output::{get_formatter, OutputFormat, OutputFormatter},
    progress::{PairingChannelObserver, PairingEvent},
};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Store a backend access token
    Login {
        /// Bearer token issued by the Relist backend
        #[arg(long)]
        token: String,
    },
    /// Remove stored credentials
    Logout,
    /// Check authentication status
    Status,
    /// Pair the browser extension with a one-time code
    Pair,
}

impl AuthCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format == OutputFormat::Json);
        match self {
            AuthCommand::Login { token } => self.execute_login(ctx, token, &*fmt),
            AuthCommand::Logout => self.execute_logout(ctx, &*fmt),
            AuthCommand::Status => self.execute_status(ctx, &*fmt, format).await,
            AuthCommand::Pair => self.execute_pair(ctx, &*fmt, format).await,
        }
    }

    fn execute_login(&self, ctx: &AppContext, token: &str, fmt: &dyn OutputFormatter) -> Result<()> {
        let stored = StoredToken::new(token)?;
        KeyringTokenStorage::store(ctx.account(), &stored)
            .context("Failed to store token in keyring")?;

        info!(account = ctx.account(), "Token stored");
        fmt.success(&format!("Token stored for account '{}'", ctx.account()));
        Ok(())
    }

    fn execute_logout(&self, ctx: &AppContext, fmt: &dyn OutputFormatter) -> Result<()> {
        KeyringTokenStorage::clear(ctx.account())
            .context("Failed to clear token from keyring")?;

        fmt.success("Logged out successfully");
        fmt.info("Credentials removed from keyring");
        Ok(())
    }

    /// Reports the stored token and probes it with a cheap authenticated call
    async fn execute_status(
        &self,
        ctx: &AppContext,
        fmt: &dyn OutputFormatter,
        format: OutputFormat,
    ) -> Result<()> {
        let stored = KeyringTokenStorage::load(ctx.account())
            .context("Failed to read credentials from keyring")?;

        let Some(stored) = stored else {
            if format == OutputFormat::Json {
                fmt.print_json(&serde_json::json!({
                    "account": ctx.account(),
                    "authenticated": false,
                }));
            } else {
                fmt.info("Authentication status: Not logged in");
                fmt.info("Run 'relist auth login --token <TOKEN>' to authenticate");
            }
            return Ok(());
        };

        let provider = ctx.provider()?;
        let probe = provider.connection_status(Marketplace::Poshmark).await;
        let accepted = match &probe {
            Ok(_) => Some(true),
            Err(e) if e.kind() == ApiErrorKind::Auth => Some(false),
            Err(_) => None,
        };

        if format == OutputFormat::Json {
            fmt.print_json(&serde_json::json!({
                "account": ctx.account(),
                "authenticated": true,
                "stored_at": stored.stored_at.to_rfc3339(),
                "token_accepted": accepted,
            }));
            return Ok(());
        }

        fmt.success(&format!("Token stored for account '{}'", ctx.account()));
        fmt.info(&format!(
            "Stored: {}",
            stored.stored_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        match (accepted, probe) {
            (Some(true), _) => fmt.info("Backend: token accepted"),
            (Some(false), _) => fmt.warn("Backend rejected the token; run 'relist auth login' again"),
            (None, Err(e)) => fmt.warn(&format!("Could not reach backend: {}", e.message())),
            (None, Ok(_)) => {}
        }
        Ok(())
    }

    /// Issues a code and waits for the extension to use it
    async fn execute_pair(
        &self,
        ctx: &AppContext,
        fmt: &dyn OutputFormatter,
        format: OutputFormat,
    ) -> Result<()> {
        let orchestrator = ctx.orchestrator()?;
        let (observer, mut events) = PairingChannelObserver::new();

        let ticket = orchestrator
            .begin_pairing(Arc::new(observer))
            .await
            .context("Failed to request a pairing code")?;

        if format == OutputFormat::Json {
            fmt.print_json(&serde_json::to_value(&ticket)?);
        } else {
            fmt.success(&format!("Pairing code: {}", ticket.code));
            fmt.info(&format!(
                "Enter it in the browser extension within {} minutes",
                ticket.expires_in_seconds / 60
            ));
            fmt.info("Waiting for the extension... (Ctrl-C to abort)");
        }

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    orchestrator.cancel_pairing().await;
                    fmt.warn("Pairing aborted");
                    return Ok(());
                }
                event = events.recv() => match event {
                    Some(PairingEvent::Status(report)) => {
                        if let Some(message) = report.message {
                            fmt.info(&message);
                        }
                    }
                    Some(PairingEvent::Fulfilled(code)) => {
                        let username = orchestrator
                            .connection_status(Marketplace::Poshmark)
                            .and_then(|s| s.username);
                        if format == OutputFormat::Json {
                            fmt.print_json(&serde_json::json!({
                                "code": code,
                                "status": "fulfilled",
                                "username": username,
                            }));
                        } else {
                            match username {
                                Some(name) => fmt.success(&format!("Poshmark connected as {name}")),
                                None => fmt.success("Poshmark connected"),
                            }
                        }
                        return Ok(());
                    }
                    Some(PairingEvent::Expired(code)) => {
                        anyhow::bail!("Pairing code {code} expired; run 'relist auth pair' for a new one");
                    }
                    None => anyhow::bail!("Pairing watcher stopped unexpectedly"),
                }
            }
        }
    }
}
