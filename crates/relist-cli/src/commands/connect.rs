//! Connect commands - marketplace sessions
//!
//! Provides the `relist connect` CLI subcommands which:
//! 1. `cookies` - Hands a browser cookie export to the backend, either
//!    directly (authenticated) or against a pairing code.
//! 2. `status`  - Shows connection state per marketplace.
//! 3. `disconnect` - Drops the stored marketplace session.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;
use clap::Subcommand;
use relist_core::{
    domain::{Marketplace, PairingCode},
    ports::IMarketplaceConnector,
};
use relist_engine::{CookieHandoffBridge, HandoffDestination, HandoffOutcome};

use crate::{
    browser::CookieFileSurface,
    context::AppContext,
    output::{get_formatter, OutputFormat, OutputFormatter},
};

#[derive(Debug, Subcommand)]
pub enum ConnectCommand {
    /// Connect Poshmark from an exported cookie file
    Cookies {
        /// JSON cookie export from the browser
        file: PathBuf,

        /// Deliver against a pairing code instead of the stored token
        #[arg(long)]
        code: Option<PairingCode>,

        /// Username to report with a pairing delivery
        #[arg(long, requires = "code")]
        username: Option<String>,
    },
    /// Show marketplace connection status
    Status {
        /// Only this marketplace
        #[arg(long, short)]
        marketplace: Option<Marketplace>,
    },
    /// Disconnect a marketplace account
    Disconnect {
        #[arg(long, short, default_value = "poshmark")]
        marketplace: Marketplace,
    },
}

impl ConnectCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format == OutputFormat::Json);
        match self {
            ConnectCommand::Cookies {
                file,
                code,
                username,
            } => {
                self.execute_cookies(ctx, file, code.clone(), username.clone(), &*fmt, format)
                    .await
            }
            ConnectCommand::Status { marketplace } => {
                self.execute_status(ctx, *marketplace, &*fmt, format).await
            }
            ConnectCommand::Disconnect { marketplace } => {
                ctx.provider()?.disconnect(*marketplace).await?;
                fmt.success(&format!("{marketplace} account disconnected"));
                Ok(())
            }
        }
    }

    async fn execute_cookies(
        &self,
        ctx: &AppContext,
        file: &Path,
        code: Option<PairingCode>,
        username: Option<String>,
        fmt: &dyn OutputFormatter,
        format: OutputFormat,
    ) -> Result<()> {
        let provider = ctx.provider()?;
        let destination = match code {
            Some(code) => HandoffDestination::Pairing { code, username },
            None => HandoffDestination::Direct,
        };
        let bridge = CookieHandoffBridge::new(
            &ctx.config.handoff,
            Arc::new(CookieFileSurface::new(file)),
            provider.clone(),
            provider,
            destination,
        );

        match bridge.save().await? {
            HandoffOutcome::Delivered { cookies, username } => {
                if format == OutputFormat::Json {
                    fmt.print_json(&serde_json::json!({
                        "success": true,
                        "cookies": cookies,
                        "username": username,
                    }));
                    return Ok(());
                }
                match username {
                    Some(name) => fmt.success(&format!("Poshmark connected as {name}")),
                    None => fmt.success("Poshmark connected"),
                }
                fmt.info(&format!("{cookies} cookies delivered"));
            }
            HandoffOutcome::Skipped(reason) => {
                fmt.warn(&format!("Nothing sent: {reason:?}"));
            }
        }
        Ok(())
    }

    async fn execute_status(
        &self,
        ctx: &AppContext,
        only: Option<Marketplace>,
        fmt: &dyn OutputFormatter,
        format: OutputFormat,
    ) -> Result<()> {
        let orchestrator = ctx.orchestrator()?;
        let marketplaces = match only {
            Some(m) => vec![m],
            None => vec![Marketplace::Poshmark, Marketplace::Ebay],
        };

        let mut statuses = Vec::with_capacity(marketplaces.len());
        for marketplace in marketplaces {
            statuses.push(orchestrator.refresh_connection(marketplace).await?);
        }

        if format == OutputFormat::Json {
            fmt.print_json(&serde_json::to_value(&statuses)?);
            return Ok(());
        }

        for status in &statuses {
            match (status.connected, &status.username) {
                (true, Some(name)) => fmt.success(&format!("{}: connected as {name}", status.marketplace)),
                (true, None) => fmt.success(&format!("{}: connected", status.marketplace)),
                (false, _) => fmt.info(&format!("{}: not connected", status.marketplace)),
            }
        }
        Ok(())
    }
}
