//! Inventory command - pull the Poshmark closet into the local catalog
//!
//! `relist inventory fetch` starts the backend job and prints its
//! progress log until the job finishes. Ctrl-C stops polling.

use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;
use relist_core::domain::{Marketplace, OperationTarget};

use crate::{
    context::AppContext,
    output::{get_formatter, OutputFormat},
    progress::{follow_job, outcome_json, ChannelObserver},
};

#[derive(Debug, Subcommand)]
pub enum InventoryCommand {
    /// Fetch the Poshmark inventory
    Fetch,
}

impl InventoryCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        match self {
            InventoryCommand::Fetch => self.execute_fetch(ctx, format).await,
        }
    }

    async fn execute_fetch(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format == OutputFormat::Json);
        let orchestrator = ctx.orchestrator()?;
        let target = OperationTarget::inventory(Marketplace::Poshmark);
        let (observer, events) = ChannelObserver::new();

        orchestrator.start_inventory_fetch(Arc::new(observer)).await?;
        fmt.info("Fetching Poshmark inventory...");

        let Some(outcome) = follow_job(&orchestrator, target, events, &*fmt).await? else {
            return Ok(());
        };

        if format == OutputFormat::Json {
            fmt.print_json(&outcome_json(&target, &outcome));
            if outcome.is_success() {
                return Ok(());
            }
        }
        if !outcome.is_success() {
            anyhow::bail!(outcome.summary());
        }
        fmt.success(&outcome.summary());
        Ok(())
    }
}
