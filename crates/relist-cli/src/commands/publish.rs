//! Publish command - list a local item on a marketplace
//!
//! Poshmark publishes run as a backend job and print progress; eBay
//! publishes complete in a single request.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use relist_core::domain::{ListingId, Marketplace, OperationTarget};
use relist_engine::PublishResult;

use crate::{
    context::AppContext,
    output::{get_formatter, OutputFormat},
    progress::{follow_job, outcome_json, ChannelObserver},
};

#[derive(Debug, Args)]
pub struct PublishCommand {
    /// Local listing id
    pub listing: ListingId,

    /// Target marketplace (poshmark or ebay)
    #[arg(long, short, default_value = "poshmark")]
    pub marketplace: Marketplace,
}

impl PublishCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format == OutputFormat::Json);
        let orchestrator = ctx.orchestrator()?;
        let target = OperationTarget::listing(self.marketplace, self.listing);
        let (observer, events) = ChannelObserver::new();

        let started = orchestrator
            .publish(self.marketplace, self.listing, Arc::new(observer))
            .await?;

        match started {
            PublishResult::Published { receipt, .. } => {
                if format == OutputFormat::Json {
                    fmt.print_json(&serde_json::json!({
                        "success": true,
                        "target": target.to_string(),
                        "receipt": receipt,
                    }));
                    return Ok(());
                }
                fmt.success(&format!("Published listing {} to {}", self.listing, self.marketplace));
                if let Some(url) = &receipt.url {
                    fmt.info(url);
                }
                Ok(())
            }
            PublishResult::Started(_) => {
                fmt.info(&format!("Publishing listing {} to {}...", self.listing, self.marketplace));
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
    }
}
