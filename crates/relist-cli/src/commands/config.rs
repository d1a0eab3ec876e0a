//! Config command - View and manage Relist configuration
//!
//! Provides the `relist config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports errors
//! 4. Writes a default configuration file

use anyhow::{Context, Result};
use clap::Subcommand;
use relist_core::config::Config;
use tracing::info;

use crate::{
    context::AppContext,
    output::{get_formatter, OutputFormat},
};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "polling.job_interval_ms")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("api.base_url", "Backend base URL"),
    ("api.request_timeout_secs", "Per-request timeout in seconds"),
    ("polling.job_interval_ms", "Job progress poll interval"),
    ("polling.pairing_interval_ms", "Pairing status poll interval"),
    ("handoff.marketplace_domain", "Cookie domain to extract"),
    ("handoff.min_cookies", "Minimum cookies for a handoff"),
    ("handoff.post_login_paths", "Comma-separated post-login path prefixes"),
    ("handoff.login_markers", "Comma-separated login URL markers"),
    ("logging.level", "trace|debug|info|warn|error"),
    ("auth.account", "Keyring account name (empty for default)"),
];

impl ConfigCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx, format),
            ConfigCommand::Set { key, value } => self.execute_set(ctx, key, value, format),
            ConfigCommand::Validate => self.execute_validate(ctx, format),
            ConfigCommand::Init { force } => self.execute_init(ctx, *force, format),
        }
    }

    fn execute_show(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        info!(config_path = %ctx.config_path.display(), "Showing configuration");

        if matches!(format, OutputFormat::Json) {
            let json = serde_json::to_value(&ctx.config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(&ctx.config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }

        Ok(())
    }

    fn execute_set(&self, ctx: &AppContext, key: &str, value: &str, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let mut config = ctx.config.clone();

        info!(key = %key, value = %value, "Setting configuration value");

        if let Err(e) = apply_config_value(&mut config, key, value) {
            if matches!(format, OutputFormat::Json) {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "error": e.to_string(),
                }));
            } else {
                formatter.error(&format!("Failed to set '{}': {}", key, e));
                formatter.info("");
                formatter.info("Supported keys:");
                for (name, help) in SUPPORTED_KEYS {
                    formatter.info(&format!("  {name:<30} - {help}"));
                }
            }
            return Ok(());
        }

        let errors = config.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            if matches!(format, OutputFormat::Json) {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "errors": messages,
                }));
            } else {
                formatter.error(&format!("Invalid value for '{}': {}", key, messages.join("; ")));
            }
            return Ok(());
        }

        config
            .save(&ctx.config_path)
            .context("Failed to write configuration file")?;

        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "value": value,
                "config_path": ctx.config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {} = {}", key, value));
            formatter.info(&format!("Saved to {}", ctx.config_path.display()));
        }
        Ok(())
    }

    fn execute_validate(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        if !ctx.config_path.exists() {
            if matches!(format, OutputFormat::Json) {
                formatter.print_json(&serde_json::json!({
                    "valid": true,
                    "config_path": ctx.config_path.display().to_string(),
                    "errors": [],
                    "defaults": true,
                }));
            } else {
                formatter.info(&format!(
                    "Configuration file not found at {}",
                    ctx.config_path.display()
                ));
                formatter.info("Using default configuration. Run 'relist config init' to create one.");
            }
            return Ok(());
        }

        info!(config_path = %ctx.config_path.display(), "Validating configuration");
        let errors = ctx.config.validate();

        if matches!(format, OutputFormat::Json) {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": ctx.config_path.display().to_string(),
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", ctx.config_path.display()));
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.info(&format!("File: {}", ctx.config_path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }

        if !errors.is_empty() {
            anyhow::bail!("Invalid configuration");
        }
        Ok(())
    }

    fn execute_init(&self, ctx: &AppContext, force: bool, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        if ctx.config_path.exists() && !force {
            anyhow::bail!(
                "{} already exists; use --force to overwrite",
                ctx.config_path.display()
            );
        }

        Config::default()
            .save(&ctx.config_path)
            .context("Failed to write configuration file")?;

        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "config_path": ctx.config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Wrote {}", ctx.config_path.display()));
        }
        Ok(())
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- api ---
        "api.base_url" => {
            config.api.base_url = value.trim_end_matches('/').to_string();
        }
        "api.request_timeout_secs" => {
            config.api.request_timeout_secs = value
                .parse::<u64>()
                .context("Expected a positive integer for api.request_timeout_secs")?;
        }

        // --- polling ---
        "polling.job_interval_ms" => {
            config.polling.job_interval_ms = value
                .parse::<u64>()
                .context("Expected a positive integer")?;
        }
        "polling.pairing_interval_ms" => {
            config.polling.pairing_interval_ms = value
                .parse::<u64>()
                .context("Expected a positive integer")?;
        }

        // --- handoff ---
        "handoff.marketplace_domain" => {
            config.handoff.marketplace_domain = value.to_string();
        }
        "handoff.min_cookies" => {
            config.handoff.min_cookies = value
                .parse::<usize>()
                .context("Expected a positive integer")?;
        }
        "handoff.post_login_paths" => {
            config.handoff.post_login_paths = parse_list(value);
        }
        "handoff.login_markers" => {
            config.handoff.login_markers = parse_list(value);
        }

        // --- logging ---
        "logging.level" => {
            config.logging.level = value.to_string();
        }

        // --- auth ---
        "auth.account" => {
            config.auth.account = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.to_string())
            };
        }

        _ => {
            anyhow::bail!("Unknown configuration key: '{}'", key);
        }
    }

    Ok(())
}
