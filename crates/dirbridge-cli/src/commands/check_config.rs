//! check-config command - show the effective configuration

use super::CommandContext;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

#[derive(Serialize)]
struct CheckConfigResult {
    url: String,
    encryption: &'static str,
    base_dn: String,
    bind_dn: String,
    user_filter: Option<String>,
    group_filter: Option<String>,
    timeout_seconds: u64,
    connected: Option<bool>,
}

pub async fn execute(ctx: &CommandContext, connect: bool) -> Result<()> {
    let config = &ctx.config;

    let connected = if connect {
        ctx.debug(&format!("Binding {} at {}", config.bind_dn, config.url()));
        ctx.service
            .test_connection(config)
            .await
            .context("Connection check failed")?;
        Some(true)
    } else {
        None
    };

    if ctx.is_json() {
        let result = CheckConfigResult {
            url: config.url(),
            encryption: config.encryption.as_str(),
            base_dn: config.base_dn.clone(),
            bind_dn: config.bind_dn.clone(),
            user_filter: config.user_filter_enabled().then(|| config.user_filter.clone()),
            group_filter: config.group_filter_enabled().then(|| config.group_filter.clone()),
            timeout_seconds: config.timeout_seconds,
            connected,
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{}", config.url().blue().bold());
    println!();
    println!("  {}: {}", "Encryption".cyan(), config.encryption.as_str());
    if config.allow_invalid_certs {
        println!("  {}: {}", "Certificates".cyan(), "not verified".yellow());
    }
    println!("  {}: {}", "Base DN".cyan(), config.base_dn);
    println!("  {}: {}", "Bind DN".cyan(), config.bind_dn);

    if config.user_filter_enabled() {
        println!("  {}: {}", "User filter".cyan(), config.user_filter);
    } else {
        println!("  {}: Disabled", "User filter".cyan());
    }
    if config.group_filter_enabled() {
        println!("  {}: {}", "Group filter".cyan(), config.group_filter);
    } else {
        println!("  {}: Disabled", "Group filter".cyan());
    }

    println!("  {}: {}s", "Timeout".cyan(), config.timeout_seconds);

    if connected.is_some() {
        println!();
        println!("{}", "Service account bind succeeded".green());
    }

    Ok(())
}
