//! sync command - diff directory users against the local population

use super::{print_users, CommandContext};
use anyhow::{Context, Result};
use colored::Colorize;
use dirbridge_core::types::LocalUser;

pub async fn execute(ctx: &CommandContext, existing: Option<&str>) -> Result<()> {
    let existing = match existing {
        Some(path) => load_existing(path)?,
        None => Vec::new(),
    };
    ctx.debug(&format!("{} existing local users", existing.len()));

    let outcome = ctx
        .service
        .sync(&ctx.config, &existing)
        .await
        .context("Failed to sync users from LDAP")?;

    if ctx.is_json() {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    ctx.info(&outcome.message.green().to_string());
    if ctx.quiet {
        return Ok(());
    }

    if !outcome.plan.to_add.is_empty() {
        println!("{}", "To add:".bold());
        print_users(&outcome.plan.to_add);
    }
    if !outcome.plan.to_deactivate.is_empty() {
        println!("{}", "To deactivate:".bold());
        for email in &outcome.plan.to_deactivate {
            println!("  {}", email.yellow());
        }
    }
    if outcome.plan.is_empty() {
        println!("{}", "Local users already match the directory".dimmed());
    }

    Ok(())
}

fn load_existing(path: &str) -> Result<Vec<LocalUser>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read existing users {}", path))?;

    serde_json::from_str(&content).with_context(|| format!("Failed to parse existing users {}", path))
}
