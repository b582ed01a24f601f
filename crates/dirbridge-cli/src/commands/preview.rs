//! preview command - fetch and reconcile without committing

use super::{print_users, CommandContext};
use anyhow::Result;
use colored::Colorize;

pub async fn execute(ctx: &CommandContext) -> Result<()> {
    ctx.debug(&format!("Previewing users from {}", ctx.config.url()));

    let result = ctx.service.preview(&ctx.config).await;

    if ctx.is_json() {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.is_error {
        ctx.error(&result.message.red().to_string());
    } else {
        ctx.info(&result.message.green().to_string());
        if !ctx.quiet {
            print_users(&result.users);
        }
    }

    if result.is_error {
        anyhow::bail!("Preview failed");
    }

    Ok(())
}
