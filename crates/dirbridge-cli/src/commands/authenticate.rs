//! authenticate command - verify a password by directory re-bind

use super::CommandContext;
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

#[derive(Serialize)]
struct AuthenticateResult<'a> {
    username: &'a str,
    authenticated: bool,
}

pub async fn execute(ctx: &CommandContext, username: &str, password: &str) -> Result<()> {
    ctx.debug(&format!("Authenticating {}", username));

    let authenticated = ctx.service.authenticate(&ctx.config, username, password).await;

    if ctx.is_json() {
        let result = AuthenticateResult {
            username,
            authenticated,
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if authenticated {
        ctx.info(&format!("{}: {}", "authenticated".green(), username));
    } else {
        ctx.error(&format!("{}: {}", "rejected".red(), username));
    }

    if !authenticated {
        anyhow::bail!("Authentication failed");
    }

    Ok(())
}
