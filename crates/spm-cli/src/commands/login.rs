//! `spm login`

use serde_json::Value;
use spm_core::error::{SpmError, SpmResult};
use spm_registry::LoginParams;
use tracing::debug;

use super::CommandContext;

/// Log in and save the returned token to the user config file
pub async fn execute(mut params: LoginParams, ctx: &CommandContext) -> SpmResult<()> {
    if params.account.is_none() && params.username.is_none() && params.email.is_none() {
        params.username = ctx.settings.username.clone();
    }

    let client = ctx.client(false)?;
    let reply = client.login(&params).await?;

    if let Some(message) = reply.failure() {
        return Err(SpmError::registry(reply.body.status.as_deref(), message));
    }

    match &reply.body.data {
        Some(Value::String(token)) if !token.is_empty() => {
            let path = ctx.loader.global_config_path()?;
            spm_config::toml::save_auth(&path, token).await?;
            debug!("Saved token to {}", path);
            ctx.output.success(&format!("Logged in, token saved to {}", path));
        }
        _ => ctx.output.warn("Logged in, but the registry returned no token"),
    }

    Ok(())
}
