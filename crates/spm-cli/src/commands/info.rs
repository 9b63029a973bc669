//! `spm info`

use serde_json::Value;
use spm_core::error::{SpmError, SpmResult};
use spm_core::types::PackageId;

use super::CommandContext;

/// Print package metadata, including its resolved download link, as JSON
pub async fn execute(package: &str, ctx: &CommandContext) -> SpmResult<()> {
    let id: PackageId = package.parse()?;

    let client = ctx.client(false)?;
    let reply = client.info(&id).await?;

    if let Some(message) = reply.failure() {
        return Err(SpmError::registry(reply.body.status.as_deref(), message));
    }

    let data = reply.body.data.unwrap_or(Value::Null);
    let rendered = serde_json::to_string_pretty(&data).map_err(|e| SpmError::JsonParse {
        message: e.to_string(),
    })?;
    ctx.output.print(&rendered);

    Ok(())
}
