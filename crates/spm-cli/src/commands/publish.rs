//! `spm publish`

use std::path::PathBuf;

use spm_core::error::{SpmError, SpmResult};
use spm_registry::request::DEFAULT_SERVER;
use spm_registry::PublishParams;
use tracing::debug;

use super::CommandContext;
use crate::tarball;

/// Publish the package found from the working directory.
///
/// Without `tarfile` the project directory is packed into a temporary
/// tarball that lives until the upload is done.
pub async fn execute(
    tarfile: Option<PathBuf>,
    force: bool,
    root: Option<String>,
    ctx: &CommandContext,
) -> SpmResult<()> {
    let (package, project_dir) = ctx.loader.load_package().await?;
    let id = package.package_id(root.as_deref())?;

    let (tarfile, _staging) = match tarfile {
        Some(path) => (path, None),
        None => {
            let staging = tempfile::tempdir()
                .map_err(|e| SpmError::io("Failed to create staging directory".to_string(), e))?;
            let path = staging
                .path()
                .join(format!("{}-{}.tar.gz", id.name, package.version));
            let size = tarball::create_tarball_file(project_dir.as_std_path(), &path)?;
            debug!("Packed {} into {} ({} bytes)", project_dir, path.display(), size);
            (path, Some(staging))
        }
    };

    let mut params = PublishParams::new(&id, tarfile);
    params.metadata = package.publish_metadata();

    let server = ctx.settings.server.as_deref().unwrap_or(DEFAULT_SERVER);
    ctx.output.info(&format!("Publishing {} to {}", id, server));
    let client = ctx.client(force)?;
    let reply = client.publish(&params).await?;

    if let Some(message) = reply.failure() {
        return Err(SpmError::registry(reply.body.status.as_deref(), message));
    }

    ctx.output.success(&format!("Published {}", id));
    Ok(())
}
