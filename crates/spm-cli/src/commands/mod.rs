//! Command implementations and dispatch logic.
//!
//! Each command is an async function that takes a [`CommandContext`], which
//! carries the merged settings and builds registry clients from them.

use std::collections::HashMap;

use camino::Utf8PathBuf;
use spm_config::{ConfigLayering, ConfigLoader, RegistrySettings};
use spm_core::error::{SpmError, SpmResult};
use spm_registry::{ClientOptions, RegistryClient};
use tracing::{debug, info};

pub mod info;
pub mod login;
pub mod publish;


use crate::{output::OutputHandler, Commands};

/// Shared context for all commands
pub struct CommandContext {
    pub loader: ConfigLoader,
    pub settings: RegistrySettings,
    pub output: OutputHandler,
}

impl CommandContext {
    /// Load configuration for the current directory; `overrides` come from CLI flags
    pub async fn new(overrides: HashMap<String, String>) -> SpmResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| SpmError::io("Failed to get current directory".to_string(), e))?;
        let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| SpmError::ConfigValidation {
            field: "cwd".to_string(),
            reason: format!("Working directory is not valid UTF-8: {}", e),
        })?;

        let loader = ConfigLoader::new(cwd);
        let (config, config_path) = loader.load_global_config().await?;
        if let Some(path) = &config_path {
            debug!("Loaded configuration from {}", path);
        }

        let settings = ConfigLayering::merge_configs(
            config,
            config_path.as_deref(),
            ConfigLayering::collect_env_overrides(),
            overrides,
        )?;

        Ok(Self {
            loader,
            settings,
            output: OutputHandler::new(),
        })
    }

    /// Client options from the merged settings
    pub fn client_options(&self, force: bool) -> ClientOptions {
        ClientOptions {
            server: self.settings.server.clone(),
            auth: self.settings.auth.clone(),
            force,
            lang: self.settings.lang.clone(),
            proxy: self.settings.proxy.clone(),
            download_base: self.settings.download_base.clone(),
            ..ClientOptions::default()
        }
    }

    /// HTTP registry client that traces every request event at debug level
    pub fn client(&self, force: bool) -> SpmResult<RegistryClient> {
        let mut client = RegistryClient::new(self.client_options(force))?;
        client.subscribe(|event| debug!("registry event: {}", event.name()));
        Ok(client)
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> SpmResult<()> {
    match command {
        Commands::Login {
            account,
            username,
            email,
            password,
        } => {
            info!("Logging in");
            let params = spm_registry::LoginParams {
                account,
                username,
                email,
                password,
            };
            login::execute(params, ctx).await
        }
        Commands::Publish { tarfile, force, root } => {
            info!("Publishing package (force: {})", force);
            publish::execute(tarfile, force, root, ctx).await
        }
        Commands::Info { package } => {
            info!("Looking up {}", package);
            info::execute(&package, ctx).await
        }
    }
}
