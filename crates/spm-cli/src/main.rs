//! # spm-cli
//!
//! Command line client for the spm package registry.
//!
//! This is the entry point of the `spm` binary. It parses arguments, sets up
//! logging, loads configuration and dispatches to the command handlers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use spm_core::error::SpmError;
use tracing::{error, info};

mod commands;
mod output;
mod tarball;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Client for the spm package registry
#[derive(Parser)]
#[command(name = "spm", version, about = "Client for the spm package registry")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Registry server URL
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Authentication token
    #[arg(long, global = true)]
    pub auth: Option<String>,

    /// HTTP(S) proxy URL
    #[arg(long, global = true)]
    pub proxy: Option<String>,

    /// Language for registry messages, e.g. zh_CN
    #[arg(long, global = true)]
    pub lang: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the returned token
    Login {
        #[arg(long)]
        account: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, env = "SPM_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Publish the package in the current directory
    Publish {
        /// Prebuilt tarball to upload instead of packing the project
        #[arg(long)]
        tarfile: Option<PathBuf>,
        /// Overwrite an existing version
        #[arg(long)]
        force: bool,
        /// Root to publish under when package.json names none
        #[arg(long)]
        root: Option<String>,
    },
    /// Show registry metadata for root/name[@version]
    Info {
        package: String,
    },
}

impl Cli {
    /// Settings given on the command line, keyed like the config file
    fn overrides(&self) -> HashMap<String, String> {
        let flags = [
            ("server", &self.server),
            ("auth", &self.auth),
            ("proxy", &self.proxy),
            ("lang", &self.lang),
        ];
        flags
            .into_iter()
            .filter_map(|(key, value)| value.clone().map(|value| (key.to_string(), value)))
            .collect()
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    info!("spm v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| SpmError::io("Failed to create async runtime".to_string(), e))?;

    let overrides = cli.overrides();
    rt.block_on(async move {
        let ctx = CommandContext::new(overrides).await?;
        commands::dispatch_command(cli.command, &ctx).await?;
        Ok::<(), anyhow::Error>(())
    })
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<SpmError>() {
        Some(spm_error) => {
            if spm_error.is_fatal() {
                error!("{}", spm_error);
            }
            eprint!("{}", ErrorFormatter::new().format_error(spm_error));
        }
        None => eprintln!("{}", ErrorFormatter::new().format_simple(&format!("{:#}", err))),
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "spm={level},spm_registry={level},spm_config={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
