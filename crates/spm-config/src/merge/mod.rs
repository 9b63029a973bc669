//! Configuration layering, file discovery and environment overrides

use std::collections::{BTreeMap, HashMap};

use camino::{Utf8Path, Utf8PathBuf};
use spm_core::error::SpmError;
use crate::json::PackageJson;
use crate::toml::{validate_http_url, SpmConfig};
use crate::ConfigResult;

/// Environment variables read as overrides, and the setting each one sets
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("SPM_SERVER", "server"),
    ("SPM_AUTH", "auth"),
    ("SPM_LANG", "lang"),
    ("SPM_PROXY", "proxy"),
    ("SPM_DOWNLOAD_BASE", "download_base"),
    ("SPM_USERNAME", "username"),
];

/// Finds and loads configuration files
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
    /// Home directory, if one could be determined
    home: Option<Utf8PathBuf>,
}

/// Where a setting came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// User config file
    Global(Utf8PathBuf),
    /// Environment variable
    Environment(String),
    /// CLI flag
    CommandLine,
}

/// Final settings a registry client is created with
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrySettings {
    pub server: Option<String>,
    pub auth: Option<String>,
    pub lang: Option<String>,
    pub proxy: Option<String>,
    pub download_base: Option<String>,
    /// Default login account
    pub username: Option<String>,
    /// Where each non-empty setting came from
    pub sources: BTreeMap<String, ConfigSource>,
}

impl RegistrySettings {
    fn slot(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key {
            "server" => Some(&mut self.server),
            "auth" => Some(&mut self.auth),
            "lang" => Some(&mut self.lang),
            "proxy" => Some(&mut self.proxy),
            "download_base" => Some(&mut self.download_base),
            "username" => Some(&mut self.username),
            _ => None,
        }
    }

    fn set(&mut self, key: &str, value: &str, source: ConfigSource) {
        if value.is_empty() {
            return;
        }
        if let Some(slot) = self.slot(key) {
            *slot = Some(value.to_string());
            self.sources.insert(key.to_string(), source);
        }
    }

    pub fn source_of(&self, key: &str) -> Option<&ConfigSource> {
        self.sources.get(key)
    }
}

impl ConfigLoader {
    /// Create a loader rooted at `cwd`, using the user's home directory
    pub fn new(cwd: Utf8PathBuf) -> Self {
        let home = dirs::home_dir().and_then(|home| Utf8PathBuf::try_from(home).ok());
        Self { cwd, home }
    }

    /// Create a loader with an explicit home directory
    pub fn with_home(cwd: Utf8PathBuf, home: Utf8PathBuf) -> Self {
        Self {
            cwd,
            home: Some(home),
        }
    }

    pub fn cwd(&self) -> &Utf8Path {
        &self.cwd
    }

    /// Path of the user config file
    pub fn global_config_path(&self) -> ConfigResult<Utf8PathBuf> {
        let home = self.home.as_ref().ok_or_else(|| SpmError::ConfigValidation {
            field: "home_dir".to_string(),
            reason: "Could not determine home directory".to_string(),
        })?;

        Ok(home.join(".spm").join("config.toml"))
    }

    /// Load the user config file; a missing file yields defaults
    pub async fn load_global_config(&self) -> ConfigResult<(SpmConfig, Option<Utf8PathBuf>)> {
        let path = self.global_config_path()?;

        if path.exists() {
            let config = crate::toml::load_from_file(&path).await?;
            Ok((config, Some(path)))
        } else {
            Ok((SpmConfig::default(), None))
        }
    }

    /// Find `filename` in the working directory or one of its parents
    pub fn find_upwards(&self, filename: &str) -> Option<Utf8PathBuf> {
        let mut current = Some(self.cwd.as_path());

        while let Some(dir) = current {
            let candidate = dir.join(filename);
            if candidate.exists() {
                return Some(candidate);
            }
            current = dir.parent();
        }

        None
    }

    /// Load the project's package.json, returning it with its directory
    pub async fn load_package(&self) -> ConfigResult<(PackageJson, Utf8PathBuf)> {
        let path = self.find_upwards("package.json").ok_or_else(|| SpmError::ConfigValidation {
            field: "package.json".to_string(),
            reason: format!("No package.json found in {} or its parent directories", self.cwd),
        })?;

        let package = crate::json::load_from_file(&path).await?;
        let dir = path
            .parent()
            .map(Utf8Path::to_path_buf)
            .unwrap_or_else(|| self.cwd.clone());

        Ok((package, dir))
    }
}

/// Configuration layering and merging
pub struct ConfigLayering;

impl ConfigLayering {
    /// Merge the config file, environment and CLI flags, later layers winning
    pub fn merge_configs(
        global_config: SpmConfig,
        global_path: Option<&Utf8Path>,
        env_overrides: HashMap<String, String>,
        cli_overrides: HashMap<String, String>,
    ) -> ConfigResult<RegistrySettings> {
        let mut settings = RegistrySettings::default();

        let file_source = || {
            global_path
                .map(|path| ConfigSource::Global(path.to_path_buf()))
                .unwrap_or(ConfigSource::CommandLine)
        };
        let registry = &global_config.registry;
        let from_file = [
            ("server", &registry.server),
            ("auth", &registry.auth),
            ("lang", &registry.lang),
            ("proxy", &registry.proxy),
            ("download_base", &registry.download_base),
            ("username", &global_config.user.username),
        ];
        for (key, value) in from_file {
            if let Some(value) = value {
                settings.set(key, value, file_source());
            }
        }

        Self::apply_env_overrides(&mut settings, &env_overrides);
        Self::apply_cli_overrides(&mut settings, &cli_overrides);

        let urls = [
            ("server", &settings.server),
            ("proxy", &settings.proxy),
            ("download_base", &settings.download_base),
        ];
        for (field, value) in urls {
            if let Some(value) = value {
                validate_http_url(field, value)?;
            }
        }

        Ok(settings)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(settings: &mut RegistrySettings, overrides: &HashMap<String, String>) {
        for (var, key) in ENV_OVERRIDES {
            if let Some(value) = overrides.get(*var) {
                settings.set(key, value, ConfigSource::Environment(var.to_string()));
            }
        }
    }

    /// Apply CLI flag overrides
    fn apply_cli_overrides(settings: &mut RegistrySettings, overrides: &HashMap<String, String>) {
        for (key, value) in overrides {
            // unknown keys are ignored
            settings.set(key, value, ConfigSource::CommandLine);
        }
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with("SPM_"))
            .collect()
    }
}
