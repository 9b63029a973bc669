//! `~/.spm/config.toml` parsing, validation and token persistence

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use toml_edit::Item;
use spm_core::error::SpmError;
use crate::ConfigResult;

/// Complete user configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpmConfig {
    /// Registry connection settings
    #[serde(default)]
    pub registry: RegistrySection,

    /// Account settings
    #[serde(default)]
    pub user: UserSection,
}

/// `[registry]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySection {
    /// Registry base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    /// Token saved by `spm login`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,

    /// Preferred language for registry messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,

    /// HTTP(S) proxy URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// Base URL that relative download links are resolved against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_base: Option<String>,
}

/// `[user]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSection {
    /// Default account for `spm login`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Parse the contents of a config file; `file` names it in error messages
pub fn parse_config(content: &str, file: &str) -> ConfigResult<SpmConfig> {
    // toml_edit first: its errors carry the span of the syntax problem
    content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| located_error(file, content, e.message(), e.span()))?;

    let config: SpmConfig = toml::from_str(content)
        .map_err(|e| located_error(file, content, e.message(), e.span()))?;

    validate_config(&config)?;

    Ok(config)
}

/// Serialize a config back to TOML
pub fn serialize_config(config: &SpmConfig) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| SpmError::ConfigValidation {
        field: "config".to_string(),
        reason: format!("TOML serialization error: {}", e),
    })
}

/// Validate URL-valued settings
pub fn validate_config(config: &SpmConfig) -> ConfigResult<()> {
    let registry = &config.registry;
    let urls = [
        ("registry.server", &registry.server),
        ("registry.proxy", &registry.proxy),
        ("registry.download_base", &registry.download_base),
    ];
    for (field, value) in urls {
        if let Some(value) = value {
            validate_http_url(field, value)?;
        }
    }

    Ok(())
}

/// Check that `value` is an absolute http(s) URL
pub fn validate_http_url(field: &str, value: &str) -> ConfigResult<()> {
    let parsed = url::Url::parse(value).map_err(|e| SpmError::ConfigValidation {
        field: field.to_string(),
        reason: format!("'{}' is not a valid URL: {}", value, e),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SpmError::ConfigValidation {
            field: field.to_string(),
            reason: format!("'{}' must use http or https", value),
        });
    }

    Ok(())
}

/// Load and parse a config file
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<SpmConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SpmError::io_at(path.as_std_path(), e))?;

    parse_config(&content, path.as_str())
}

/// Store `token` as `registry.auth`, keeping the rest of the file as written
pub async fn save_auth(path: &Utf8Path, token: &str) -> ConfigResult<()> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(SpmError::io_at(path.as_std_path(), e)),
    };

    let updated = set_auth(&content, path.as_str(), token)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| SpmError::io_at(parent.as_std_path(), e))?;
    }
    tokio::fs::write(path, updated)
        .await
        .map_err(|e| SpmError::io_at(path.as_std_path(), e))
}

/// Return `content` with `registry.auth` set to `token`
fn set_auth(content: &str, file: &str, token: &str) -> ConfigResult<String> {
    let mut document = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| located_error(file, content, e.message(), e.span()))?;

    // `[registry]` may also be written as an inline table
    if document.get("registry").and_then(Item::as_table_like).is_none() {
        if document.contains_key("registry") {
            return Err(SpmError::ConfigValidation {
                field: "registry".to_string(),
                reason: format!("{} has a `registry` key that is not a table", file),
            });
        }
        document.insert("registry", toml_edit::table());
    }
    if let Some(registry) = document.get_mut("registry").and_then(Item::as_table_like_mut) {
        registry.insert("auth", toml_edit::value(token));
    }

    Ok(document.to_string())
}

fn located_error(
    file: &str,
    content: &str,
    message: &str,
    span: Option<std::ops::Range<usize>>,
) -> SpmError {
    let (line, column) = span
        .map(|span| line_column(content, span.start))
        .unwrap_or((0, 0));

    SpmError::TomlParse {
        file: file.to_string(),
        message: message.trim().to_string(),
        line,
        column,
    }
}

/// 1-based line and column of a byte offset
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let before = &content[..offset.min(content.len())];
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map_or(0, |tail| tail.chars().count()) + 1;
    (line, column)
}
