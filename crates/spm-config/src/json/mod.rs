//! package.json parsing

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use spm_core::error::SpmError;
use spm_core::types::PackageId;
use crate::ConfigResult;

/// Fields copied into the registration payload when publishing
const PUBLISHED_FIELDS: &[&str] = &[
    "description",
    "keywords",
    "homepage",
    "repository",
    "license",
    "dependencies",
];

/// The parts of package.json spm cares about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageJson {
    /// Package name (required)
    #[serde(default)]
    pub name: String,

    /// Package version (required)
    #[serde(default)]
    pub version: String,

    /// Registry root the package is published under; older files call it `family`
    #[serde(default, alias = "family", skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    /// Package description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Everything else, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PackageJson {
    /// Registry coordinates; `default_root` is used when the file names none
    pub fn package_id(&self, default_root: Option<&str>) -> ConfigResult<PackageId> {
        let root = self
            .root
            .as_deref()
            .or(default_root)
            .filter(|root| !root.is_empty())
            .ok_or_else(|| SpmError::ConfigValidation {
                field: "root".to_string(),
                reason: "package.json has no root (or family) and none was given".to_string(),
            })?;

        Ok(PackageId::new(root, &self.name).with_version(&self.version))
    }

    /// Descriptive fields to send along with a registration
    pub fn publish_metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        if let Some(description) = &self.description {
            metadata.insert("description".to_string(), Value::String(description.clone()));
        }
        for field in PUBLISHED_FIELDS {
            if let Some(value) = self.extra.get(*field) {
                metadata.insert(field.to_string(), value.clone());
            }
        }
        metadata
    }
}

/// Parse package.json content
pub fn parse_package_json(content: &str) -> ConfigResult<PackageJson> {
    let package: PackageJson = serde_json::from_str(content).map_err(|e| SpmError::JsonParse {
        message: format!("line {}, column {}: {}", e.line(), e.column(), e),
    })?;

    validate_package_json(&package)?;

    Ok(package)
}

/// Check the fields publishing depends on
pub fn validate_package_json(package: &PackageJson) -> ConfigResult<()> {
    if package.name.is_empty() {
        return Err(SpmError::ConfigValidation {
            field: "name".to_string(),
            reason: "package.json must have a name".to_string(),
        });
    }

    if !is_valid_package_name(&package.name) {
        return Err(SpmError::ConfigValidation {
            field: "name".to_string(),
            reason: format!(
                "Invalid package name '{}'. Names may contain letters, digits, '-', '_' and '.'",
                package.name
            ),
        });
    }

    if package.version.is_empty() {
        return Err(SpmError::ConfigValidation {
            field: "version".to_string(),
            reason: "package.json must have a version".to_string(),
        });
    }

    Ok(())
}

/// Load and parse package.json from file path
pub async fn load_from_file(path: &camino::Utf8Path) -> ConfigResult<PackageJson> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SpmError::io_at(path.as_std_path(), e))?;

    parse_package_json(&content).map_err(|e| match e {
        SpmError::JsonParse { message } => SpmError::JsonParse {
            message: format!("In file {}: {}", path, message),
        },
        other => other,
    })
}

fn is_valid_package_name(name: &str) -> bool {
    name.chars().next().map_or(false, char::is_alphanumeric)
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
