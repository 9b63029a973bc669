//! Package coordinate type.
//!
//! A package on the registry is addressed by the root (family) it lives
//! under, its name, and optionally a version.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SpmError;

/// Registry coordinates of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageId {
    pub root: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl PackageId {
    /// Create coordinates without a version
    pub fn new(root: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
            version: None,
        }
    }

    /// Pin the coordinates to one version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into()).filter(|v: &String| !v.is_empty());
        self
    }

    /// Relative registry path for these coordinates.
    ///
    /// Without a version the path keeps its trailing slash, which the
    /// registry reads as "list all versions".
    pub fn repository_path(&self) -> String {
        match &self.version {
            Some(version) => format!("repository/{}/{}/{}", self.root, self.name, version),
            None => format!("repository/{}/{}/", self.root, self.name),
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.root, self.name)?;
        if let Some(version) = &self.version {
            write!(f, "@{}", version)?;
        }
        Ok(())
    }
}

impl FromStr for PackageId {
    type Err = SpmError;

    /// Parse `root/name` or `root/name@version`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| SpmError::ConfigValidation {
            field: "package".to_string(),
            reason: format!("'{}' {}", s, reason),
        };

        let (path, version) = match s.split_once('@') {
            Some((path, version)) => (path, Some(version)),
            None => (s, None),
        };
        let (root, name) = path
            .split_once('/')
            .ok_or_else(|| invalid("must look like root/name[@version]"))?;

        if root.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid("must look like root/name[@version]"));
        }
        if version == Some("") {
            return Err(invalid("has an empty version after '@'"));
        }

        let id = PackageId::new(root, name);
        Ok(match version {
            Some(version) => id.with_version(version),
            None => id,
        })
    }
}
