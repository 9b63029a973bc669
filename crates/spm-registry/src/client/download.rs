//! Download link resolution for package lookups

use serde_json::{Map, Value};

/// Where a package artifact can be fetched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    /// Base the relative `download_url` is resolved against
    pub download_base: Option<String>,
    /// Link as reported by the registry
    pub download_url: String,
    /// Absolute link to the artifact
    pub download: String,
}

impl DownloadLink {
    /// Write the three fields into package metadata
    pub fn merge_into(&self, data: &mut Map<String, Value>) {
        if let Some(base) = &self.download_base {
            data.insert("download_base".to_string(), Value::String(base.clone()));
        }
        data.insert("download_url".to_string(), Value::String(self.download_url.clone()));
        data.insert("download".to_string(), Value::String(self.download.clone()));
    }
}

/// Work out the download link from lookup metadata.
///
/// A versioned lookup carries `download_url` directly in `data`; a listing
/// carries it on the first entry of `data.packages`. `base_override` wins
/// over the registry's own `download_base`.
pub fn resolve_download(
    data: &Value,
    versioned: bool,
    base_override: Option<&str>,
) -> Option<DownloadLink> {
    let source = if versioned {
        data
    } else {
        data.get("packages")?.get(0)?
    };
    let download_url = source.get("download_url")?.as_str()?.to_string();

    let download_base = base_override
        .filter(|base| !base.is_empty())
        .map(str::to_string)
        .or_else(|| {
            data.get("download_base")
                .and_then(Value::as_str)
                .map(str::to_string)
        });

    let download = if is_absolute(&download_url) {
        download_url.clone()
    } else {
        match &download_base {
            Some(base) => format!("{}/{}", base.strip_suffix('/').unwrap_or(base), download_url),
            None => download_url.clone(),
        }
    };

    Some(DownloadLink {
        download_base,
        download_url,
        download,
    })
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("http:") || url.starts_with("https:")
}
