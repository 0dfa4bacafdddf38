//! Addon manifest parsing and install-URL normalization.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::fetch::FetchError;
use crate::stream::MediaKind;

/// Install-time manifest failures. Installed providers are never affected.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("unsupported manifest URL scheme {0:?}: only http and https are allowed")]
    UnsupportedScheme(String),

    #[error("invalid manifest URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("manifest is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("failed to fetch manifest: {0}")]
    Fetch(#[from] FetchError),
}

/// Wire shape of `{base}/manifest.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub resources: Vec<ManifestResource>,
    #[serde(default)]
    pub id_prefixes: Option<Vec<String>>,
    #[serde(default)]
    pub catalogs: Vec<serde_json::Value>,
}

/// A resource is either a bare name or a detailed object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ManifestResource {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        types: Option<Vec<String>>,
        #[serde(default, rename = "idPrefixes")]
        id_prefixes: Option<Vec<String>>,
    },
}

impl ManifestResource {
    pub fn name(&self) -> &str {
        match self {
            ManifestResource::Name(name) | ManifestResource::Detailed { name, .. } => name,
        }
    }
}

impl Manifest {
    pub fn parse(body: &[u8]) -> Result<Self, ManifestError> {
        serde_json::from_slice(body).map_err(ManifestError::InvalidJson)
    }

    fn stream_resource(&self) -> Option<&ManifestResource> {
        self.resources.iter().find(|r| r.name() == "stream")
    }
}

/// An installed third-party provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub name: String,
    pub version: String,
    /// Manifest URL minus `/manifest.json`, no trailing slash.
    pub base_url: String,
    pub original_manifest_url: String,
    pub supported_types: BTreeSet<String>,
    pub stream_capable: bool,
    /// Manifest-level content id prefixes.
    pub id_prefixes: BTreeSet<String>,
    /// Prefixes declared on the stream resource itself.
    #[serde(default)]
    pub resource_id_prefixes: BTreeSet<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

impl Provider {
    /// Build a provider record from a fetched manifest.
    pub fn from_manifest(manifest: Manifest, base_url: &str, original_manifest_url: &str) -> Self {
        let stream = manifest.stream_resource().cloned();

        let (resource_types, resource_prefixes) = match &stream {
            Some(ManifestResource::Detailed {
                types, id_prefixes, ..
            }) => (types.clone(), id_prefixes.clone()),
            _ => (None, None),
        };

        let supported_types = resource_types
            .unwrap_or_else(|| manifest.types.clone())
            .into_iter()
            .collect();

        let id = manifest
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| slug_for(base_url));

        Self {
            name: manifest.name.unwrap_or_else(|| id.clone()),
            id,
            version: manifest.version.unwrap_or_else(|| "0.0.0".to_string()),
            base_url: base_url.to_string(),
            original_manifest_url: original_manifest_url.to_string(),
            supported_types,
            stream_capable: stream.is_some(),
            id_prefixes: manifest.id_prefixes.unwrap_or_default().into_iter().collect(),
            resource_id_prefixes: resource_prefixes.unwrap_or_default().into_iter().collect(),
            description: manifest.description,
            logo: manifest.logo,
        }
    }

    /// Whether this provider can serve streams for `content_id`.
    ///
    /// Requires a stream resource and a matching type; when id prefixes are
    /// declared at either level, the id must start with one of them.
    pub fn supports(&self, kind: MediaKind, content_id: &str) -> bool {
        if !self.stream_capable {
            return false;
        }
        if !self.supported_types.is_empty() && !self.supported_types.contains(kind.wire_type()) {
            return false;
        }

        let mut prefixes = self.id_prefixes.iter().chain(&self.resource_id_prefixes).peekable();
        if prefixes.peek().is_none() {
            return true;
        }
        prefixes.any(|prefix| content_id.starts_with(prefix.as_str()))
    }
}

/// Split a user-supplied URL into `(base_url, manifest_url)`.
///
/// Accepts either the manifest URL itself or the addon base URL.
pub fn normalize_install_url(input: &str) -> Result<(String, String), ManifestError> {
    let trimmed = input.trim();
    let parsed = Url::parse(trimmed).map_err(|e| ManifestError::InvalidUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(ManifestError::UnsupportedScheme(other.to_string())),
    }

    let without_query = trimmed
        .split(['?', '#'])
        .next()
        .unwrap_or(trimmed)
        .trim_end_matches('/');
    let base = without_query
        .strip_suffix("/manifest.json")
        .unwrap_or(without_query)
        .trim_end_matches('/')
        .to_string();

    let manifest_url = format!("{base}/manifest.json");
    Ok((base, manifest_url))
}

/// Deterministic id for manifests without one: host and path, slugified.
pub fn slug_for(base_url: &str) -> String {
    let stripped = base_url
        .strip_prefix("https://")
        .or_else(|| base_url.strip_prefix("http://"))
        .unwrap_or(base_url);

    let mut slug = String::with_capacity(stripped.len());
    for c in stripped.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}
