//! Canonical stream records shared by every source adapter.
//!
//! Adapters normalize their wire payloads into [`Stream`]; the classifier
//! turns a [`Stream`] into a [`ClassifiedStream`].

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::hash::InfoHash;

/// What kind of content a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Episode,
}

impl MediaKind {
    /// Type name used by the addon wire protocol (`movie` / `series`).
    pub fn wire_type(self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Episode => "series",
        }
    }
}

/// How a stream is played back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Needs a debrid service (or a torrent client) to become playable.
    Torrent,
    /// Already an HTTP URL.
    DirectUrl,
}

/// Normalized stream record produced by a source adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    pub source_kind: SourceKind,
    pub info_hash: Option<InfoHash>,
    /// Present iff `source_kind` is [`SourceKind::DirectUrl`].
    pub url: Option<String>,
    /// Short human-readable label.
    pub title: String,
    /// Newline-joined name/title/description, fed to the classifier.
    pub raw_text: String,
    pub provider_id: String,
    pub provider_name: String,
    pub file_index: Option<u32>,
    pub filename: Option<String>,
    /// Cached flag reported by the upstream payload itself.
    pub upstream_cached: Option<bool>,
    /// Size reported as a structured field, used when the text carries none.
    pub size_hint: Option<u64>,
}

impl Stream {
    pub fn torrent(
        info_hash: InfoHash,
        provider_id: impl Into<String>,
        provider_name: impl Into<String>,
        title: impl Into<String>,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            source_kind: SourceKind::Torrent,
            info_hash: Some(info_hash),
            url: None,
            title: title.into(),
            raw_text: raw_text.into(),
            provider_id: provider_id.into(),
            provider_name: provider_name.into(),
            file_index: None,
            filename: None,
            upstream_cached: None,
            size_hint: None,
        }
    }

    pub fn direct(
        url: impl Into<String>,
        provider_id: impl Into<String>,
        provider_name: impl Into<String>,
        title: impl Into<String>,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            source_kind: SourceKind::DirectUrl,
            info_hash: None,
            url: Some(url.into()),
            title: title.into(),
            raw_text: raw_text.into(),
            provider_id: provider_id.into(),
            provider_name: provider_name.into(),
            file_index: None,
            filename: None,
            upstream_cached: None,
            size_hint: None,
        }
    }

    #[must_use]
    pub fn with_info_hash(mut self, info_hash: Option<InfoHash>) -> Self {
        self.info_hash = info_hash;
        self
    }

    #[must_use]
    pub fn with_file_index(mut self, file_index: Option<u32>) -> Self {
        self.file_index = file_index;
        self
    }

    #[must_use]
    pub fn with_filename(mut self, filename: Option<String>) -> Self {
        self.filename = filename;
        self
    }

    #[must_use]
    pub fn with_upstream_cached(mut self, cached: Option<bool>) -> Self {
        self.upstream_cached = cached;
        self
    }

    #[must_use]
    pub fn with_size_hint(mut self, size: Option<u64>) -> Self {
        self.size_hint = size;
        self
    }

    /// Magnet URI for torrent streams.
    pub fn magnet(&self) -> Option<String> {
        match self.source_kind {
            SourceKind::Torrent => self.info_hash.as_ref().map(InfoHash::magnet),
            SourceKind::DirectUrl => None,
        }
    }
}

/// Coarse resolution bucket used to partition results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityTier {
    #[serde(rename = "4K")]
    FourK,
    #[serde(rename = "1080p")]
    FullHd,
    #[serde(rename = "Other")]
    Other,
}

impl QualityTier {
    /// Every resolution maps to exactly one tier.
    pub fn from_resolution(resolution: Option<&str>) -> Self {
        match resolution {
            Some(r) if r.eq_ignore_ascii_case("4k") || r.eq_ignore_ascii_case("2160p") => {
                QualityTier::FourK
            }
            Some(r) if r.eq_ignore_ascii_case("1080p") => QualityTier::FullHd,
            _ => QualityTier::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityTier::FourK => "4K",
            QualityTier::FullHd => "1080p",
            QualityTier::Other => "Other",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A [`Stream`] plus the attributes extracted from its text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedStream {
    #[serde(flatten)]
    pub stream: Stream,
    pub quality_tier: QualityTier,
    pub resolution: Option<String>,
    pub codec: Option<String>,
    pub hdr: Option<String>,
    pub audio: Option<String>,
    pub source_type: Option<String>,
    pub languages: BTreeSet<String>,
    pub seed_count: u32,
    pub size_bytes: u64,
    pub cached_hint: bool,
}

impl AsRef<Stream> for Stream {
    fn as_ref(&self) -> &Stream {
        self
    }
}

impl AsRef<Stream> for ClassifiedStream {
    fn as_ref(&self) -> &Stream {
        &self.stream
    }
}

impl ClassifiedStream {
    pub fn info_hash(&self) -> Option<&InfoHash> {
        self.stream.info_hash.as_ref()
    }

    pub fn provider_name(&self) -> &str {
        &self.stream.provider_name
    }
}
