//! Addon stream protocol shared by the aggregator and installed providers.
//!
//! `GET {base}/stream/{movie|series}/{contentId}.json` returns
//! `{ "streams": [ { name?, title?, description?, infoHash?, url?, fileIdx?, behaviorHints? } ] }`.

use serde::Deserialize;
use tracing::trace;

use crate::classify::join_text;
use crate::stream::{InfoHash, Stream};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamsResponse {
    #[serde(default)]
    pub streams: Vec<AddonStream>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonStream {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub info_hash: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub file_idx: Option<u32>,
    #[serde(default)]
    pub behavior_hints: Option<BehaviorHints>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorHints {
    #[serde(default)]
    pub binge_group: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub not_web_ready: bool,
    #[serde(default)]
    pub video_size: Option<u64>,
    #[serde(default)]
    pub cached: Option<bool>,
}

/// `{base}/{path}` with exactly one slash between.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Parse a streams response body. Bodies without a `streams` array yield
/// an empty list.
pub fn parse_streams(body: &[u8]) -> Result<Vec<AddonStream>, serde_json::Error> {
    Ok(serde_json::from_slice::<StreamsResponse>(body)?.streams)
}

/// Convert addon entries to canonical streams.
///
/// Entries with a valid hash become torrent streams; otherwise entries
/// with a URL become direct-URL streams; anything else is skipped.
/// `cached_default` is used when an entry carries no cached flag of its own.
pub fn normalize(
    streams: Vec<AddonStream>,
    provider_id: &str,
    provider_name: &str,
    cached_default: Option<bool>,
) -> Vec<Stream> {
    streams
        .into_iter()
        .filter_map(|entry| to_stream(entry, provider_id, provider_name, cached_default))
        .collect()
}

fn to_stream(
    entry: AddonStream,
    provider_id: &str,
    provider_name: &str,
    cached_default: Option<bool>,
) -> Option<Stream> {
    let hints = entry.behavior_hints.unwrap_or_default();
    let raw_text = join_text([
        entry.name.as_deref(),
        entry.title.as_deref(),
        entry.description.as_deref(),
        hints.filename.as_deref(),
    ]);
    let title = entry
        .title
        .as_deref()
        .or(entry.description.as_deref())
        .or(entry.name.as_deref())
        .and_then(|t| t.lines().next())
        .unwrap_or_default()
        .to_string();

    let stream = match (InfoHash::parse_opt(entry.info_hash.as_deref()), entry.url) {
        (Some(hash), _) => Stream::torrent(hash, provider_id, provider_name, title, raw_text),
        (None, Some(url)) if !url.trim().is_empty() => {
            Stream::direct(url, provider_id, provider_name, title, raw_text)
        }
        _ => {
            trace!(provider = provider_id, "Skipping entry without hash or url");
            return None;
        }
    };

    Some(
        stream
            .with_file_index(entry.file_idx)
            .with_filename(hints.filename)
            .with_size_hint(hints.video_size)
            .with_upstream_cached(hints.cached.or(cached_default)),
    )
}
